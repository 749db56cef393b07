//! Resource directory keys: either a 16-bit integer id or a UTF-16 name.

use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

/// A resource directory entry's key, used at all three levels (type, name,
/// language) of [`crate::resource::table::ResTable`].
///
/// Ordering places every [`ResId::Id`] before every [`ResId::Name`]
/// (matching the on-wire convention that id entries are enumerated before
/// name entries within a directory), and orders within a kind by natural
/// order (numeric for ids, UTF-16 code unit order for names).
#[derive(Debug, Clone, Eq)]
pub enum ResId {
    Id(u16),
    Name(String),
}

impl ResId {
    pub fn as_id(&self) -> Option<u16> {
        match self {
            ResId::Id(id) => Some(*id),
            ResId::Name(_) => None,
        }
    }

    pub fn is_id(&self) -> bool {
        matches!(self, ResId::Id(_))
    }

    fn utf16_units(&self) -> Option<Vec<u16>> {
        match self {
            ResId::Name(name) => Some(name.encode_utf16().collect()),
            ResId::Id(_) => None,
        }
    }
}

impl PartialEq for ResId {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ResId::Id(a), ResId::Id(b)) => a == b,
            (ResId::Name(a), ResId::Name(b)) => a == b,
            _ => false,
        }
    }
}

impl Hash for ResId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            ResId::Id(id) => {
                0u8.hash(state);
                id.hash(state);
            }
            ResId::Name(name) => {
                1u8.hash(state);
                name.hash(state);
            }
        }
    }
}

impl PartialOrd for ResId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ResId {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (ResId::Id(a), ResId::Id(b)) => a.cmp(b),
            (ResId::Name(_), ResId::Id(_)) => Ordering::Greater,
            (ResId::Id(_), ResId::Name(_)) => Ordering::Less,
            (ResId::Name(_), ResId::Name(_)) => self.utf16_units().cmp(&other.utf16_units()),
        }
    }
}

impl From<u16> for ResId {
    fn from(id: u16) -> ResId {
        ResId::Id(id)
    }
}

impl From<&str> for ResId {
    fn from(name: &str) -> ResId {
        ResId::Name(name.to_string())
    }
}

impl From<String> for ResId {
    fn from(name: String) -> ResId {
        ResId::Name(name)
    }
}
