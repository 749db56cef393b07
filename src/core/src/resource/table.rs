//! In-memory resource tree: `type -> name -> lang -> data`, with insertion
//! order preserved at each level for iteration, but a canonical emit order
//! (ids ascending, then names ascending) used only at serialization time.
//! See [`crate::resource::codec`] for the on-wire format.

use indexmap::IndexMap;

use crate::resource::res_id::ResId;

/// The 16-byte header each directory table (type level and name level)
/// carries on the wire. Preserved across a parse/serialize round trip when
/// the input had one; defaulted to all-zero for directories this editor
/// creates itself (e.g. a freshly synthesized `RT_ICON` type).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResTableHeader {
    pub characteristics: u32,
    pub timestamp: u32,
    pub major_version: u16,
    pub minor_version: u16,
}

/// A resource leaf: the payload bytes plus the data entry's codepage field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResTableData {
    pub data: Vec<u8>,
    pub codepage: u32,
}

impl ResTableData {
    pub fn new(data: Vec<u8>) -> ResTableData {
        ResTableData { data, codepage: 0 }
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct NameEntry {
    header: Option<ResTableHeader>,
    langs: IndexMap<ResId, ResTableData>,
}

#[derive(Debug, Clone, Default)]
struct TypeEntry {
    header: Option<ResTableHeader>,
    names: IndexMap<ResId, NameEntry>,
}

/// The fully-parsed `.rsrc` tree, independent of any particular on-wire
/// encoding of it.
#[derive(Debug, Clone, Default)]
pub struct ResTable {
    types: IndexMap<ResId, TypeEntry>,
}

/// The identity of one leaf: which type, name and language it lives under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResLeafId {
    pub type_id: ResId,
    pub name_id: ResId,
    pub lang_id: ResId,
}

impl ResTable {
    pub fn new() -> ResTable {
        ResTable::default()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn type_ids(&self) -> impl Iterator<Item = &ResId> {
        self.types.keys()
    }

    pub fn type_header(&self, type_id: &ResId) -> Option<&ResTableHeader> {
        self.types.get(type_id).and_then(|t| t.header.as_ref())
    }

    pub fn name_header(&self, type_id: &ResId, name_id: &ResId) -> Option<&ResTableHeader> {
        self.types.get(type_id)?.names.get(name_id)?.header.as_ref()
    }

    /// Sets the directory header carried by the type-level table. Only
    /// meaningful to callers reconstructing a table from a parse (see
    /// [`crate::resource::codec::parse`]); freshly-created types keep a
    /// `None` header, which serializes to all-zero fields.
    pub fn set_type_header(&mut self, type_id: ResId, header: ResTableHeader) {
        self.types.entry(type_id).or_default().header = Some(header);
    }

    pub fn set_name_header(&mut self, type_id: ResId, name_id: ResId, header: ResTableHeader) {
        let type_entry = self.types.entry(type_id).or_default();
        type_entry.names.entry(name_id).or_default().header = Some(header);
    }

    /// `get(type, name?, lang?)`: when `name`/`lang` are omitted, the first
    /// inserted child at that level is used.
    pub fn get(&self, type_id: &ResId, name_id: Option<&ResId>, lang_id: Option<&ResId>) -> Option<&ResTableData> {
        let type_entry = self.types.get(type_id)?;
        let (resolved_name, name_entry) = match name_id {
            Some(name_id) => (name_id.clone(), type_entry.names.get(name_id)?),
            None => {
                let (name_id, entry) = type_entry.names.iter().next()?;
                (name_id.clone(), entry)
            }
        };
        let _ = resolved_name;
        match lang_id {
            Some(lang_id) => name_entry.langs.get(lang_id),
            None => name_entry.langs.values().next(),
        }
    }

    /// `find(type, name?)`: returns the identity of the first matching leaf
    /// rather than its data, so callers can re-`set`/delete by that
    /// identity.
    pub fn find(&self, type_id: &ResId, name_id: Option<&ResId>) -> Option<ResLeafId> {
        let type_entry = self.types.get(type_id)?;
        let (resolved_name, name_entry) = match name_id {
            Some(name_id) => (name_id.clone(), type_entry.names.get(name_id)?),
            None => {
                let (name_id, entry) = type_entry.names.iter().next()?;
                (name_id.clone(), entry)
            }
        };
        let (lang_id, _) = name_entry.langs.iter().next()?;
        Some(ResLeafId {
            type_id: type_id.clone(),
            name_id: resolved_name,
            lang_id: lang_id.clone(),
        })
    }

    /// Upserts a leaf, creating the type/name directories along the way if
    /// they don't exist yet.
    pub fn set(&mut self, type_id: ResId, name_id: ResId, lang_id: ResId, data: ResTableData) {
        let type_entry = self.types.entry(type_id).or_default();
        let name_entry = type_entry.names.entry(name_id).or_default();
        name_entry.langs.insert(lang_id, data);
    }

    pub fn delete_type(&mut self, type_id: &ResId) -> bool {
        self.types.shift_remove(type_id).is_some()
    }

    pub fn delete_name(&mut self, type_id: &ResId, name_id: &ResId) -> bool {
        let Some(type_entry) = self.types.get_mut(type_id) else {
            return false;
        };
        let removed = type_entry.names.shift_remove(name_id).is_some();
        if removed && type_entry.names.is_empty() {
            self.types.shift_remove(type_id);
        }
        removed
    }

    pub fn delete_lang(&mut self, type_id: &ResId, name_id: &ResId, lang_id: &ResId) -> bool {
        let Some(type_entry) = self.types.get_mut(type_id) else {
            return false;
        };
        let Some(name_entry) = type_entry.names.get_mut(name_id) else {
            return false;
        };
        let removed = name_entry.langs.shift_remove(lang_id).is_some();
        if removed && name_entry.langs.is_empty() {
            type_entry.names.shift_remove(name_id);
            if type_entry.names.is_empty() {
                self.types.shift_remove(type_id);
            }
        }
        removed
    }

    /// `nextId(type)`: one past the largest integer name id currently under
    /// `type`, or `0` if there are none (including when the type itself
    /// doesn't exist yet).
    pub fn next_id(&self, type_id: &ResId) -> u16 {
        let Some(type_entry) = self.types.get(type_id) else {
            return 0;
        };
        type_entry.names.keys().filter_map(ResId::as_id).max().map_or(0, |max| max + 1)
    }

    /// Lazy in-order traversal of every leaf in store order.
    pub fn iterate(&self) -> impl Iterator<Item = (ResLeafId, &ResTableData)> {
        self.types.iter().flat_map(|(type_id, type_entry)| {
            type_entry.names.iter().flat_map(move |(name_id, name_entry)| {
                name_entry.langs.iter().map(move |(lang_id, data)| {
                    (
                        ResLeafId {
                            type_id: type_id.clone(),
                            name_id: name_id.clone(),
                            lang_id: lang_id.clone(),
                        },
                        data,
                    )
                })
            })
        })
    }

    /// Emit order within a directory level: integer ids ascending, then
    /// names ascending by UTF-16 code unit. Returns the keys of `iter`
    /// sorted canonically without touching store order.
    pub(crate) fn canonical_order<'a, V>(iter: &'a IndexMap<ResId, V>) -> Vec<&'a ResId> {
        let mut keys: Vec<&ResId> = iter.keys().collect();
        keys.sort();
        keys
    }

    /// [`ResTable::canonical_order`] over the top-level type keys; the only
    /// level whose backing `IndexMap` isn't otherwise reachable outside this
    /// module.
    pub(crate) fn canonical_type_order(&self) -> Vec<&ResId> {
        Self::canonical_order(&self.types)
    }
}

impl TypeEntry {
    fn header(&self) -> Option<ResTableHeader> {
        self.header
    }
}

pub(crate) struct TypeView<'a> {
    pub header: Option<ResTableHeader>,
    pub names: &'a IndexMap<ResId, NameEntry>,
}

pub(crate) struct NameView<'a> {
    pub header: Option<ResTableHeader>,
    pub langs: &'a IndexMap<ResId, ResTableData>,
}

impl ResTable {
    pub(crate) fn view_types(&self) -> impl Iterator<Item = (&ResId, TypeView<'_>)> {
        self.types.iter().map(|(id, entry)| {
            (
                id,
                TypeView {
                    header: entry.header(),
                    names: &entry.names,
                },
            )
        })
    }
}

impl<'a> TypeView<'a> {
    pub fn view_names(&self) -> impl Iterator<Item = (&'a ResId, NameView<'a>)> {
        self.names.iter().map(|(id, entry)| {
            (
                id,
                NameView {
                    header: entry.header,
                    langs: &entry.langs,
                },
            )
        })
    }
}
