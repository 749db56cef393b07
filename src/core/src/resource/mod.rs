//! The `.rsrc` resource directory: its in-memory tree ([`table`]), the
//! directory key type ([`res_id`]), and the on-wire codec ([`codec`]).

pub mod codec;
pub mod res_id;
pub mod table;

pub use res_id::ResId;
pub use table::{ResLeafId, ResTable, ResTableData, ResTableHeader};

/// Well-known `RT_*` resource type ids this editor reads or writes.
/// The rest of the standard `RT_*` range (cursor, bitmap, menu, ...) is
/// passed through untouched and never needs a name here.
pub const RT_ICON: u16 = 3;
pub const RT_GROUP_ICON: u16 = 14;
pub const RT_VERSION: u16 = 16;

/// The language every icon and version resource this editor writes is filed
/// under: US English, the conventional default for synthesized resources.
pub const US_ENGLISH_LANG: u16 = 0x0409;
