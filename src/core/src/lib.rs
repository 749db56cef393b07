//! A portable editor for Windows PE/PE32+ executables: locates and rewrites
//! the embedded resource section (icons, version information) and a handful
//! of header fields (subsystem, checksum), without requiring Windows or the
//! native `rcedit` tool.
//!
//! The entry point is [`session::run_edit_session`], which drives the PE
//! header reader ([`pe`]), the resource directory codec ([`resource`]), the
//! `VS_VERSIONINFO` codec ([`version_info`]) and the icon importer
//! ([`icon`]) through one read-mutate-write pass against a caller-supplied
//! [`io::Readable`]/[`io::Writable`] implementation.

pub mod error;
pub mod icon;
pub mod io;
pub mod pe;
pub mod range;
pub mod resource;
pub mod session;
pub mod version_info;

pub use error::{Error, Result};
pub use session::{run_edit_session, IconEdit, Mutations, Subsystem};
