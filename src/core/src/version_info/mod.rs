//! The `VS_VERSIONINFO` resource: its recursive block tree ([`block`]), the
//! fixed-size `VS_FIXEDFILEINFO` binary leaf ([`fixed_file_info`]), and the
//! update operations editors actually need ([`update`]).

pub mod block;
pub mod fixed_file_info;
pub mod update;

pub use block::{VersionInfoBlock, VersionInfoValue};
pub use fixed_file_info::{FixedFileInfo, VersionQuad};
pub use update::{find_version_resource, get_version_string, update_version_info, VersionUpdateOptions};
