//! Ties the PE header reader, resource codec, version-info codec, and icon
//! importer together into a single edit pass:
//! `Read -> (HeaderEdit) -> (ResourceRead -> Mutate -> Serialize -> SectionWrite) -> HeaderWrite -> Close`.

use crate::error::{Error, Result};
use crate::icon::{import_icon_file, remove_icons};
use crate::io::{Closeable, Readable, Writable};
use crate::pe::data_directory::DataDirectoryIndex;
use crate::pe::header::ExeHeader;
use crate::range::align;
use crate::resource::codec;
use crate::resource::ResTable;
use crate::version_info::{update_version_info, VersionUpdateOptions};

/// The Windows subsystem id a binary declares in its optional header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subsystem {
    /// `IMAGE_SUBSYSTEM_WINDOWS_GUI`.
    Gui,
    /// `IMAGE_SUBSYSTEM_WINDOWS_CUI`.
    Console,
}

impl Subsystem {
    fn wire_value(self) -> u16 {
        match self {
            Subsystem::Gui => 2,
            Subsystem::Console => 3,
        }
    }
}

/// What to do with the icon resources, if anything.
#[derive(Debug, Clone)]
pub enum IconEdit {
    /// Import `ico_bytes` as a fresh `RT_GROUP_ICON`/`RT_ICON` pair after
    /// removing any icons already present.
    Replace(Vec<u8>),
    /// `--no-icon`: strip every icon resource.
    Remove,
}

/// Every edit a single pass may apply. All fields are optional; an entirely
/// empty `Mutations` still round-trips the file unchanged.
#[derive(Debug, Clone, Default)]
pub struct Mutations {
    pub subsystem: Option<Subsystem>,
    pub icon: Option<IconEdit>,
    pub version: VersionUpdateOptions,
}

impl Mutations {
    fn touches_resources(&self) -> bool {
        self.icon.is_some() || !self.version.is_empty()
    }
}

/// Runs one edit pass over `io`: reads the header, optionally edits it and
/// the resource section, and always closes `io` before returning — on the
/// success path and on every failure path alike.
pub fn run_edit_session<IO: Readable + Writable + Closeable>(io: &mut IO, mutations: &Mutations) -> Result<()> {
    let result = run_edit_session_inner(io, mutations);
    let close_result = io.close();
    result.and(close_result)
}

fn run_edit_session_inner<IO: Readable + Writable + Closeable>(io: &mut IO, mutations: &Mutations) -> Result<()> {
    let mut header = ExeHeader::read(io)?;

    if mutations.touches_resources() {
        let resolved = header
            .resolve_rva(DataDirectoryIndex::ResourceTable)?
            .ok_or_else(|| Error::unsupported("executable has no resource section to edit"))?;
        let section_index = resolved.section_index;
        let rva_base = resolved.virtual_range.start as u32;

        let section_bytes = io.read(resolved.file.start, resolved.file.size as usize)?;
        log::debug!("read resource section: {} bytes at file offset 0x{:x}", section_bytes.len(), resolved.file.start);
        let mut table = codec::parse(&section_bytes, rva_base)?;

        apply_mutations(&mut table, mutations)?;

        let new_bytes = codec::serialize(&table, rva_base);
        if new_bytes.is_empty() {
            return Err(Error::unsupported("resource section would become empty"));
        }

        let section = header.section(section_index);
        if new_bytes.len() as u64 > section.virtual_range.size || new_bytes.len() as u64 > section.file.size {
            return Err(Error::unsupported("mutated resource section no longer fits its existing allocation"));
        }

        let file_alignment = header.file_alignment() as u64;
        let padded_file_size = align(new_bytes.len() as u64, file_alignment);
        header.set_resource_directory_size(new_bytes.len() as u32);
        header.set_section_sizes(section_index, new_bytes.len() as u32, padded_file_size as u32);

        io.write(section.file.start, &new_bytes)?;
        log::info!("wrote {} bytes of resource section back to file offset 0x{:x}", new_bytes.len(), section.file.start);
    }

    if let Some(subsystem) = mutations.subsystem {
        log::info!("setting subsystem to {:?}", subsystem);
        header.set_subsystem(subsystem.wire_value());
    }
    header.zero_checksum();
    header.flush(io)?;

    Ok(())
}

fn apply_mutations(table: &mut ResTable, mutations: &Mutations) -> Result<()> {
    match &mutations.icon {
        Some(IconEdit::Remove) => {
            log::info!("removing icon resources");
            remove_icons(table);
        }
        Some(IconEdit::Replace(ico_bytes)) => {
            log::info!("replacing icon resources ({} bytes of .ico input)", ico_bytes.len());
            remove_icons(table);
            import_icon_file(table, ico_bytes)?;
        }
        None => {}
    }

    if !mutations.version.is_empty() {
        log::info!("updating VS_VERSIONINFO resource");
        update_version_info(table, &mutations.version)?;
    }

    Ok(())
}
