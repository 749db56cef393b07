//! The PE optional header (`IMAGE_OPTIONAL_HEADER32`/`64`).
//!
//! The two magic-dependent layouts agree on every offset this editor
//! touches — `SectionAlignment` (32), `FileAlignment` (36), `SizeOfImage`
//! (56), `SizeOfHeaders` (60), `CheckSum` (64) and `Subsystem` (68) sit at
//! the same byte offset in both PE32 and PE32+, because dropping
//! `BaseOfData` (-4 bytes) exactly offsets widening `ImageBase` from 4 to 8
//! bytes (+4). Only the data-directory table's starting offset differs: 96
//! for PE32, 112 for PE32+.

use crate::error::{Error, Result};
use crate::pe::data_directory::{DataDirectoryIndex, RvaTable, DATA_DIRECTORY_COUNT};

pub const MAGIC_PE32: u16 = 0x10b;
pub const MAGIC_PE32_PLUS: u16 = 0x20b;

/// Offset, relative to the start of the optional header, of fields that are
/// at an identical position in both PE32 and PE32+.
mod common_offset {
    pub const MAGIC: usize = 0;
    pub const SECTION_ALIGNMENT: usize = 32;
    pub const FILE_ALIGNMENT: usize = 36;
    pub const SIZE_OF_IMAGE: usize = 56;
    pub const SIZE_OF_HEADERS: usize = 60;
    pub const CHECK_SUM: usize = 64;
    pub const SUBSYSTEM: usize = 68;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionalHeaderKind {
    Pe32,
    Pe32Plus,
}

#[derive(Debug, Clone)]
pub struct OptionalHeader {
    pub kind: OptionalHeaderKind,
    pub section_alignment: u32,
    pub file_alignment: u32,
    pub size_of_image: u32,
    pub size_of_headers: u32,
    pub subsystem: u16,
    pub data_directory_offset: usize,
    pub data_directories: RvaTable,
}

impl OptionalHeader {
    /// Parses the optional header out of `header_buffer` at
    /// `[offset..offset+declared_size)`. `declared_size` is the COFF
    /// header's `optional_header_size` field, used only to bound-check the
    /// data directory count actually present.
    pub fn parse(header_buffer: &[u8], offset: usize, declared_size: usize) -> Result<OptionalHeader> {
        let read_u16 = |at: usize| -> u16 { u16::from_le_bytes(header_buffer[offset + at..offset + at + 2].try_into().unwrap()) };
        let read_u32 = |at: usize| -> u32 { u32::from_le_bytes(header_buffer[offset + at..offset + at + 4].try_into().unwrap()) };

        let magic = read_u16(common_offset::MAGIC);
        let kind = match magic {
            MAGIC_PE32 => OptionalHeaderKind::Pe32,
            MAGIC_PE32_PLUS => OptionalHeaderKind::Pe32Plus,
            other => return Err(Error::invalid_format(format!("unrecognized optional header magic 0x{other:04x}"))),
        };

        let data_directory_offset = match kind {
            OptionalHeaderKind::Pe32 => 96,
            OptionalHeaderKind::Pe32Plus => 112,
        };

        let mut raw_directories = [(0u32, 0u32); DATA_DIRECTORY_COUNT];
        let available_directory_bytes = declared_size.saturating_sub(data_directory_offset);
        let available_slots = (available_directory_bytes / 8).min(DATA_DIRECTORY_COUNT);
        for slot in 0..available_slots {
            let at = data_directory_offset + slot * 8;
            raw_directories[slot] = (read_u32(at), read_u32(at + 4));
        }

        Ok(OptionalHeader {
            kind,
            section_alignment: read_u32(common_offset::SECTION_ALIGNMENT),
            file_alignment: read_u32(common_offset::FILE_ALIGNMENT),
            size_of_image: read_u32(common_offset::SIZE_OF_IMAGE),
            size_of_headers: read_u32(common_offset::SIZE_OF_HEADERS),
            subsystem: read_u16(common_offset::SUBSYSTEM),
            data_directory_offset: offset + data_directory_offset,
            data_directories: RvaTable::from_slots(&raw_directories),
        })
    }

    pub fn resource_directory(&self) -> Option<&crate::pe::data_directory::RvaEntry> {
        self.data_directories.get(DataDirectoryIndex::ResourceTable)
    }

    /// Absolute offset, within the header buffer, of the checksum field.
    pub fn checksum_offset(&self, optional_header_start: usize) -> usize {
        optional_header_start + common_offset::CHECK_SUM
    }

    /// Absolute offset, within the header buffer, of the subsystem field.
    pub fn subsystem_offset(&self, optional_header_start: usize) -> usize {
        optional_header_start + common_offset::SUBSYSTEM
    }
}
