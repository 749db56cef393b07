//! Section table entries (`IMAGE_SECTION_HEADER`), one per PE section.
//!
//! Carries both the file/virtual [`Range`] pair and an `adjustment` value
//! (the constant offset between a section's virtual address and its file
//! offset) needed for RVA-to-file-offset translation.

use crate::pe::characteristics::SectionCharacteristics;
use crate::range::{FileRange, RvaRange};

pub const SECTION_HEADER_SIZE: usize = 40;

#[derive(Debug, Clone)]
pub struct SectionHeader {
    /// Index of this section within the section table (0-based).
    pub index: usize,
    /// File offset of this section's own 40-byte header entry.
    pub file_header_offset: u64,
    /// Name with trailing NULs stripped; not guaranteed valid UTF-8 in
    /// general PE files but always ASCII for the sections this editor cares
    /// about (`.rsrc` et al.), so it's kept as a `String` for ergonomics.
    pub name: String,
    pub characteristics: SectionCharacteristics,
    pub file: FileRange,
    pub virtual_range: RvaRange,
    /// `virtual.start - file.start`, used to translate RVAs inside this
    /// section into file offsets and back.
    pub adjustment: i64,
}

impl SectionHeader {
    pub fn parse(index: usize, file_header_offset: u64, slice: &[u8; SECTION_HEADER_SIZE]) -> SectionHeader {
        let name_bytes = &slice[0..8];
        let name_len = name_bytes.iter().position(|&b| b == 0).unwrap_or(8);
        let name = String::from_utf8_lossy(&name_bytes[..name_len]).into_owned();

        let virtual_size = u32::from_le_bytes(slice[8..12].try_into().unwrap());
        let virtual_address = u32::from_le_bytes(slice[12..16].try_into().unwrap());
        let size_of_raw_data = u32::from_le_bytes(slice[16..20].try_into().unwrap());
        let pointer_to_raw_data = u32::from_le_bytes(slice[20..24].try_into().unwrap());
        let characteristics = u32::from_le_bytes(slice[36..40].try_into().unwrap());

        let file = FileRange::new(pointer_to_raw_data as u64, size_of_raw_data as u64);
        let virtual_range = RvaRange::new(virtual_address as u64, virtual_size as u64);
        let adjustment = virtual_range.start as i64 - file.start as i64;

        SectionHeader {
            index,
            file_header_offset,
            name,
            characteristics: SectionCharacteristics::new(characteristics),
            file,
            virtual_range,
            adjustment,
        }
    }

    /// Translates an RVA known to lie within this section into a file
    /// offset: `file.start = virtual.start - adjustment`... equivalently
    /// `rva - adjustment`.
    pub fn rva_to_file_offset(&self, rva: u32) -> u64 {
        (rva as i64 - self.adjustment) as u64
    }

    pub fn file_offset_to_rva(&self, file_offset: u64) -> u32 {
        (file_offset as i64 + self.adjustment) as u32
    }

    pub fn contains_rva(&self, rva: u32) -> bool {
        self.virtual_range.contains_point(rva as u64)
    }
}
