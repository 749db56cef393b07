//! `VS_FIXEDFILEINFO`: the fixed-size binary `Value` payload of the root
//! `VS_VERSION_INFO` block.

use crate::error::{Error, Result};

pub const FIXED_FILE_INFO_SIZE: usize = 52;
pub const FIXED_FILE_INFO_SIGNATURE: u32 = 0xFEEF_04BD;

/// A `major.minor.build.revision` version quad, the form both
/// `dwFileVersionMS`/`LS` and `dwProductVersionMS`/`LS` encode: each DWORD
/// packs two 16-bit words, high word first (`MSHigh`/`MSLow`,
/// `LSHigh`/`LSLow` in Microsoft's naming).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VersionQuad {
    pub major: u16,
    pub minor: u16,
    pub build: u16,
    pub revision: u16,
}

impl VersionQuad {
    pub fn from_words(major: u16, minor: u16, build: u16, revision: u16) -> VersionQuad {
        VersionQuad { major, minor, build, revision }
    }

    pub fn to_words(self) -> (u16, u16, u16, u16) {
        (self.major, self.minor, self.build, self.revision)
    }

    /// Reads a version quad from the two packed DWORDs (`dwFileVersionMS`/
    /// `LS`, or the product-version pair) starting at `o`. Each DWORD packs
    /// its high and low 16-bit halves low-word-first on the wire, so
    /// `major`/`build` (the high halves) sit *after* `minor`/`revision` (the
    /// low halves) in byte order: `major` is `readUInt16LE(o+2)`, `minor` is
    /// `readUInt16LE(o)`, `build` is `readUInt16LE(o+6)`, `revision` is
    /// `readUInt16LE(o+4)`: the DWORD pair in `(MSlow, MShigh, LSlow, LShigh)` order.
    fn read_packed(buf: &[u8], o: usize) -> VersionQuad {
        let read_u16 = |at: usize| u16::from_le_bytes(buf[at..at + 2].try_into().unwrap());
        VersionQuad {
            major: read_u16(o + 2),
            minor: read_u16(o),
            build: read_u16(o + 6),
            revision: read_u16(o + 4),
        }
    }

    /// Inverse of [`VersionQuad::read_packed`]: writes the quad back into
    /// the same low-word-first DWORD packing.
    fn write_packed(self, out: &mut [u8], o: usize) {
        let write_u16 = |out: &mut [u8], at: usize, v: u16| out[at..at + 2].copy_from_slice(&v.to_le_bytes());
        write_u16(out, o, self.minor);
        write_u16(out, o + 2, self.major);
        write_u16(out, o + 4, self.revision);
        write_u16(out, o + 6, self.build);
    }

    /// Parses a `--file-version`/`--product-version`-style 1-4 component
    /// dotted string. Missing trailing components default to zero.
    pub fn parse_dotted(text: &str) -> Result<VersionQuad> {
        let parts: Vec<&str> = text.split('.').collect();
        if parts.is_empty() || parts.len() > 4 {
            return Err(Error::usage(format!("version '{text}' must have 1 to 4 dot-separated components")));
        }
        let mut components = [0u16; 4];
        for (i, part) in parts.iter().enumerate() {
            components[i] = part.parse::<u16>().map_err(|_| Error::usage(format!("version component '{part}' is not a 16-bit integer")))?;
        }
        Ok(VersionQuad {
            major: components[0],
            minor: components[1],
            build: components[2],
            revision: components[3],
        })
    }
}

impl std::fmt::Display for VersionQuad {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}.{}", self.major, self.minor, self.build, self.revision)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedFileInfo {
    pub struc_version: u32,
    pub file_version: VersionQuad,
    pub product_version: VersionQuad,
    pub file_flags_mask: u32,
    pub file_flags: u32,
    pub file_os: u32,
    pub file_type: u32,
    pub file_subtype: u32,
    pub file_date: u64,
}

impl Default for FixedFileInfo {
    /// Defaults matching what `rc.exe` emits for a resource that declares no
    /// `FILEOS`/`FILETYPE` block: `VOS_NT_WINDOWS32` / `VFT_APP`, no flags.
    fn default() -> FixedFileInfo {
        FixedFileInfo {
            struc_version: 0x0001_0000,
            file_version: VersionQuad::default(),
            product_version: VersionQuad::default(),
            file_flags_mask: 0x3f,
            file_flags: 0,
            file_os: 0x0004_0004, // VOS_NT_WINDOWS32
            file_type: 0x1,       // VFT_APP
            file_subtype: 0,
            file_date: 0,
        }
    }
}

impl FixedFileInfo {
    pub fn parse(buf: &[u8; FIXED_FILE_INFO_SIZE]) -> Result<FixedFileInfo> {
        let read_u32 = |at: usize| u32::from_le_bytes(buf[at..at + 4].try_into().unwrap());

        let signature = read_u32(0);
        if signature != FIXED_FILE_INFO_SIGNATURE {
            return Err(Error::invalid_format(format!("VS_FIXEDFILEINFO signature is 0x{signature:08x}, expected 0x{FIXED_FILE_INFO_SIGNATURE:08x}")));
        }

        Ok(FixedFileInfo {
            struc_version: read_u32(4),
            file_version: VersionQuad::read_packed(buf, 8),
            product_version: VersionQuad::read_packed(buf, 16),
            file_flags_mask: read_u32(24),
            file_flags: read_u32(28),
            file_os: read_u32(32),
            file_type: read_u32(36),
            file_subtype: read_u32(40),
            file_date: ((read_u32(44) as u64) << 32) | read_u32(48) as u64,
        })
    }

    pub fn serialize(&self) -> [u8; FIXED_FILE_INFO_SIZE] {
        let mut out = [0u8; FIXED_FILE_INFO_SIZE];
        let write_u16 = |out: &mut [u8; FIXED_FILE_INFO_SIZE], at: usize, v: u16| out[at..at + 2].copy_from_slice(&v.to_le_bytes());
        let write_u32 = |out: &mut [u8; FIXED_FILE_INFO_SIZE], at: usize, v: u32| out[at..at + 4].copy_from_slice(&v.to_le_bytes());

        write_u32(&mut out, 0, FIXED_FILE_INFO_SIGNATURE);
        write_u32(&mut out, 4, self.struc_version);
        self.file_version.write_packed(&mut out, 8);
        self.product_version.write_packed(&mut out, 16);
        write_u32(&mut out, 24, self.file_flags_mask);
        write_u32(&mut out, 28, self.file_flags);
        write_u32(&mut out, 32, self.file_os);
        write_u32(&mut out, 36, self.file_type);
        write_u32(&mut out, 40, self.file_subtype);
        write_u32(&mut out, 44, (self.file_date >> 32) as u32);
        write_u32(&mut out, 48, self.file_date as u32);
        out
    }
}
