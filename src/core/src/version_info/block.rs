//! The recursive `VS_VERSIONINFO` block format: a tree of length-delimited
//! records sharing one shape (total length, value length, type, UTF-16 key,
//! value, children), used for the root `VS_VERSION_INFO` record itself and
//! every `StringFileInfo`/`StringTable`/`String`/`VarFileInfo`/`Var` node
//! nested inside it.
//!
//! Every offset in this module is local to the record currently being
//! parsed or written, per the format's own `length = align(6 +
//! 2*(len(key)+1), 4) + valueSize` formula, which is itself expressed in
//! record-local terms.

use crate::error::{Error, Result};
use crate::range::align;

const RECORD_HEADER_SIZE: usize = 6;
const TYPE_BINARY: u16 = 0;
const TYPE_TEXT: u16 = 1;

/// One `VS_VERSIONINFO`-shaped record: a key, a value that's either raw
/// bytes (binary-typed) or a string (text-typed), and nested child records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionInfoBlock {
    pub key: String,
    pub value: VersionInfoValue,
    pub children: Vec<VersionInfoBlock>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionInfoValue {
    Binary(Vec<u8>),
    Text(String),
}

impl VersionInfoBlock {
    pub fn child(&self, key: &str) -> Option<&VersionInfoBlock> {
        self.children.iter().find(|c| c.key == key)
    }

    pub fn child_mut(&mut self, key: &str) -> Option<&mut VersionInfoBlock> {
        self.children.iter_mut().find(|c| c.key == key)
    }

    /// True for a binary leaf whose first 4 bytes are the FIXEDFILEINFO
    /// signature and whose length is at least 52 bytes.
    pub fn is_fixed_file_info(&self) -> bool {
        match &self.value {
            VersionInfoValue::Binary(bytes) => {
                bytes.len() >= crate::version_info::fixed_file_info::FIXED_FILE_INFO_SIZE
                    && u32::from_le_bytes(bytes[0..4].try_into().unwrap()) == crate::version_info::fixed_file_info::FIXED_FILE_INFO_SIGNATURE
            }
            VersionInfoValue::Text(_) => false,
        }
    }
}

fn read_u16(buf: &[u8], at: usize) -> Result<u16> {
    let slice = buf.get(at..at + 2).ok_or_else(|| Error::invalid_format("version info record truncated reading a u16"))?;
    Ok(u16::from_le_bytes(slice.try_into().unwrap()))
}

/// Reads a NUL-terminated UTF-16 string starting at `at`, returning it
/// along with its length in UTF-16 code units (excluding the terminator).
fn read_nul_terminated_utf16(buf: &[u8], at: usize) -> Result<(String, usize)> {
    let mut units = Vec::new();
    let mut offset = at;
    loop {
        let unit = read_u16(buf, offset)?;
        offset += 2;
        if unit == 0 {
            break;
        }
        units.push(unit);
    }
    let text = String::from_utf16(&units).map_err(|_| Error::invalid_format("version info key is not valid UTF-16"))?;
    Ok((text, units.len()))
}

/// Decodes a text value's raw bytes, dropping any trailing NUL units — the
/// wire `valueLen` for text records commonly includes the terminator, but
/// this editor doesn't require it to.
fn decode_text_value(bytes: &[u8]) -> Result<String> {
    let mut units: Vec<u16> = bytes.chunks_exact(2).map(|c| u16::from_le_bytes([c[0], c[1]])).collect();
    while units.last() == Some(&0) {
        units.pop();
    }
    String::from_utf16(&units).map_err(|_| Error::invalid_format("version info value is not valid UTF-16"))
}

/// Parses a single `VS_VERSIONINFO`-format root record out of `buf`.
pub fn parse(buf: &[u8]) -> Result<VersionInfoBlock> {
    let (block, length) = parse_record(buf, 0)?;
    log::trace!("parsed VS_VERSIONINFO root '{}': {} bytes, {} children", block.key, length, block.children.len());
    Ok(block)
}

/// Parses one record at `base` within `buf`, returning it along with its
/// total on-wire length (so the caller — itself, recursing over siblings —
/// knows where the next record starts).
fn parse_record(buf: &[u8], base: usize) -> Result<(VersionInfoBlock, usize)> {
    let total_length = read_u16(buf, base)? as usize;
    let value_length = read_u16(buf, base + 2)? as usize;
    let value_type = read_u16(buf, base + 4)?;
    if total_length < RECORD_HEADER_SIZE {
        return Err(Error::invalid_format(format!("version info record length {total_length} is shorter than its own header")));
    }
    let record = buf
        .get(base..base + total_length)
        .ok_or_else(|| Error::invalid_format("version info record runs past end of buffer"))?;

    let (key, key_units) = read_nul_terminated_utf16(record, RECORD_HEADER_SIZE)?;
    let key_end = RECORD_HEADER_SIZE + (key_units + 1) * 2;
    let value_start = align(key_end as u64, 4) as usize;

    let value_byte_len = match value_type {
        TYPE_BINARY => value_length,
        TYPE_TEXT => value_length * 2,
        other => return Err(Error::invalid_format(format!("unknown VS_VERSIONINFO record type {other}"))),
    };
    let value_bytes = record
        .get(value_start..value_start + value_byte_len)
        .ok_or_else(|| Error::invalid_format("version info value runs past end of its record"))?;
    let value = match value_type {
        TYPE_BINARY => VersionInfoValue::Binary(value_bytes.to_vec()),
        TYPE_TEXT => VersionInfoValue::Text(decode_text_value(value_bytes)?),
        _ => unreachable!(),
    };

    let mut children = Vec::new();
    let mut local_offset = align((value_start + value_byte_len) as u64, 4) as usize;
    while local_offset < total_length {
        let (child, child_length) = parse_record(record, local_offset)?;
        children.push(child);
        local_offset = align((local_offset + child_length) as u64, 4) as usize;
    }

    Ok((VersionInfoBlock { key, value, children }, total_length))
}

/// Serializes `block` back into `VS_VERSIONINFO`-format bytes, recomputing
/// each record's length bottom-up as it writes.
pub fn serialize(block: &VersionInfoBlock) -> Vec<u8> {
    let mut out = Vec::new();
    write_record(block, &mut out);
    log::trace!("serialized VS_VERSIONINFO root '{}': {} bytes", block.key, out.len());
    out
}

fn pad_to_record_boundary(out: &mut Vec<u8>, record_start: usize, alignment: usize) {
    let local = out.len() - record_start;
    let aligned = align(local as u64, alignment as u64) as usize;
    out.resize(record_start + aligned, 0);
}

fn write_record(block: &VersionInfoBlock, out: &mut Vec<u8>) {
    let record_start = out.len();
    out.extend_from_slice(&[0u8; RECORD_HEADER_SIZE]);

    let key_units: Vec<u16> = block.key.encode_utf16().collect();
    for unit in &key_units {
        out.extend_from_slice(&unit.to_le_bytes());
    }
    out.extend_from_slice(&0u16.to_le_bytes());

    pad_to_record_boundary(out, record_start, 4);

    let (value_type, value_length) = match &block.value {
        VersionInfoValue::Binary(bytes) => {
            out.extend_from_slice(bytes);
            (TYPE_BINARY, bytes.len() as u16)
        }
        VersionInfoValue::Text(text) => {
            let mut units: Vec<u16> = text.encode_utf16().collect();
            units.push(0);
            for unit in &units {
                out.extend_from_slice(&unit.to_le_bytes());
            }
            (TYPE_TEXT, units.len() as u16)
        }
    };

    for child in &block.children {
        pad_to_record_boundary(out, record_start, 4);
        write_record(child, out);
    }

    let total_length = (out.len() - record_start) as u16;
    out[record_start..record_start + 2].copy_from_slice(&total_length.to_le_bytes());
    out[record_start + 2..record_start + 4].copy_from_slice(&value_length.to_le_bytes());
    out[record_start + 4..record_start + 6].copy_from_slice(&value_type.to_le_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tree() -> VersionInfoBlock {
        VersionInfoBlock {
            key: "VS_VERSION_INFO".into(),
            value: VersionInfoValue::Binary(vec![0xAA; 52]),
            children: vec![VersionInfoBlock {
                key: "StringFileInfo".into(),
                value: VersionInfoValue::Text(String::new()),
                children: vec![VersionInfoBlock {
                    key: "040904b0".into(),
                    value: VersionInfoValue::Text(String::new()),
                    children: vec![VersionInfoBlock {
                        key: "CompanyName".into(),
                        value: VersionInfoValue::Text("Acme".into()),
                        children: vec![],
                    }],
                }],
            }],
        }
    }

    #[test]
    fn round_trips_through_serialize_and_parse() {
        let tree = sample_tree();
        let bytes = serialize(&tree);
        let parsed = parse(&bytes).unwrap();
        assert_eq!(parsed, tree);
    }

    #[test]
    fn records_are_four_byte_aligned_between_children() {
        let tree = sample_tree();
        let bytes = serialize(&tree);
        // total length recorded at offset 0 must itself be 4-byte aligned
        // since there's nothing after the root to further align it to.
        let total_length = u16::from_le_bytes(bytes[0..2].try_into().unwrap());
        assert_eq!(total_length as usize, bytes.len());
    }

    #[test]
    fn rejects_unknown_value_type() {
        let mut bytes = serialize(&sample_tree());
        bytes[4] = 7;
        bytes[5] = 0;
        assert!(parse(&bytes).is_err());
    }

    #[test]
    fn detects_fixed_file_info_by_signature_and_length() {
        let mut signature_bytes = vec![0u8; 52];
        signature_bytes[0..4].copy_from_slice(&crate::version_info::fixed_file_info::FIXED_FILE_INFO_SIGNATURE.to_le_bytes());
        let block = VersionInfoBlock {
            key: "VS_VERSION_INFO".into(),
            value: VersionInfoValue::Binary(signature_bytes),
            children: vec![],
        };
        assert!(block.is_fixed_file_info());

        let too_short = VersionInfoBlock {
            key: "VS_VERSION_INFO".into(),
            value: VersionInfoValue::Binary(vec![0xBD, 0x04, 0xEF, 0xFE]),
            children: vec![],
        };
        assert!(!too_short.is_fixed_file_info());
    }

    #[test]
    fn empty_text_value_round_trips() {
        let block = VersionInfoBlock {
            key: "VarFileInfo".into(),
            value: VersionInfoValue::Text(String::new()),
            children: vec![],
        };
        let bytes = serialize(&block);
        let parsed = parse(&bytes).unwrap();
        assert_eq!(parsed, block);
    }
}
