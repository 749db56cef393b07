//! Converts a Windows `.ico` file into the `RT_GROUP_ICON` + `RT_ICON`
//! resource pair an executable's icon actually lives in.

use crate::error::{Error, Result};
use crate::resource::{ResId, ResTable, ResTableData, RT_GROUP_ICON, RT_ICON, US_ENGLISH_LANG};

const ICO_HEADER_SIZE: usize = 6;
const ICON_DIR_ENTRY_SIZE: usize = 16;
/// `GRPICONDIRENTRY` is the same as `ICONDIRENTRY` with its 4-byte
/// `imageOffset` replaced by a 2-byte resource id.
const GRP_ICON_DIR_ENTRY_SIZE: usize = 14;

/// Removes every `RT_GROUP_ICON` and `RT_ICON` resource from `table`
/// (`--no-icon`).
pub fn remove_icons(table: &mut ResTable) {
    table.delete_type(&ResId::Id(RT_GROUP_ICON));
    table.delete_type(&ResId::Id(RT_ICON));
    log::debug!("removed all RT_GROUP_ICON/RT_ICON resources");
}

/// Imports `ico_bytes` (the full contents of a `.ico` file) into `table`,
/// materializing one `RT_ICON` leaf per image plus a `RT_GROUP_ICON` leaf
/// that indexes them. Existing icon resources are left in place — callers
/// that want a clean replace should [`remove_icons`] first.
pub fn import_icon_file(table: &mut ResTable, ico_bytes: &[u8]) -> Result<()> {
    if ico_bytes.len() < ICO_HEADER_SIZE {
        return Err(Error::invalid_format("icon file is shorter than its own header"));
    }
    let reserved = u16::from_le_bytes(ico_bytes[0..2].try_into().unwrap());
    let kind = u16::from_le_bytes(ico_bytes[2..4].try_into().unwrap());
    let count = u16::from_le_bytes(ico_bytes[4..6].try_into().unwrap()) as usize;
    if reserved != 0 || kind != 1 {
        return Err(Error::invalid_format(format!("not an icon file (reserved={reserved}, type={kind})")));
    }
    if count == 0 {
        return Err(Error::invalid_format("icon file contains no images"));
    }

    let directory_end = ICO_HEADER_SIZE + count * ICON_DIR_ENTRY_SIZE;
    let directory = ico_bytes
        .get(ICO_HEADER_SIZE..directory_end)
        .ok_or_else(|| Error::invalid_format("icon file directory runs past end of file"))?;

    let mut group_data = vec![0u8; ICO_HEADER_SIZE + GRP_ICON_DIR_ENTRY_SIZE * count];
    group_data[0..ICO_HEADER_SIZE].copy_from_slice(&ico_bytes[0..ICO_HEADER_SIZE]);

    for i in 0..count {
        let entry = &directory[i * ICON_DIR_ENTRY_SIZE..(i + 1) * ICON_DIR_ENTRY_SIZE];
        let bytes_in_res = u32::from_le_bytes(entry[8..12].try_into().unwrap()) as usize;
        let image_offset = u32::from_le_bytes(entry[12..16].try_into().unwrap()) as usize;
        let image = ico_bytes
            .get(image_offset..image_offset + bytes_in_res)
            .ok_or_else(|| Error::invalid_format(format!("icon image {i} runs past end of file")))?;

        let new_id = table.next_id(&ResId::Id(RT_ICON));

        let group_entry_start = ICO_HEADER_SIZE + i * GRP_ICON_DIR_ENTRY_SIZE;
        group_data[group_entry_start..group_entry_start + 12].copy_from_slice(&entry[0..12]);
        group_data[group_entry_start + 12..group_entry_start + 14].copy_from_slice(&new_id.to_le_bytes());

        table.set(ResId::Id(RT_ICON), ResId::Id(new_id), ResId::Id(US_ENGLISH_LANG), ResTableData::new(image.to_vec()));
    }

    let group_id = table.next_id(&ResId::Id(RT_GROUP_ICON));
    table.set(ResId::Id(RT_GROUP_ICON), ResId::Id(group_id), ResId::Id(US_ENGLISH_LANG), ResTableData::new(group_data));

    log::debug!("imported {count} icon(s) from .ico file as group {group_id}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_ico(images: &[&[u8]]) -> Vec<u8> {
        let count = images.len();
        let mut out = vec![0u8; ICO_HEADER_SIZE + count * ICON_DIR_ENTRY_SIZE];
        out[2..4].copy_from_slice(&1u16.to_le_bytes());
        out[4..6].copy_from_slice(&(count as u16).to_le_bytes());

        let mut offset = out.len();
        for (i, image) in images.iter().enumerate() {
            let entry_start = ICO_HEADER_SIZE + i * ICON_DIR_ENTRY_SIZE;
            out[entry_start] = 32; // width
            out[entry_start + 1] = 32; // height
            out[entry_start + 4..entry_start + 6].copy_from_slice(&1u16.to_le_bytes()); // planes
            out[entry_start + 6..entry_start + 8].copy_from_slice(&32u16.to_le_bytes()); // bitCount
            out[entry_start + 8..entry_start + 12].copy_from_slice(&(image.len() as u32).to_le_bytes());
            out[entry_start + 12..entry_start + 16].copy_from_slice(&(offset as u32).to_le_bytes());
            offset += image.len();
        }
        for image in images {
            out.extend_from_slice(image);
        }
        out
    }

    #[test]
    fn imports_one_group_icon_and_one_icon_per_image() {
        let ico = build_ico(&[&[1, 2, 3, 4], &[5, 6, 7, 8, 9]]);
        let mut table = ResTable::new();
        import_icon_file(&mut table, &ico).unwrap();

        let group = table.get(&ResId::Id(RT_GROUP_ICON), None, None).unwrap();
        assert_eq!(group.data.len(), ICO_HEADER_SIZE + 2 * GRP_ICON_DIR_ENTRY_SIZE);

        let icon0 = table.get(&ResId::Id(RT_ICON), Some(&ResId::Id(0)), Some(&ResId::Id(US_ENGLISH_LANG))).unwrap();
        assert_eq!(icon0.data, vec![1, 2, 3, 4]);
        let icon1 = table.get(&ResId::Id(RT_ICON), Some(&ResId::Id(1)), Some(&ResId::Id(US_ENGLISH_LANG))).unwrap();
        assert_eq!(icon1.data, vec![5, 6, 7, 8, 9]);
    }

    #[test]
    fn group_icon_entries_reference_the_allocated_icon_ids() {
        let ico = build_ico(&[&[0xAA; 4], &[0xBB; 4]]);
        let mut table = ResTable::new();
        import_icon_file(&mut table, &ico).unwrap();

        let group = table.get(&ResId::Id(RT_GROUP_ICON), None, None).unwrap();
        let first_id = u16::from_le_bytes(group.data[ICO_HEADER_SIZE + 12..ICO_HEADER_SIZE + 14].try_into().unwrap());
        let second_id = u16::from_le_bytes(group.data[ICO_HEADER_SIZE + GRP_ICON_DIR_ENTRY_SIZE + 12..ICO_HEADER_SIZE + GRP_ICON_DIR_ENTRY_SIZE + 14].try_into().unwrap());
        assert_eq!(first_id, 0);
        assert_eq!(second_id, 1);
    }

    #[test]
    fn allocates_new_ids_after_existing_icons() {
        let mut table = ResTable::new();
        table.set(ResId::Id(RT_ICON), ResId::Id(5), ResId::Id(US_ENGLISH_LANG), ResTableData::new(vec![0]));
        let ico = build_ico(&[&[1, 1, 1, 1]]);
        import_icon_file(&mut table, &ico).unwrap();
        assert!(table.get(&ResId::Id(RT_ICON), Some(&ResId::Id(6)), Some(&ResId::Id(US_ENGLISH_LANG))).is_some());
    }

    #[test]
    fn rejects_non_icon_file() {
        let mut table = ResTable::new();
        assert!(import_icon_file(&mut table, &[0, 0, 0, 0, 0, 0]).is_err());
    }

    #[test]
    fn rejects_icon_file_with_zero_images() {
        let mut table = ResTable::new();
        let ico = build_ico(&[]);
        let err = import_icon_file(&mut table, &ico).unwrap_err();
        assert!(matches!(err, Error::InvalidFormat(_)));
        assert!(table.get(&ResId::Id(RT_GROUP_ICON), None, None).is_none());
    }

    #[test]
    fn remove_icons_deletes_both_types() {
        let mut table = ResTable::new();
        let ico = build_ico(&[&[1, 2, 3]]);
        import_icon_file(&mut table, &ico).unwrap();
        remove_icons(&mut table);
        assert!(table.get(&ResId::Id(RT_GROUP_ICON), None, None).is_none());
        assert!(table.get(&ResId::Id(RT_ICON), None, None).is_none());
    }
}
