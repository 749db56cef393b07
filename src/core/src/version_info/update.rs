//! High-level `RT_VERSION` edits: locating the resource, synthesizing a
//! default tree when absent, and applying file/product version and
//! string-table edits.

use crate::error::Result;
use crate::resource::{ResId, ResLeafId, ResTable, ResTableData, RT_VERSION, US_ENGLISH_LANG};
use crate::version_info::block::{self, VersionInfoBlock, VersionInfoValue};
use crate::version_info::fixed_file_info::{FixedFileInfo, VersionQuad};

/// The name id every version resource this editor writes is filed under.
/// `rc.exe` always emits a single unnamed (id 1) version resource.
const VERSION_NAME_ID: u16 = 1;

/// The default US-English, Unicode (codepage 1200) string-table key
/// `StringFileInfo` children are keyed by: language 0x0409, charset 0x04B0.
const DEFAULT_STRING_TABLE_KEY: &str = "040904b0";

/// `VarFileInfo -> Translation`'s default payload: one `(langId, charsetId)`
/// pair, 0x0409 / 0x04B0, matching [`DEFAULT_STRING_TABLE_KEY`].
const DEFAULT_TRANSLATION: [u8; 4] = [0x09, 0x04, 0xB0, 0x04];

/// Edits to apply to the `RT_VERSION` resource. `strings` entries map a
/// `String` child's key to `Some(value)` to upsert it or `None` to delete
/// it; order is preserved so repeated `--set-version`/`--delete-version`
/// flags apply left to right.
#[derive(Debug, Clone, Default)]
pub struct VersionUpdateOptions {
    pub file_version: Option<VersionQuad>,
    pub product_version: Option<VersionQuad>,
    pub strings: Vec<(String, Option<String>)>,
}

impl VersionUpdateOptions {
    pub fn is_empty(&self) -> bool {
        self.file_version.is_none() && self.product_version.is_none() && self.strings.is_empty()
    }
}

/// Locates the first `RT_VERSION` resource in `table`, regardless of name
/// or language id.
pub fn find_version_resource(table: &ResTable) -> Option<ResLeafId> {
    table.find(&ResId::Id(RT_VERSION), None)
}

fn default_version_tree() -> VersionInfoBlock {
    VersionInfoBlock {
        key: "VS_VERSION_INFO".to_string(),
        value: VersionInfoValue::Binary(FixedFileInfo::default().serialize().to_vec()),
        children: vec![
            VersionInfoBlock {
                key: "StringFileInfo".to_string(),
                value: VersionInfoValue::Text(String::new()),
                children: vec![VersionInfoBlock {
                    key: DEFAULT_STRING_TABLE_KEY.to_string(),
                    value: VersionInfoValue::Text(String::new()),
                    children: vec![],
                }],
            },
            VersionInfoBlock {
                key: "VarFileInfo".to_string(),
                value: VersionInfoValue::Text(String::new()),
                children: vec![VersionInfoBlock {
                    key: "Translation".to_string(),
                    value: VersionInfoValue::Binary(DEFAULT_TRANSLATION.to_vec()),
                    children: vec![],
                }],
            },
        ],
    }
}

fn find_or_create_child<'a>(parent: &'a mut VersionInfoBlock, key: &str, default_value: VersionInfoValue) -> &'a mut VersionInfoBlock {
    if parent.children.iter().any(|c| c.key == key) {
        return parent.child_mut(key).unwrap();
    }
    parent.children.push(VersionInfoBlock {
        key: key.to_string(),
        value: default_value,
        children: vec![],
    });
    parent.children.last_mut().unwrap()
}

/// Reads the existing `RT_VERSION` resource out of `table` (synthesizing
/// [`default_version_tree`] if there isn't one), applies `options`, and
/// writes the result back under `RT_VERSION` / name 1 / `US_ENGLISH_LANG`.
pub fn update_version_info(table: &mut ResTable, options: &VersionUpdateOptions) -> Result<()> {
    let existing_leaf = find_version_resource(table);
    let mut root = match &existing_leaf {
        Some(leaf) => {
            let data = table.get(&leaf.type_id, Some(&leaf.name_id), Some(&leaf.lang_id)).expect("leaf just found by find() must resolve");
            block::parse(&data.data)?
        }
        None => default_version_tree(),
    };

    if options.file_version.is_some() || options.product_version.is_some() {
        let mut fixed = extract_fixed_file_info(&root).unwrap_or_default();
        if let Some(file_version) = options.file_version {
            fixed.file_version = file_version;
        }
        if let Some(product_version) = options.product_version {
            fixed.product_version = product_version;
        }
        root.value = VersionInfoValue::Binary(fixed.serialize().to_vec());
    }

    if !options.strings.is_empty() {
        let string_file_info = find_or_create_child(&mut root, "StringFileInfo", VersionInfoValue::Text(String::new()));
        let string_table = if string_file_info.children.is_empty() {
            string_file_info.children.push(VersionInfoBlock {
                key: DEFAULT_STRING_TABLE_KEY.to_string(),
                value: VersionInfoValue::Text(String::new()),
                children: vec![],
            });
            &mut string_file_info.children[0]
        } else {
            &mut string_file_info.children[0]
        };

        for (key, value) in &options.strings {
            match value {
                Some(value) => {
                    let entry = find_or_create_child(string_table, key, VersionInfoValue::Text(String::new()));
                    entry.value = VersionInfoValue::Text(value.clone());
                }
                None => {
                    string_table.children.retain(|c| &c.key != key);
                }
            }
        }
    }

    let name_id = existing_leaf.as_ref().map(|leaf| leaf.name_id.clone()).unwrap_or(ResId::Id(VERSION_NAME_ID));
    let lang_id = existing_leaf.as_ref().map(|leaf| leaf.lang_id.clone()).unwrap_or(ResId::Id(US_ENGLISH_LANG));

    let bytes = block::serialize(&root);
    table.set(ResId::Id(RT_VERSION), name_id, lang_id, ResTableData::new(bytes));
    Ok(())
}

fn extract_fixed_file_info(root: &VersionInfoBlock) -> Option<FixedFileInfo> {
    match &root.value {
        VersionInfoValue::Binary(bytes) if root.is_fixed_file_info() => {
            let array: [u8; crate::version_info::fixed_file_info::FIXED_FILE_INFO_SIZE] = bytes[..crate::version_info::fixed_file_info::FIXED_FILE_INFO_SIZE].try_into().ok()?;
            FixedFileInfo::parse(&array).ok()
        }
        _ => None,
    }
}

/// Reads a string value out of `StringFileInfo -> <first table> -> <key>`,
/// if the version resource and that string both exist.
pub fn get_version_string(table: &ResTable, key: &str) -> Option<String> {
    let leaf = find_version_resource(table)?;
    let data = table.get(&leaf.type_id, Some(&leaf.name_id), Some(&leaf.lang_id))?;
    let root = block::parse(&data.data).ok()?;
    let string_file_info = root.child("StringFileInfo")?;
    let string_table = string_file_info.children.first()?;
    let entry = string_table.child(key)?;
    match &entry.value {
        VersionInfoValue::Text(text) => Some(text.clone()),
        VersionInfoValue::Binary(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthesizes_default_tree_when_absent() {
        let mut table = ResTable::new();
        let options = VersionUpdateOptions {
            file_version: Some(VersionQuad { major: 1, minor: 2, build: 3, revision: 4 }),
            ..Default::default()
        };
        update_version_info(&mut table, &options).unwrap();

        let leaf = find_version_resource(&table).unwrap();
        assert_eq!(leaf.lang_id, ResId::Id(US_ENGLISH_LANG));
        let data = table.get(&leaf.type_id, Some(&leaf.name_id), Some(&leaf.lang_id)).unwrap();
        let root = block::parse(&data.data).unwrap();
        let fixed = extract_fixed_file_info(&root).unwrap();
        assert_eq!(fixed.file_version, VersionQuad { major: 1, minor: 2, build: 3, revision: 4 });
        assert!(root.child("StringFileInfo").is_some());
        let translation = root.child("VarFileInfo").unwrap().child("Translation").unwrap();
        assert_eq!(translation.value, VersionInfoValue::Binary(DEFAULT_TRANSLATION.to_vec()));
    }

    #[test]
    fn sets_and_reads_back_a_string() {
        let mut table = ResTable::new();
        let options = VersionUpdateOptions {
            strings: vec![("CompanyName".to_string(), Some("Acme".to_string()))],
            ..Default::default()
        };
        update_version_info(&mut table, &options).unwrap();
        assert_eq!(get_version_string(&table, "CompanyName"), Some("Acme".to_string()));
    }

    #[test]
    fn deleting_a_string_removes_it() {
        let mut table = ResTable::new();
        update_version_info(
            &mut table,
            &VersionUpdateOptions {
                strings: vec![("CompanyName".to_string(), Some("Acme".to_string()))],
                ..Default::default()
            },
        )
        .unwrap();
        update_version_info(
            &mut table,
            &VersionUpdateOptions {
                strings: vec![("CompanyName".to_string(), None)],
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(get_version_string(&table, "CompanyName"), None);
    }

    #[test]
    fn preserves_existing_name_and_lang_ids_on_update() {
        let mut table = ResTable::new();
        table.set(ResId::Id(RT_VERSION), ResId::Id(2), ResId::Id(0x0407), ResTableData::new(block::serialize(&default_version_tree())));

        update_version_info(
            &mut table,
            &VersionUpdateOptions {
                strings: vec![("CompanyName".to_string(), Some("Acme".to_string()))],
                ..Default::default()
            },
        )
        .unwrap();

        let leaf = find_version_resource(&table).unwrap();
        assert_eq!(leaf.name_id, ResId::Id(2));
        assert_eq!(leaf.lang_id, ResId::Id(0x0407));
    }

    #[test]
    fn preserves_existing_strings_when_only_editing_file_version() {
        let mut table = ResTable::new();
        update_version_info(
            &mut table,
            &VersionUpdateOptions {
                strings: vec![("CompanyName".to_string(), Some("Acme".to_string()))],
                ..Default::default()
            },
        )
        .unwrap();
        update_version_info(
            &mut table,
            &VersionUpdateOptions {
                file_version: Some(VersionQuad { major: 9, minor: 9, build: 9, revision: 9 }),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(get_version_string(&table, "CompanyName"), Some("Acme".to_string()));
    }
}
