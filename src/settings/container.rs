//! Per-target build settings

use std::collections::BTreeMap;

pub const TARGET_NAME_KEY: &str = "TARGETNAME";
pub const FULL_PRODUCT_NAME_KEY: &str = "FULL_PRODUCT_NAME";
pub const DWARF_DSYM_FILE_NAME_KEY: &str = "DWARF_DSYM_FILE_NAME";
pub const PRODUCT_MODULE_NAME_KEY: &str = "PRODUCT_MODULE_NAME";
pub const MODULEMAP_FILE_KEY: &str = "MODULEMAP_FILE";
pub const SWIFT_OBJC_INTERFACE_HEADER_NAME_KEY: &str = "SWIFT_OBJC_INTERFACE_HEADER_NAME";
pub const PUBLIC_HEADERS_FOLDER_PATH_KEY: &str = "PUBLIC_HEADERS_FOLDER_PATH";

/// Every parsed setting of a target plus the subset that affects its output
///
/// Both maps are ordered by key, so [`filtered_to_string`] is canonical.
///
/// [`filtered_to_string`]: SettingsContainer::filtered_to_string
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsContainer {
    all: BTreeMap<String, String>,
    filtered: BTreeMap<String, String>,
}

impl SettingsContainer {
    pub fn new(all: BTreeMap<String, String>, filtered: BTreeMap<String, String>) -> Self {
        Self { all, filtered }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.all.get(name).map(String::as_str)
    }

    pub fn all(&self) -> &BTreeMap<String, String> {
        &self.all
    }

    pub fn filtered(&self) -> &BTreeMap<String, String> {
        &self.filtered
    }

    /// `NAME = value` lines of the filtered settings, newline separated
    pub fn filtered_to_string(&self) -> String {
        self.filtered
            .iter()
            .map(|(name, value)| format!("{} = {}", name, value))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn target_name(&self) -> Option<&str> {
        self.get(TARGET_NAME_KEY)
    }

    pub fn full_product_name(&self) -> Option<&str> {
        self.non_empty(FULL_PRODUCT_NAME_KEY)
    }

    pub fn dwarf_dsym_file_name(&self) -> Option<&str> {
        self.non_empty(DWARF_DSYM_FILE_NAME_KEY)
    }

    pub fn product_module_name(&self) -> Option<&str> {
        self.non_empty(PRODUCT_MODULE_NAME_KEY)
    }

    pub fn modulemap_file(&self) -> Option<&str> {
        self.non_empty(MODULEMAP_FILE_KEY)
    }

    pub fn swift_objc_interface_header_name(&self) -> Option<&str> {
        self.non_empty(SWIFT_OBJC_INTERFACE_HEADER_NAME_KEY)
    }

    pub fn public_headers_folder_path(&self) -> Option<&str> {
        self.non_empty(PUBLIC_HEADERS_FOLDER_PATH_KEY)
    }

    fn non_empty(&self, name: &str) -> Option<&str> {
        self.get(name).filter(|value| !value.is_empty())
    }
}
