//! Build settings: parsing, filtering, interpolation and loading

mod container;
mod extractor;
mod filter;
mod interpolator;
mod loader;

pub use container::{
    SettingsContainer, DWARF_DSYM_FILE_NAME_KEY, FULL_PRODUCT_NAME_KEY, MODULEMAP_FILE_KEY,
    PRODUCT_MODULE_NAME_KEY, PUBLIC_HEADERS_FOLDER_PATH_KEY,
    SWIFT_OBJC_INTERFACE_HEADER_NAME_KEY, TARGET_NAME_KEY,
};
pub use extractor::SettingsExtractor;
pub use filter::{strip_path_flags, SettingsFilter};
pub use interpolator::{tokenize, Interpolator, Segment};
pub use loader::SettingsLoader;
