//! Build setting edits that point a consumer at a prebuilt artifact

use crate::error::CacheResult;
use crate::graph::Node;
use crate::project::xcconfig::walk_include_chain;
use crate::project::{BuildConfiguration, SettingValue};
use std::path::Path;
use tracing::debug;

pub const FRAMEWORK_SEARCH_PATHS_KEY: &str = "FRAMEWORK_SEARCH_PATHS";
pub const LIBRARY_SEARCH_PATHS_KEY: &str = "LIBRARY_SEARCH_PATHS";
pub const HEADER_SEARCH_PATHS_KEY: &str = "HEADER_SEARCH_PATHS";
pub const OTHER_CFLAGS_KEY: &str = "OTHER_CFLAGS";
pub const OTHER_CPLUSPLUSFLAGS_KEY: &str = "OTHER_CPLUSPLUSFLAGS";
pub const OTHER_LDFLAGS_KEY: &str = "OTHER_LDFLAGS";
pub const OTHER_LIBTOOLFLAGS_KEY: &str = "OTHER_LIBTOOLFLAGS";
pub const OTHER_SWIFT_FLAGS_KEY: &str = "OTHER_SWIFT_FLAGS";
pub const INHERITED_SETTINGS_VALUE: &str = "$(inherited)";

const MODULE_MAP_FLAG: &str = "-fmodule-map-file=";
const MODULE_MAP_FLAG_KEYS: [&str; 3] = [OTHER_CFLAGS_KEY, OTHER_CPLUSPLUSFLAGS_KEY, OTHER_SWIFT_FLAGS_KEY];

pub fn add_framework_search_path(configuration: &mut BuildConfiguration, path: &Path) {
    debug!("Using framework search path {}", path.display());
    add_flag_to_configuration(configuration, FRAMEWORK_SEARCH_PATHS_KEY, quoted(path));
}

/// `-iquote` into the headers of a framework stored under `artifact_location`
pub fn add_framework_headers_iquote(
    configuration: &mut BuildConfiguration,
    artifact_location: &Path,
    node: &Node,
) {
    let headers = artifact_location.join(node.product_file_name()).join("Headers");
    add_iquote_path(configuration, &headers);
}

/// `Core.framework` becomes `-framework "Core"`
pub fn add_framework_linker_flag(configuration: &mut BuildConfiguration, node: &Node) {
    let flag = format!("-framework \"{}\"", product_stem(&node.product_file_name()));
    debug!("Using linker flag {}", flag);
    add_flag_to_configuration(configuration, OTHER_LDFLAGS_KEY, flag);
}

pub fn add_library_search_path(configuration: &mut BuildConfiguration, path: &Path) {
    debug!("Using library search path {}", path.display());
    add_flag_to_configuration(configuration, LIBRARY_SEARCH_PATHS_KEY, quoted(path));
}

/// `libCore.a` becomes `-l"Core"`
///
/// A static library consumer archives instead of linking, so the flag goes
/// to the archiver settings there.
pub fn add_library_linker_flag(
    configuration: &mut BuildConfiguration,
    node: &Node,
    consumer_is_static_library: bool,
) {
    let stem = product_stem(&node.product_file_name());
    let name = stem.strip_prefix("lib").unwrap_or(&stem);
    let flag = format!("-l\"{}\"", name);
    let key = if consumer_is_static_library {
        OTHER_LIBTOOLFLAGS_KEY
    } else {
        OTHER_LDFLAGS_KEY
    };
    debug!("Using {} flag {}", key, flag);
    add_flag_to_configuration(configuration, key, flag);
}

pub fn add_headers_search_path(configuration: &mut BuildConfiguration, path: &Path) {
    debug!("Using headers search path {}", path.display());
    add_flag_to_configuration(configuration, HEADER_SEARCH_PATHS_KEY, path.display().to_string());
}

pub fn add_iquote_path(configuration: &mut BuildConfiguration, path: &Path) {
    debug!("Using -iquote path {}", path.display());
    add_flag_to_configuration(configuration, OTHER_CFLAGS_KEY, format!("-iquote {}", quoted(path)));
}

pub fn add_capital_i_path(configuration: &mut BuildConfiguration, path: &Path) {
    debug!("Using -I path {}", path.display());
    add_flag_to_configuration(configuration, OTHER_CFLAGS_KEY, format!("-I{}", quoted(path)));
}

/// Point `-fmodule-map-file=` flags naming any of `old_names` at `path`
///
/// Applies to the configuration's own settings and to every settings file
/// reachable from its base configuration.
pub fn fix_module_map_path(
    configuration: &mut BuildConfiguration,
    project_dir: &Path,
    old_names: &[String],
    path: &Path,
) -> CacheResult<()> {
    for key in MODULE_MAP_FLAG_KEYS {
        if let Some(flags) = configuration.settings.get(key) {
            let updated = replace_module_map_path(flags, old_names, path);
            configuration.settings.insert(key.to_string(), updated);
        }
    }

    let Some(base) = &configuration.base_configuration else {
        return Ok(());
    };
    walk_include_chain(&project_dir.join(base), |xcconfig| {
        let changed = xcconfig.rewrite_values(|key, value| {
            MODULE_MAP_FLAG_KEYS
                .contains(&key)
                .then(|| replace_module_map_flags(value.split(' '), old_names, path).join(" "))
        });
        if changed {
            xcconfig.write()?;
        }
        Ok(())
    })
}

/// Append `flag` to a setting
///
/// An unset or empty setting starts from `$(inherited)`; a single value
/// becomes a list; a list only gains the flag if it is not there yet.
pub fn add_flag(flags: Option<&SettingValue>, flag: impl Into<String>) -> SettingValue {
    let flag = flag.into();
    match flags {
        Some(value) if !value.is_empty() => match value {
            SettingValue::Single(single) => SettingValue::List(vec![single.clone(), flag]),
            SettingValue::List(list) => {
                let mut list = list.clone();
                if !list.contains(&flag) {
                    list.push(flag);
                }
                SettingValue::List(list)
            }
        },
        _ => SettingValue::List(vec![INHERITED_SETTINGS_VALUE.to_string(), flag]),
    }
}

fn add_flag_to_configuration(configuration: &mut BuildConfiguration, key: &str, flag: impl Into<String>) {
    let updated = add_flag(configuration.settings.get(key), flag);
    configuration.settings.insert(key.to_string(), updated);
}

fn replace_module_map_path(flags: &SettingValue, old_names: &[String], path: &Path) -> SettingValue {
    match flags {
        SettingValue::Single(single) => {
            SettingValue::Single(replace_module_map_flags(single.split(' '), old_names, path).join(" "))
        }
        SettingValue::List(list) => SettingValue::List(replace_module_map_flags(
            list.iter().flat_map(|line| line.split(' ')),
            old_names,
            path,
        )),
    }
}

fn replace_module_map_flags<'a>(
    tokens: impl Iterator<Item = &'a str>,
    old_names: &[String],
    path: &Path,
) -> Vec<String> {
    tokens
        .filter(|token| !token.is_empty())
        .map(|token| {
            if token.contains(MODULE_MAP_FLAG) && old_names.iter().any(|name| token.contains(name.as_str())) {
                format!("{}{}", MODULE_MAP_FLAG, quoted(path))
            } else {
                token.to_string()
            }
        })
        .collect()
}

fn quoted(path: &Path) -> String {
    format!("\"{}\"", path.display())
}

fn product_stem(file_name: &str) -> String {
    Path::new(file_name)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| file_name.to_string())
}
