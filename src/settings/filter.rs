//! Selection of output-affecting settings
//!
//! Only settings that change what the compiler produces go into the
//! fingerprint. Machine-dependent values (absolute paths, user names) must
//! stay out, otherwise two checkouts of the same sources never share a
//! cache entry.

use std::collections::{BTreeMap, BTreeSet};

const DEFAULT_ALLOWED: &[&str] = &[
    "ACTION",
    "ALWAYS_EMBED_SWIFT_STANDARD_LIBRARIES",
    "ARCHS",
    "ARCH",
    "BITCODE_GENERATION_MODE",
    "BUILD_COMPONENTS",
    "CLANG_CXX_LANGUAGE_STANDARD",
    "CLANG_CXX_LIBRARY",
    "CLANG_ENABLE_MODULES",
    "CLANG_ENABLE_OBJC_ARC",
    "COMBINE_HIDPI_IMAGES",
    "COMPRESS_PNG_FILES",
    "CONFIGURATION",
    "COPY_RESOURCES_FROM_STATIC_FRAMEWORKS",
    "CREATE_INFOPLIST_SECTION_IN_BINARY",
    "DEBUG_INFORMATION_FORMAT",
    "DEFINES_MODULE",
    "EMBED_ASSET_PACKS_IN_PRODUCT_BUNDLE",
    "ENABLE_BITCODE",
    "ENABLE_TESTABILITY",
    "GCC_C_LANGUAGE_STANDARD",
    "GCC_OPTIMIZATION_LEVEL",
    "GCC_PREPROCESSOR_DEFINITIONS",
    "IPHONEOS_DEPLOYMENT_TARGET",
    "MACH_O_TYPE",
    "MACOSX_DEPLOYMENT_TARGET",
    "OTHER_CFLAGS",
    "OTHER_CPLUSPLUSFLAGS",
    "OTHER_LDFLAGS",
    "OTHER_SWIFT_FLAGS",
    "PLATFORM_NAME",
    "PRODUCT_MODULE_NAME",
    "PRODUCT_NAME",
    "SWIFT_ACTIVE_COMPILATION_CONDITIONS",
    "SWIFT_OPTIMIZATION_LEVEL",
    "SWIFT_VERSION",
    "TARGETNAME",
    "TVOS_DEPLOYMENT_TARGET",
    "WATCHOS_DEPLOYMENT_TARGET",
];

/// Keys whose values are flag lists that may carry paths
const FLAG_KEYS: &[&str] = &[
    "OTHER_CFLAGS",
    "OTHER_CPLUSPLUSFLAGS",
    "OTHER_LDFLAGS",
    "OTHER_SWIFT_FLAGS",
];

/// Flags whose argument is a path
const PATH_FLAGS: &[&str] = &[
    "-fmodule-map-file=",
    "-iquote",
    "-isystem",
    "-iframework",
    "-I",
    "-L",
    "-F",
];

/// Allow-list filter over parsed settings
#[derive(Debug, Clone)]
pub struct SettingsFilter {
    allowed: BTreeSet<String>,
}

impl Default for SettingsFilter {
    fn default() -> Self {
        Self::with_allowed(DEFAULT_ALLOWED.iter().copied())
    }
}

impl SettingsFilter {
    pub fn with_allowed<I, S>(allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed: allowed.into_iter().map(Into::into).collect(),
        }
    }

    pub fn filter(&self, settings: &BTreeMap<String, String>) -> BTreeMap<String, String> {
        settings
            .iter()
            .filter(|(name, _)| self.allowed.contains(name.as_str()))
            .map(|(name, value)| {
                let value = if FLAG_KEYS.contains(&name.as_str()) {
                    strip_path_flags(value)
                } else {
                    value.clone()
                };
                (name.clone(), value)
            })
            .collect()
    }
}

/// Drop path-carrying flags from a flag string
///
/// Quotes are removed and the value is split on `" -"`. A path flag swallows
/// everything up to the next `" -"`, so a quoted argument that itself starts
/// with a dash (`-iquote "-D"`) ends the path flag early and survives as a
/// flag of its own. Paths containing `" -"` are cut the same way.
pub fn strip_path_flags(value: &str) -> String {
    let unquoted = value.replace('"', "");
    let mut kept = Vec::new();

    for (index, part) in unquoted.split(" -").enumerate() {
        let token = if index == 0 {
            part.to_string()
        } else {
            format!("-{}", part)
        };
        let token = token.trim();
        if token.is_empty() || is_path_flag(token) {
            continue;
        }
        kept.push(token.to_string());
    }

    kept.join(" ")
}

fn is_path_flag(token: &str) -> bool {
    PATH_FLAGS.iter().any(|flag| token.starts_with(flag))
}
