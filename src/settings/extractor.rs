//! Parser for `-showBuildSettings` output

use crate::settings::container::{SettingsContainer, TARGET_NAME_KEY};
use crate::settings::filter::SettingsFilter;
use std::collections::{BTreeMap, HashMap};

const BLOCK_SEPARATOR: &str = "Build settings for action";

/// Splits raw settings output into per-target containers
#[derive(Debug, Default, Clone)]
pub struct SettingsExtractor {
    filter: SettingsFilter,
}

impl SettingsExtractor {
    pub fn new(filter: SettingsFilter) -> Self {
        Self { filter }
    }

    /// Containers keyed by target name; blocks without a target name are skipped
    pub fn extract_per_target(&self, output: &str) -> HashMap<String, SettingsContainer> {
        output
            .split(BLOCK_SEPARATOR)
            .filter_map(|block| {
                let all = parse_block(block);
                let target = all.get(TARGET_NAME_KEY)?.clone();
                let filtered = self.filter.filter(&all);
                Some((target, SettingsContainer::new(all, filtered)))
            })
            .collect()
    }
}

fn parse_block(block: &str) -> BTreeMap<String, String> {
    block.lines().filter_map(parse_line).collect()
}

/// `NAME = value` with a non-empty value
fn parse_line(line: &str) -> Option<(String, String)> {
    let line = line.trim_start();
    let (name, value) = line.split_once(" = ")?;
    if name.is_empty()
        || !name
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
    {
        return None;
    }
    if value.is_empty() {
        return None;
    }
    Some((name.to_string(), value.to_string()))
}
