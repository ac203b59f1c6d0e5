//! External settings files
//!
//! Understands the subset that matters for rewriting: `KEY = value` lines and
//! `#include "path"` directives. Everything else (comments, blank lines,
//! conditional keys we don't touch) is kept verbatim so a rewrite only changes
//! the values it means to change.

use crate::error::{CacheError, CacheResult};
use crate::project::model::normalize_path;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Line {
    Include(String),
    Setting { key: String, value: String },
    Verbatim(String),
}

/// Parsed settings file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Xcconfig {
    path: PathBuf,
    lines: Vec<Line>,
}

impl Xcconfig {
    /// Parse content that belongs to the file at `path`
    pub fn parse(path: impl Into<PathBuf>, content: &str) -> Self {
        let lines = content.lines().map(parse_line).collect();
        Self {
            path: path.into(),
            lines,
        }
    }

    pub fn read(path: &Path) -> CacheResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| CacheError::io(format!("reading {}", path.display()), e))?;
        Ok(Self::parse(path, &content))
    }

    pub fn write(&self) -> CacheResult<()> {
        debug!("Writing {}", self.path.display());
        fs::write(&self.path, self.to_string())
            .map_err(|e| CacheError::io(format!("writing {}", self.path.display()), e))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Included files, resolved against this file's directory
    pub fn includes(&self) -> Vec<PathBuf> {
        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        self.lines
            .iter()
            .filter_map(|line| match line {
                Line::Include(include) => Some(normalize_path(&dir.join(include))),
                _ => None,
            })
            .collect()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.lines.iter().find_map(|line| match line {
            Line::Setting { key: k, value } if k == key => Some(value.as_str()),
            _ => None,
        })
    }

    /// Replace the value of an existing key or append a new one
    pub fn set(&mut self, key: &str, new_value: impl Into<String>) {
        let new_value = new_value.into();
        for line in &mut self.lines {
            if let Line::Setting { key: k, value } = line {
                if k == key {
                    *value = new_value;
                    return;
                }
            }
        }
        self.lines.push(Line::Setting {
            key: key.to_string(),
            value: new_value,
        });
    }

    /// Rewrite every value through `f`; returns whether anything changed
    pub fn rewrite_values(&mut self, mut f: impl FnMut(&str, &str) -> Option<String>) -> bool {
        let mut changed = false;
        for line in &mut self.lines {
            if let Line::Setting { key, value } = line {
                if let Some(updated) = f(key, value) {
                    if updated != *value {
                        *value = updated;
                        changed = true;
                    }
                }
            }
        }
        changed
    }
}

impl std::fmt::Display for Xcconfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for line in &self.lines {
            match line {
                Line::Include(path) => writeln!(f, "#include \"{}\"", path)?,
                Line::Setting { key, value } => writeln!(f, "{} = {}", key, value)?,
                Line::Verbatim(raw) => writeln!(f, "{}", raw)?,
            }
        }
        Ok(())
    }
}

fn parse_line(raw: &str) -> Line {
    let trimmed = raw.trim();

    if let Some(rest) = trimmed
        .strip_prefix("#include?")
        .or_else(|| trimmed.strip_prefix("#include"))
    {
        let include = rest.trim().trim_matches('"');
        if !include.is_empty() {
            return Line::Include(include.to_string());
        }
    }

    if !trimmed.starts_with("//") {
        if let Some((key, value)) = trimmed.split_once('=') {
            let key = key.trim();
            if !key.is_empty()
                && key
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_')
            {
                return Line::Setting {
                    key: key.to_string(),
                    value: value.trim().to_string(),
                };
            }
        }
    }

    Line::Verbatim(raw.to_string())
}

/// Visit a settings file and every file it includes, depth first
///
/// Each file is visited once even if included several times. Missing
/// includes are skipped, the build tool tolerates them too.
pub fn walk_include_chain(
    root: &Path,
    mut visit: impl FnMut(&mut Xcconfig) -> CacheResult<()>,
) -> CacheResult<()> {
    let mut seen = BTreeSet::new();
    let mut pending = vec![normalize_path(root)];

    while let Some(path) = pending.pop() {
        if !seen.insert(path.clone()) || !path.is_file() {
            continue;
        }

        let mut config = Xcconfig::read(&path)?;
        visit(&mut config)?;
        pending.extend(config.includes().into_iter().rev());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn parse_and_render_preserves_unknown_lines() {
        let content = "// generated\n#include \"base.xcconfig\"\nOTHER_CFLAGS = $(inherited) -DX\nOTHER_LDFLAGS[sdk=iphoneos*] = -ObjC\n";
        let config = Xcconfig::parse("/p/Pods.xcconfig", content);

        assert_eq!(config.get("OTHER_CFLAGS"), Some("$(inherited) -DX"));
        assert_eq!(config.includes(), vec![PathBuf::from("/p/base.xcconfig")]);
        assert_eq!(config.to_string(), content);
    }

    #[test]
    fn set_replaces_or_appends() {
        let mut config = Xcconfig::parse("/p/a.xcconfig", "A = 1\n");
        config.set("A", "2");
        config.set("B", "3");
        assert_eq!(config.to_string(), "A = 2\nB = 3\n");
    }

    #[test]
    fn include_chain_visits_each_file_once() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join("top.xcconfig"),
            "#include \"mid.xcconfig\"\n#include \"missing.xcconfig\"\nA = 1\n",
        )
        .unwrap();
        fs::write(
            temp.path().join("mid.xcconfig"),
            "#include \"top.xcconfig\"\nB = 2\n",
        )
        .unwrap();

        let mut visited = Vec::new();
        walk_include_chain(&temp.path().join("top.xcconfig"), |config| {
            visited.push(config.path().file_name().unwrap().to_string_lossy().into_owned());
            Ok(())
        })
        .unwrap();

        assert_eq!(visited, vec!["top.xcconfig", "mid.xcconfig"]);
    }
}
