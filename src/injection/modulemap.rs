//! Module map reading and rewriting

use crate::error::{CacheError, CacheResult};
use crate::project::model::file_name_of;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// `header "path"` line of a module map
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderDeclaration {
    /// Everything before the opening quote, e.g. `  umbrella header `
    pub prefix: String,
    pub path: String,
}

impl HeaderDeclaration {
    pub fn parse(line: &str) -> Option<Self> {
        if !line.contains("header") || line.contains("exclude") {
            return None;
        }
        let mut components = line.split('"');
        let prefix = components.next()?;
        let path = components.next()?;
        Some(Self {
            prefix: prefix.to_string(),
            path: path.to_string(),
        })
    }

    /// Declared path resolved against the module map's directory
    pub fn full_path(&self, modulemap_dir: &Path) -> PathBuf {
        let path = Path::new(&self.path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            modulemap_dir.join(path)
        }
    }
}

/// Paths of every header a module map declares
pub fn extract_header_paths(modulemap: &Path) -> CacheResult<Vec<PathBuf>> {
    let dir = parent_dir(modulemap);
    let paths: Vec<PathBuf> = read(modulemap)?
        .lines()
        .filter_map(HeaderDeclaration::parse)
        .map(|declaration| declaration.full_path(&dir))
        .collect();
    debug!("{} declares {} header(s)", modulemap.display(), paths.len());
    Ok(paths)
}

/// Point absolute or dangling header declarations at staged copies
///
/// A declaration is replaced by `<module map dir>/<header file name>` when
/// that file exists; otherwise it is left alone.
pub fn fix_header_paths(modulemap: &Path) -> CacheResult<()> {
    let dir = parent_dir(modulemap);
    let content = read(modulemap)?;

    let lines: Vec<String> = content
        .lines()
        .map(|line| {
            let Some(declaration) = HeaderDeclaration::parse(line) else {
                return line.to_string();
            };
            let should_replace = Path::new(&declaration.path).is_absolute()
                || !declaration.full_path(&dir).exists();
            if !should_replace {
                return line.to_string();
            }

            let staged = dir.join(file_name_of(Path::new(&declaration.path)));
            if staged == Path::new(&declaration.path) {
                return line.to_string();
            }
            if staged.exists() {
                debug!("Substituting {} with {}", declaration.path, staged.display());
                format!("{}\"{}\"", declaration.prefix, staged.display())
            } else {
                warn!(
                    "Header {} of {} is missing, leaving it as is",
                    declaration.path,
                    modulemap.display()
                );
                line.to_string()
            }
        })
        .collect();

    let mut updated = lines.join("\n");
    updated.push('\n');
    fs::write(modulemap, updated)
        .map_err(|e| CacheError::io(format!("writing {}", modulemap.display()), e))
}

/// Expose a generated Swift interface header as `<module>.Swift`
pub fn append_swift_submodule(modulemap: &Path, module_name: &str, header: &Path) -> CacheResult<()> {
    let context = || format!("appending to {}", modulemap.display());
    let mut file = fs::OpenOptions::new()
        .append(true)
        .open(modulemap)
        .map_err(|e| CacheError::io(context(), e))?;
    write!(
        file,
        "\nmodule {}.Swift {{\n  header \"{}\"\n  requires objc\n}}\n",
        module_name,
        header.display()
    )
    .map_err(|e| CacheError::io(context(), e))?;
    debug!("Added {}.Swift to {}", module_name, modulemap.display());
    Ok(())
}

fn read(modulemap: &Path) -> CacheResult<String> {
    fs::read_to_string(modulemap)
        .map_err(|e| CacheError::io(format!("reading {}", modulemap.display()), e))
}

fn parent_dir(path: &Path) -> PathBuf {
    path.parent().map(Path::to_path_buf).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn parses_header_declarations() {
        let declaration = HeaderDeclaration::parse("  umbrella header \"Core-umbrella.h\"").unwrap();
        assert_eq!(declaration.prefix, "  umbrella header ");
        assert_eq!(declaration.path, "Core-umbrella.h");

        assert!(HeaderDeclaration::parse("  exclude header \"Private.h\"").is_none());
        assert!(HeaderDeclaration::parse("  export *").is_none());
        assert!(HeaderDeclaration::parse("  header").is_none());
    }

    #[test]
    fn extracts_paths_relative_to_modulemap() {
        let temp = TempDir::new().unwrap();
        let modulemap = temp.path().join("Core.modulemap");
        fs::write(
            &modulemap,
            "module Core {\n  umbrella header \"Core.h\"\n  header \"/abs/Extra.h\"\n  exclude header \"No.h\"\n}\n",
        )
        .unwrap();

        assert_eq!(
            extract_header_paths(&modulemap).unwrap(),
            vec![temp.path().join("Core.h"), PathBuf::from("/abs/Extra.h")]
        );
    }

    #[test]
    fn fixes_absolute_and_missing_paths() {
        let temp = TempDir::new().unwrap();
        let modulemap = temp.path().join("Core.modulemap");
        fs::write(temp.path().join("Core.h"), "").unwrap();
        fs::write(temp.path().join("Extra.h"), "").unwrap();
        fs::write(
            &modulemap,
            "module Core {\n  umbrella header \"Core.h\"\n  header \"/somewhere/else/Extra.h\"\n  header \"Sub/Extra.h\"\n  header \"/gone/Missing.h\"\n}",
        )
        .unwrap();

        fix_header_paths(&modulemap).unwrap();

        let extra = temp.path().join("Extra.h");
        assert_eq!(
            fs::read_to_string(&modulemap).unwrap(),
            format!(
                "module Core {{\n  umbrella header \"Core.h\"\n  header \"{0}\"\n  header \"{0}\"\n  header \"/gone/Missing.h\"\n}}\n",
                extra.display()
            )
        );
    }

    #[test]
    fn appends_swift_submodule() {
        let temp = TempDir::new().unwrap();
        let modulemap = temp.path().join("Core.modulemap");
        fs::write(&modulemap, "module Core {}\n").unwrap();

        append_swift_submodule(&modulemap, "Core", Path::new("/dd/cached/Core/Core-Swift.h")).unwrap();
        assert_eq!(
            fs::read_to_string(&modulemap).unwrap(),
            "module Core {}\n\nmodule Core.Swift {\n  header \"/dd/cached/Core/Core-Swift.h\"\n  requires objc\n}\n"
        );
    }
}
