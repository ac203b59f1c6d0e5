//! Locating and copying build products

use crate::error::{CacheError, CacheResult};
use crate::graph::Node;
use crate::project::ProductKind;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Finds a built node's products under a derived data directory
#[derive(Debug, Clone)]
pub struct ProductExtractor {
    derived_data: PathBuf,
    excluded: Vec<PathBuf>,
}

impl ProductExtractor {
    pub fn new(derived_data: impl Into<PathBuf>) -> Self {
        Self {
            derived_data: derived_data.into(),
            excluded: Vec::new(),
        }
    }

    /// Skip a subtree of the derived data directory while searching
    pub fn excluding(mut self, path: impl Into<PathBuf>) -> Self {
        self.excluded.push(path.into());
        self
    }

    /// Paths of the node's products, main product first
    pub fn list_products(&self, node: &Node) -> CacheResult<Vec<PathBuf>> {
        let product_name = node.product_file_name();
        let not_found = || CacheError::ProductNotFound {
            kind: node.product_kind.to_string(),
            target: node.name.clone(),
        };

        match node.product_kind {
            ProductKind::Framework => {
                let framework = self.find(&product_name).ok_or_else(not_found)?;
                let mut products = vec![framework.clone()];
                if let Some(dir) = framework.parent() {
                    let dsym = dir.join(node.dsym_file_name());
                    if dsym.exists() {
                        products.push(dsym);
                    }
                }
                Ok(products)
            }
            ProductKind::StaticLibrary => {
                let library = self.find(&product_name).ok_or_else(not_found)?;
                let mut products = vec![library];
                if let Some(header) = node.swift_objc_interface_header_file() {
                    products.extend(self.find(&header));
                }
                Ok(products)
            }
            ProductKind::Bundle | ProductKind::Other(_) => Err(CacheError::UnsupportedProductType {
                name: node.name.clone(),
                product_type: node.product_kind.uti().to_string(),
            }),
        }
    }

    /// Copy the node's products into `destination`, resolving symlinks
    pub fn copy_products(&self, node: &Node, destination: &Path) -> CacheResult<()> {
        fs::create_dir_all(destination)
            .map_err(|e| CacheError::io(format!("creating {}", destination.display()), e))?;

        for product in self.list_products(node)? {
            let real = fs::canonicalize(&product)
                .map_err(|e| CacheError::io(format!("resolving {}", product.display()), e))?;
            let Some(name) = product.file_name() else {
                continue;
            };
            debug!("Copying {} for {}", real.display(), node.name);
            copy_recursively(&real, &destination.join(name))?;
        }
        Ok(())
    }

    /// First path in a sorted walk whose file name is `file_name`
    fn find(&self, file_name: &str) -> Option<PathBuf> {
        WalkDir::new(&self.derived_data)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !self.excluded.iter().any(|excluded| entry.path() == excluded))
            .filter_map(Result::ok)
            .find(|entry| entry.file_name().to_string_lossy() == file_name)
            .map(walkdir::DirEntry::into_path)
    }
}

/// Copy a file or directory tree; symlinks inside a tree stay symlinks
pub fn copy_recursively(source: &Path, destination: &Path) -> CacheResult<()> {
    let context = |path: &Path| format!("copying {} to {}", path.display(), destination.display());

    if !source.is_dir() {
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent).map_err(|e| CacheError::io(context(source), e))?;
        }
        fs::copy(source, destination).map_err(|e| CacheError::io(context(source), e))?;
        return Ok(());
    }

    for entry in WalkDir::new(source).sort_by_file_name() {
        let entry = entry.map_err(|e| CacheError::io(context(source), e.into()))?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(|e| CacheError::Internal(e.to_string()))?;
        let target = destination.join(relative);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            fs::create_dir_all(&target).map_err(|e| CacheError::io(context(entry.path()), e))?;
        } else if file_type.is_symlink() {
            copy_symlink(entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target).map_err(|e| CacheError::io(context(entry.path()), e))?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn copy_symlink(source: &Path, destination: &Path) -> CacheResult<()> {
    let context = || format!("copying link {}", source.display());
    let link = fs::read_link(source).map_err(|e| CacheError::io(context(), e))?;
    std::os::unix::fs::symlink(link, destination).map_err(|e| CacheError::io(context(), e))
}

#[cfg(not(unix))]
fn copy_symlink(source: &Path, destination: &Path) -> CacheResult<()> {
    fs::copy(source, destination)
        .map(|_| ())
        .map_err(|e| CacheError::io(format!("copying {}", source.display()), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::model::product_types;
    use crate::project::{ProductReference, Target, TargetId};
    use crate::settings::SettingsContainer;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn node(product_type: &str, path: &str, settings: &[(&str, &str)]) -> Node {
        let target = Target {
            uuid: "CORE".into(),
            name: "Core".into(),
            platform: "ios".into(),
            product_type: product_type.into(),
            product: ProductReference {
                uuid: "CORE-product".into(),
                name: None,
                path: path.into(),
            },
            aggregate: false,
            dependencies: vec![],
            phases: vec![],
            configurations: vec![],
        };
        let mut node = Node::new(TargetId::new("/w/Pods.json", "CORE"), &target);
        let all: BTreeMap<String, String> = settings
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        node.settings = Some(SettingsContainer::new(all, BTreeMap::new()));
        node
    }

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "x").unwrap();
    }

    #[test]
    fn framework_with_dsym() {
        let temp = TempDir::new().unwrap();
        let products = temp.path().join("Build/Products/Release-iphoneos/Core");
        touch(&products.join("Core.framework/Core"));
        touch(&products.join("Core.framework.dSYM/Contents/Info.plist"));

        let extractor = ProductExtractor::new(temp.path());
        let found = extractor
            .list_products(&node(product_types::FRAMEWORK, "Core.framework", &[]))
            .unwrap();
        assert_eq!(
            found,
            vec![
                products.join("Core.framework"),
                products.join("Core.framework.dSYM")
            ]
        );

        let destination = temp.path().join("cached/Core");
        extractor
            .copy_products(&node(product_types::FRAMEWORK, "Core.framework", &[]), &destination)
            .unwrap();
        assert!(destination.join("Core.framework/Core").is_file());
        assert!(destination.join("Core.framework.dSYM/Contents/Info.plist").is_file());
    }

    #[test]
    fn static_library_with_swift_header() {
        let temp = TempDir::new().unwrap();
        touch(&temp.path().join("Build/Products/Release-iphoneos/libCore.a"));
        touch(&temp.path().join("Build/Intermediates/Core.build/DerivedSources/Core-Swift.h"));

        let node = node(
            product_types::STATIC_LIBRARY,
            "libCore.a",
            &[("SWIFT_OBJC_INTERFACE_HEADER_NAME", "Core-Swift.h")],
        );
        let found = ProductExtractor::new(temp.path()).list_products(&node).unwrap();
        let names: Vec<String> = found
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["libCore.a", "Core-Swift.h"]);
    }

    #[test]
    fn excluded_subtrees_are_not_searched() {
        let temp = TempDir::new().unwrap();
        touch(&temp.path().join("cached/Core/libCore.a"));

        let extractor = ProductExtractor::new(temp.path()).excluding(temp.path().join("cached"));
        let err = extractor
            .list_products(&node(product_types::STATIC_LIBRARY, "libCore.a", &[]))
            .unwrap_err();
        assert!(matches!(err, CacheError::ProductNotFound { .. }));
    }

    #[test]
    fn bundles_are_unsupported() {
        let temp = TempDir::new().unwrap();
        let err = ProductExtractor::new(temp.path())
            .list_products(&node(product_types::BUNDLE, "Core.bundle", &[]))
            .unwrap_err();
        assert!(matches!(err, CacheError::UnsupportedProductType { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn copy_keeps_inner_symlinks() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("Core.framework");
        touch(&source.join("Versions/A/Core"));
        std::os::unix::fs::symlink("A", source.join("Versions/Current")).unwrap();

        let destination = temp.path().join("copy/Core.framework");
        copy_recursively(&source, &destination).unwrap();
        assert_eq!(
            fs::read_link(destination.join("Versions/Current")).unwrap(),
            PathBuf::from("A")
        );
    }
}
