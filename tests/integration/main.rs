//! Integration tests for xccache

mod fixtures {
    use std::fs;
    use std::path::{Path, PathBuf};
    use xccache::project::model::product_types;
    use xccache::project::{
        BuildConfiguration, BuildFile, BuildPhase, FileReference, JsonProjectStore,
        ProductReference, Project, ProjectStore, Target, TargetDependency,
    };

    pub const APPLICATION: &str = "com.apple.product-type.application";

    pub fn target(
        name: &str,
        product_type: &str,
        product: &str,
        sources: &[&str],
        dependencies: &[(&str, &str)],
    ) -> Target {
        Target {
            uuid: format!("{}-uuid", name),
            name: name.into(),
            platform: "ios".into(),
            product_type: product_type.into(),
            product: ProductReference {
                uuid: format!("{}-product", name),
                name: None,
                path: product.into(),
            },
            aggregate: false,
            dependencies: dependencies
                .iter()
                .map(|(name, _)| TargetDependency::Target {
                    uuid: format!("{}-uuid", name),
                })
                .collect(),
            phases: vec![
                BuildPhase::Sources {
                    files: sources
                        .iter()
                        .map(|s| BuildFile::new(FileReference::file(*s)))
                        .collect(),
                },
                BuildPhase::Frameworks {
                    files: dependencies
                        .iter()
                        .map(|(_, product)| BuildFile::new(FileReference::file(*product)))
                        .collect(),
                },
            ],
            configurations: vec![BuildConfiguration::new("Release")],
        }
    }

    /// `X` links framework `F` and static library `S`; `S` links `F`
    pub fn write_project(dir: &Path) -> PathBuf {
        for (source, content) in [("F/F.m", "// F"), ("S/S.m", "// S")] {
            let path = dir.join(source);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }

        let path = dir.join("X.json");
        let mut project = Project::new(&path);
        project.targets = vec![
            target("F", product_types::FRAMEWORK, "F.framework", &["F/F.m"], &[]),
            target(
                "S",
                product_types::STATIC_LIBRARY,
                "libS.a",
                &["S/S.m"],
                &[("F", "F.framework")],
            ),
            target(
                "X",
                APPLICATION,
                "X.app",
                &[],
                &[("F", "F.framework"), ("S", "libS.a")],
            ),
        ];
        JsonProjectStore.save(&project).unwrap();
        path
    }

    /// Settings text as `xcodebuild -showBuildSettings` prints it
    pub fn settings_text(names: &[&str]) -> String {
        names
            .iter()
            .map(|name| {
                format!("Build settings for action archive and target {name}:\n    TARGETNAME = {name}\n    ARCHS = arm64\n\n")
            })
            .collect()
    }
}

mod cli_tests {
    use super::fixtures;
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::fs;
    use tempfile::TempDir;

    fn xccache() -> Command {
        let mut cmd = cargo_bin_cmd!("xccache");
        cmd.env_remove("XCCACHE_CACHEFILE");
        cmd
    }

    #[test]
    fn help_displays() {
        xccache()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("build-avoidance cache"));
    }

    #[test]
    fn version_displays() {
        xccache()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("xccache"));
    }

    #[test]
    fn config_path_defaults_to_cachefile() {
        xccache()
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::diff("Cachefile\n"));
    }

    #[test]
    fn missing_cachefile_is_reported_with_hint() {
        let temp = TempDir::new().unwrap();
        xccache()
            .arg("--cachefile")
            .arg(temp.path().join("Cachefile"))
            .args(["inject", "--configuration", "debug"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Cache file not found"))
            .stderr(predicate::str::contains("Hint:"));
    }

    #[test]
    fn config_init_then_show() {
        let temp = TempDir::new().unwrap();
        let cachefile = temp.path().join("Cachefile");

        xccache()
            .arg("-f")
            .arg(&cachefile)
            .args(["config", "init"])
            .assert()
            .success();
        assert!(cachefile.is_file());

        xccache()
            .arg("-f")
            .arg(&cachefile)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[[configurations]]"))
            .stdout(predicate::str::contains("build_configuration = \"Debug\""));

        xccache()
            .arg("-f")
            .arg(&cachefile)
            .args(["config", "init"])
            .assert()
            .success()
            .stdout(predicate::str::contains("already exists"));
    }

    #[test]
    fn unknown_configuration_is_rejected() {
        let temp = TempDir::new().unwrap();
        let cachefile = temp.path().join("Cachefile");
        fs::write(&cachefile, "[[configurations]]\nname = \"debug\"\n").unwrap();

        xccache()
            .arg("-f")
            .arg(&cachefile)
            .args(["graph", "-c", "release"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("configuration 'release' is not defined"));
    }

    /// Stand-in `xcodebuild` printing settings or dropping products
    #[cfg(unix)]
    fn install_fake_xcodebuild(dir: &std::path::Path) -> String {
        use std::os::unix::fs::PermissionsExt;

        let bin = dir.join("bin");
        fs::create_dir_all(&bin).unwrap();
        let script = format!(
            r#"#!/bin/sh
scheme=""
derived=""
settings=0
while [ $# -gt 0 ]; do
  case "$1" in
    -scheme) scheme="$2"; shift ;;
    -derivedDataPath) derived="$2"; shift ;;
    -showBuildSettings) settings=1 ;;
  esac
  shift
done
if [ "$settings" = 1 ]; then
  printf '%s' '{}'
  exit 0
fi
mkdir -p "$derived/Build/Products/F.framework"
echo binary > "$derived/Build/Products/F.framework/F"
echo archive > "$derived/Build/Products/lib$scheme.a"
"#,
            fixtures::settings_text(&["F", "S", "X"])
        );
        let path = bin.join("xcodebuild");
        fs::write(&path, script).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();

        format!("{}:{}", bin.display(), std::env::var("PATH").unwrap_or_default())
    }

    #[cfg(unix)]
    fn write_cachefile(dir: &std::path::Path) -> std::path::PathBuf {
        let cachefile = dir.join("Cachefile");
        fs::write(
            &cachefile,
            r#"projects = ["X.json"]

[[configurations]]
name = "release"
build_configuration = "Release"

[storage]
path = "store"

[[targets]]
name = "X"
dependencies = ["S"]
"#,
        )
        .unwrap();
        cachefile
    }

    #[cfg(unix)]
    #[test]
    fn graph_prints_nodes_without_touching_projects() {
        let temp = TempDir::new().unwrap();
        let project = fixtures::write_project(temp.path());
        let before = fs::read_to_string(&project).unwrap();
        let path = install_fake_xcodebuild(temp.path());
        let cachefile = write_cachefile(temp.path());

        xccache()
            .env("PATH", path)
            .arg("-f")
            .arg(&cachefile)
            .args(["graph", "-c", "release", "--evaluate"])
            .assert()
            .success()
            .stdout(predicate::str::contains("# X <- S"))
            .stdout(predicate::str::contains("S (root)"))
            .stdout(predicate::str::contains("state: waiting_for_rebuild"));

        assert_eq!(fs::read_to_string(&project).unwrap(), before);
        assert!(!temp.path().join("store").exists());
    }

    #[cfg(unix)]
    #[test]
    fn second_inject_reuses_the_store() {
        let temp = TempDir::new().unwrap();
        let project = fixtures::write_project(temp.path());
        let pristine = fs::read_to_string(&project).unwrap();
        let path = install_fake_xcodebuild(temp.path());
        let cachefile = write_cachefile(temp.path());

        xccache()
            .env("PATH", &path)
            .arg("-f")
            .arg(&cachefile)
            .args(["inject", "-c", "release"])
            .assert()
            .success()
            .stdout(predicate::str::contains("0 unpacked, 2 rebuilt, 2 target(s) replaced"));
        assert!(temp.path().join("store/S").is_dir());
        assert!(temp.path().join("store/F").is_dir());
        assert_ne!(fs::read_to_string(&project).unwrap(), pristine);

        // Fresh checkout of the same sources
        fs::write(&project, &pristine).unwrap();
        xccache()
            .env("PATH", &path)
            .arg("-f")
            .arg(&cachefile)
            .args(["inject", "-c", "release"])
            .assert()
            .success()
            .stdout(predicate::str::contains("2 unpacked, 0 rebuilt, 2 target(s) replaced"));
        assert!(temp.path().join("build/cached/F/F.framework/F").is_file());
        assert!(temp.path().join("build/cached/S/libS.a").is_file());
    }
}

mod pipeline_tests {
    use super::fixtures;
    use std::cell::RefCell;
    use std::fs;
    use std::path::{Path, PathBuf};
    use std::rc::Rc;
    use std::sync::Arc;
    use tempfile::TempDir;
    use xccache::build::{BuildInvoker, BuildRequest, SettingsQuery};
    use xccache::cache::LocalStorage;
    use xccache::config::TargetConfig;
    use xccache::graph::{GraphBuilder, TargetResolver};
    use xccache::project::{JsonProjectStore, Project, ProjectStore, SettingValue, Workspace};
    use xccache::runner::Runner;
    use xccache::settings::SettingsLoader;
    use xccache::CacheResult;

    struct FakeSettings;

    impl SettingsQuery for FakeSettings {
        fn load_build_settings(&self, _project: &Path, _platform: &str) -> CacheResult<String> {
            Ok(fixtures::settings_text(&["F", "S", "X"]))
        }
    }

    /// Drops the scheme's product and snapshots the project it was asked
    /// to build
    struct FakeToolchain {
        builds: Rc<RefCell<Vec<(String, Project)>>>,
    }

    impl BuildInvoker for FakeToolchain {
        fn build(&self, request: &BuildRequest<'_>) -> CacheResult<bool> {
            let products = request.derived_data.join("Build/Products/Release-iphoneos");
            fs::create_dir_all(&products).unwrap();
            if request.scheme == "F" {
                fs::create_dir_all(products.join("F.framework")).unwrap();
                fs::write(products.join("F.framework/F"), "binary").unwrap();
            } else {
                fs::write(products.join(format!("lib{}.a", request.scheme)), "archive").unwrap();
            }

            let project = JsonProjectStore.open(request.project).unwrap();
            self.builds
                .borrow_mut()
                .push((request.scheme.to_string(), project));
            Ok(true)
        }
    }

    struct Pipeline {
        temp: TempDir,
        project: PathBuf,
        builds: Rc<RefCell<Vec<(String, Project)>>>,
    }

    impl Pipeline {
        fn new() -> Self {
            let temp = TempDir::new().unwrap();
            let project = fixtures::write_project(temp.path());
            Self {
                temp,
                project,
                builds: Rc::default(),
            }
        }

        fn run(&self) -> xccache::runner::RunReport {
            let workspace =
                Workspace::open(Box::new(JsonProjectStore), &[self.project.clone()]).unwrap();
            let builder = GraphBuilder::new(
                TargetResolver::new(&[self.project.clone()]),
                SettingsLoader::new(Arc::new(FakeSettings)),
            );
            let store = LocalStorage::new(self.temp.path().join("store"));
            let toolchain = FakeToolchain {
                builds: self.builds.clone(),
            };
            let mut runner = Runner::new(
                workspace,
                builder,
                Box::new(store),
                Box::new(toolchain),
                "Release",
                self.temp.path().join("DerivedData"),
            );

            runner
                .run(&[TargetConfig {
                    name: "X".into(),
                    dependencies: vec!["F".into(), "S".into()],
                    embed_frameworks_script: None,
                }])
                .unwrap()
        }

        fn container(&self) -> PathBuf {
            self.temp.path().join("DerivedData/cached")
        }

        fn stored_shas(&self, name: &str) -> usize {
            fs::read_dir(self.temp.path().join("store").join(name))
                .unwrap()
                .filter_map(Result::ok)
                .filter(|entry| entry.path().extension().is_none())
                .count()
        }
    }

    fn setting(project: &Project, target: &str, key: &str) -> Vec<String> {
        let target = project.targets.iter().find(|t| t.name == target).unwrap();
        match target.find_build_configuration("Release").unwrap().settings.get(key) {
            Some(SettingValue::List(values)) => values.clone(),
            Some(SettingValue::Single(value)) => vec![value.clone()],
            None => vec![],
        }
    }

    #[test]
    fn cached_framework_is_injected_and_changed_library_rebuilt() {
        let pipeline = Pipeline::new();
        let pristine = fs::read_to_string(&pipeline.project).unwrap();

        let first = pipeline.run();
        assert!(first.unpacked.is_empty());
        assert_eq!(first.rebuilt, vec!["F", "S"]);
        assert_eq!(pipeline.stored_shas("F"), 1);
        assert_eq!(pipeline.stored_shas("S"), 1);

        // Fresh checkout with a changed library source
        fs::write(&pipeline.project, &pristine).unwrap();
        fs::write(pipeline.temp.path().join("S/S.m"), "// S changed").unwrap();
        pipeline.builds.borrow_mut().clear();

        let second = pipeline.run();
        assert_eq!(second.unpacked, vec!["F"]);
        assert_eq!(second.rebuilt, vec!["S"]);
        assert_eq!(pipeline.stored_shas("F"), 1);
        assert_eq!(pipeline.stored_shas("S"), 2);

        // S was built against the cached framework, not the F target
        let builds = pipeline.builds.borrow();
        assert_eq!(builds.len(), 1);
        let (scheme, built) = &builds[0];
        assert_eq!(scheme, "S");
        let f_location = format!("\"{}\"", pipeline.container().join("F").display());
        assert!(setting(built, "S", "FRAMEWORK_SEARCH_PATHS").contains(&f_location));
        let s = built.targets.iter().find(|t| t.name == "S").unwrap();
        assert!(s.dependencies.is_empty());

        // X links both artifacts and no longer depends on either target
        let saved = JsonProjectStore.open(&pipeline.project).unwrap();
        assert_eq!(saved.targets.len(), 1);
        let x = &saved.targets[0];
        assert!(x.dependencies.is_empty());
        assert!(x.linked_files().is_empty());
        assert!(setting(&saved, "X", "FRAMEWORK_SEARCH_PATHS").contains(&f_location));
        let ldflags = setting(&saved, "X", "OTHER_LDFLAGS");
        assert!(ldflags.contains(&"-framework \"F\"".to_string()));
        assert!(ldflags.contains(&"-l\"S\"".to_string()));
        assert!(pipeline.container().join("F/F.framework/F").is_file());
        assert!(pipeline.container().join("S/libS.a").is_file());
    }

    #[test]
    fn unchanged_sources_build_nothing() {
        let pipeline = Pipeline::new();
        let pristine = fs::read_to_string(&pipeline.project).unwrap();
        pipeline.run();

        fs::write(&pipeline.project, &pristine).unwrap();
        pipeline.builds.borrow_mut().clear();
        let report = pipeline.run();

        assert_eq!(report.unpacked, vec!["F", "S"]);
        assert!(report.rebuilt.is_empty());
        assert!(pipeline.builds.borrow().is_empty());
    }
}
