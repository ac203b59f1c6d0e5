//! `xcodebuild` command lines

use crate::build::shell::ShellExecutor;
use crate::build::{BuildInvoker, BuildRequest, SettingsQuery};
use crate::error::{CacheError, CacheResult};
use std::path::Path;
use tracing::{info, warn};

pub const ARCHIVE_ACTION: &str = "archive";
pub const GENERIC_DESTINATION: &str = "generic";

/// Settings query and build invoker backed by `xcodebuild`
#[derive(Debug, Clone)]
pub struct Xcodebuild {
    configuration: String,
    destination: String,
    action: String,
    args: String,
    shell: ShellExecutor,
}

impl Xcodebuild {
    pub fn new(
        configuration: impl Into<String>,
        destination: impl Into<String>,
        action: impl Into<String>,
        args: impl Into<String>,
    ) -> Self {
        Self {
            configuration: configuration.into(),
            destination: destination.into(),
            action: action.into(),
            args: args.into(),
            shell: ShellExecutor::default(),
        }
    }

    pub fn with_shell(mut self, shell: ShellExecutor) -> Self {
        self.shell = shell;
        self
    }

    pub fn settings_command(&self, project: &Path, platform: &str) -> String {
        compile_command(&[
            project_flag(project),
            self.configuration_flag(),
            self.destination_flag(platform),
            "-alltargets".to_string(),
            "-showBuildSettings".to_string(),
            self.args.clone(),
            self.action.clone(),
        ])
    }

    pub fn build_command(&self, request: &BuildRequest<'_>) -> String {
        compile_command(&[
            project_flag(request.project),
            self.configuration_flag(),
            self.destination_flag(request.platform),
            format!("-scheme '{}'", request.scheme),
            format!("-derivedDataPath '{}'", request.derived_data.display()),
            self.args.clone(),
            self.action.clone(),
        ])
    }

    fn configuration_flag(&self) -> String {
        format!("-configuration '{}'", self.configuration)
    }

    /// Archives can only be made for a generic destination
    fn destination_flag(&self, platform: &str) -> String {
        let destination = if self.action == ARCHIVE_ACTION {
            GENERIC_DESTINATION
        } else {
            self.destination.as_str()
        };

        if destination == GENERIC_DESTINATION {
            format!("-destination 'generic/platform={}'", platform)
        } else {
            format!("-destination '{}'", destination)
        }
    }
}

impl SettingsQuery for Xcodebuild {
    fn load_build_settings(&self, project: &Path, platform: &str) -> CacheResult<String> {
        self.shell
            .execute_for_output(&self.settings_command(project, platform))
    }
}

impl BuildInvoker for Xcodebuild {
    fn build(&self, request: &BuildRequest<'_>) -> CacheResult<bool> {
        let command = self.build_command(request);
        info!("Building {}", request.scheme);

        match self.shell.execute_for_output(&command) {
            Ok(_) => Ok(true),
            Err(CacheError::CommandExecution { output, .. }) => {
                let tail: Vec<&str> = output.lines().rev().take(20).collect();
                for line in tail.into_iter().rev() {
                    warn!("{}", line);
                }
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }
}

fn project_flag(project: &Path) -> String {
    format!("-project '{}'", project.display())
}

fn compile_command(flags: &[String]) -> String {
    let flags: Vec<&str> = flags
        .iter()
        .map(String::as_str)
        .filter(|flag| !flag.is_empty())
        .collect();
    format!("xcodebuild {}", flags.join(" "))
}
