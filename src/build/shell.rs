//! Shell command execution

use crate::error::{CacheError, CacheResult};
use std::collections::BTreeMap;
use std::process::{Command, Stdio};
use tracing::debug;

/// Runs command lines through a shell
#[derive(Debug, Clone)]
pub struct ShellExecutor {
    shell: String,
}

impl Default for ShellExecutor {
    fn default() -> Self {
        Self::new("bash")
    }
}

impl ShellExecutor {
    pub fn new(shell: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
        }
    }

    /// Run `command` and return its combined output
    ///
    /// A non-zero exit status is an error carrying the command and output.
    pub fn execute_for_output(&self, command: &str) -> CacheResult<String> {
        self.run(command, &BTreeMap::new())
    }

    /// Run `command` with extra environment variables
    pub fn execute_with_env(
        &self,
        command: &str,
        env: &BTreeMap<String, String>,
    ) -> CacheResult<String> {
        self.run(command, env)
    }

    fn run(&self, command: &str, env: &BTreeMap<String, String>) -> CacheResult<String> {
        let actual = extend_for_pipefail(command);
        debug!("Executing: {}", actual);

        let output = Command::new(&self.shell)
            .arg("-c")
            .arg(&actual)
            .envs(env)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| CacheError::command_failed(command, e))?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        if !output.status.success() {
            return Err(CacheError::command_exec(command, combined));
        }
        Ok(combined)
    }
}

/// Make a pipeline fail when any of its stages fails
fn extend_for_pipefail(command: &str) -> String {
    if command.contains('|') {
        format!("set -eo pipefail && {}", command)
    } else {
        command.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipes_enable_pipefail() {
        assert_eq!(
            extend_for_pipefail("xcodebuild | xcpretty"),
            "set -eo pipefail && xcodebuild | xcpretty"
        );
        assert_eq!(extend_for_pipefail("ls"), "ls");
    }

    #[test]
    fn captures_output() {
        let shell = ShellExecutor::new("sh");
        let output = shell.execute_for_output("echo hello").unwrap();
        assert_eq!(output.trim(), "hello");
    }

    #[test]
    fn failure_carries_command_and_output() {
        let shell = ShellExecutor::new("sh");
        let err = shell
            .execute_for_output("echo broken >&2; exit 3")
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("echo broken"));
        assert!(msg.contains("execution failed"));
        assert!(msg.contains("broken"));
    }

    #[test]
    fn environment_is_passed() {
        let shell = ShellExecutor::new("sh");
        let mut env = BTreeMap::new();
        env.insert("PODS_ROOT".to_string(), "/pods".to_string());
        let output = shell.execute_with_env("echo $PODS_ROOT", &env).unwrap();
        assert_eq!(output.trim(), "/pods");
    }
}
