//! External tool invocation
//!
//! Every build, test and analysis tool is reached through a shell command.
//! This module provides:
//!
//! - Variable expansion (`${VAR}`) against the run environment
//! - The [`ToolInvoker`] seam, so tests can substitute a fake
//! - [`ShellInvoker`], which runs `sh -c` through `tokio::process`
//!
//! ## Variable Expansion
//!
//! ```rust
//! use std::collections::HashMap;
//! use stagegate::expand_variables;
//!
//! let env = HashMap::from([("BUILD_ID".to_string(), "42".to_string())]);
//! assert_eq!(expand_variables("echo ${BUILD_ID}", &env), "echo 42");
//! ```

use crate::pipeline::PipelineError;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;

/// A single command to run against the workspace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Command line, `${VAR}` references already expanded
    pub command: String,

    /// Working directory
    pub working_dir: PathBuf,

    /// Complete environment of the child process
    pub env: HashMap<String, String>,

    /// Globs, relative to the working directory, of files to report as produced
    pub outputs: Vec<String>,
}

impl Invocation {
    /// Creates an invocation with an empty environment
    #[must_use]
    pub fn new(command: impl Into<String>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            command: command.into(),
            working_dir: working_dir.into(),
            env: HashMap::new(),
            outputs: Vec::new(),
        }
    }

    /// Replaces the environment
    #[must_use]
    pub fn with_env(mut self, env: HashMap<String, String>) -> Self {
        self.env = env;
        self
    }

    /// Adds a produced-file glob
    #[must_use]
    pub fn with_output(mut self, pattern: impl Into<String>) -> Self {
        self.outputs.push(pattern.into());
        self
    }
}

/// Result of a successful tool invocation
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    /// Exit code
    pub exit_code: i32,

    /// Standard output
    pub stdout: String,

    /// Standard error
    pub stderr: String,

    /// Files matching the declared outputs after the run
    pub produced_files: Vec<PathBuf>,

    /// Duration of execution
    pub duration: Duration,
}

impl ToolOutput {
    /// Returns true if command succeeded (exit code 0)
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Boundary to an external build, test or analysis tool
#[async_trait]
pub trait ToolInvoker: Send + Sync {
    /// Runs the invocation once
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::ToolExecution`] when the tool exits non-zero
    /// and [`PipelineError::Io`] when it cannot be started.
    async fn invoke(&self, invocation: &Invocation) -> Result<ToolOutput, PipelineError>;
}

/// Runs invocations through a POSIX shell
#[derive(Debug, Clone)]
pub struct ShellInvoker {
    shell: String,
    echo_output: bool,
}

impl ShellInvoker {
    /// Creates an invoker using `sh`
    #[must_use]
    pub fn new() -> Self {
        Self {
            shell: "sh".to_string(),
            echo_output: true,
        }
    }

    /// Sets the shell binary
    #[must_use]
    pub fn with_shell(mut self, shell: impl Into<String>) -> Self {
        self.shell = shell.into();
        self
    }

    /// Controls whether child output is copied to this process's stdout/stderr
    #[must_use]
    pub fn echo_output(mut self, echo: bool) -> Self {
        self.echo_output = echo;
        self
    }
}

impl Default for ShellInvoker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolInvoker for ShellInvoker {
    async fn invoke(&self, invocation: &Invocation) -> Result<ToolOutput, PipelineError> {
        let start = Instant::now();
        tracing::debug!(
            command = %invocation.command,
            cwd = %invocation.working_dir.display(),
            "Executing shell command"
        );

        let output = Command::new(&self.shell)
            .arg("-c")
            .arg(&invocation.command)
            .current_dir(&invocation.working_dir)
            .env_clear()
            .envs(&invocation.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                PipelineError::Io(format!("failed to start '{}': {e}", invocation.command))
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        let exit_code = output.status.code().unwrap_or(-1);

        if self.echo_output {
            if !stdout.is_empty() {
                print!("{stdout}");
            }
            if !stderr.is_empty() {
                eprint!("{stderr}");
            }
        }

        if exit_code != 0 {
            return Err(PipelineError::ToolExecution {
                command: invocation.command.clone(),
                code: exit_code,
                stderr,
            });
        }

        Ok(ToolOutput {
            exit_code,
            stdout,
            stderr,
            produced_files: collect_outputs(&invocation.working_dir, &invocation.outputs),
            duration: start.elapsed(),
        })
    }
}

/// Lists files under `base` matching any of `patterns`, sorted and deduplicated
#[must_use]
pub fn collect_outputs(base: &Path, patterns: &[String]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for pattern in patterns {
        let full = base.join(pattern);
        match glob::glob(&full.to_string_lossy()) {
            Ok(paths) => files.extend(paths.filter_map(Result::ok).filter(|p| p.is_file())),
            Err(e) => tracing::warn!(pattern = %pattern, error = %e, "Ignoring invalid output glob"),
        }
    }
    files.sort();
    files.dedup();
    files
}

static VAR_PATTERN: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").unwrap()
});

/// Expands environment variables in a command string
///
/// Variables are expanded using the `${VAR_NAME}` syntax.
/// If a variable is not found, it remains unchanged in the output.
#[must_use]
pub fn expand_variables(input: &str, env: &HashMap<String, String>) -> String {
    VAR_PATTERN
        .replace_all(input, |caps: &regex::Captures| {
            let var_name = caps.get(1).map_or("", |m| m.as_str());
            env.get(var_name).cloned().unwrap_or_else(|| {
                caps.get(0)
                    .map(|m| m.as_str().to_string())
                    .unwrap_or_default()
            })
        })
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_env() -> HashMap<String, String> {
        HashMap::from([(
            "PATH".to_string(),
            std::env::var("PATH").unwrap_or_else(|_| "/usr/bin:/bin".to_string()),
        )])
    }

    #[test]
    fn test_expand_variables_simple() {
        let env = HashMap::from([("BUILD_NUMBER".to_string(), "123".to_string())]);
        assert_eq!(expand_variables("echo ${BUILD_NUMBER}", &env), "echo 123");
    }

    #[test]
    fn test_expand_variables_mixed() {
        let env = HashMap::from([
            ("BUILD_NUMBER".to_string(), "789".to_string()),
            ("FOO".to_string(), "bar".to_string()),
        ]);

        let expanded = expand_variables("${BUILD_NUMBER} and ${UNKNOWN} and ${FOO}", &env);
        assert_eq!(expanded, "789 and ${UNKNOWN} and bar");
    }

    #[test]
    fn test_expand_variables_leaves_bare_dollar() {
        let env = HashMap::from([("HOME".to_string(), "/root".to_string())]);
        assert_eq!(expand_variables("echo $HOME $5", &env), "echo $HOME $5");
    }

    #[tokio::test]
    async fn test_shell_invoker_captures_output() {
        let dir = tempfile::tempdir().unwrap();
        let invocation = Invocation::new("echo hello", dir.path()).with_env(base_env());

        let output = ShellInvoker::new()
            .echo_output(false)
            .invoke(&invocation)
            .await
            .unwrap();

        assert!(output.is_success());
        assert_eq!(output.stdout.trim(), "hello");
    }

    #[tokio::test]
    async fn test_shell_invoker_passes_environment() {
        let dir = tempfile::tempdir().unwrap();
        let mut env = base_env();
        env.insert("STAGE_NAME".to_string(), "Build".to_string());
        let invocation = Invocation::new("echo \"$STAGE_NAME\"", dir.path()).with_env(env);

        let output = ShellInvoker::new()
            .echo_output(false)
            .invoke(&invocation)
            .await
            .unwrap();
        assert_eq!(output.stdout.trim(), "Build");
    }

    #[tokio::test]
    async fn test_shell_invoker_non_zero_exit() {
        let dir = tempfile::tempdir().unwrap();
        let invocation = Invocation::new("echo boom >&2; exit 3", dir.path()).with_env(base_env());

        let err = ShellInvoker::new()
            .echo_output(false)
            .invoke(&invocation)
            .await
            .unwrap_err();

        assert_eq!(
            err,
            PipelineError::ToolExecution {
                command: "echo boom >&2; exit 3".to_string(),
                code: 3,
                stderr: "boom\n".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_shell_invoker_reports_produced_files() {
        let dir = tempfile::tempdir().unwrap();
        let invocation = Invocation::new(
            "mkdir -p target && touch target/app-1.0.war target/app.jar",
            dir.path(),
        )
        .with_env(base_env())
        .with_output("target/*.war");

        let output = ShellInvoker::new()
            .echo_output(false)
            .invoke(&invocation)
            .await
            .unwrap();

        assert_eq!(
            output.produced_files,
            vec![dir.path().join("target/app-1.0.war")]
        );
    }

    #[tokio::test]
    async fn test_shell_invoker_missing_shell() {
        let dir = tempfile::tempdir().unwrap();
        let invocation = Invocation::new("true", dir.path());

        let err = ShellInvoker::new()
            .with_shell("/nonexistent/shell")
            .invoke(&invocation)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Io(_)));
    }
}
