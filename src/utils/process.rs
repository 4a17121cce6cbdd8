//! Builder for the external programs this tool drives.
//!
//! Both collaborators that leave the process (the bundler and the package
//! manager) go through [`ProcessCommand`], so command logging, environment
//! handling and output capture behave the same for each.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, trace};

/// Fluent builder for a child process.
///
/// # Examples
///
/// ```rust,no_run
/// use layer_manager::utils::process::ProcessCommand;
///
/// # async fn example() -> anyhow::Result<()> {
/// let output = ProcessCommand::new("npx")
///     .args(["webpack", "--json"])
///     .current_dir("/path/to/project")
///     .env("PACKAGING_LABELS", "true")
///     .with_context("DepsLambdaLayer")
///     .execute()
///     .await?;
/// assert!(output.success);
/// # Ok(())
/// # }
/// ```
///
/// Output is captured by default. [`inherit_stdio`](Self::inherit_stdio)
/// streams it to the terminal instead, which is what package installs use.
#[derive(Debug, Clone)]
pub struct ProcessCommand {
    program: String,
    args: Vec<String>,
    current_dir: Option<PathBuf>,
    env_vars: Vec<(String, String)>,
    capture_output: bool,
    context: Option<String>,
}

/// Exit status and captured output of a finished process.
#[derive(Debug, Clone, Default)]
pub struct ProcessOutput {
    /// True when the process exited with status zero.
    pub success: bool,
    /// Exit code, `None` when terminated by a signal.
    pub code: Option<i32>,
    /// Captured standard output; empty when stdio was inherited.
    pub stdout: String,
    /// Captured standard error; empty when stdio was inherited.
    pub stderr: String,
}

impl ProcessOutput {
    /// Human-readable exit status for error messages.
    #[must_use]
    pub fn status_text(&self) -> String {
        self.code.map_or_else(|| "terminated by signal".to_string(), |code| format!("exit code {code}"))
    }
}

impl ProcessCommand {
    /// Start building a command for `program`.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
            env_vars: Vec::new(),
            capture_output: true,
            context: None,
        }
    }

    /// Add one argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add several arguments in order.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Working directory of the child.
    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.current_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Set an environment variable for the child only.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_vars.push((key.into(), value.into()));
        self
    }

    /// Let the child write straight to the parent's stdout/stderr.
    pub const fn inherit_stdio(mut self) -> Self {
        self.capture_output = false;
        self
    }

    /// Label included in log lines, typically the layer being processed.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// The command line as it would be typed in a shell.
    #[must_use]
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Run the process to completion.
    ///
    /// A non-zero exit is reported through [`ProcessOutput::success`], not as
    /// an error; callers decide which error kind it maps to.
    ///
    /// # Errors
    ///
    /// Returns an error only if the process could not be spawned or waited on.
    pub async fn execute(self) -> Result<ProcessOutput> {
        let command_line = self.command_line();
        match &self.context {
            Some(ctx) => debug!("({}) Executing command: {}", ctx, command_line),
            None => debug!("Executing command: {}", command_line),
        }

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        if let Some(dir) = &self.current_dir {
            cmd.current_dir(dir);
        }
        for (key, value) in &self.env_vars {
            trace!("Setting env var: {}={}", key, value);
            cmd.env(key, value);
        }

        if self.capture_output {
            cmd.stdout(Stdio::piped());
            cmd.stderr(Stdio::piped());
        } else {
            cmd.stdout(Stdio::inherit());
            cmd.stderr(Stdio::inherit());
        }

        let output =
            cmd.output().await.with_context(|| format!("Failed to execute {command_line}"))?;

        let result = ProcessOutput {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        if result.success {
            trace!("Command completed successfully: {}", command_line);
        } else {
            debug!("Command failed with {}: {}", result.status_text(), command_line);
            if !result.stderr.is_empty() {
                debug!("Error: {}", result.stderr.trim_end());
            }
        }

        Ok(result)
    }
}
