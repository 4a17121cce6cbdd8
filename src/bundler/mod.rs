//! The bundler collaborator.
//!
//! Discovery treats the bundler as a black box: a [`BuildConfig`] goes in, a
//! [`ModuleGraph`] comes out. [`WebpackCli`] is the production implementation;
//! it runs webpack as a child process and reads its `--json` stats.
//!
//! # Passing entries to webpack
//!
//! The entry mapping is handed to the child in the `LAYER_MANAGER_ENTRIES`
//! environment variable as a JSON object. The project's webpack config picks
//! it up when present:
//!
//! ```js
//! const layerEntries = process.env.LAYER_MANAGER_ENTRIES;
//! module.exports = {
//!   entry: layerEntries ? JSON.parse(layerEntries) : './src/index.js',
//!   externals: [nodeExternals()],
//!   // ...
//! };
//! ```
//!
//! When [`BuildConfig::packaging_labels`] is set the child also sees
//! `PACKAGING_LABELS=true`, letting the config tell a layer discovery build
//! apart from a regular packaging build.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, error};

use crate::constants::{ENTRIES_ENV_VAR, PACKAGING_LABELS_ENV_VAR};
use crate::core::LayerError;
use crate::discovery::ModuleGraph;
use crate::resolver::EntryMap;
use crate::utils::ProcessCommand;

/// Input of one build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildConfig {
    /// Bundler configuration file.
    pub config_path: PathBuf,

    /// Directory the bundler runs in.
    pub working_dir: PathBuf,

    /// Entry name → absolute source path, replacing the configured entries.
    pub entries: EntryMap,

    /// Mark the build as a layer discovery build for the child process.
    pub packaging_labels: bool,

    /// Label used in logs and errors, usually the layer resource id.
    pub label: String,
}

impl BuildConfig {
    /// A build of `config_path` with no entries, run in the config's directory.
    #[must_use]
    pub fn new(config_path: PathBuf) -> Self {
        let working_dir = config_path.parent().map(Path::to_path_buf).unwrap_or_default();
        Self {
            config_path,
            working_dir,
            entries: EntryMap::new(),
            packaging_labels: true,
            label: String::new(),
        }
    }

    /// Replace the entries.
    #[must_use]
    pub fn with_entries(mut self, entries: EntryMap) -> Self {
        self.entries = entries;
        self
    }

    /// Set the working directory.
    #[must_use]
    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = dir.into();
        self
    }

    /// Set the label.
    #[must_use]
    pub fn labelled(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Entries as the JSON object handed to the bundler.
    ///
    /// # Errors
    ///
    /// Returns an error if the entries cannot be serialized.
    pub fn entries_json(&self) -> Result<String> {
        serde_json::to_string(&self.entries).context("Failed to serialize build entries")
    }
}

/// Builds a set of entries and reports the compiled module graph.
#[allow(async_fn_in_trait)]
pub trait Bundler {
    /// Run one build.
    ///
    /// # Errors
    ///
    /// Returns [`LayerError::BuildFailed`] when the build cannot run or
    /// reports errors.
    async fn build(&self, config: &BuildConfig) -> Result<ModuleGraph>;
}

/// Runs the webpack CLI and parses its JSON stats.
#[derive(Debug, Clone)]
pub struct WebpackCli {
    command: Vec<String>,
}

impl WebpackCli {
    /// `command` is the program followed by its leading arguments, e.g.
    /// `["npx", "webpack"]`. `--config <path> --json` is appended.
    #[must_use]
    pub const fn new(command: Vec<String>) -> Self {
        Self { command }
    }

    fn process_command(&self, config: &BuildConfig) -> Result<ProcessCommand> {
        let (program, leading_args) = self.command.split_first().ok_or_else(|| {
            LayerError::ConfigError {
                message: "webpack.command must name a program".to_string(),
            }
        })?;

        let mut cmd = ProcessCommand::new(program.as_str())
            .args(leading_args.iter().map(String::as_str))
            .arg("--config")
            .arg(config.config_path.display().to_string())
            .arg("--json")
            .env(ENTRIES_ENV_VAR, config.entries_json()?)
            .with_context(config.label.as_str());
        if !config.working_dir.as_os_str().is_empty() {
            cmd = cmd.current_dir(&config.working_dir);
        }
        if config.packaging_labels {
            cmd = cmd.env(PACKAGING_LABELS_ENV_VAR, "true");
        }
        Ok(cmd)
    }
}

impl Bundler for WebpackCli {
    async fn build(&self, config: &BuildConfig) -> Result<ModuleGraph> {
        let build_failed = |reason: String| LayerError::BuildFailed {
            layer: config.label.clone(),
            reason,
        };

        let cmd = self.process_command(config)?;
        let command_line = cmd.command_line();
        let output = cmd
            .execute()
            .await
            .map_err(|e| build_failed(format!("could not run `{command_line}`: {e:#}")))?;

        let graph = parse_stats(&output.stdout);

        if !output.success {
            let detail = graph
                .as_ref()
                .ok()
                .map(ModuleGraph::error_messages)
                .filter(|messages| !messages.is_empty())
                .map_or_else(|| output.stderr.trim().to_string(), |messages| messages.join("\n"));
            error!("Build for {} failed ({}): {}", config.label, output.status_text(), detail);
            let reason = format!("{command_line} failed with {}: {detail}", output.status_text());
            return Err(build_failed(reason).into());
        }

        let graph = graph.map_err(|e| build_failed(format!("unreadable stats output: {e:#}")))?;
        let messages = graph.error_messages();
        if !messages.is_empty() {
            error!("Build for {} reported {} errors", config.label, messages.len());
            return Err(build_failed(messages.join("\n")).into());
        }

        debug!("Build for {} produced {} modules", config.label, graph.identifiers().count());
        Ok(graph)
    }
}

/// Parse webpack stats from stdout.
///
/// The document starts at the first line beginning with `{`; banner or
/// warning lines before it and any output after it are ignored.
///
/// # Errors
///
/// Returns an error if no JSON object is found or it does not parse.
pub fn parse_stats(stdout: &str) -> Result<ModuleGraph> {
    let mut offset = 0;
    let start = stdout
        .split_inclusive('\n')
        .find_map(|line| {
            let at = offset;
            offset += line.len();
            line.starts_with('{').then_some(at)
        })
        .context("no JSON object in bundler output")?;

    serde_json::Deserializer::from_str(&stdout[start..])
        .into_iter::<ModuleGraph>()
        .next()
        .context("no JSON object in bundler output")?
        .context("Failed to parse bundler stats")
}
