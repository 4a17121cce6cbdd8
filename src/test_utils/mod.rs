//! Test utilities for layer-manager
//!
//! Fakes for the two external collaborators and small project fixtures. The
//! fakes record what they were asked to do so tests can assert on build
//! configurations and package manager command lines without spawning
//! processes.
//!
//! # Example
//!
//! ```rust,no_run
//! use layer_manager::test_utils::{FakeBundler, RecordingInstaller};
//!
//! let bundler = FakeBundler::with_identifiers([r#"external "lodash""#]);
//! let installer = RecordingInstaller::default();
//! // hand both to a LayerInstaller or LayerManager
//! assert!(installer.commands().is_empty());
//! ```

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, Once};
use tracing::Level;
use tracing_subscriber::EnvFilter;

use crate::bundler::{BuildConfig, Bundler};
use crate::core::LayerError;
use crate::discovery::ModuleGraph;
use crate::installer::{InstallCommand, PackageInstaller};

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Uses `level` when given, otherwise `RUST_LOG`; with neither, logging stays
/// off.
///
/// ```bash
/// RUST_LOG=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .try_init();
    });
}

/// Bundler returning a fixed graph and recording every build it was given.
#[derive(Debug, Default)]
pub struct FakeBundler {
    graph: ModuleGraph,
    builds: Mutex<Vec<BuildConfig>>,
    failure: Option<String>,
}

impl FakeBundler {
    /// A bundler whose graph holds the given module identifiers.
    pub fn with_identifiers<I, S>(identifiers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            graph: ModuleGraph::from_identifiers(identifiers),
            ..Self::default()
        }
    }

    /// A bundler whose every build fails with `reason`.
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            failure: Some(reason.into()),
            ..Self::default()
        }
    }

    /// Number of builds run so far.
    pub fn build_count(&self) -> usize {
        self.builds.lock().map(|builds| builds.len()).unwrap_or_default()
    }

    /// The most recent build configuration.
    pub fn last_build(&self) -> Option<BuildConfig> {
        self.builds.lock().ok().and_then(|builds| builds.last().cloned())
    }
}

impl Bundler for FakeBundler {
    async fn build(&self, config: &BuildConfig) -> Result<ModuleGraph> {
        if let Ok(mut builds) = self.builds.lock() {
            builds.push(config.clone());
        }
        if let Some(reason) = &self.failure {
            return Err(LayerError::BuildFailed {
                layer: config.label.clone(),
                reason: reason.clone(),
            }
            .into());
        }
        Ok(self.graph.clone())
    }
}

/// Package installer that records commands instead of running them.
#[derive(Debug, Default)]
pub struct RecordingInstaller {
    commands: Mutex<Vec<InstallCommand>>,
    fail: bool,
    writes: Vec<String>,
}

impl RecordingInstaller {
    /// Make every install fail with [`LayerError::InstallFailed`].
    #[must_use]
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    /// Create `relative` (under the install folder) on every install, standing
    /// in for files the package manager would download.
    #[must_use]
    pub fn writing(mut self, relative: impl Into<String>) -> Self {
        self.writes.push(relative.into());
        self
    }

    /// Commands received so far, in call order.
    pub fn commands(&self) -> Vec<InstallCommand> {
        self.commands.lock().map(|commands| commands.clone()).unwrap_or_default()
    }
}

impl PackageInstaller for RecordingInstaller {
    async fn install(&self, command: &InstallCommand) -> Result<()> {
        if let Ok(mut commands) = self.commands.lock() {
            commands.push(command.clone());
        }
        if self.fail {
            return Err(LayerError::InstallFailed {
                layer: command.layer.clone(),
                command: command.command_line(),
                status: "exit code 1".to_string(),
            }
            .into());
        }
        for relative in &self.writes {
            let path = command.working_dir.join(relative);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, "")?;
        }
        Ok(())
    }
}

/// Write `package.json` with the given content into `project_dir`.
pub fn write_project(project_dir: &Path, package_json: &str) -> PathBuf {
    let path = project_dir.join("package.json");
    std::fs::create_dir_all(project_dir).expect("create project dir");
    std::fs::write(&path, package_json).expect("write package.json");
    path
}

/// A compiled template with one function on `FooLambdaLayer` and the
/// versioned output `FooLambdaLayerQualifiedArn` pointing at `versioned`.
pub fn sample_template(versioned: &str) -> serde_json::Value {
    serde_json::json!({
        "AWSTemplateFormatVersion": "2010-09-09",
        "Resources": {
            "HelloLambdaFunction": {
                "Type": "AWS::Lambda::Function",
                "Properties": {
                    "Handler": "handlers/hello.handler",
                    "Layers": [
                        { "Ref": "FooLambdaLayer" },
                        "arn:aws:lambda:us-east-1:123456789012:layer:shared:3"
                    ]
                }
            },
            "FooLambdaLayer": {
                "Type": "AWS::Lambda::LayerVersion",
                "Properties": { "LayerName": "foo" }
            },
            "ServerlessDeploymentBucket": { "Type": "AWS::S3::Bucket" }
        },
        "Outputs": {
            "FooLambdaLayerQualifiedArn": {
                "Description": "Current Lambda layer version",
                "Value": { "Ref": versioned }
            }
        }
    })
}
