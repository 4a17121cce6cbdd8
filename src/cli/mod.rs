//! Command-line interface for layer-manager.
//!
//! The binary stands in for the deployment host: each subcommand runs one of
//! the host lifecycle hooks against a service descriptor on disk.
//!
//! # Available Commands
//!
//! - `install` - Discover and install every layer's dependencies
//!   (package-initialize hook)
//! - `discover <layer>` - Print the install list of one layer without
//!   installing anything
//! - `transform` - Export versioned layer outputs and upgrade function layer
//!   references in the compiled template (before-deploy hook)
//!
//! # Typical Workflow
//!
//! ```bash
//! # Before packaging
//! layer-manager install
//!
//! # After the provider has compiled its template
//! layer-manager transform
//!
//! # Inspect what a layer would receive
//! layer-manager --verbose discover deps
//! ```
//!
//! # Global Options
//!
//! - `--verbose` - Enable debug output
//! - `--quiet` - Suppress all output except errors
//! - `--service <FILE>` - Service descriptor (default `serverless.yml`; a
//!   `.json` file is read as JSON, e.g. `serverless print --format json`)
//! - `--project-dir <DIR>` - Project root (default: current directory)
//!
//! `RUST_LOG` takes precedence over `--verbose` and `--quiet` when set.

mod discover;
mod install;
mod transform;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use crate::constants::DEFAULT_SERVICE_FILE;
use crate::plugin::LayerManager;
use crate::service::ServiceDescriptor;

/// Logging and output settings derived from the global flags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliConfig {
    /// Filter directive for the log subscriber.
    pub log_level: String,

    /// Suppress progress and summary output.
    pub quiet: bool,
}

impl CliConfig {
    /// Install the global tracing subscriber.
    ///
    /// Logs go to stderr so that command output on stdout stays parseable.
    pub fn init_logging(&self) {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&self.log_level));

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    }
}

/// Main CLI structure for layer-manager.
#[derive(Parser)]
#[command(
    name = "layer-manager",
    about = "Install serverless layer dependencies and pin layer versions",
    version,
    long_about = "Discovers the external runtime dependencies of bundled function handlers, \
installs them into shared layers, and rewrites the compiled template so functions \
reference versioned layers."
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output for debugging and detailed information.
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Service descriptor to read.
    #[arg(long, global = true, value_name = "FILE", default_value = DEFAULT_SERVICE_FILE)]
    service: PathBuf,

    /// Project root that layer paths, handlers and `package.json` are
    /// resolved against.
    #[arg(long, global = true, value_name = "DIR", env = "LAYER_MANAGER_PROJECT_DIR")]
    project_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Discover and install dependencies into every declared layer.
    Install(install::InstallCommand),

    /// Print the packages one layer would receive.
    Discover(discover::DiscoverCommand),

    /// Export layer outputs and upgrade layer references in the compiled template.
    Transform(transform::TransformCommand),
}

impl Cli {
    /// Execute the parsed command line.
    ///
    /// # Errors
    ///
    /// Returns any error from loading the service or running the command.
    pub async fn execute(self) -> Result<()> {
        let config = self.build_config();
        config.init_logging();
        self.execute_with_config(&config).await
    }

    /// Derive logging settings from the global flags.
    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            "warn"
        };
        CliConfig {
            log_level: log_level.to_string(),
            quiet: self.quiet,
        }
    }

    /// Execute with explicit settings, without touching the global logger.
    ///
    /// # Errors
    ///
    /// Returns any error from loading the service or running the command.
    pub async fn execute_with_config(self, config: &CliConfig) -> Result<()> {
        let project_dir = match self.project_dir {
            Some(dir) => dir,
            None => std::env::current_dir().context("Failed to determine current directory")?,
        };
        let service_path = resolve_service_path(&project_dir, &self.service);
        let descriptor = ServiceDescriptor::load(&service_path)?;
        let manager = LayerManager::with_system_tools(descriptor, &project_dir);

        match self.command {
            Commands::Install(cmd) => cmd.execute(&manager, config).await,
            Commands::Discover(cmd) => cmd.execute(&manager).await,
            Commands::Transform(cmd) => cmd.execute(&manager, &project_dir, config),
        }
    }
}

fn resolve_service_path(project_dir: &Path, service: &Path) -> PathBuf {
    if service.is_absolute() {
        service.to_path_buf()
    } else {
        project_dir.join(service)
    }
}
