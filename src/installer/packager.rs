//! Package manager invocation.
//!
//! The install step is described by an [`InstallCommand`] and carried out by a
//! [`PackageInstaller`]. [`SystemInstaller`] runs the real package manager with
//! its output streamed to the terminal; tests substitute a recording fake.

use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::{error, info};

use crate::config::Packager;
use crate::core::LayerError;
use crate::merge::InstallSpecifier;
use crate::utils::ProcessCommand;

/// One package manager run inside a layer folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallCommand {
    /// Layer the install belongs to.
    pub layer: String,
    /// Package manager to run.
    pub packager: Packager,
    /// Arguments after the program name.
    pub args: Vec<String>,
    /// The layer's `nodejs` folder.
    pub working_dir: PathBuf,
}

impl InstallCommand {
    /// Install an explicit package list: `npm install <specs>` or
    /// `yarn add <specs>`.
    #[must_use]
    pub fn add_packages(
        layer: &str,
        packager: Packager,
        working_dir: &Path,
        specs: &[InstallSpecifier],
    ) -> Self {
        let subcommand = match packager {
            Packager::Npm => "install",
            Packager::Yarn => "add",
        };
        let args = std::iter::once(subcommand.to_string())
            .chain(specs.iter().map(ToString::to_string))
            .collect();
        Self {
            layer: layer.to_string(),
            packager,
            args,
            working_dir: working_dir.to_path_buf(),
        }
    }

    /// Install whatever the copied manifest declares: `npm install` or
    /// `yarn install`.
    #[must_use]
    pub fn from_manifest(layer: &str, packager: Packager, working_dir: &Path) -> Self {
        Self {
            layer: layer.to_string(),
            packager,
            args: vec!["install".to_string()],
            working_dir: working_dir.to_path_buf(),
        }
    }

    /// The command line as typed in a shell.
    #[must_use]
    pub fn command_line(&self) -> String {
        std::iter::once(self.packager.program())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Runs package manager commands.
#[allow(async_fn_in_trait)]
pub trait PackageInstaller {
    /// Execute `command` to completion.
    ///
    /// # Errors
    ///
    /// Returns [`LayerError::PackagerNotFound`] when the package manager is not
    /// installed and [`LayerError::InstallFailed`] when it exits unsuccessfully.
    async fn install(&self, command: &InstallCommand) -> Result<()>;
}

/// Spawns the package manager found on `PATH`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemInstaller;

impl PackageInstaller for SystemInstaller {
    async fn install(&self, command: &InstallCommand) -> Result<()> {
        let program = which::which(command.packager.program()).map_err(|_| {
            LayerError::PackagerNotFound {
                packager: command.packager.program().to_string(),
            }
        })?;

        let command_line = command.command_line();
        info!("Installing layer {}: {}", command.layer, command_line);

        let output = ProcessCommand::new(program.to_string_lossy())
            .args(command.args.iter().map(String::as_str))
            .current_dir(&command.working_dir)
            .inherit_stdio()
            .with_context(command.layer.as_str())
            .execute()
            .await?;

        if !output.success {
            error!(
                "{} failed in {} with {}",
                command_line,
                command.working_dir.display(),
                output.status_text()
            );
            return Err(LayerError::InstallFailed {
                layer: command.layer.clone(),
                command: command_line,
                status: output.status_text(),
            }
            .into());
        }
        Ok(())
    }
}
