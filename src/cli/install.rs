//! Install layer dependencies.

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use super::CliConfig;
use crate::bundler::Bundler;
use crate::installer::{LayerOutcome, PackageInstaller};
use crate::plugin::LayerManager;

/// Run discovery and the package manager for every declared layer.
///
/// Layers are processed concurrently. Every failing layer is reported; the
/// command fails if any layer failed.
#[derive(Args, Debug, Default)]
pub struct InstallCommand {}

impl InstallCommand {
    /// Execute the install pipeline.
    ///
    /// # Errors
    ///
    /// Returns configuration errors or the aggregated layer failures.
    pub async fn execute<B: Bundler, P: PackageInstaller>(
        self,
        manager: &LayerManager<B, P>,
        config: &CliConfig,
    ) -> Result<()> {
        if !manager.config().install_layers {
            if !config.quiet {
                println!("Layer installation disabled (installLayers: false)");
            }
            return Ok(());
        }
        if !config.quiet {
            println!("📦 Installing layer dependencies...");
        }

        let reports = manager.package_initialize().await?;

        if config.quiet {
            return Ok(());
        }
        for report in &reports {
            match &report.outcome {
                LayerOutcome::Installed { packages: Some(count) } => {
                    println!("  {} {} ({} packages)", "✓".green(), report.layer, count);
                }
                LayerOutcome::Installed { packages: None } => {
                    println!("  {} {} (from package.json)", "✓".green(), report.layer);
                }
                LayerOutcome::Skipped { reason } => {
                    println!("  {} {} skipped: {}", "-".yellow(), report.layer, reason);
                }
            }
        }
        let installed = reports.iter().filter(|r| r.is_installed()).count();
        println!("\n{}", format!("Installed {installed} layers").green().bold());
        Ok(())
    }
}
