//! Rewrite the compiled template.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::path::{Path, PathBuf};

use super::CliConfig;
use crate::bundler::Bundler;
use crate::constants::DEFAULT_TEMPLATE_PATH;
use crate::installer::PackageInstaller;
use crate::plugin::LayerManager;

/// Export versioned layer outputs and repoint function layer references.
#[derive(Args, Debug)]
pub struct TransformCommand {
    /// Compiled template, relative to the project directory.
    #[arg(long, value_name = "FILE", default_value = DEFAULT_TEMPLATE_PATH)]
    template: PathBuf,

    /// Write the result here instead of overwriting the template.
    #[arg(long, value_name = "FILE")]
    output: Option<PathBuf>,
}

impl TransformCommand {
    /// Execute the transform.
    ///
    /// # Errors
    ///
    /// Returns an error if the template is missing or cannot be read or
    /// written.
    pub fn execute<B: Bundler, P: PackageInstaller>(
        self,
        manager: &LayerManager<B, P>,
        project_dir: &Path,
        config: &CliConfig,
    ) -> Result<()> {
        let template = project_dir.join(&self.template);
        let output = self.output.map(|path| project_dir.join(path));
        let report = manager.before_deploy(&template, output.as_deref())?;

        if !config.quiet {
            for name in &report.exported_layers {
                println!("  {} exported {}", "✓".green(), name);
            }
            for upgrade in &report.upgraded_layer_references {
                println!("  {} {}: {} → {}", "✓".green(), upgrade.function, upgrade.from, upgrade.to);
            }
            println!(
                "\n{}",
                format!(
                    "Exported {} layers, upgraded {} layer references",
                    report.exported_layers.len(),
                    report.upgraded_layer_references.len()
                )
                .green()
                .bold()
            );
        }
        Ok(())
    }
}
