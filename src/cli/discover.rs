//! Print a layer's install list.

use anyhow::Result;
use clap::Args;

use crate::bundler::Bundler;
use crate::installer::PackageInstaller;
use crate::plugin::LayerManager;

/// Show the packages a layer would receive, one specifier per line.
///
/// Runs entry resolution, the bundler and the merge, but never the package
/// manager.
#[derive(Args, Debug)]
pub struct DiscoverCommand {
    /// Layer name as declared under `layers`.
    layer: String,

    /// Print the list as a JSON array.
    #[arg(long)]
    json: bool,
}

impl DiscoverCommand {
    /// Execute discovery for the layer.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown layer, disabled discovery or a failed
    /// build.
    pub async fn execute<B: Bundler, P: PackageInstaller>(
        self,
        manager: &LayerManager<B, P>,
    ) -> Result<()> {
        let specs = manager.discover(&self.layer).await?;
        let rendered: Vec<String> = specs.iter().map(ToString::to_string).collect();

        if self.json {
            println!("{}", serde_json::to_string_pretty(&rendered)?);
        } else {
            for spec in rendered {
                println!("{spec}");
            }
        }
        Ok(())
    }
}
