//! layer-manager CLI entry point
//!
//! Parses the command line, runs the selected hook and renders failures with
//! suggestions:
//! - `install` - Install dependencies into every declared layer
//! - `discover` - Print the install list of one layer
//! - `transform` - Pin layer references in the compiled template

use anyhow::Result;
use clap::Parser;
use layer_manager::cli;
use layer_manager::core::user_friendly_error;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    // Set up colored output for Windows
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    match cli.execute().await {
        Ok(()) => Ok(()),
        Err(e) => {
            let error_ctx = user_friendly_error(e);
            error_ctx.display();
            std::process::exit(1);
        }
    }
}
