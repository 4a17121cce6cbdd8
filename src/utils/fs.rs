//! File system helpers for layer folders and the compiled template.

use anyhow::{Context, Result};
use std::fs;
use std::io::Write;
use std::path::Path;

/// Create a directory and its parents if missing.
///
/// # Errors
///
/// Returns an error if the path exists but is not a directory, or if it cannot
/// be created.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if path.exists() {
        if !path.is_dir() {
            anyhow::bail!("Path exists but is not a directory: {}", path.display());
        }
        return Ok(());
    }
    fs::create_dir_all(path)
        .with_context(|| format!("Failed to create directory: {}", path.display()))
}

/// Remove everything inside `path`, creating it when absent.
///
/// # Errors
///
/// Returns an error if an entry cannot be removed or the directory cannot be
/// created.
pub fn empty_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        return ensure_dir(path);
    }

    for entry in fs::read_dir(path)
        .with_context(|| format!("Failed to read directory: {}", path.display()))?
    {
        let entry = entry?;
        let entry_path = entry.path();
        if entry.file_type()?.is_dir() {
            fs::remove_dir_all(&entry_path)
                .with_context(|| format!("Failed to remove {}", entry_path.display()))?;
        } else {
            fs::remove_file(&entry_path)
                .with_context(|| format!("Failed to remove {}", entry_path.display()))?;
        }
    }
    Ok(())
}

/// Write a file by writing a sibling temp file and renaming it into place.
///
/// # Errors
///
/// Returns an error if the parent directory cannot be created or the temp
/// file cannot be written, synced or renamed.
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        ensure_dir(parent)?;
    }

    let temp_path = path.with_extension("tmp");
    {
        let mut file = fs::File::create(&temp_path)
            .with_context(|| format!("Failed to create temp file: {}", temp_path.display()))?;
        file.write_all(content)
            .with_context(|| format!("Failed to write to temp file: {}", temp_path.display()))?;
        file.sync_all().context("Failed to sync file to disk")?;
    }

    fs::rename(&temp_path, path)
        .with_context(|| format!("Failed to rename temp file to: {}", path.display()))
}
