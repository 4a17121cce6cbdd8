//! Provisioning and cleanup of a layer's `nodejs` folder.
//!
//! The runtime only loads packages from `<layer>/nodejs/node_modules`, so all
//! installs happen inside that folder. When `manageNodeFolder` is off the
//! folder belongs to the user and a missing folder means the layer is skipped.

use anyhow::{Context, Result};
use glob::Pattern;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::config::Packager;
use crate::constants::{NODE_LAYER_FOLDER, PACKAGE_MANIFEST_FILE};
use crate::core::LayerError;
use crate::utils::{atomic_write, empty_dir};

/// `<project>/<layer path>/nodejs`.
#[must_use]
pub fn node_folder(project_dir: &Path, layer_path: &str) -> PathBuf {
    project_dir.join(layer_path).join(NODE_LAYER_FOLDER)
}

/// Ready the folder for an explicit package list.
///
/// Managed folders are emptied (or created) and seeded with an empty
/// `package.json`. Returns `false` when the folder is unmanaged and missing.
///
/// # Errors
///
/// Returns an error if the folder cannot be emptied or written.
pub fn prepare_for_packages(folder: &Path, manage: bool) -> Result<bool> {
    if !manage {
        return Ok(folder.is_dir());
    }

    empty_dir(folder)?;
    atomic_write(&folder.join(PACKAGE_MANIFEST_FILE), b"{}")?;
    debug!("Reset {}", folder.display());
    Ok(true)
}

/// Ready the folder for a manifest install by copying the project's
/// `package.json` and the packager's lockfile into it.
///
/// Returns `false` when the folder is unmanaged and missing. A missing lockfile
/// is not an error.
///
/// # Errors
///
/// Returns [`LayerError::ManifestNotFound`] when the project has no
/// `package.json`, or an I/O error if copying fails.
pub fn prepare_from_manifest(
    folder: &Path,
    project_dir: &Path,
    packager: Packager,
    manage: bool,
) -> Result<bool> {
    if manage {
        empty_dir(folder)?;
    } else if !folder.is_dir() {
        return Ok(false);
    }

    let manifest = project_dir.join(PACKAGE_MANIFEST_FILE);
    if !manifest.is_file() {
        return Err(LayerError::ManifestNotFound {
            path: manifest.display().to_string(),
        }
        .into());
    }
    copy_into(&manifest, folder)?;

    let lockfile = project_dir.join(packager.lockfile());
    if lockfile.is_file() {
        copy_into(&lockfile, folder)?;
    } else {
        debug!("No {} to copy into {}", packager.lockfile(), folder.display());
    }
    Ok(true)
}

fn copy_into(file: &Path, folder: &Path) -> Result<()> {
    let name = file.file_name().context("file has no name")?;
    let target = folder.join(name);
    fs::copy(file, &target)
        .with_context(|| format!("Failed to copy {} to {}", file.display(), target.display()))?;
    Ok(())
}

/// Delete everything under `folder` matching one of `patterns`.
///
/// Patterns are globs relative to the folder. A pattern starting with `!`
/// protects its matches: they are kept, and so is any matched directory that
/// contains one. Returns the number of removed files and directories.
///
/// # Errors
///
/// Returns an error for an invalid pattern or a failed removal.
pub fn clean_folder(folder: &Path, patterns: &[String]) -> Result<usize> {
    let mut excludes = Vec::new();
    let mut keeps = Vec::new();
    for pattern in patterns {
        match pattern.strip_prefix('!') {
            Some(negated) => {
                let compiled = Pattern::new(negated.trim_start_matches("./"))
                    .with_context(|| format!("Invalid exclude pattern: {pattern}"))?;
                keeps.push(compiled);
            }
            None => excludes.push(pattern.trim_start_matches("./")),
        }
    }

    let mut removed = 0;
    for pattern in excludes {
        let full = folder.join(pattern);
        let matches = glob::glob(&full.to_string_lossy())
            .with_context(|| format!("Invalid exclude pattern: {pattern}"))?;

        for path in matches {
            let path = path.with_context(|| format!("Failed to read match of {pattern}"))?;
            // An earlier match may already have removed a parent directory.
            let Ok(metadata) = fs::symlink_metadata(&path) else {
                continue;
            };
            if is_kept(folder, &path, &keeps) {
                debug!("Keeping {}", path.display());
                continue;
            }
            if metadata.is_dir() {
                if contains_kept(folder, &path, &keeps)? {
                    debug!("Keeping {}, it holds protected files", path.display());
                    continue;
                }
                fs::remove_dir_all(&path)
                    .with_context(|| format!("Failed to remove {}", path.display()))?;
            } else {
                fs::remove_file(&path)
                    .with_context(|| format!("Failed to remove {}", path.display()))?;
            }
            removed += 1;
        }
    }

    Ok(removed)
}

/// `path` relative to `folder`, `/`-separated.
fn relative_path(folder: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(folder).ok()?;
    let parts: Vec<_> = relative.components().map(|c| c.as_os_str().to_string_lossy()).collect();
    Some(parts.join("/"))
}

fn is_kept(folder: &Path, path: &Path, keeps: &[Pattern]) -> bool {
    relative_path(folder, path)
        .is_some_and(|relative| keeps.iter().any(|keep| keep.matches(&relative)))
}

fn contains_kept(folder: &Path, dir: &Path, keeps: &[Pattern]) -> Result<bool> {
    if keeps.is_empty() {
        return Ok(false);
    }
    let descendants = dir.join("**").join("*");
    let matches = glob::glob(&descendants.to_string_lossy())
        .with_context(|| format!("Failed to list {}", dir.display()))?;
    Ok(matches.flatten().any(|path| is_kept(folder, &path, keeps)))
}
