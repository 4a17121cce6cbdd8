//! Expansion of explicitly declared entry patterns.
//!
//! A function's `entry` may list literal files or glob patterns. Patterns are
//! resolved against the project directory unless they are absolute; every
//! match becomes its own build entry keyed by the path as written relative to
//! the project directory.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Expand entry patterns into `(entry key, absolute path)` pairs.
///
/// Matches are returned in pattern order, and in path order within a pattern.
/// A literal path that does not exist produces no entry.
///
/// # Errors
///
/// Returns an error if a pattern is not a valid glob, or if the expansion task
/// fails to complete.
pub async fn expand_entry_patterns(
    project_dir: &Path,
    patterns: &[&str],
) -> Result<Vec<(String, PathBuf)>> {
    let project_dir = project_dir.to_path_buf();
    let patterns: Vec<String> = patterns.iter().map(|p| (*p).to_string()).collect();

    tokio::task::spawn_blocking(move || expand_blocking(&project_dir, &patterns))
        .await
        .context("Entry pattern expansion task failed")?
}

fn expand_blocking(project_dir: &Path, patterns: &[String]) -> Result<Vec<(String, PathBuf)>> {
    let mut entries = Vec::new();

    for pattern in patterns {
        let full_pattern = if Path::new(pattern).is_absolute() {
            PathBuf::from(pattern)
        } else {
            project_dir.join(pattern.trim_start_matches("./"))
        };
        let full_pattern = full_pattern.to_string_lossy().into_owned();

        let paths = glob::glob(&full_pattern)
            .with_context(|| format!("Invalid entry pattern: {pattern}"))?;

        let mut matched = 0usize;
        for path in paths {
            let path = path.with_context(|| format!("Failed to read match of {pattern}"))?;
            if !path.is_file() {
                continue;
            }
            let key = entry_key_for(project_dir, &path);
            debug!("Entry pattern '{}' matched {}", pattern, path.display());
            entries.push((key, path));
            matched += 1;
        }

        if matched == 0 {
            debug!("Entry pattern '{}' matched no files", pattern);
        }
    }

    Ok(entries)
}

/// Key for an explicit entry: its path relative to the project directory with
/// forward slashes, or the absolute path when it lies outside.
fn entry_key_for(project_dir: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(project_dir).unwrap_or(path);
    relative.components().map(|c| c.as_os_str().to_string_lossy()).collect::<Vec<_>>().join("/")
}
