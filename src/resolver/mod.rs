//! Build entry resolution for a layer.
//!
//! Produces the entry mapping handed to the bundler: for every function that
//! is layer-eligible and references the target layer, its explicit entry
//! patterns plus the source file implied by its handler string.
//!
//! Resolution is lenient per function. A handler that does not parse, a
//! directory that cannot be listed, or a handler with no matching file drops
//! that one function (logged at warn level) and leaves the rest of the mapping
//! intact. A function is either resolved completely or not at all.

pub mod handler;
pub mod pattern_expander;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::core::LayerError;
use crate::service::{FunctionDef, ServiceDescriptor};

pub use handler::HandlerPath;

/// Logical entry name → absolute source path.
pub type EntryMap = BTreeMap<String, PathBuf>;

/// Resolve the entry mapping for the functions attached to `layer_id`.
///
/// Later entries with an equal key overwrite earlier ones.
pub async fn resolve_entries(
    descriptor: &ServiceDescriptor,
    project_dir: &Path,
    layer_id: &str,
    backup_extension: &str,
) -> EntryMap {
    let mut entries = EntryMap::new();

    for (name, function) in descriptor.functions_using(layer_id) {
        match resolve_function_entries(name, function, project_dir, backup_extension).await {
            Ok(function_entries) => {
                debug!("Function '{}' contributes {} entries to {}", name, function_entries.len(), layer_id);
                entries.extend(function_entries);
            }
            Err(e) => warn!("Skipping function '{}' for {}: {}", name, layer_id, e),
        }
    }

    entries
}

/// Resolve one function's explicit and handler-implied entries.
///
/// # Errors
///
/// Returns [`LayerError::ResolutionError`] when an entry pattern is invalid,
/// the handler does not parse, its directory cannot be listed, or no file in
/// it matches the handler.
pub async fn resolve_function_entries(
    name: &str,
    function: &FunctionDef,
    project_dir: &Path,
    backup_extension: &str,
) -> Result<EntryMap, LayerError> {
    let resolution_error = |reason: String| LayerError::ResolutionError {
        function: name.to_string(),
        reason,
    };

    let mut entries = EntryMap::new();

    if let Some(spec) = &function.entry {
        let expanded = pattern_expander::expand_entry_patterns(project_dir, &spec.patterns())
            .await
            .map_err(|e| resolution_error(format!("{e:#}")))?;
        entries.extend(expanded);
    }

    let Some(handler) = function.handler.as_deref() else {
        return Ok(entries);
    };

    let handler_path = HandlerPath::parse(handler)
        .ok_or_else(|| resolution_error(format!("handler '{handler}' does not name a source file")))?;

    let dir = project_dir.join(&handler_path.dir);
    let files = list_file_names(&dir)
        .await
        .map_err(|e| resolution_error(format!("cannot read directory {}: {e}", dir.display())))?;

    let file_name = handler_path.select_file(&files, backup_extension).ok_or_else(|| {
        resolution_error(format!(
            "no file in {} matches handler '{}'",
            dir.display(),
            handler_path.entry_key()
        ))
    })?;

    entries.insert(handler_path.entry_key(), dir.join(file_name));
    Ok(entries)
}

async fn list_file_names(dir: &Path) -> std::io::Result<Vec<String>> {
    let mut reader = tokio::fs::read_dir(dir).await?;
    let mut names = Vec::new();
    while let Some(entry) = reader.next_entry().await? {
        if entry.file_type().await?.is_dir() {
            continue;
        }
        names.push(entry.file_name().to_string_lossy().into_owned());
    }
    names.sort();
    Ok(names)
}
