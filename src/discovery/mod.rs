//! External dependency discovery.
//!
//! A layer's functions are built once with the bundler; every module the
//! bundler left unresolved is tagged `external` in the compiled graph. The
//! package names behind those identifiers, minus Node.js core modules, are
//! what the layer has to provide at runtime.
//!
//! # Identifier grammar
//!
//! ```text
//! identifier := "external" (" " type)* " " '"' request '"'
//! ```
//!
//! The bundler writes `external "lodash"` for plain externals and inserts the
//! externals type when one is configured (`external commonjs "lodash"`,
//! `external node-commonjs "fs"`). Any other identifier is a bundled module.
//!
//! # Module names
//!
//! The module name is the package part of the request: its first path
//! segment (`lodash/fp` → `lodash`), or the first two when the first is a
//! scope (`@aws-sdk/client-s3/dist` → `@aws-sdk/client-s3`).

pub mod builtins;
pub mod graph;

use anyhow::Result;
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;
use tracing::debug;

use crate::bundler::{BuildConfig, Bundler};

pub use builtins::is_builtin_module;
pub use graph::{Chunk, GraphModule, ModuleGraph};

static EXTERNAL_IDENTIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^external(?: [^\s"]+)* "([^"]*)"$"#).expect("external identifier pattern is a valid regex")
});

/// The request string of an external module identifier, or `None` for a
/// bundled module.
#[must_use]
pub fn external_request(identifier: &str) -> Option<&str> {
    EXTERNAL_IDENTIFIER
        .captures(identifier)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str())
        .filter(|request| !request.is_empty())
}

/// Package name for a request path.
///
/// Returns `None` when the request has no usable package segment, such as
/// `@scope` on its own or an empty first segment.
#[must_use]
pub fn module_name(request: &str) -> Option<String> {
    let mut segments = request.split('/');
    let first = segments.next().filter(|s| !s.is_empty())?;

    if first.starts_with('@') {
        let package = segments.next().filter(|s| !s.is_empty())?;
        return Some(format!("{first}/{package}"));
    }
    Some(first.to_string())
}

/// Names of the external, non-core modules in a graph, sorted and deduplicated.
#[must_use]
pub fn external_module_names(graph: &ModuleGraph) -> BTreeSet<String> {
    graph
        .identifiers()
        .filter_map(external_request)
        .filter(|request| !is_builtin_module(request))
        .filter_map(module_name)
        .filter(|name| !is_builtin_module(name))
        .collect()
}

/// Build `config` with `bundler` and return the external module names the
/// resulting graph references.
///
/// # Errors
///
/// Propagates the bundler's failure, typically a
/// [`crate::core::LayerError::BuildFailed`].
pub async fn discover_external_modules<B: Bundler>(
    bundler: &B,
    config: &BuildConfig,
) -> Result<BTreeSet<String>> {
    debug!("Building {} entries with {}", config.entries.len(), config.config_path.display());
    let graph = bundler.build(config).await?;
    let names = external_module_names(&graph);
    debug!("Discovered {} external modules: {:?}", names.len(), names);
    Ok(names)
}
