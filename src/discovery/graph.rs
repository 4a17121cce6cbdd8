//! Compiled module graph as reported by the bundler.
//!
//! Mirrors the subset of webpack's `--json` stats output that discovery reads:
//!
//! ```json
//! { "chunks": [ { "modules": [ { "identifier": "external \"lodash\"" } ] } ] }
//! ```
//!
//! Both `chunks` and `modules` may be absent; such a graph simply has no
//! modules.

use serde::{Deserialize, Serialize};

/// The result of one build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleGraph {
    /// Output chunks, if the bundler reported any.
    #[serde(default)]
    pub chunks: Option<Vec<Chunk>>,

    /// Build errors reported in the stats.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<serde_json::Value>,
}

/// One output chunk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Modules bundled into (or referenced by) the chunk.
    #[serde(default)]
    pub modules: Option<Vec<GraphModule>>,
}

/// One module of the graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphModule {
    /// Bundler identifier, e.g. `./src/app.js` or `external "lodash"`.
    #[serde(default)]
    pub identifier: String,
}

impl ModuleGraph {
    /// Build a graph with a single chunk holding the given identifiers.
    #[must_use]
    pub fn from_identifiers<I, S>(identifiers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let modules = identifiers
            .into_iter()
            .map(|identifier| GraphModule {
                identifier: identifier.into(),
            })
            .collect();
        Self {
            chunks: Some(vec![Chunk {
                modules: Some(modules),
            }]),
            errors: Vec::new(),
        }
    }

    /// Every module identifier in chunk order.
    pub fn identifiers(&self) -> impl Iterator<Item = &str> {
        self.chunks
            .iter()
            .flatten()
            .filter_map(|chunk| chunk.modules.as_ref())
            .flatten()
            .map(|module| module.identifier.as_str())
    }

    /// Messages of the errors reported by the build.
    #[must_use]
    pub fn error_messages(&self) -> Vec<String> {
        self.errors
            .iter()
            .map(|error| match error {
                serde_json::Value::String(message) => message.clone(),
                serde_json::Value::Object(map) => map
                    .get("message")
                    .and_then(serde_json::Value::as_str)
                    .map_or_else(|| error.to_string(), str::to_string),
                other => other.to_string(),
            })
            .collect()
    }
}
