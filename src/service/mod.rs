//! Service descriptor: the functions and layers of one deployment unit.
//!
//! The descriptor is the resolved service definition owned by the host. It is
//! read once per run and never mutated. Both YAML (`serverless.yml`) and JSON
//! (for example the output of `serverless print --format json`) are accepted;
//! the format is chosen from the file extension.
//!
//! Only the parts this tool consumes are modelled:
//!
//! ```yaml
//! functions:
//!   hello:
//!     handler: src/handlers/hello.handler
//!     layers:
//!       - Ref: DepsLambdaLayer
//!     forceInclude: [pg]
//! layers:
//!   deps:
//!     path: layers/deps
//! custom:
//!   layerConfig:
//!     packager: npm
//! package:
//!   exclude: ['**/*.md']
//! ```
//!
//! Layer references must use the `{ Ref: <id> }` mapping form to take part in
//! discovery; plain strings are treated as literal layer ARNs.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::config::LayerConfig;
use crate::constants::LAYER_RESOURCE_SUFFIX;
use crate::core::LayerError;

/// The declared set of functions and layers for a deployment unit.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceDescriptor {
    /// Service name, informational only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,

    /// Functions keyed by their logical name.
    #[serde(default)]
    pub functions: BTreeMap<String, FunctionDef>,

    /// Layers keyed by their logical name.
    #[serde(default)]
    pub layers: BTreeMap<String, LayerDef>,

    /// Plugin-specific settings.
    #[serde(default)]
    pub custom: CustomSection,

    /// Packaging rules; `exclude` drives layer cleanup.
    #[serde(default)]
    pub package: PackageSection,
}

/// The `custom` block of the descriptor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CustomSection {
    /// `custom.layerConfig`; absent means every option takes its default.
    #[serde(rename = "layerConfig", default, skip_serializing_if = "Option::is_none")]
    pub layer_config: Option<LayerConfig>,
}

/// The `package` block of the descriptor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PackageSection {
    /// Glob rules removed from installed layer folders when `clean` is on.
    #[serde(default)]
    pub exclude: Vec<String>,
}

/// A function declaration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionDef {
    /// Handler string such as `src/handlers/hello.handler`. Image-based
    /// functions have none and never contribute entries.
    #[serde(default)]
    pub handler: Option<String>,

    /// Ordered layer references.
    #[serde(default)]
    pub layers: Vec<LayerReference>,

    /// Explicit entry files or glob patterns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry: Option<EntrySpec>,

    /// Module names always installed into the layers this function uses.
    #[serde(default)]
    pub force_include: Vec<String>,

    /// Module names never installed into the layers this function uses.
    #[serde(default)]
    pub force_exclude: Vec<String>,

    /// `false` removes the function from layer discovery.
    #[serde(default = "default_should_layer")]
    pub should_layer: bool,
}

const fn default_should_layer() -> bool {
    true
}

/// One entry of a function's `layers` list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LayerReference {
    /// `{ Ref: DepsLambdaLayer }`
    Logical {
        /// Referenced resource id.
        #[serde(rename = "Ref")]
        reference: String,
    },
    /// A literal layer ARN or resource id string.
    Literal(String),
    /// Any other intrinsic (`Fn::ImportValue`, ...), kept opaque.
    Other(serde_json::Value),
}

impl LayerReference {
    /// True when this is a logical reference to exactly `resource_id`.
    #[must_use]
    pub fn references(&self, resource_id: &str) -> bool {
        matches!(self, Self::Logical { reference } if reference == resource_id)
    }
}

/// Explicit entry declaration: one pattern or a list of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntrySpec {
    /// A single path or glob pattern.
    Single(String),
    /// Several paths or glob patterns.
    Multiple(Vec<String>),
}

impl EntrySpec {
    /// The declared patterns in order.
    #[must_use]
    pub fn patterns(&self) -> Vec<&str> {
        match self {
            Self::Single(pattern) => vec![pattern.as_str()],
            Self::Multiple(patterns) => patterns.iter().map(String::as_str).collect(),
        }
    }
}

/// A layer declaration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LayerDef {
    /// Layer folder relative to the project directory.
    #[serde(default)]
    pub path: Option<String>,

    /// Display name, informational only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl LayerDef {
    /// The layer folder.
    ///
    /// # Errors
    ///
    /// Returns [`LayerError::ConfigError`] when the layer has no `path`.
    pub fn require_path(&self, layer_name: &str) -> Result<&str, LayerError> {
        self.path.as_deref().filter(|p| !p.trim().is_empty()).ok_or_else(|| {
            LayerError::ConfigError {
                message: format!("layer '{layer_name}' has no path"),
            }
        })
    }
}

impl FunctionDef {
    /// Whether this function takes part in discovery for `resource_id`.
    #[must_use]
    pub fn uses_layer(&self, resource_id: &str) -> bool {
        self.should_layer && self.layers.iter().any(|layer| layer.references(resource_id))
    }
}

impl ServiceDescriptor {
    /// Load a descriptor, choosing JSON for `.json` files and YAML otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`LayerError::DescriptorNotFound`] if the file does not exist
    /// and [`LayerError::DescriptorParseError`] if it does not parse.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(LayerError::DescriptorNotFound {
                path: path.display().to_string(),
            }
            .into());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read service descriptor {}", path.display()))?;

        let is_json = path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let parsed: Result<Self, String> = if is_json {
            serde_json::from_str(&content).map_err(|e| e.to_string())
        } else {
            serde_yaml::from_str(&content).map_err(|e| e.to_string())
        };
        parsed.map_err(|reason| {
            LayerError::DescriptorParseError {
                file: path.display().to_string(),
                reason,
            }
            .into()
        })
    }

    /// The effective layer configuration, defaults applied.
    #[must_use]
    pub fn layer_config(&self) -> LayerConfig {
        self.custom.layer_config.clone().unwrap_or_default()
    }

    /// The declared layer configuration, required by the install pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`LayerError::ConfigError`] when `custom.layerConfig` is absent.
    pub fn require_layer_config(&self) -> Result<&LayerConfig, LayerError> {
        self.custom.layer_config.as_ref().ok_or_else(|| LayerError::ConfigError {
            message: "no custom layer configuration (custom.layerConfig) in the service".to_string(),
        })
    }

    /// Functions that take part in discovery for `resource_id`, in name order.
    pub fn functions_using<'a>(
        &'a self,
        resource_id: &'a str,
    ) -> impl Iterator<Item = (&'a String, &'a FunctionDef)> + 'a {
        self.functions.iter().filter(move |(_, function)| function.uses_layer(resource_id))
    }
}

/// Normalize a layer name the way the provider does for logical ids.
///
/// `-` becomes `Dash`, `_` becomes `Underscore`, and the first character is
/// upper-cased: `deps` → `Deps`, `my-deps` → `MyDashdeps`.
#[must_use]
pub fn normalize_layer_name(name: &str) -> String {
    let replaced = name.replace('-', "Dash").replace('_', "Underscore");
    let mut chars = replaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Unversioned resource id of a layer: `<Normalized>LambdaLayer`.
#[must_use]
pub fn layer_resource_id(name: &str) -> String {
    format!("{}{LAYER_RESOURCE_SUFFIX}", normalize_layer_name(name))
}
