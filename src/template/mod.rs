//! The compiled resource template.
//!
//! Only the parts the transform touches are typed: each output's `Value` and
//! `Export`, and each resource's `Type` and `Properties.Layers`. Every other
//! key at every level is kept in an `extra` map and written back unchanged.
//!
//! ```json
//! {
//!   "Resources": {
//!     "HelloLambdaFunction": {
//!       "Type": "AWS::Lambda::Function",
//!       "Properties": { "Layers": [ { "Ref": "FooLambdaLayer" } ] }
//!     }
//!   },
//!   "Outputs": {
//!     "FooLambdaLayerQualifiedArn": { "Value": { "Ref": "FooLambdaLayerVersion3" } }
//!   }
//! }
//! ```

pub mod transform;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;

use crate::core::LayerError;
use crate::utils::atomic_write;

pub use transform::{TransformOptions, TransformReport, UpgradedReference, transform};

/// A compiled deployment template.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceTemplate {
    /// Resources keyed by logical id.
    #[serde(rename = "Resources", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub resources: BTreeMap<String, TemplateResource>,

    /// Outputs keyed by name.
    #[serde(rename = "Outputs", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub outputs: BTreeMap<String, TemplateOutput>,

    /// Every other top-level key.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One resource.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemplateResource {
    /// Resource type such as `AWS::Lambda::Function`.
    #[serde(rename = "Type", default)]
    pub resource_type: String,

    /// Resource properties.
    #[serde(rename = "Properties", default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<ResourceProperties>,

    /// Every other key (`DependsOn`, `Condition`, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The properties of a resource.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceProperties {
    /// Layer references. Normally an array of `{ "Ref": id }` objects, ARN
    /// strings or intrinsics, but the whole list may itself be an intrinsic
    /// such as `Fn::If`.
    #[serde(rename = "Layers", default, skip_serializing_if = "Option::is_none")]
    pub layers: Option<Value>,

    /// Every other property.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One template output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemplateOutput {
    /// Output value, normally `{ "Ref": id }` for layer outputs.
    #[serde(rename = "Value", default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,

    /// Export descriptor.
    #[serde(rename = "Export", default, skip_serializing_if = "Option::is_none")]
    pub export: Option<OutputExport>,

    /// Every other key (`Description`, `Condition`, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The `Export` block of an output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputExport {
    /// Export name, a literal or an intrinsic such as `Fn::Sub`.
    #[serde(rename = "Name")]
    pub name: Value,
}

impl OutputExport {
    /// `{ "Name": { "Fn::Sub": name } }`
    #[must_use]
    pub fn substituted(name: impl Into<String>) -> Self {
        let mut sub = Map::new();
        sub.insert("Fn::Sub".to_string(), Value::String(name.into()));
        Self {
            name: Value::Object(sub),
        }
    }
}

impl TemplateOutput {
    /// The resource id under `Value.Ref`, if the value is a reference.
    #[must_use]
    pub fn value_ref(&self) -> Option<&str> {
        ref_target(self.value.as_ref()?)
    }
}

/// The id of a `{ "Ref": id }` object.
#[must_use]
pub fn ref_target(value: &Value) -> Option<&str> {
    value.as_object()?.get("Ref")?.as_str()
}

impl ResourceTemplate {
    /// Read a template file.
    ///
    /// # Errors
    ///
    /// Returns [`LayerError::TemplateNotFound`] if the file does not exist and
    /// [`LayerError::TemplateShape`] if it is not a template.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(LayerError::TemplateNotFound {
                path: path.display().to_string(),
            }
            .into());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read template {}", path.display()))?;
        serde_json::from_str(&content).map_err(|e| {
            LayerError::TemplateShape {
                location: path.display().to_string(),
                reason: e.to_string(),
            }
            .into()
        })
    }

    /// Write the template pretty-printed, replacing the file atomically.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut content =
            serde_json::to_string_pretty(self).context("Failed to serialize template")?;
        content.push('\n');
        atomic_write(path, content.as_bytes())
    }
}
