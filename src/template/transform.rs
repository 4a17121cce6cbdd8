//! Export attachment and layer reference upgrade.
//!
//! For every declared layer the provider emits an unversioned resource
//! (`FooLambdaLayer`), a versioned one (`FooLambdaLayerVersion3`, the id
//! changes with every deploy) and an output `FooLambdaLayerQualifiedArn` that
//! references the versioned id. Functions, however, still reference the
//! unversioned alias. The transform repoints those references at the
//! versioned id and optionally exports the output under a stable name so
//! other stacks can import the current version.

use serde_json::Value;
use tracing::{debug, info, warn};

use super::{OutputExport, ResourceTemplate, ref_target};
use crate::config::LayerConfig;
use crate::constants::{FUNCTION_RESOURCE_TYPE, QUALIFIED_ARN_OUTPUT_SUFFIX};
use crate::service::layer_resource_id;

/// Switches for the transform, usually taken from [`LayerConfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformOptions {
    /// Attach `Export.Name` to each versioned output.
    pub export_layers: bool,
    /// Prefix of the export name.
    pub export_prefix: String,
    /// Rewrite function layer references.
    pub upgrade_layer_references: bool,
}

impl From<&LayerConfig> for TransformOptions {
    fn from(config: &LayerConfig) -> Self {
        Self {
            export_layers: config.export_layers,
            export_prefix: config.export_prefix.clone(),
            upgrade_layer_references: config.upgrade_layer_references,
        }
    }
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self::from(&LayerConfig::default())
    }
}

/// One rewritten layer reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpgradedReference {
    /// Function resource whose layer list was changed.
    pub function: String,
    /// Previous target.
    pub from: String,
    /// New target.
    pub to: String,
}

/// What the transform changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransformReport {
    /// Output names that received an export.
    pub exported_layers: Vec<String>,
    /// Every reference rewritten.
    pub upgraded_layer_references: Vec<UpgradedReference>,
}

/// Apply the export and upgrade passes for `layer_names`, returning the new
/// template and a report. The input template is left untouched.
///
/// A layer without a `<Id>QualifiedArn` output is skipped. An output whose
/// value is not a `Ref` is logged and gets no upgrade.
#[must_use]
pub fn transform<'a, I>(
    template: &ResourceTemplate,
    layer_names: I,
    options: &TransformOptions,
) -> (ResourceTemplate, TransformReport)
where
    I: IntoIterator<Item = &'a str>,
{
    let mut template = template.clone();
    let mut report = TransformReport::default();

    for layer_name in layer_names {
        let resource_id = layer_resource_id(layer_name);
        let output_name = format!("{resource_id}{QUALIFIED_ARN_OUTPUT_SUFFIX}");

        let Some(output) = template.outputs.get_mut(&output_name) else {
            debug!("No output {} for layer {}, skipping", output_name, layer_name);
            continue;
        };

        if options.export_layers {
            output.export =
                Some(OutputExport::substituted(format!("{}{output_name}", options.export_prefix)));
            report.exported_layers.push(output_name.clone());
        }

        if !options.upgrade_layer_references {
            continue;
        }

        let Some(versioned_id) = output.value_ref().map(str::to_string) else {
            warn!("Output {} has no Value.Ref, layer references left as they are", output_name);
            continue;
        };

        if versioned_id == resource_id {
            continue;
        }

        info!("Replacing references to {} with {}", resource_id, versioned_id);
        upgrade_references(&mut template, &resource_id, &versioned_id, &mut report);
    }

    (template, report)
}

fn upgrade_references(
    template: &mut ResourceTemplate,
    from: &str,
    to: &str,
    report: &mut TransformReport,
) {
    let functions = template
        .resources
        .iter_mut()
        .filter(|(_, resource)| resource.resource_type == FUNCTION_RESOURCE_TYPE);

    for (function_id, resource) in functions {
        let Some(layers) = resource.properties.as_mut().and_then(|p| p.layers.as_mut()) else {
            continue;
        };
        let Some(layers) = layers.as_array_mut() else {
            warn!("{}: Layers is not a list, references left as they are", function_id);
            continue;
        };

        for layer in layers.iter_mut().filter(|layer| ref_target(layer) == Some(from)) {
            debug!("{}: updating reference to layer version {}", function_id, to);
            if let Some(object) = layer.as_object_mut() {
                object.insert("Ref".to_string(), Value::String(to.to_string()));
            }
            report.upgraded_layer_references.push(UpgradedReference {
                function: function_id.clone(),
                from: from.to_string(),
                to: to.to_string(),
            });
        }
    }
}
