//! Host lifecycle hooks.
//!
//! [`LayerManager`] is what a deployment host wires into its lifecycle:
//! [`package_initialize`](LayerManager::package_initialize) before functions
//! are packaged and [`before_deploy`](LayerManager::before_deploy) once the
//! provider has compiled its template.

use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::bundler::{Bundler, WebpackCli};
use crate::config::LayerConfig;
use crate::installer::{LayerInstaller, LayerReport, PackageInstaller, SystemInstaller};
use crate::merge::InstallSpecifier;
use crate::service::ServiceDescriptor;
use crate::template::{ResourceTemplate, TransformOptions, TransformReport, transform};

/// Layer management for one service.
pub struct LayerManager<B, P> {
    descriptor: ServiceDescriptor,
    project_dir: PathBuf,
    bundler: B,
    installer: P,
}

impl LayerManager<WebpackCli, SystemInstaller> {
    /// A manager that runs the configured bundler command and the system
    /// package manager.
    #[must_use]
    pub fn with_system_tools(descriptor: ServiceDescriptor, project_dir: &Path) -> Self {
        let command = descriptor
            .layer_config()
            .webpack
            .map(|webpack| webpack.command)
            .unwrap_or_default();
        Self::new(descriptor, project_dir, WebpackCli::new(command), SystemInstaller)
    }
}

impl<B: Bundler, P: PackageInstaller> LayerManager<B, P> {
    /// Create a manager from its collaborators.
    pub fn new(descriptor: ServiceDescriptor, project_dir: &Path, bundler: B, installer: P) -> Self {
        Self {
            descriptor,
            project_dir: project_dir.to_path_buf(),
            bundler,
            installer,
        }
    }

    /// The bundler used for module discovery.
    #[must_use]
    pub const fn bundler(&self) -> &B {
        &self.bundler
    }

    /// The package installer.
    #[must_use]
    pub const fn installer(&self) -> &P {
        &self.installer
    }

    /// Effective layer configuration.
    #[must_use]
    pub fn config(&self) -> LayerConfig {
        self.descriptor.layer_config()
    }

    fn layer_installer(&self) -> Result<LayerInstaller<'_, B, P>> {
        LayerInstaller::new(&self.descriptor, &self.project_dir, &self.bundler, &self.installer)
    }

    /// Install dependencies into every layer.
    ///
    /// # Errors
    ///
    /// Returns configuration errors, or the aggregated failures of the layers.
    pub async fn package_initialize(&self) -> Result<Vec<LayerReport>> {
        let reports = self.layer_installer()?.install_all().await?;
        let installed = reports.iter().filter(|report| report.is_installed()).count();
        info!("Installed {} layers", installed);
        Ok(reports)
    }

    /// The install list one layer would receive.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an unknown layer or when module
    /// discovery is disabled, and build or manifest errors otherwise.
    pub async fn discover(&self, layer_name: &str) -> Result<Vec<InstallSpecifier>> {
        if !self.descriptor.layers.contains_key(layer_name) {
            return Err(crate::core::LayerError::ConfigError {
                message: format!("layer '{layer_name}' is not declared in the service"),
            }
            .into());
        }
        self.layer_installer()?.install_list(layer_name).await
    }

    /// Rewrite a compiled template in memory.
    #[must_use]
    pub fn transform_template(&self, template: &ResourceTemplate) -> (ResourceTemplate, TransformReport) {
        let options = TransformOptions::from(&self.config());
        transform(template, self.descriptor.layers.keys().map(String::as_str), &options)
    }

    /// Load the template at `template_path`, transform it and write the
    /// result to `output` (the same file when `None`).
    ///
    /// # Errors
    ///
    /// Returns [`crate::core::LayerError::TemplateNotFound`] when the template
    /// is missing, or a read/parse/write error.
    pub fn before_deploy(&self, template_path: &Path, output: Option<&Path>) -> Result<TransformReport> {
        let template = ResourceTemplate::load(template_path)?;
        let (transformed, report) = self.transform_template(&template);
        transformed.save(output.unwrap_or(template_path))?;
        info!(
            "Exported {} layers, upgraded {} layer references",
            report.exported_layers.len(),
            report.upgraded_layer_references.len()
        );
        Ok(report)
    }
}
