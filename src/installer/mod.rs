//! Per-layer install pipeline.
//!
//! For every declared layer the pipeline runs, strictly in order:
//!
//! 1. **Folder provisioning**: locate `<layer>/nodejs`, resetting it when
//!    `manageNodeFolder` is on. Unmanaged missing folders skip the layer.
//! 2. **Install list**: resolve the entries of the functions on the layer,
//!    build them, and merge the external modules with the force overrides
//!    ([`LayerInstaller::install_list`]).
//! 3. **Install**: run the package manager in the folder. An empty install
//!    list skips the package manager.
//!
//! With `webpack: false` steps 2 and 3 are replaced by copying the project's
//! `package.json` and lockfile into the folder and installing from them.
//!
//! Layers run concurrently and every failure is collected; one failing layer
//! never hides another. Once all layers have finished, `package.exclude` rules
//! are applied to the folders that were actually installed.

pub mod node_folder;
pub mod packager;

use anyhow::{Context, Result};
use futures::future::join_all;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::bundler::{BuildConfig, Bundler};
use crate::config::LayerConfig;
use crate::core::LayerError;
use crate::discovery::discover_external_modules;
use crate::manifest::PackageManifest;
use crate::merge::{ForceOverrides, InstallSpecifier, merge_modules};
use crate::resolver::resolve_entries;
use crate::service::{LayerDef, ServiceDescriptor, layer_resource_id};

pub use node_folder::node_folder;
pub use packager::{InstallCommand, PackageInstaller, SystemInstaller};

/// What happened to one layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayerOutcome {
    /// The package manager ran; `packages` is the install list length, or
    /// `None` for a manifest install.
    Installed {
        /// Number of packages passed to the package manager.
        packages: Option<usize>,
    },
    /// Nothing was installed.
    Skipped {
        /// Why the layer was skipped.
        reason: String,
    },
}

/// Result of one layer's pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerReport {
    /// Layer name as declared.
    pub layer: String,
    /// Unversioned resource id.
    pub resource_id: String,
    /// The layer's `nodejs` folder.
    pub folder: PathBuf,
    /// Outcome.
    pub outcome: LayerOutcome,
}

impl LayerReport {
    /// True when the package manager ran for this layer.
    #[must_use]
    pub const fn is_installed(&self) -> bool {
        matches!(self.outcome, LayerOutcome::Installed { .. })
    }
}

/// Runs the install pipeline against one service.
pub struct LayerInstaller<'a, B, P> {
    descriptor: &'a ServiceDescriptor,
    config: LayerConfig,
    project_dir: PathBuf,
    bundler: &'a B,
    installer: &'a P,
}

impl<'a, B: Bundler, P: PackageInstaller> LayerInstaller<'a, B, P> {
    /// Create an installer for `descriptor` rooted at `project_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`LayerError::ConfigError`] if the service has no
    /// `custom.layerConfig` or the configuration is invalid.
    pub fn new(
        descriptor: &'a ServiceDescriptor,
        project_dir: &Path,
        bundler: &'a B,
        installer: &'a P,
    ) -> Result<Self> {
        let config = descriptor.require_layer_config()?.clone();
        config.validate()?;
        Ok(Self {
            descriptor,
            config,
            project_dir: project_dir.to_path_buf(),
            bundler,
            installer,
        })
    }

    /// The effective configuration.
    #[must_use]
    pub const fn config(&self) -> &LayerConfig {
        &self.config
    }

    /// Compute the install list for one layer without touching its folder.
    ///
    /// # Errors
    ///
    /// Returns [`LayerError::ConfigError`] when module discovery is disabled,
    /// a build error from the bundler, or a manifest error.
    pub async fn install_list(&self, layer_name: &str) -> Result<Vec<InstallSpecifier>> {
        let webpack = self.config.webpack.as_ref().ok_or_else(|| LayerError::ConfigError {
            message: "module discovery is disabled (webpack: false)".to_string(),
        })?;
        let resource_id = layer_resource_id(layer_name);

        let discovered = if webpack.discover_modules {
            let entries = resolve_entries(
                self.descriptor,
                &self.project_dir,
                &resource_id,
                webpack.backup_extension(),
            )
            .await;

            if entries.is_empty() {
                info!("No functions resolve to entries for {}, nothing to build", resource_id);
                BTreeSet::new()
            } else {
                let build = BuildConfig::new(self.project_dir.join(&webpack.config_path))
                    .in_dir(&self.project_dir)
                    .with_entries(entries)
                    .labelled(&resource_id);
                discover_external_modules(self.bundler, &build).await?
            }
        } else {
            debug!("Module discovery disabled for {}, using forceInclude only", resource_id);
            BTreeSet::new()
        };

        let manifest = PackageManifest::load(&self.project_dir)?;
        let overrides = ForceOverrides::collect(Some(webpack), self.descriptor, &resource_id);
        Ok(merge_modules(&discovered, &overrides, &manifest))
    }

    /// Run the pipeline for one layer.
    ///
    /// # Errors
    ///
    /// Returns an error if the layer has no path, its folder cannot be
    /// prepared, discovery fails, or the package manager fails.
    pub async fn install_layer(&self, name: &str, layer: &LayerDef) -> Result<LayerReport> {
        let resource_id = layer_resource_id(name);
        let folder = node_folder(&self.project_dir, layer.require_path(name)?);
        let report = |outcome| LayerReport {
            layer: name.to_string(),
            resource_id: resource_id.clone(),
            folder: folder.clone(),
            outcome,
        };

        let manage = self.config.manage_node_folder;
        let packager = self.config.packager;

        if self.config.webpack.is_none() {
            if !node_folder::prepare_from_manifest(&folder, &self.project_dir, packager, manage)? {
                return Ok(report(missing_folder(&folder)));
            }
            let command = InstallCommand::from_manifest(name, packager, &folder);
            self.installer.install(&command).await?;
            return Ok(report(LayerOutcome::Installed { packages: None }));
        }

        if !node_folder::prepare_for_packages(&folder, manage)? {
            return Ok(report(missing_folder(&folder)));
        }

        let specs = self.install_list(name).await?;
        if specs.is_empty() {
            info!("No external modules for layer {}, skipping {}", name, packager);
            return Ok(report(LayerOutcome::Skipped {
                reason: "no modules to install".to_string(),
            }));
        }

        info!("Layer {} needs {} packages", name, specs.len());
        let command = InstallCommand::add_packages(name, packager, &folder, &specs);
        self.installer.install(&command).await?;
        Ok(report(LayerOutcome::Installed {
            packages: Some(specs.len()),
        }))
    }

    /// Run every layer's pipeline concurrently, then clean installed folders.
    ///
    /// Returns one report per layer in name order. Skipped entirely when
    /// `installLayers` is false.
    ///
    /// # Errors
    ///
    /// Returns the failure of a single failing layer unchanged, or one error
    /// listing every failing layer.
    pub async fn install_all(&self) -> Result<Vec<LayerReport>> {
        if !self.config.install_layers {
            info!("installLayers is false, skipping layer installation");
            return Ok(Vec::new());
        }

        let futures = self
            .descriptor
            .layers
            .iter()
            .map(|(name, layer)| async move { (name, self.install_layer(name, layer).await) });
        let results = join_all(futures).await;

        let mut reports = Vec::new();
        let mut failures = Vec::new();
        for (name, result) in results {
            match result {
                Ok(report) => reports.push(report),
                Err(e) => failures.push((name.clone(), e)),
            }
        }

        failures.extend(self.clean_installed(&reports));
        failures.sort_by(|(a, _), (b, _)| a.cmp(b));

        aggregate_failures(failures)?;
        Ok(reports)
    }

    /// Prune every installed layer, returning the layers whose cleanup failed.
    fn clean_installed(&self, reports: &[LayerReport]) -> Vec<(String, anyhow::Error)> {
        let patterns = &self.descriptor.package.exclude;
        if !self.config.clean || patterns.is_empty() {
            return Vec::new();
        }

        let mut failures = Vec::new();
        for report in reports.iter().filter(|r| r.is_installed()) {
            match node_folder::clean_folder(&report.folder, patterns)
                .with_context(|| format!("Failed to clean layer {}", report.layer))
            {
                Ok(removed) => {
                    debug!("Removed {} excluded paths from {}", removed, report.folder.display());
                }
                Err(e) => failures.push((report.layer.clone(), e)),
            }
        }
        failures
    }
}

fn missing_folder(folder: &Path) -> LayerOutcome {
    warn!("{} does not exist and manageNodeFolder is off, skipping layer", folder.display());
    LayerOutcome::Skipped {
        reason: format!("{} does not exist", folder.display()),
    }
}

fn aggregate_failures(mut failures: Vec<(String, anyhow::Error)>) -> Result<()> {
    match failures.len() {
        0 => Ok(()),
        1 => {
            let (name, error) = failures.remove(0);
            Err(error.context(format!("Layer '{name}' failed")))
        }
        count => {
            let details = failures
                .iter()
                .map(|(name, error)| format!("  {name}: {error:#}"))
                .collect::<Vec<_>>()
                .join("\n");
            Err(LayerError::Other {
                message: format!("{count} layers failed:\n{details}"),
            }
            .into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{FakeBundler, RecordingInstaller, write_project};
    use std::fs;
    use tempfile::TempDir;

    const SERVICE: &str = r"
functions:
  hello:
    handler: handlers/hello.handler
    layers:
      - Ref: DepsLambdaLayer
    forceInclude: [pg]
layers:
  deps:
    path: layers/deps
custom:
  layerConfig:
    manageNodeFolder: true
    webpack:
      forceExclude: [aws-sdk]
package:
  exclude:
    - '**/*.md'
";

    fn descriptor(yaml: &str) -> ServiceDescriptor {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[tokio::test]
    async fn test_install_list_merges_discovery_and_overrides() {
        let temp = TempDir::new().unwrap();
        write_project(temp.path(), r#"{"dependencies":{"lodash":"^4.17.21","pg":"^8.0.0"}}"#);
        fs::create_dir_all(temp.path().join("handlers")).unwrap();
        fs::write(temp.path().join("handlers/hello.js"), "").unwrap();

        let descriptor = descriptor(SERVICE);
        let bundler = FakeBundler::with_identifiers([
            r#"external "lodash""#,
            r#"external "aws-sdk""#,
            r#"external "fs""#,
        ]);
        let installer = RecordingInstaller::default();
        let layers = LayerInstaller::new(&descriptor, temp.path(), &bundler, &installer).unwrap();

        let specs = layers.install_list("deps").await.unwrap();
        let rendered: Vec<String> = specs.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, vec!["lodash@^4.17.21", "pg@^8.0.0"]);

        let build = bundler.last_build().unwrap();
        assert_eq!(build.label, "DepsLambdaLayer");
        assert!(build.packaging_labels);
        assert_eq!(build.entries["handlers/hello"], temp.path().join("handlers/hello.js"));
        assert_eq!(build.config_path, temp.path().join("./webpack.config.js"));
    }

    #[tokio::test]
    async fn test_install_all_runs_packager_and_cleans() {
        let temp = TempDir::new().unwrap();
        write_project(temp.path(), r#"{"dependencies":{"lodash":"^4.17.21"}}"#);
        fs::create_dir_all(temp.path().join("handlers")).unwrap();
        fs::write(temp.path().join("handlers/hello.js"), "").unwrap();

        let descriptor = descriptor(SERVICE);
        let bundler = FakeBundler::with_identifiers([r#"external "lodash""#]);
        let installer = RecordingInstaller::default().writing("node_modules/lodash/README.md");
        let layers = LayerInstaller::new(&descriptor, temp.path(), &bundler, &installer).unwrap();

        let reports = layers.install_all().await.unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].outcome, LayerOutcome::Installed { packages: Some(2) });

        let commands = installer.commands();
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].command_line(), "npm install lodash@^4.17.21 pg");
        assert_eq!(commands[0].working_dir, temp.path().join("layers/deps/nodejs"));

        let folder = temp.path().join("layers/deps/nodejs");
        assert_eq!(fs::read_to_string(folder.join("package.json")).unwrap(), "{}");
        assert!(!folder.join("node_modules/lodash/README.md").exists());
    }

    #[tokio::test]
    async fn test_unmanaged_missing_folder_is_skipped_and_not_cleaned() {
        let temp = TempDir::new().unwrap();
        write_project(temp.path(), "{}");
        let yaml = SERVICE.replace("manageNodeFolder: true", "manageNodeFolder: false");
        let descriptor = descriptor(&yaml);
        let bundler = FakeBundler::default();
        let installer = RecordingInstaller::default();
        let layers = LayerInstaller::new(&descriptor, temp.path(), &bundler, &installer).unwrap();

        let reports = layers.install_all().await.unwrap();
        assert!(matches!(reports[0].outcome, LayerOutcome::Skipped { .. }));
        assert!(installer.commands().is_empty());
        assert_eq!(bundler.build_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_install_list_skips_packager() {
        let temp = TempDir::new().unwrap();
        write_project(temp.path(), "{}");
        let yaml = "layers:\n  deps:\n    path: deps\ncustom:\n  layerConfig:\n    manageNodeFolder: true\n";
        let descriptor = descriptor(yaml);
        let bundler = FakeBundler::default();
        let installer = RecordingInstaller::default();
        let layers = LayerInstaller::new(&descriptor, temp.path(), &bundler, &installer).unwrap();

        let reports = layers.install_all().await.unwrap();
        assert_eq!(
            reports[0].outcome,
            LayerOutcome::Skipped {
                reason: "no modules to install".to_string()
            }
        );
        assert!(installer.commands().is_empty());
        assert_eq!(bundler.build_count(), 0);
    }

    #[tokio::test]
    async fn test_manifest_copy_mode() {
        let temp = TempDir::new().unwrap();
        write_project(temp.path(), r#"{"dependencies":{"pg":"^8.0.0"}}"#);
        fs::write(temp.path().join("package-lock.json"), "{}").unwrap();
        let yaml = "layers:\n  deps:\n    path: deps\ncustom:\n  layerConfig:\n    manageNodeFolder: true\n    webpack: false\n";
        let descriptor = descriptor(yaml);
        let bundler = FakeBundler::default();
        let installer = RecordingInstaller::default();
        let layers = LayerInstaller::new(&descriptor, temp.path(), &bundler, &installer).unwrap();

        let reports = layers.install_all().await.unwrap();
        assert_eq!(reports[0].outcome, LayerOutcome::Installed { packages: None });
        assert_eq!(installer.commands()[0].command_line(), "npm install");
        assert!(temp.path().join("deps/nodejs/package-lock.json").exists());
        assert_eq!(bundler.build_count(), 0);

        let err = layers.install_list("deps").await.unwrap_err();
        assert!(matches!(err.downcast_ref::<LayerError>(), Some(LayerError::ConfigError { .. })));
    }

    #[tokio::test]
    async fn test_install_layers_false_does_nothing() {
        let temp = TempDir::new().unwrap();
        let yaml = SERVICE.replace("manageNodeFolder: true", "installLayers: false");
        let descriptor = descriptor(&yaml);
        let bundler = FakeBundler::default();
        let installer = RecordingInstaller::default();
        let layers = LayerInstaller::new(&descriptor, temp.path(), &bundler, &installer).unwrap();

        assert!(layers.install_all().await.unwrap().is_empty());
        assert!(installer.commands().is_empty());
    }

    #[tokio::test]
    async fn test_cleanup_failure_does_not_hide_layer_failures() {
        let temp = TempDir::new().unwrap();
        write_project(temp.path(), "{}");
        let yaml = "layers:\n  broken:\n    name: broken\n  good:\n    path: good\npackage:\n  exclude: ['[']\ncustom:\n  layerConfig:\n    manageNodeFolder: true\n    webpack:\n      forceInclude: [pg]\n";
        let descriptor = descriptor(yaml);
        let bundler = FakeBundler::default();
        let installer = RecordingInstaller::default();
        let layers = LayerInstaller::new(&descriptor, temp.path(), &bundler, &installer).unwrap();

        let err = layers.install_all().await.unwrap_err();
        let message = err.to_string();
        assert!(message.contains("2 layers failed"), "unexpected error: {message}");
        assert!(message.contains("broken:"));
        assert!(message.contains("good: Failed to clean layer good"));
        assert_eq!(installer.commands().len(), 1);
    }

    #[test]
    fn test_missing_layer_config_is_config_error() {
        let descriptor = descriptor("layers:\n  deps:\n    path: deps\n");
        let bundler = FakeBundler::default();
        let installer = RecordingInstaller::default();

        let result = LayerInstaller::new(&descriptor, Path::new("."), &bundler, &installer);
        let Err(err) = result else {
            panic!("expected a configuration error");
        };
        assert!(matches!(err.downcast_ref::<LayerError>(), Some(LayerError::ConfigError { .. })));
        assert!(err.to_string().contains("custom.layerConfig"));
    }

    #[tokio::test]
    async fn test_failures_are_aggregated() {
        let temp = TempDir::new().unwrap();
        write_project(temp.path(), "{}");
        let yaml = "layers:\n  a:\n    name: a\n  b:\n    name: b\n  c:\n    path: c\ncustom:\n  layerConfig:\n    manageNodeFolder: true\n    webpack:\n      forceInclude: [pg]\n";
        let descriptor = descriptor(yaml);
        let bundler = FakeBundler::default();
        let installer = RecordingInstaller::default();
        let layers = LayerInstaller::new(&descriptor, temp.path(), &bundler, &installer).unwrap();

        let err = layers.install_all().await.unwrap_err();
        let message = err.to_string();
        assert!(message.contains("2 layers failed"));
        assert!(message.contains("a:"));
        assert!(message.contains("b:"));
        assert_eq!(installer.commands().len(), 1);
    }

    #[tokio::test]
    async fn test_single_failure_keeps_its_error_kind() {
        let temp = TempDir::new().unwrap();
        write_project(temp.path(), "{}");
        let yaml = "layers:\n  deps:\n    path: deps\ncustom:\n  layerConfig:\n    manageNodeFolder: true\n    webpack:\n      forceInclude: [pg]\n";
        let descriptor = descriptor(yaml);
        let bundler = FakeBundler::default();
        let installer = RecordingInstaller::default().failing();
        let layers = LayerInstaller::new(&descriptor, temp.path(), &bundler, &installer).unwrap();

        let err = layers.install_all().await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<LayerError>(),
            Some(LayerError::InstallFailed { .. })
        ));
    }

    #[test]
    fn test_invalid_config_is_rejected_up_front() {
        let temp = TempDir::new().unwrap();
        let yaml = "custom:\n  layerConfig:\n    webpack:\n      command: []\n";
        let descriptor = descriptor(yaml);
        let bundler = FakeBundler::default();
        let installer = RecordingInstaller::default();
        assert!(LayerInstaller::new(&descriptor, temp.path(), &bundler, &installer).is_err());
    }
}
