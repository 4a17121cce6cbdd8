//! Layer configuration read from `custom.layerConfig`.
//!
//! Every option is an explicit field with its own default, so a partially
//! specified block (or no block at all) yields a complete configuration.
//! [`LayerConfig::validate`] runs once at the entry of each pipeline.
//!
//! # Example
//!
//! ```yaml
//! custom:
//!   layerConfig:
//!     packager: yarn
//!     manageNodeFolder: true
//!     exportPrefix: 'prod-'
//!     webpack:
//!       configPath: ./webpack.layers.js
//!       forceInclude: [pg]
//!       forceExclude: [aws-sdk]
//! ```
//!
//! Setting `webpack: false` turns module discovery off entirely: the layer is
//! then installed from a copy of the project's `package.json` and lockfile.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use crate::core::LayerError;

/// Package manager used to install layer dependencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Packager {
    /// `npm install`
    #[default]
    Npm,
    /// `yarn add` / `yarn install`
    Yarn,
}

impl Packager {
    /// Executable name looked up on PATH.
    #[must_use]
    pub const fn program(self) -> &'static str {
        match self {
            Self::Npm => "npm",
            Self::Yarn => "yarn",
        }
    }

    /// Lockfile copied alongside `package.json` in manifest-copy mode.
    #[must_use]
    pub const fn lockfile(self) -> &'static str {
        match self {
            Self::Npm => "package-lock.json",
            Self::Yarn => "yarn.lock",
        }
    }
}

impl fmt::Display for Packager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.program())
    }
}

/// Top-level options of `custom.layerConfig`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerConfig {
    /// Run the discovery/install pipeline during packaging.
    #[serde(default = "default_true")]
    pub install_layers: bool,

    /// Attach an export name to each versioned layer output.
    #[serde(default = "default_true")]
    pub export_layers: bool,

    /// Repoint function layer references at the versioned resource.
    #[serde(default = "default_true")]
    pub upgrade_layer_references: bool,

    /// Prefix for export names. `${AWS::StackName}` is substituted by the provider.
    #[serde(default = "default_export_prefix")]
    pub export_prefix: String,

    /// Whether this tool creates and empties each layer's `nodejs` folder.
    #[serde(default)]
    pub manage_node_folder: bool,

    /// Prune `package.exclude` matches from installed layer folders.
    #[serde(default = "default_true")]
    pub clean: bool,

    /// Package manager used for installation.
    #[serde(default)]
    pub packager: Packager,

    /// Module discovery settings; `None` when `webpack: false`.
    #[serde(default = "default_webpack", deserialize_with = "deserialize_webpack")]
    pub webpack: Option<WebpackConfig>,
}

/// Options of the `webpack` block controlling module discovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebpackConfig {
    /// Bundler configuration file, relative to the project directory.
    #[serde(default = "default_config_path")]
    pub config_path: String,

    /// Run the bundler; when false only `forceInclude` contributes modules.
    #[serde(default = "default_true")]
    pub discover_modules: bool,

    /// Extension appended to a handler base name when several files match it.
    #[serde(default = "default_backup_file_type")]
    pub backup_file_type: String,

    /// Module names always installed.
    #[serde(default)]
    pub force_include: Vec<String>,

    /// Module names never installed.
    #[serde(default)]
    pub force_exclude: Vec<String>,

    /// Bundler program followed by its leading arguments.
    #[serde(default = "default_bundler_command")]
    pub command: Vec<String>,
}

const fn default_true() -> bool {
    true
}

fn default_export_prefix() -> String {
    "${AWS::StackName}-".to_string()
}

fn default_config_path() -> String {
    "./webpack.config.js".to_string()
}

fn default_backup_file_type() -> String {
    "js".to_string()
}

fn default_bundler_command() -> Vec<String> {
    vec!["npx".to_string(), "webpack".to_string()]
}

#[allow(clippy::unnecessary_wraps)]
fn default_webpack() -> Option<WebpackConfig> {
    Some(WebpackConfig::default())
}

/// Accepts `webpack: false`, `webpack: true` or a settings block.
fn deserialize_webpack<'de, D>(deserializer: D) -> Result<Option<WebpackConfig>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum WebpackSetting {
        Toggle(bool),
        Settings(WebpackConfig),
    }

    Ok(match Option::<WebpackSetting>::deserialize(deserializer)? {
        None | Some(WebpackSetting::Toggle(false)) => None,
        Some(WebpackSetting::Toggle(true)) => Some(WebpackConfig::default()),
        Some(WebpackSetting::Settings(settings)) => Some(settings),
    })
}

impl Default for WebpackConfig {
    fn default() -> Self {
        Self {
            config_path: default_config_path(),
            discover_modules: true,
            backup_file_type: default_backup_file_type(),
            force_include: Vec::new(),
            force_exclude: Vec::new(),
            command: default_bundler_command(),
        }
    }
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self {
            install_layers: true,
            export_layers: true,
            upgrade_layer_references: true,
            export_prefix: default_export_prefix(),
            manage_node_folder: false,
            clean: true,
            packager: Packager::default(),
            webpack: default_webpack(),
        }
    }
}

impl LayerConfig {
    /// Check option values that serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`LayerError::ConfigError`] for an empty `webpack.configPath`,
    /// `webpack.backupFileType` or `webpack.command`.
    pub fn validate(&self) -> Result<(), LayerError> {
        let Some(webpack) = &self.webpack else {
            return Ok(());
        };

        if webpack.config_path.trim().is_empty() {
            return Err(LayerError::ConfigError {
                message: "webpack.configPath must not be empty".to_string(),
            });
        }
        let backup = webpack.backup_file_type.trim_start_matches('.');
        if backup.is_empty() {
            return Err(LayerError::ConfigError {
                message: "webpack.backupFileType must not be empty".to_string(),
            });
        }
        if webpack.command.first().is_none_or(|program| program.trim().is_empty()) {
            return Err(LayerError::ConfigError {
                message: "webpack.command must name a program".to_string(),
            });
        }
        Ok(())
    }
}

impl WebpackConfig {
    /// Backup extension without a leading dot.
    #[must_use]
    pub fn backup_extension(&self) -> &str {
        self.backup_file_type.trim_start_matches('.')
    }
}
