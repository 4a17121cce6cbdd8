//! The project's dependency manifest (`package.json`).
//!
//! Only the two dependency tiers are read. They decorate install specifiers
//! with declared version ranges and never decide which packages are installed.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

use crate::constants::PACKAGE_MANIFEST_FILE;
use crate::core::LayerError;

/// Declared dependency ranges split by tier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageManifest {
    /// Production tier, consulted first.
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,

    /// Development tier, consulted when the production tier has no entry.
    #[serde(default)]
    pub dev_dependencies: BTreeMap<String, String>,
}

impl PackageManifest {
    /// Load `package.json` from the project directory.
    ///
    /// # Errors
    ///
    /// Returns [`LayerError::ManifestNotFound`] if the file is missing, or a
    /// parse error with context.
    pub fn load(project_dir: &Path) -> Result<Self> {
        let path = project_dir.join(PACKAGE_MANIFEST_FILE);
        if !path.exists() {
            return Err(LayerError::ManifestNotFound {
                path: path.display().to_string(),
            }
            .into());
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Declared range for `name`, production tier first.
    #[must_use]
    pub fn version_of(&self, name: &str) -> Option<&str> {
        self.dependencies
            .get(name)
            .or_else(|| self.dev_dependencies.get(name))
            .map(String::as_str)
            .filter(|range| !range.is_empty())
    }
}
