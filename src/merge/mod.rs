//! Combining discovered modules with overrides into the install list.
//!
//! The merge is a pure function of its inputs:
//!
//! 1. start from the discovered names,
//! 2. add every force-include name (layer-level and function-level),
//! 3. remove every force-exclude name (layer-level and function-level),
//! 4. qualify each survivor with its declared range from `package.json`.
//!
//! Exclusion is always the last set operation, so a name that is both
//! force-included and force-excluded is never installed.

use std::collections::BTreeSet;
use std::fmt;

use crate::config::WebpackConfig;
use crate::manifest::PackageManifest;
use crate::service::ServiceDescriptor;

/// Force-include and force-exclude lists gathered for one layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ForceOverrides {
    /// Names always installed.
    pub include: BTreeSet<String>,
    /// Names never installed.
    pub exclude: BTreeSet<String>,
}

impl ForceOverrides {
    /// Union of the layer-level lists and the lists of every function that
    /// takes part in discovery for `layer_id`.
    #[must_use]
    pub fn collect(
        webpack: Option<&WebpackConfig>,
        descriptor: &ServiceDescriptor,
        layer_id: &str,
    ) -> Self {
        let mut overrides = Self::default();

        if let Some(webpack) = webpack {
            overrides.include.extend(webpack.force_include.iter().cloned());
            overrides.exclude.extend(webpack.force_exclude.iter().cloned());
        }

        for (_, function) in descriptor.functions_using(layer_id) {
            overrides.include.extend(function.force_include.iter().cloned());
            overrides.exclude.extend(function.force_exclude.iter().cloned());
        }

        overrides
    }
}

/// A package argument for the package manager.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct InstallSpecifier {
    /// Package name, possibly scoped.
    pub name: String,
    /// Declared version range, if the manifest has one.
    pub version: Option<String>,
}

impl fmt::Display for InstallSpecifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(range) => write!(f, "{}@{range}", self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// Produce the install list, sorted by name.
#[must_use]
pub fn merge_modules(
    discovered: &BTreeSet<String>,
    overrides: &ForceOverrides,
    manifest: &PackageManifest,
) -> Vec<InstallSpecifier> {
    discovered
        .union(&overrides.include)
        .filter(|name| !overrides.exclude.contains(*name))
        .map(|name| InstallSpecifier {
            name: name.clone(),
            version: manifest.version_of(name).map(str::to_string),
        })
        .collect()
}
