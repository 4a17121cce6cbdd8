//! layer-manager - dependency layers for serverless functions
//!
//! Functions bundled with webpack usually mark their heavy or native
//! dependencies as externals. Those packages still have to exist at runtime,
//! typically in a shared layer. This crate works out which packages a layer
//! actually needs by building the functions attached to it, installs exactly
//! those packages into the layer, and after the provider has compiled its
//! template pins every function to the layer version being deployed.
//!
//! # Architecture Overview
//!
//! Two independent halves share the service descriptor and configuration:
//!
//! - **Install** (package-initialize): [`resolver`] maps function handlers to
//!   build entries, [`discovery`] runs the [`bundler`] and extracts external
//!   module names, [`merge`] applies force overrides and version ranges from
//!   the [`manifest`], and [`installer`] runs the package manager in each
//!   layer's `nodejs` folder.
//! - **Transform** (before-deploy): [`template`] exports each versioned layer
//!   output and repoints function layer references from the unversioned alias
//!   to the versioned resource.
//!
//! # Core Modules
//!
//! - [`service`] - Service descriptor (functions, layers) and layer ids
//! - [`config`] - `custom.layerConfig` options and defaults
//! - [`plugin`] - [`plugin::LayerManager`], the host lifecycle hooks
//! - [`cli`] - Command-line front end
//! - [`core`] - Error types and user-facing error formatting
//! - [`utils`] - Process and file system helpers
//!
//! # Configuration
//!
//! ```yaml
//! functions:
//!   hello:
//!     handler: src/handlers/hello.handler
//!     layers:
//!       - Ref: DepsLambdaLayer
//! layers:
//!   deps:
//!     path: layers/deps
//! custom:
//!   layerConfig:
//!     packager: npm
//!     manageNodeFolder: true
//!     exportPrefix: '${AWS::StackName}-'
//!     webpack:
//!       configPath: ./webpack.config.js
//!       forceInclude: [pg]
//!       forceExclude: [aws-sdk]
//! ```
//!
//! # Command-Line Usage
//!
//! ```bash
//! layer-manager install
//! layer-manager discover deps
//! layer-manager transform --template .serverless/cloudformation-template-update-stack.json
//! ```

// Core functionality modules
pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod plugin;
pub mod service;

// Install pipeline
pub mod bundler;
pub mod discovery;
pub mod installer;
pub mod manifest;
pub mod merge;
pub mod resolver;

// Deploy-time transform
pub mod template;

// Supporting modules
pub mod utils;

// test_utils module is available for both unit tests and integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
