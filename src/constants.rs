//! Global constants used throughout layer-manager.
//!
//! File names, naming suffixes and environment variable names that more than
//! one module depends on live here so the conventions are discoverable in one
//! place.

/// Suffix appended to a normalized layer name to form its unversioned resource id.
pub const LAYER_RESOURCE_SUFFIX: &str = "LambdaLayer";

/// Suffix appended to a layer resource id to form the versioned output name.
pub const QUALIFIED_ARN_OUTPUT_SUFFIX: &str = "QualifiedArn";

/// Resource type of functions whose layer lists are rewritten.
pub const FUNCTION_RESOURCE_TYPE: &str = "AWS::Lambda::Function";

/// Subfolder of a layer path that holds installed Node packages.
pub const NODE_LAYER_FOLDER: &str = "nodejs";

/// Default service descriptor file name.
pub const DEFAULT_SERVICE_FILE: &str = "serverless.yml";

/// Dependency manifest file name.
pub const PACKAGE_MANIFEST_FILE: &str = "package.json";

/// Compiled template written by the provider during packaging.
pub const DEFAULT_TEMPLATE_PATH: &str = ".serverless/cloudformation-template-update-stack.json";

/// Environment variable carrying the entry mapping into the bundler process.
pub const ENTRIES_ENV_VAR: &str = "LAYER_MANAGER_ENTRIES";

/// Environment variable set on the bundler process when packaging labels are requested.
pub const PACKAGING_LABELS_ENV_VAR: &str = "PACKAGING_LABELS";
