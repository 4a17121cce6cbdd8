//! Error handling for layer-manager
//!
//! This module provides the typed error enum used across the crate and the
//! user-facing error reporting used by the CLI. It follows two principles:
//! 1. **Strongly-typed errors** for the failure modes callers branch on
//! 2. **User-friendly messages** with actionable suggestions for CLI users
//!
//! # Architecture
//!
//! - [`LayerError`] - Enumerated error types for every failure class
//! - [`ErrorContext`] - Wrapper that adds suggestions and details
//!
//! # Error Categories
//!
//! - **Configuration**: [`LayerError::ConfigError`], [`LayerError::DescriptorNotFound`],
//!   [`LayerError::ManifestNotFound`]
//! - **Resolution**: [`LayerError::ResolutionError`] (per function, never fatal for a layer)
//! - **Build**: [`LayerError::BuildFailed`]
//! - **Install**: [`LayerError::InstallFailed`], [`LayerError::PackagerNotFound`]
//! - **Template**: [`LayerError::TemplateNotFound`], [`LayerError::TemplateShape`]
//!
//! Most functions in the crate return [`anyhow::Result`] and construct a
//! [`LayerError`] at the point where the failure class is known. The CLI turns
//! whatever bubbles up into an [`ErrorContext`] with [`user_friendly_error`].
//!
//! # Examples
//!
//! ```rust,no_run
//! use layer_manager::core::{LayerError, ErrorContext};
//!
//! let context = ErrorContext::new(LayerError::DescriptorNotFound {
//!     path: "serverless.yml".to_string(),
//! })
//! .with_suggestion("Run the command from the service directory");
//!
//! context.display();
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// The main error type for layer-manager operations.
///
/// Each variant carries the names and paths needed to explain the failure
/// without consulting logs.
///
/// # Examples
///
/// ```rust,no_run
/// use layer_manager::core::LayerError;
///
/// fn handle(error: LayerError) {
///     match error {
///         LayerError::BuildFailed { layer, .. } => {
///             eprintln!("bundler failed while discovering modules for {layer}");
///         }
///         LayerError::ResolutionError { function, .. } => {
///             eprintln!("skipping {function}");
///         }
///         other => eprintln!("{other}"),
///     }
/// }
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LayerError {
    /// A descriptor field is missing or an option has an invalid value
    #[error("Configuration error: {message}")]
    ConfigError {
        /// What is wrong with the configuration
        message: String,
    },

    /// The service descriptor file does not exist
    #[error("Service descriptor not found: {path}")]
    DescriptorNotFound {
        /// Path that was looked up
        path: String,
    },

    /// The service descriptor could not be parsed
    #[error("Invalid service descriptor syntax in {file}")]
    DescriptorParseError {
        /// Descriptor file
        file: String,
        /// Parser message
        reason: String,
    },

    /// The dependency manifest (package.json) does not exist
    #[error("Dependency manifest not found: {path}")]
    ManifestNotFound {
        /// Path that was looked up
        path: String,
    },

    /// A function's handler could not be mapped to a source file
    #[error("Cannot resolve entry for function '{function}': {reason}")]
    ResolutionError {
        /// Function name in the service descriptor
        function: String,
        /// Why resolution failed
        reason: String,
    },

    /// The bundler reported a failed compilation
    #[error("Build failed for layer '{layer}'")]
    BuildFailed {
        /// Layer resource id the build was run for
        layer: String,
        /// Bundler diagnostics
        reason: String,
    },

    /// The package manager exited unsuccessfully
    #[error("Package install failed for layer '{layer}': {command}")]
    InstallFailed {
        /// Layer name
        layer: String,
        /// Command line that was executed
        command: String,
        /// Exit status description
        status: String,
    },

    /// The package manager executable is not available
    #[error("Package manager '{packager}' is not installed or not found in PATH")]
    PackagerNotFound {
        /// `npm` or `yarn`
        packager: String,
    },

    /// The compiled resource template file does not exist
    #[error("Compiled resource template not found: {path}")]
    TemplateNotFound {
        /// Path that was looked up
        path: String,
    },

    /// An expected template substructure is missing
    #[error("Unexpected template shape at {location}: {reason}")]
    TemplateShape {
        /// Template file or element
        location: String,
        /// What was expected
        reason: String,
    },

    /// Other error
    #[error("{message}")]
    Other {
        /// Generic error message
        message: String,
    },
}

/// Error context wrapper that provides user-friendly error information.
///
/// When displayed, errors show the main message in red, optional details in
/// yellow, and an optional suggestion in green.
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error
    pub error: LayerError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context with no suggestion or details.
    #[must_use]
    pub const fn new(error: LayerError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add additional details explaining the error
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print the error context to stderr with terminal colors
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error to a user-friendly [`ErrorContext`] with actionable suggestions.
///
/// Recognizes [`LayerError`] anywhere in the chain, [`std::io::Error`] and the
/// descriptor parser errors. Anything else is rendered with its full cause chain.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    if let Some(layer_error) = error.chain().find_map(|e| e.downcast_ref::<LayerError>()) {
        let mut ctx = create_error_context(layer_error.clone());
        if ctx.details.is_none() {
            let chain = format_chain(&error);
            if !chain.is_empty() {
                ctx = ctx.with_details(chain);
            }
        }
        return ctx;
    }

    if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
        match io_error.kind() {
            std::io::ErrorKind::PermissionDenied => {
                return ErrorContext::new(LayerError::Other {
                    message: io_error.to_string(),
                })
                .with_suggestion("Check ownership and permissions of the layer folders")
                .with_details("layer-manager could not read or write a file it needs");
            }
            std::io::ErrorKind::NotFound => {
                return ErrorContext::new(LayerError::Other {
                    message: io_error.to_string(),
                })
                .with_suggestion("Check that the file or directory exists and the path is correct");
            }
            _ => {}
        }
    }

    if let Some(yaml_error) = error.downcast_ref::<serde_yaml::Error>() {
        return ErrorContext::new(LayerError::DescriptorParseError {
            file: "service descriptor".to_string(),
            reason: yaml_error.to_string(),
        })
        .with_suggestion("Check the YAML syntax of the service descriptor");
    }

    let mut message = error.to_string();
    let chain = format_chain(&error);
    if !chain.is_empty() {
        message.push_str("\n\n");
        message.push_str(&chain);
    }

    ErrorContext::new(LayerError::Other {
        message,
    })
}

fn format_chain(error: &anyhow::Error) -> String {
    let chain: Vec<String> =
        error.chain().skip(1).map(std::string::ToString::to_string).collect();
    if chain.is_empty() {
        return String::new();
    }

    let mut message = String::from("Caused by:");
    for (i, cause) in chain.iter().enumerate() {
        message.push_str(&format!("\n  {}: {}", i + 1, cause));
    }
    message
}

/// Attach suggestions and details for each [`LayerError`] variant.
fn create_error_context(error: LayerError) -> ErrorContext {
    match &error {
        LayerError::DescriptorNotFound {
            path,
        } => ErrorContext::new(error.clone())
            .with_suggestion(format!(
                "Run from the service directory or pass --service. A resolved JSON descriptor can be produced with 'serverless print --format json > {path}'"
            )),

        LayerError::ManifestNotFound {
            ..
        } => ErrorContext::new(error.clone())
            .with_suggestion("Create a package.json in the project directory or pass --project-dir")
            .with_details("Declared dependency versions are read from package.json"),

        LayerError::BuildFailed {
            reason, ..
        } => ErrorContext::new(error.clone())
            .with_details(reason.clone())
            .with_suggestion("Run the bundler manually with the same configuration to see the full output"),

        LayerError::InstallFailed {
            status, ..
        } => ErrorContext::new(error.clone())
            .with_details(format!("Package manager exited with {status}"))
            .with_suggestion("Check the package names in forceInclude and the versions declared in package.json"),

        LayerError::PackagerNotFound {
            packager,
        } => ErrorContext::new(error.clone())
            .with_suggestion(format!("Install {packager} or set 'packager' in custom.layerConfig")),

        LayerError::TemplateNotFound {
            ..
        } => ErrorContext::new(error.clone())
            .with_suggestion("Run 'serverless package' first so the compiled template exists, or pass --template"),

        LayerError::DescriptorParseError {
            reason, ..
        } => ErrorContext::new(error.clone()).with_details(reason.clone()),

        _ => ErrorContext::new(error),
    }
}
