//! Core types shared across layer-manager.
//!
//! Currently this is the error taxonomy; see [`error`] for the variants and
//! the CLI-facing [`user_friendly_error`] conversion.

pub mod error;

pub use error::{ErrorContext, LayerError, user_friendly_error};
