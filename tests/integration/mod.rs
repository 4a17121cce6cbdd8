//! Integration test suite for layer-manager
//!
//! End-to-end tests that run the binary against throwaway service projects and
//! drive the library pipeline with in-memory bundler and installer doubles.
//! None of them need npm, yarn or webpack on PATH.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **cli**: Argument handling and error reporting
//! - **discover**: `discover` against a scripted bundler
//! - **pipeline**: Install pipeline through [`layer_manager::plugin::LayerManager`]
//! - **transform**: Template rewriting through the binary

// Shared test utilities (from parent tests/ directory)
#[path = "../common/mod.rs"]
mod common;

mod cli;
mod discover;
mod pipeline;
mod transform;
