//! Shared helpers for the integration suite.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

/// A throwaway service project on disk.
pub struct TestProject {
    _temp_dir: TempDir, // Keep alive for RAII cleanup
    project_dir: PathBuf,
}

impl TestProject {
    /// Create an empty project directory.
    pub fn new() -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let project_dir = temp_dir.path().join("service");
        fs::create_dir_all(&project_dir)?;

        Ok(Self {
            _temp_dir: temp_dir,
            project_dir,
        })
    }

    /// Get the project directory path
    pub fn project_path(&self) -> &Path {
        &self.project_dir
    }

    /// Write `serverless.yml`.
    pub fn write_service(&self, content: &str) -> Result<()> {
        self.write_file("serverless.yml", content)
    }

    /// Write a file relative to the project, creating parent directories.
    pub fn write_file(&self, path: &str, content: &str) -> Result<()> {
        let file_path = self.project_dir.join(path);
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&file_path, content)
            .with_context(|| format!("Failed to write {}", file_path.display()))?;
        Ok(())
    }

    /// Read a file relative to the project.
    pub fn read_file(&self, path: &str) -> Result<String> {
        let file_path = self.project_dir.join(path);
        fs::read_to_string(&file_path)
            .with_context(|| format!("Failed to read {}", file_path.display()))
    }

    /// Run the binary in the project directory.
    pub fn run_layer_manager(&self, args: &[&str]) -> Result<CommandOutput> {
        let binary = env!("CARGO_BIN_EXE_layer-manager");
        let output = Command::new(binary)
            .args(args)
            .current_dir(&self.project_dir)
            .env_remove("LAYER_MANAGER_PROJECT_DIR")
            .env_remove("RUST_LOG")
            .env("NO_COLOR", "1")
            .output()
            .context("Failed to run layer-manager")?;

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            success: output.status.success(),
            code: output.status.code(),
        })
    }
}

/// Captured output of one run.
#[derive(Debug)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
    pub code: Option<i32>,
}

impl CommandOutput {
    /// Assert the command succeeded
    pub fn assert_success(&self) -> &Self {
        assert!(
            self.success,
            "Command failed with code {:?}\nstdout: {}\nstderr: {}",
            self.code, self.stdout, self.stderr
        );
        self
    }

    /// Assert the command failed with exit code 1
    pub fn assert_failure(&self) -> &Self {
        assert_eq!(
            self.code,
            Some(1),
            "Expected exit code 1\nstdout: {}\nstderr: {}",
            self.stdout,
            self.stderr
        );
        self
    }

    /// Assert stdout contains the given text
    pub fn assert_stdout_contains(&self, text: &str) -> &Self {
        assert!(self.stdout.contains(text), "Expected stdout to contain '{}'\nActual: {}", text, self.stdout);
        self
    }

    /// Assert stderr contains the given text
    pub fn assert_stderr_contains(&self, text: &str) -> &Self {
        assert!(self.stderr.contains(text), "Expected stderr to contain '{}'\nActual: {}", text, self.stderr);
        self
    }
}
