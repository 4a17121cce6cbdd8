//! Argument handling and error reporting of the binary.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

#[test]
fn test_help_lists_commands() {
    let mut cmd = Command::cargo_bin("layer-manager").unwrap();
    cmd.arg("--help");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("install"))
        .stdout(predicate::str::contains("discover"))
        .stdout(predicate::str::contains("transform"));
}

#[test]
fn test_verbose_conflicts_with_quiet() {
    let mut cmd = Command::cargo_bin("layer-manager").unwrap();
    cmd.args(["--verbose", "--quiet", "install"]);

    cmd.assert().failure().stderr(predicate::str::contains("cannot be used with"));
}

#[test]
fn test_missing_service_descriptor() {
    let temp = TempDir::new().unwrap();

    let mut cmd = Command::cargo_bin("layer-manager").unwrap();
    cmd.current_dir(temp.path()).env("NO_COLOR", "1").env_remove("LAYER_MANAGER_PROJECT_DIR").arg("install");

    cmd.assert()
        .code(1)
        .stderr(predicate::str::contains("Service descriptor not found"))
        .stderr(predicate::str::contains("suggestion"));
}

#[test]
fn test_malformed_service_descriptor() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("serverless.yml"), "functions: [unclosed").unwrap();

    let mut cmd = Command::cargo_bin("layer-manager").unwrap();
    cmd.current_dir(temp.path()).env("NO_COLOR", "1").env_remove("LAYER_MANAGER_PROJECT_DIR").arg("install");

    cmd.assert()
        .code(1)
        .stderr(predicate::str::contains("Invalid service descriptor syntax"));
}

#[test]
fn test_project_dir_and_service_flags() {
    let temp = TempDir::new().unwrap();
    let service_dir = temp.path().join("app");
    std::fs::create_dir_all(&service_dir).unwrap();
    std::fs::write(
        service_dir.join("service.yml"),
        "custom:\n  layerConfig:\n    installLayers: false\n",
    )
    .unwrap();

    let mut cmd = Command::cargo_bin("layer-manager").unwrap();
    cmd.current_dir(temp.path())
        .env("NO_COLOR", "1")
        .args(["--project-dir", "app", "--service", "service.yml", "install"]);

    cmd.assert().success().stdout(predicate::str::contains("Layer installation disabled"));
}

#[test]
fn test_invalid_layer_config_is_reported() {
    let temp = TempDir::new().unwrap();
    std::fs::write(
        temp.path().join("serverless.yml"),
        "layers:\n  deps:\n    path: layers/deps\ncustom:\n  layerConfig:\n    packager: pnpm\n",
    )
    .unwrap();

    let mut cmd = Command::cargo_bin("layer-manager").unwrap();
    cmd.current_dir(temp.path()).env("NO_COLOR", "1").env_remove("LAYER_MANAGER_PROJECT_DIR").arg("install");

    cmd.assert().code(1).stderr(predicate::str::contains("Invalid service descriptor syntax"));
}

#[test]
fn test_install_without_layer_config() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("serverless.yml"), "layers:\n  deps:\n    path: layers/deps\n").unwrap();

    let mut cmd = Command::cargo_bin("layer-manager").unwrap();
    cmd.current_dir(temp.path()).env("NO_COLOR", "1").env_remove("LAYER_MANAGER_PROJECT_DIR").arg("install");

    cmd.assert()
        .code(1)
        .stderr(predicate::str::contains("Configuration error"))
        .stderr(predicate::str::contains("custom.layerConfig"));
    assert!(!temp.path().join("layers").exists());
}

