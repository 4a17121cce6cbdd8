//! `layer-manager discover` with a scripted bundler standing in for webpack.
//!
//! The bundler command is `sh fake-webpack.sh`, which prints a stats file
//! prepared by the test. Unix only.

#![cfg(unix)]

use serde_json::json;

use crate::common::TestProject;

const SERVICE: &str = "\
service: demo
functions:
  hello:
    handler: src/handlers/hello.handler
    layers:
      - Ref: DepsLambdaLayer
  report:
    handler: src/handlers/report.handler
    layers:
      - Ref: OtherLambdaLayer
layers:
  deps:
    path: layers/deps
  other:
    path: layers/other
custom:
  layerConfig:
    webpack:
      command: [sh, fake-webpack.sh]
      forceInclude: [lodash]
      forceExclude: [aws-sdk]
";

const PACKAGE_JSON: &str = r#"{
  "name": "demo",
  "dependencies": { "pg": "^8.11.0", "aws-sdk": "^2.1500.0" }
}"#;

fn scripted_project(script: &str) -> TestProject {
    let project = TestProject::new().unwrap();
    project.write_service(SERVICE).unwrap();
    project.write_file("package.json", PACKAGE_JSON).unwrap();
    project.write_file("src/handlers/hello.js", "exports.handler = () => {};\n").unwrap();
    project.write_file("src/handlers/report.js", "exports.handler = () => {};\n").unwrap();
    project.write_file("fake-webpack.sh", script).unwrap();
    project
}

fn write_stats(project: &TestProject, identifiers: &[&str]) {
    let modules: Vec<_> = identifiers.iter().map(|id| json!({ "identifier": id })).collect();
    let stats = json!({ "chunks": [{ "modules": modules }], "errors": [] });
    project.write_file("stats.json", &stats.to_string()).unwrap();
}

#[test]
fn test_discover_prints_install_list() {
    let project = scripted_project("cat stats.json\n");
    write_stats(
        &project,
        &[
            "external \"pg\"",
            "external \"fs\"",
            "external \"node:path\"",
            "external \"aws-sdk\"",
            "./src/handlers/hello.js",
        ],
    );

    let output = project.run_layer_manager(&["discover", "deps"]).unwrap();
    output.assert_success();

    let lines: Vec<&str> = output.stdout.lines().collect();
    assert_eq!(lines, vec!["lodash", "pg@^8.11.0"]);
}

#[test]
fn test_discover_json_output() {
    let project = scripted_project("cat stats.json\n");
    write_stats(&project, &["external \"pg\""]);

    let output = project.run_layer_manager(&["discover", "deps", "--json"]).unwrap();
    output.assert_success();

    let specs: Vec<String> = serde_json::from_str(&output.stdout).unwrap();
    assert_eq!(specs, vec!["lodash".to_string(), "pg@^8.11.0".to_string()]);
}

#[test]
fn test_discover_passes_only_the_layers_entries() {
    let project = scripted_project("printf '%s' \"$LAYER_MANAGER_ENTRIES\" > entries.json\ncat stats.json\n");
    write_stats(&project, &[]);

    project.run_layer_manager(&["discover", "other"]).unwrap().assert_success();

    let entries: serde_json::Value =
        serde_json::from_str(&project.read_file("entries.json").unwrap()).unwrap();
    let keys: Vec<&String> = entries.as_object().unwrap().keys().collect();
    assert_eq!(keys, vec!["src/handlers/report"]);
}

#[test]
fn test_discover_unknown_layer() {
    let project = scripted_project("cat stats.json\n");

    project
        .run_layer_manager(&["discover", "missing"])
        .unwrap()
        .assert_failure()
        .assert_stderr_contains("Configuration error")
        .assert_stderr_contains("missing");
}

#[test]
fn test_discover_reports_bundler_failure() {
    let project = scripted_project("echo 'webpack exploded' >&2\nexit 2\n");

    project
        .run_layer_manager(&["discover", "deps"])
        .unwrap()
        .assert_failure()
        .assert_stderr_contains("Build failed for layer 'DepsLambdaLayer'")
        .assert_stderr_contains("webpack exploded");
}

#[test]
fn test_discover_reports_stats_errors() {
    let project = scripted_project("cat stats.json\n");
    let stats = json!({ "chunks": [], "errors": [{ "message": "Module not found: Error: Can't resolve 'x'" }] });
    project.write_file("stats.json", &stats.to_string()).unwrap();

    project
        .run_layer_manager(&["discover", "deps"])
        .unwrap()
        .assert_failure()
        .assert_stderr_contains("Module not found");
}
