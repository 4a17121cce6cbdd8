//! `layer-manager transform` against compiled templates on disk.

use layer_manager::test_utils::sample_template;
use serde_json::Value;

use crate::common::TestProject;

const SERVICE: &str = "\
service: demo
layers:
  foo:
    path: layers/foo
";

const TEMPLATE_PATH: &str = ".serverless/cloudformation-template-update-stack.json";

fn project_with_template(service: &str) -> TestProject {
    let project = TestProject::new().unwrap();
    project.write_service(service).unwrap();
    let template = serde_json::to_string_pretty(&sample_template("FooLambdaLayerVersion7")).unwrap();
    project.write_file(TEMPLATE_PATH, &template).unwrap();
    project
}

fn read_json(project: &TestProject, path: &str) -> Value {
    serde_json::from_str(&project.read_file(path).unwrap()).unwrap()
}

#[test]
fn test_transform_rewrites_template_in_place() {
    let project = project_with_template(SERVICE);

    project
        .run_layer_manager(&["transform"])
        .unwrap()
        .assert_success()
        .assert_stdout_contains("exported FooLambdaLayerQualifiedArn")
        .assert_stdout_contains("HelloLambdaFunction: FooLambdaLayer → FooLambdaLayerVersion7")
        .assert_stdout_contains("Exported 1 layers, upgraded 1 layer references");

    let template = read_json(&project, TEMPLATE_PATH);
    assert_eq!(
        template["Outputs"]["FooLambdaLayerQualifiedArn"]["Export"]["Name"]["Fn::Sub"],
        "${AWS::StackName}-FooLambdaLayerQualifiedArn"
    );
    let layers = &template["Resources"]["HelloLambdaFunction"]["Properties"]["Layers"];
    assert_eq!(layers[0]["Ref"], "FooLambdaLayerVersion7");
    assert_eq!(layers[1], "arn:aws:lambda:us-east-1:123456789012:layer:shared:3");
    // Untouched keys survive the rewrite.
    assert_eq!(template["AWSTemplateFormatVersion"], "2010-09-09");
    assert_eq!(template["Resources"]["ServerlessDeploymentBucket"]["Type"], "AWS::S3::Bucket");
}

#[test]
fn test_transform_to_output_file() {
    let project = project_with_template(SERVICE);
    let original = project.read_file(TEMPLATE_PATH).unwrap();

    project
        .run_layer_manager(&["--quiet", "transform", "--output", "out/template.json"])
        .unwrap()
        .assert_success();

    assert_eq!(project.read_file(TEMPLATE_PATH).unwrap(), original);
    let written = read_json(&project, "out/template.json");
    assert_eq!(
        written["Resources"]["HelloLambdaFunction"]["Properties"]["Layers"][0]["Ref"],
        "FooLambdaLayerVersion7"
    );
}

#[test]
fn test_transform_respects_disabled_options() {
    let service = format!(
        "{SERVICE}custom:\n  layerConfig:\n    exportLayers: false\n    upgradeLayerReferences: false\n"
    );
    let project = project_with_template(&service);

    project
        .run_layer_manager(&["transform"])
        .unwrap()
        .assert_success()
        .assert_stdout_contains("Exported 0 layers, upgraded 0 layer references");

    let template = read_json(&project, TEMPLATE_PATH);
    assert_eq!(template, sample_template("FooLambdaLayerVersion7"));
}

#[test]
fn test_transform_custom_export_prefix() {
    let service = format!("{SERVICE}custom:\n  layerConfig:\n    exportPrefix: shared-\n");
    let project = project_with_template(&service);

    project.run_layer_manager(&["--quiet", "transform"]).unwrap().assert_success();

    let template = read_json(&project, TEMPLATE_PATH);
    assert_eq!(
        template["Outputs"]["FooLambdaLayerQualifiedArn"]["Export"]["Name"]["Fn::Sub"],
        "shared-FooLambdaLayerQualifiedArn"
    );
}

#[test]
fn test_transform_missing_template() {
    let project = TestProject::new().unwrap();
    project.write_service(SERVICE).unwrap();

    project
        .run_layer_manager(&["transform"])
        .unwrap()
        .assert_failure()
        .assert_stderr_contains("Compiled resource template not found")
        .assert_stderr_contains("serverless package");
}

#[test]
fn test_transform_rejects_malformed_template() {
    let project = TestProject::new().unwrap();
    project.write_service(SERVICE).unwrap();
    project.write_file(TEMPLATE_PATH, r#"{"Outputs": "nope"}"#).unwrap();

    project
        .run_layer_manager(&["transform"])
        .unwrap()
        .assert_failure()
        .assert_stderr_contains("Unexpected template shape");
}
