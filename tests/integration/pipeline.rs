//! The install pipeline through `LayerManager` with test doubles.

use layer_manager::core::LayerError;
use layer_manager::installer::LayerOutcome;
use layer_manager::plugin::LayerManager;
use layer_manager::service::ServiceDescriptor;
use layer_manager::test_utils::{FakeBundler, RecordingInstaller, init_test_logging, write_project};

use crate::common::TestProject;

const PACKAGE_JSON: &str = r#"{
  "name": "demo",
  "dependencies": { "pg": "^8.11.0", "sharp": "0.33.2" },
  "devDependencies": { "aws-sdk": "^2.1500.0" }
}"#;

fn setup_project(service: &str) -> (TestProject, ServiceDescriptor) {
    init_test_logging(None);
    let project = TestProject::new().unwrap();
    project.write_service(service).unwrap();
    project.write_file("src/hello.js", "exports.handler = () => {};\n").unwrap();
    project.write_file("src/thumbs.ts", "export const handler = () => {};\n").unwrap();
    write_project(project.project_path(), PACKAGE_JSON);
    let descriptor = ServiceDescriptor::load(&project.project_path().join("serverless.yml")).unwrap();
    (project, descriptor)
}

const TWO_LAYERS: &str = "\
service: demo
functions:
  hello:
    handler: src/hello.handler
    layers:
      - Ref: DbLambdaLayer
  thumbs:
    handler: src/thumbs.handler
    layers:
      - Ref: ImageLambdaLayer
layers:
  db:
    path: layers/db
  image:
    path: layers/image
package:
  exclude: ['**/*.md']
custom:
  layerConfig:
    manageNodeFolder: true
    webpack:
      forceExclude: [aws-sdk]
";

#[tokio::test]
async fn test_install_all_layers() {
    let (project, descriptor) = setup_project(TWO_LAYERS);
    let bundler = FakeBundler::with_identifiers([
        "external \"pg\"",
        "external \"sharp\"",
        "external \"aws-sdk\"",
        "external \"crypto\"",
    ]);
    let installer = RecordingInstaller::default().writing("node_modules/pg/README.md");
    let manager = LayerManager::new(descriptor, project.project_path(), bundler, installer);

    let reports = manager.package_initialize().await.unwrap();

    assert_eq!(reports.len(), 2);
    assert!(reports.iter().all(|report| report.outcome == LayerOutcome::Installed { packages: Some(2) }));

    // The fake bundler returns the same graph for both builds.
    let commands = manager.installer().commands();
    assert_eq!(commands.len(), 2);
    for command in &commands {
        assert_eq!(command.args, vec!["install", "pg@^8.11.0", "sharp@0.33.2"]);
    }

    for layer in ["layers/db/nodejs", "layers/image/nodejs"] {
        let folder = project.project_path().join(layer);
        assert_eq!(std::fs::read_to_string(folder.join("package.json")).unwrap(), "{}");
        assert!(!folder.join("node_modules/pg/README.md").exists());
        assert!(folder.join("node_modules/pg").is_dir());
    }
}

#[tokio::test]
async fn test_install_without_discovery_copies_manifest() {
    let service = "\
service: demo
layers:
  deps:
    path: layers/deps
custom:
  layerConfig:
    manageNodeFolder: true
    packager: yarn
    webpack: false
";
    let (project, descriptor) = setup_project(service);
    project.write_file("yarn.lock", "# yarn lockfile v1\n").unwrap();
    let manager =
        LayerManager::new(descriptor, project.project_path(), FakeBundler::default(), RecordingInstaller::default());

    let reports = manager.package_initialize().await.unwrap();

    assert_eq!(reports[0].outcome, LayerOutcome::Installed { packages: None });
    assert_eq!(manager.bundler().build_count(), 0);
    let commands = manager.installer().commands();
    assert_eq!(commands[0].args, vec!["install"]);

    let folder = project.project_path().join("layers/deps/nodejs");
    assert_eq!(std::fs::read_to_string(folder.join("package.json")).unwrap(), PACKAGE_JSON);
    assert!(folder.join("yarn.lock").is_file());
}

#[tokio::test]
async fn test_unmanaged_missing_folder_is_skipped() {
    let service = TWO_LAYERS.replace("    manageNodeFolder: true\n", "");
    let (project, descriptor) = setup_project(&service);
    std::fs::create_dir_all(project.project_path().join("layers/db/nodejs")).unwrap();
    let manager = LayerManager::new(
        descriptor,
        project.project_path(),
        FakeBundler::with_identifiers(["external \"pg\""]),
        RecordingInstaller::default(),
    );

    let reports = manager.package_initialize().await.unwrap();

    let db = reports.iter().find(|report| report.layer == "db").unwrap();
    let image = reports.iter().find(|report| report.layer == "image").unwrap();
    assert!(db.is_installed());
    assert!(matches!(image.outcome, LayerOutcome::Skipped { .. }));
    assert_eq!(manager.installer().commands().len(), 1);
}

#[tokio::test]
async fn test_failing_layers_are_aggregated() {
    let (project, descriptor) = setup_project(TWO_LAYERS);
    let manager = LayerManager::new(
        descriptor,
        project.project_path(),
        FakeBundler::failing("Module not found"),
        RecordingInstaller::default(),
    );

    let err = manager.package_initialize().await.unwrap_err();

    let message = err.to_string();
    assert!(message.contains("2 layers failed"), "unexpected error: {message}");
    assert!(message.contains("db:"));
    assert!(message.contains("image:"));
    assert!(manager.installer().commands().is_empty());
}

#[tokio::test]
async fn test_single_failure_keeps_error_kind() {
    let (project, descriptor) = setup_project(TWO_LAYERS);
    let manager = LayerManager::new(
        descriptor,
        project.project_path(),
        FakeBundler::with_identifiers(["external \"pg\""]),
        RecordingInstaller::default().failing(),
    );

    let err = manager.package_initialize().await.unwrap_err();
    // Both layers fail at the installer, so the errors are aggregated.
    assert!(err.to_string().contains("2 layers failed"));

    let service = TWO_LAYERS.replace("  image:\n    path: layers/image\n", "");
    let (project, descriptor) = setup_project(&service);
    let manager = LayerManager::new(
        descriptor,
        project.project_path(),
        FakeBundler::with_identifiers(["external \"pg\""]),
        RecordingInstaller::default().failing(),
    );

    let err = manager.package_initialize().await.unwrap_err();
    assert!(matches!(
        err.chain().find_map(|cause| cause.downcast_ref::<LayerError>()),
        Some(LayerError::InstallFailed { .. })
    ));
}

#[tokio::test]
async fn test_install_layers_disabled() {
    let service = TWO_LAYERS.replace("    manageNodeFolder: true\n", "    installLayers: false\n");
    let (project, descriptor) = setup_project(&service);
    let manager =
        LayerManager::new(descriptor, project.project_path(), FakeBundler::default(), RecordingInstaller::default());

    assert!(manager.package_initialize().await.unwrap().is_empty());
    assert_eq!(manager.bundler().build_count(), 0);
    assert!(!project.project_path().join("layers").exists());
}
