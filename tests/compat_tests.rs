//! Tool/interpreter compatibility adjustment as the resolver applies it.

use molectl::deps::index_client::{IndexClient, IndexClientConfig};
use molectl::deps::{RequirementsDescriptor, RoleMeta};
use molectl::manifest::Manifest;

fn offline_index() -> IndexClient {
    IndexClient::new(IndexClientConfig {
        server_url: "http://127.0.0.1:1".into(),
        max_retries: 0,
        ..Default::default()
    })
    .unwrap()
}

#[tokio::test]
async fn an_incompatible_runner_constraint_is_substituted_in_the_lock() {
    let mut manifest = Manifest::synthesize_default("compat-test");
    manifest.dependencies.interpreter.pinned = "3.13".into();
    manifest.dependencies.tools.runner = ">=10.0.0".into();

    let index = offline_index();
    let lock = molectl::deps::resolver::resolve(
        &manifest,
        &RoleMeta::default(),
        &RequirementsDescriptor::default(),
        &index,
    )
    .await
    .unwrap();

    let runner = lock.tools.iter().find(|t| t.name == "runner").unwrap();
    assert_eq!(runner.constraint, ">=13.0.0");
}

#[tokio::test]
async fn a_disallowed_interpreter_fails_resolution_before_any_network_call() {
    let mut manifest = Manifest::synthesize_default("compat-test-bad-interpreter");
    manifest.dependencies.interpreter.pinned = "2.7".into();

    let index = offline_index();
    let result = molectl::deps::resolver::resolve(
        &manifest,
        &RoleMeta::default(),
        &RequirementsDescriptor::default(),
        &index,
    )
    .await;

    assert!(result.is_err());
}

#[tokio::test]
async fn a_patch_version_is_truncated_and_accepted() {
    let mut manifest = Manifest::synthesize_default("compat-test-patch");
    manifest.dependencies.interpreter.pinned = "3.11.4".into();

    let index = offline_index();
    let lock = molectl::deps::resolver::resolve(
        &manifest,
        &RoleMeta::default(),
        &RequirementsDescriptor::default(),
        &index,
    )
    .await
    .unwrap();

    assert_eq!(lock.interpreter.pinned, "3.11");
}
