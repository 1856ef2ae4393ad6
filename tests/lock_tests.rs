//! Staleness detection and orphan-role removal across a full resolve/lock cycle.

use molectl::deps::index_client::{IndexClient, IndexClientConfig};
use molectl::deps::{self, lock_path_in, RequirementsDescriptor, RoleMeta};
use molectl::manifest::{CollectionRequirement, Manifest, RoleRequirement, SourceKind};
use wiremock::matchers::{method, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn base_manifest() -> Manifest {
    let mut manifest = Manifest::synthesize_default("lock-test-role");
    manifest.dependencies.interpreter.pinned = "3.12".into();
    manifest
}

async fn index_pointing_at(server: &MockServer) -> IndexClient {
    IndexClient::new(IndexClientConfig {
        server_url: server.uri(),
        max_retries: 0,
        ..Default::default()
    })
    .unwrap()
}

#[tokio::test]
async fn a_fresh_lock_is_not_stale_against_itself() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/api/v3/.*/versions/$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": [{"version": "1.2.0"}]
        })))
        .mount(&server)
        .await;

    let mut manifest = base_manifest();
    manifest.dependencies.collections.push(CollectionRequirement {
        name: "community.docker".into(),
        constraint: ">=1.0.0".into(),
        source: SourceKind::Index,
        source_url: None,
    });

    let index = index_pointing_at(&server).await;
    let meta = RoleMeta::default();
    let requirements = RequirementsDescriptor::default();

    let first = molectl::deps::resolver::resolve(&manifest, &meta, &requirements, &index)
        .await
        .unwrap();
    let second = molectl::deps::resolver::resolve(&manifest, &meta, &requirements, &index)
        .await
        .unwrap();

    assert!(!first.is_stale_against(&second));
    assert_eq!(first.hash, second.hash);
}

#[tokio::test]
async fn adding_a_collection_marks_the_lock_stale() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/api/v3/.*/versions/$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": [{"version": "2.0.0"}]
        })))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let mut manifest = base_manifest();
    let meta = RoleMeta::default();
    let requirements = RequirementsDescriptor::default();

    let index = index_pointing_at(&server).await;
    let original = molectl::deps::resolver::resolve(&manifest, &meta, &requirements, &index)
        .await
        .unwrap();
    original.save(&lock_path_in(dir.path())).unwrap();

    manifest.dependencies.collections.push(CollectionRequirement {
        name: "community.general".into(),
        constraint: ">=2.0.0".into(),
        source: SourceKind::Index,
        source_url: None,
    });

    let report = deps_check_against(&server, &manifest, dir.path()).await;
    assert!(report.stale);
    assert_ne!(report.recorded_hash, report.fresh_hash);
}

#[tokio::test]
async fn a_role_dropped_from_the_manifest_disappears_from_the_next_lock() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/api/v3/.*/versions/$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "data": [] })))
        .mount(&server)
        .await;

    let mut manifest = base_manifest();
    manifest.dependencies.roles.push(RoleRequirement {
        name: "default.kept".into(),
        src: "".into(),
        scm: None,
        constraint: "".into(),
    });
    manifest.dependencies.roles.push(RoleRequirement {
        name: "default.removed".into(),
        src: "".into(),
        scm: None,
        constraint: "".into(),
    });

    let index = index_pointing_at(&server).await;
    let meta = RoleMeta::default();
    let requirements = RequirementsDescriptor::default();

    let with_both = molectl::deps::resolver::resolve(&manifest, &meta, &requirements, &index)
        .await
        .unwrap();
    assert_eq!(with_both.roles.len(), 2);

    manifest.dependencies.roles.retain(|r| r.name != "default.removed");

    let with_one = molectl::deps::resolver::resolve(&manifest, &meta, &requirements, &index)
        .await
        .unwrap();
    assert_eq!(with_one.roles.len(), 1);
    assert_eq!(with_one.roles[0].name, "kept");
    assert!(with_both.is_stale_against(&with_one));
}

async fn deps_check_against(
    server: &MockServer,
    manifest: &Manifest,
    dir: &std::path::Path,
) -> deps::StalenessReport {
    let meta = RoleMeta::default();
    let requirements = RequirementsDescriptor::default();
    let existing = molectl::deps::Lock::load(&lock_path_in(dir)).unwrap();
    let index = index_pointing_at(server).await;
    let fresh = molectl::deps::resolver::resolve(manifest, &meta, &requirements, &index)
        .await
        .unwrap();
    deps::StalenessReport {
        stale: existing.is_stale_against(&fresh),
        recorded_hash: existing.hash,
        fresh_hash: fresh.hash,
    }
}
