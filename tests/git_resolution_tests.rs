//! Resolving a role pinned to a Git remote, against a real local bare repo.

use std::path::Path;
use std::process::Command;

use molectl::deps::index_client::{IndexClient, IndexClientConfig};
use molectl::deps::{RequirementsDescriptor, RoleMeta};
use molectl::manifest::{Manifest, RoleRequirement, SourceKind};

fn run(args: &[&str], cwd: &Path) {
    let status = Command::new("git")
        .args(args)
        .current_dir(cwd)
        .status()
        .expect("git must be available for this test");
    assert!(status.success(), "git {args:?} failed in {}", cwd.display());
}

/// Builds a bare repo with the given tags on its default branch, returning
/// the `TempDir` owning it (drop it last).
fn init_bare_repo_with_tags(tags: &[&str]) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let work = dir.path().join("work");
    std::fs::create_dir_all(&work).unwrap();

    run(&["init", "-q", "-b", "main"], &work);
    run(&["config", "user.email", "test@example.invalid"], &work);
    run(&["config", "user.name", "test"], &work);
    std::fs::write(work.join("tasks.yml"), "- debug: msg=hi\n").unwrap();
    run(&["add", "."], &work);
    run(&["commit", "-q", "-m", "initial"], &work);
    for tag in tags {
        run(&["tag", tag], &work);
    }

    let bare = dir.path().join("role.git");
    run(
        &["clone", "-q", "--bare", work.to_str().unwrap(), bare.to_str().unwrap()],
        dir.path(),
    );
    dir
}

fn offline_index() -> IndexClient {
    IndexClient::new(IndexClientConfig {
        server_url: "http://127.0.0.1:1".into(),
        max_retries: 0,
        ..Default::default()
    })
    .unwrap()
}

#[tokio::test]
async fn a_git_sourced_role_resolves_to_its_greatest_matching_tag() {
    let repo = init_bare_repo_with_tags(&["v1.0.0", "v1.2.0", "v2.0.0"]);
    let url = repo.path().join("role.git");

    let mut manifest = Manifest::synthesize_default("git-role-test");
    manifest.dependencies.interpreter.pinned = "3.12".into();
    manifest.dependencies.roles.push(RoleRequirement {
        name: "default.webserver".into(),
        src: url.to_string_lossy().into_owned(),
        scm: Some(SourceKind::Git),
        constraint: "<2.0.0".into(),
    });

    let index = offline_index();
    let lock = molectl::deps::resolver::resolve(
        &manifest,
        &RoleMeta::default(),
        &RequirementsDescriptor::default(),
        &index,
    )
    .await
    .unwrap();

    assert_eq!(lock.roles.len(), 1);
    assert_eq!(lock.roles[0].name, "webserver");
    assert_eq!(lock.roles[0].resolved_version, "v1.2.0");
    assert_eq!(lock.roles[0].src, url.to_string_lossy());
}

#[tokio::test]
async fn a_bare_constraint_falls_back_to_the_default_branch_tip() {
    let repo = init_bare_repo_with_tags(&[]);
    let url = repo.path().join("role.git");

    let mut manifest = Manifest::synthesize_default("git-role-test-bare");
    manifest.dependencies.interpreter.pinned = "3.12".into();
    manifest.dependencies.roles.push(RoleRequirement {
        name: "default.webserver".into(),
        src: url.to_string_lossy().into_owned(),
        scm: Some(SourceKind::Git),
        constraint: "".into(),
    });

    let index = offline_index();
    let lock = molectl::deps::resolver::resolve(
        &manifest,
        &RoleMeta::default(),
        &RequirementsDescriptor::default(),
        &index,
    )
    .await
    .unwrap();

    assert_eq!(lock.roles.len(), 1);
    assert_eq!(lock.roles[0].resolved_version.len(), 40);
}

#[tokio::test]
async fn an_unreachable_git_remote_records_an_unresolved_constraint_instead_of_aborting() {
    let mut manifest = Manifest::synthesize_default("git-role-test-unreachable");
    manifest.dependencies.interpreter.pinned = "3.12".into();
    manifest.dependencies.roles.push(RoleRequirement {
        name: "default.ghost".into(),
        src: "/nonexistent/path/to/role.git".into(),
        scm: Some(SourceKind::Git),
        constraint: ">=1.0.0".into(),
    });

    let index = offline_index();
    let lock = molectl::deps::resolver::resolve(
        &manifest,
        &RoleMeta::default(),
        &RequirementsDescriptor::default(),
        &index,
    )
    .await
    .unwrap();

    assert_eq!(lock.roles.len(), 1);
    assert_eq!(lock.roles[0].resolved_version, "");
}
