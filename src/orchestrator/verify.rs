//! Test-source resolution (§4.5.3).
//!
//! `verify` needs a `tests/` directory to exist in the scenario workspace
//! where the worker can reach it. Where that directory comes from depends on
//! the manifest's `tests.type`:
//!
//! - `local` — already in the role workspace outside CI; in CI the workspace
//!   is a disposable runner checkout, so the suite is instead pulled from the
//!   discovered remote at the discovered commit.
//! - `remote` — cloned (or overwritten) from a configured URL, directly into
//!   the scenario's `tests/` directory.
//! - `framework-managed` — a shared, cached clone of the testing framework's
//!   own bundled suite, reused across roles and copied into the scenario
//!   directory on every resolve.

use std::path::{Path, PathBuf};

use tracing::{info, warn};
use walkdir::WalkDir;

use super::VcsInfo;
use crate::deps::git_client;
use crate::error::Result;
use crate::manifest::{TestsSource, TestsSourceType};

/// The framework's own bundled test suite, cloned when a role opts into
/// `framework-managed` tests and declares no override. Overridable by
/// populating `tests.remotes` even when `type` is `framework-managed`.
pub const DEFAULT_FRAMEWORK_TESTS_URL: &str = "https://github.com/molectl/framework-tests.git";

/// Resolves `tests` into the scenario's `tests/` directory, returning its
/// path. `ci_mode` and `vcs` only matter for `local` sources: outside CI the
/// workspace's own `tests/` is used as-is, while in CI it's populated from
/// the discovered remote at the discovered commit.
pub async fn resolve(tests: &TestsSource, workspace: &Path, ci_mode: bool, vcs: Option<&VcsInfo>) -> Result<PathBuf> {
    let dest = workspace.join("tests");

    match tests.kind {
        TestsSourceType::Local => {
            if ci_mode {
                let vcs = vcs.ok_or_else(|| {
                    crate::error::Error::Config("tests.type is 'local' in CI mode but no VCS info was discovered".into())
                })?;
                let staging = std::env::temp_dir().join("molectl-local-tests").join(&vcs.commit);
                clone_remote_at_commit(&vcs.remote_url, &vcs.commit, &staging).await?;

                let source_tests = staging.join("tests");
                if source_tests.is_dir() {
                    copy_tree(&source_tests, &dest)?;
                } else {
                    warn!("remote '{}' at '{}' has no 'tests' directory", vcs.remote_url, vcs.commit);
                }
            } else if !dest.is_dir() {
                warn!("tests.type is 'local' but '{}' does not exist", dest.display());
            }
            Ok(dest)
        }
        TestsSourceType::Remote => {
            let url = tests
                .remotes
                .first()
                .ok_or_else(|| crate::error::Error::Config("tests.type is 'remote' but no remotes are configured".into()))?;
            clone_or_overwrite(url, &dest, tests.overwrite).await?;
            Ok(dest)
        }
        TestsSourceType::FrameworkManaged => {
            let url = tests.remotes.first().map(String::as_str).unwrap_or(DEFAULT_FRAMEWORK_TESTS_URL);
            let cached = framework_cache_dir(url);
            clone_or_overwrite(url, &cached, tests.overwrite).await?;
            copy_tree(&cached, &dest)?;
            Ok(dest)
        }
    }
}

/// The shared cache location for a framework-managed test clone, keyed by a
/// short hash of the source URL so multiple frameworks don't collide.
fn framework_cache_dir(url: &str) -> PathBuf {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    let digest = hasher.finalize();
    let short = digest.iter().take(8).map(|b| format!("{b:02x}")).collect::<String>();
    std::env::temp_dir().join("molectl-framework-tests").join(short)
}

async fn clone_or_overwrite(url: &str, dest: &Path, overwrite: bool) -> Result<()> {
    if dest.is_dir() {
        if !overwrite {
            info!("reusing existing test clone at '{}'", dest.display());
            return Ok(());
        }
        info!("overwrite requested, removing stale test clone at '{}'", dest.display());
        std::fs::remove_dir_all(dest)?;
    }

    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)?;
    }

    info!("cloning test suite from '{url}' into '{}'", dest.display());
    git_client::clone(url, dest).await
}

async fn clone_remote_at_commit(url: &str, commit: &str, dest: &Path) -> Result<()> {
    if dest.is_dir() {
        std::fs::remove_dir_all(dest)?;
    }
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)?;
    }

    info!("cloning '{url}' at commit '{commit}' into '{}'", dest.display());
    git_client::clone_at_commit(url, commit, dest).await
}

/// Recursively copies `src`'s contents into `dest`, creating `dest` if
/// necessary. A no-op if `src` and `dest` are the same path.
fn copy_tree(src: &Path, dest: &Path) -> Result<()> {
    if src == dest {
        return Ok(());
    }
    std::fs::create_dir_all(dest)?;

    for entry in WalkDir::new(src) {
        let entry = entry.map_err(|e| crate::error::Error::Config(format!("walking '{}': {e}", src.display())))?;
        let rel = entry.path().strip_prefix(src).expect("entry is under src by construction");
        if rel.as_os_str().is_empty() {
            continue;
        }
        let target = dest.join(rel);
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target)?;
        } else if entry.file_type().is_file() {
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn framework_cache_dir_is_stable_for_same_url() {
        let a = framework_cache_dir(DEFAULT_FRAMEWORK_TESTS_URL);
        let b = framework_cache_dir(DEFAULT_FRAMEWORK_TESTS_URL);
        assert_eq!(a, b);
    }

    #[test]
    fn framework_cache_dir_differs_for_different_urls() {
        let a = framework_cache_dir(DEFAULT_FRAMEWORK_TESTS_URL);
        let b = framework_cache_dir("https://example.invalid/other.git");
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn local_mode_points_at_workspace_tests_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("tests")).unwrap();
        let tests = TestsSource {
            kind: TestsSourceType::Local,
            remotes: vec![],
            overwrite: false,
        };
        let resolved = resolve(&tests, dir.path(), false, None).await.unwrap();
        assert_eq!(resolved, dir.path().join("tests"));
    }

    #[tokio::test]
    async fn local_mode_in_ci_without_vcs_info_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let tests = TestsSource {
            kind: TestsSourceType::Local,
            remotes: vec![],
            overwrite: false,
        };
        assert!(resolve(&tests, dir.path(), true, None).await.is_err());
    }

    #[tokio::test]
    async fn remote_mode_without_a_url_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let tests = TestsSource {
            kind: TestsSourceType::Remote,
            remotes: vec![],
            overwrite: false,
        };
        assert!(resolve(&tests, dir.path(), false, None).await.is_err());
    }

    #[test]
    fn copy_tree_mirrors_nested_files() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        let dest = dir.path().join("dest");
        std::fs::create_dir_all(src.join("nested")).unwrap();
        std::fs::write(src.join("nested").join("case.yml"), "- ok\n").unwrap();

        copy_tree(&src, &dest).unwrap();

        assert_eq!(std::fs::read_to_string(dest.join("nested").join("case.yml")).unwrap(), "- ok\n");
    }
}
