//! Git remote ref listing, shelled out to the `git` binary rather than
//! linking libgit2 — the same process-invocation style the teacher uses for
//! every external tool it drives.

use std::time::Duration;

use tokio::process::Command;
use tokio::time::timeout;

use crate::error::{Error, Result};

const LS_REMOTE_TIMEOUT: Duration = Duration::from_secs(60);
const CLONE_TIMEOUT: Duration = Duration::from_secs(300);
const CHECKOUT_TIMEOUT: Duration = Duration::from_secs(60);

/// Lists tag names at `url` via `git ls-remote --tags`, stripping the
/// `refs/tags/` prefix and any `^{}` peeled-tag suffix.
pub async fn list_tags(url: &str) -> Result<Vec<String>> {
    let output = timeout(
        LS_REMOTE_TIMEOUT,
        Command::new("git")
            .args(["ls-remote", "--tags", url])
            .output(),
    )
    .await
    .map_err(|_| Error::Config(format!("git ls-remote timed out for '{url}'")))??;

    if !output.status.success() {
        return Err(Error::Config(format!(
            "git ls-remote failed for '{url}': {}",
            String::from_utf8_lossy(&output.stderr)
        )));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let mut tags: Vec<String> = stdout
        .lines()
        .filter_map(|line| line.split_whitespace().nth(1))
        .filter_map(|r#ref| r#ref.strip_prefix("refs/tags/"))
        .filter(|tag| !tag.ends_with("^{}"))
        .map(|tag| tag.to_string())
        .collect();
    tags.sort();
    tags.dedup();
    Ok(tags)
}

/// Discovers the default branch's tip commit, used for the "bare/latest
/// constraint from a Git source" case.
pub async fn default_branch_tip(url: &str) -> Result<Option<String>> {
    let output = timeout(
        LS_REMOTE_TIMEOUT,
        Command::new("git").args(["ls-remote", url, "HEAD"]).output(),
    )
    .await
    .map_err(|_| Error::Config(format!("git ls-remote timed out for '{url}'")))??;

    if !output.status.success() {
        return Ok(None);
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    Ok(stdout
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().next())
        .map(|s| s.to_string()))
}

/// Shallow-clones `url` into `dest` (which must not already exist).
pub async fn clone(url: &str, dest: &std::path::Path) -> Result<()> {
    let output = timeout(
        CLONE_TIMEOUT,
        Command::new("git")
            .args(["clone", "-q", "--depth", "1", url])
            .arg(dest)
            .output(),
    )
    .await
    .map_err(|_| Error::Config(format!("git clone timed out for '{url}'")))??;

    if !output.status.success() {
        return Err(Error::Config(format!(
            "git clone failed for '{url}': {}",
            String::from_utf8_lossy(&output.stderr)
        )));
    }
    Ok(())
}

/// Clones `url` into `dest` (which must not already exist), then checks out
/// `commit`. Used to reconstruct a specific point in a repo's history rather
/// than just its current tip.
pub async fn clone_at_commit(url: &str, commit: &str, dest: &std::path::Path) -> Result<()> {
    let output = timeout(CLONE_TIMEOUT, Command::new("git").args(["clone", "-q", url]).arg(dest).output())
        .await
        .map_err(|_| Error::Config(format!("git clone timed out for '{url}'")))??;

    if !output.status.success() {
        return Err(Error::Config(format!(
            "git clone failed for '{url}': {}",
            String::from_utf8_lossy(&output.stderr)
        )));
    }

    let checkout = timeout(
        CHECKOUT_TIMEOUT,
        Command::new("git").arg("-C").arg(dest).args(["checkout", "-q", commit]).output(),
    )
    .await
    .map_err(|_| Error::Config(format!("git checkout of '{commit}' timed out")))??;

    if !checkout.status.success() {
        return Err(Error::Config(format!(
            "git checkout of '{commit}' failed: {}",
            String::from_utf8_lossy(&checkout.stderr)
        )));
    }
    Ok(())
}
