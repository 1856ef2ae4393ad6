//! Dependency resolver and lock engine (C4) — the hardest subsystem.
//!
//! Converts manifest constraints into a reproducible resolved set: parsing
//! (`constraint`), merging the three input sources (`merge`), querying the
//! package index and Git remotes (`index_client`, `git_client`), adjusting
//! tool versions for interpreter compatibility (`compat`), and writing a
//! content-hashed lock file (`lock`). `resolver` ties these together;
//! `derived` projects the result into the worker's package manifest.

pub mod compat;
pub mod constraint;
pub mod derived;
pub mod git_client;
pub mod index_client;
pub mod lock;
pub mod merge;
pub mod resolver;

pub use constraint::{CollectionRef, Constraint, RoleRef};
pub use lock::Lock;
pub use merge::{RequirementsDescriptor, RequirementsRole, RoleMeta};

use std::path::Path;

use crate::error::Result;
use crate::manifest::Manifest;

use index_client::IndexClient;

/// Default lock file name, sibling of the manifest.
pub const LOCK_FILE_NAME: &str = "molectl.lock.yml";

/// Path to the lock file in `dir`.
pub fn lock_path_in(dir: &Path) -> std::path::PathBuf {
    dir.join(LOCK_FILE_NAME)
}

/// Resolves `manifest` and writes the resulting lock to `dir`.
pub async fn lock(
    manifest: &Manifest,
    meta: &RoleMeta,
    requirements: &RequirementsDescriptor,
    dir: &Path,
) -> Result<Lock> {
    let index = IndexClient::with_defaults()?;
    let resolved = resolver::resolve(manifest, meta, requirements, &index).await?;
    resolved.save(&lock_path_in(dir))?;
    Ok(resolved)
}

/// Result of a staleness check (§4.4.6).
pub struct StalenessReport {
    pub stale: bool,
    pub recorded_hash: String,
    pub fresh_hash: String,
}

/// Recomputes the lock from the current manifest (re-resolving against the
/// network where possible) and compares it against whatever is on disk.
/// The engine only reports the comparison; deciding what to print or which
/// exit code to use is the caller's job.
pub async fn check(
    manifest: &Manifest,
    meta: &RoleMeta,
    requirements: &RequirementsDescriptor,
    dir: &Path,
) -> Result<StalenessReport> {
    let existing = Lock::load(&lock_path_in(dir))?;

    let index = IndexClient::with_defaults()?;
    let fresh = resolver::resolve(manifest, meta, requirements, &index).await?;

    Ok(StalenessReport {
        stale: existing.is_stale_against(&fresh),
        recorded_hash: existing.hash,
        fresh_hash: fresh.hash,
    })
}
