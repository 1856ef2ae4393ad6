//! Multi-layer, per-role cache manager (C3).
//!
//! A cache identity (`CacheId`) is generated once per role and persisted in
//! the manifest; it names a directory under `<user-home>/.cache/` (or a
//! project-configured custom path) with a fixed subdirectory layout:
//!
//! - `roles/`, `collections/` — always present when the cache is enabled.
//! - `uv/` — present when the uv package cache is enabled.
//! - `docker/` — present when the Docker image cache is enabled; holds a
//!   single opaque `image.tar`.
//!
//! This module only owns the filesystem layout and size accounting. Creating
//! or restoring the Docker tarball requires a running daemon and is the
//! orchestrator's job (C5).

mod id;
mod layout;

pub use id::CacheId;
pub use layout::CacheLayout;

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::Result;
use crate::manifest::CacheSettings;

/// Name of the single opaque Docker image tarball kept per cache.
pub const DOCKER_TARBALL_NAME: &str = "image.tar";

/// Owns the on-disk layout for one role's cache.
pub struct CacheManager {
    layout: CacheLayout,
}

impl CacheManager {
    /// Resolves the cache base directory for `settings`, preferring
    /// `custom_path` when it names an existing directory.
    pub fn base_dir(settings: &CacheSettings) -> Result<PathBuf> {
        let root = if !settings.custom_path.is_empty() && Path::new(&settings.custom_path).is_dir()
        {
            PathBuf::from(&settings.custom_path).join("cache")
        } else {
            dirs::home_dir()
                .ok_or_else(|| {
                    crate::error::Error::Config(
                        "could not determine the current user's home directory".into(),
                    )
                })?
                .join(".cache")
        };
        Ok(root.join(format!("role_{}", settings.cache_id)))
    }

    /// Builds a manager for an already-assigned cache id.
    pub fn open(settings: &CacheSettings) -> Result<Self> {
        let base = Self::base_dir(settings)?;
        Ok(Self {
            layout: CacheLayout::new(base, settings.docker_cache, settings.uv_cache),
        })
    }

    /// Builds a manager directly from a base directory, bypassing manifest
    /// resolution; used by tests.
    pub fn open_at(base: PathBuf, docker_cache: bool, uv_cache: bool) -> Self {
        Self {
            layout: CacheLayout::new(base, docker_cache, uv_cache),
        }
    }

    /// The resolved layout.
    pub fn layout(&self) -> &CacheLayout {
        &self.layout
    }

    /// Idempotently creates every directory the layout requires.
    pub fn ensure(&self) -> Result<()> {
        self.layout.ensure()
    }

    /// Recursively removes the entire cache directory for this role. Silent
    /// if it does not exist.
    pub fn cleanup(&self) -> Result<()> {
        match std::fs::remove_dir_all(self.layout.base()) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Lists the top-level directory names present under the cache base.
    pub fn list(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let base = self.layout.base();
        if !base.exists() {
            return Ok(names);
        }
        for entry in std::fs::read_dir(base)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    /// Total size in bytes of everything under the cache base.
    pub fn size(&self) -> Result<u64> {
        subdir_size(self.layout.base())
    }

    /// Size in bytes of a single subdirectory (`roles`, `collections`, `uv`,
    /// or `docker`).
    pub fn subdir_size(&self, subdir: &str) -> Result<u64> {
        subdir_size(&self.layout.base().join(subdir))
    }

    /// Path to the opaque Docker image tarball, regardless of whether it
    /// currently exists.
    pub fn docker_tarball_path(&self) -> PathBuf {
        self.layout.docker().join(DOCKER_TARBALL_NAME)
    }

    /// Whether the Docker image tarball currently exists on disk.
    pub fn has_tarball(&self) -> bool {
        self.docker_tarball_path().is_file()
    }
}

fn subdir_size(path: &Path) -> Result<u64> {
    if !path.exists() {
        return Ok(0);
    }
    let mut total = 0u64;
    for entry in WalkDir::new(path).into_iter().filter_map(|e| e.ok()) {
        if entry.file_type().is_file() {
            total += entry.metadata().map(|m| m.len()).unwrap_or(0);
        }
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_creates_always_on_subdirectories() {
        let dir = tempfile::tempdir().unwrap();
        let manager = CacheManager::open_at(dir.path().join("role_abc"), false, false);
        manager.ensure().unwrap();
        assert!(manager.layout().roles().is_dir());
        assert!(manager.layout().collections().is_dir());
        assert!(!manager.layout().uv().is_dir());
        assert!(!manager.layout().docker().is_dir());
    }

    #[test]
    fn ensure_creates_optional_subdirectories_when_enabled() {
        let dir = tempfile::tempdir().unwrap();
        let manager = CacheManager::open_at(dir.path().join("role_abc"), true, true);
        manager.ensure().unwrap();
        assert!(manager.layout().uv().is_dir());
        assert!(manager.layout().docker().is_dir());
    }

    #[test]
    fn cleanup_removes_the_whole_base_and_tolerates_absence() {
        let dir = tempfile::tempdir().unwrap();
        let manager = CacheManager::open_at(dir.path().join("role_abc"), true, true);
        manager.ensure().unwrap();
        manager.cleanup().unwrap();
        assert!(!manager.layout().base().exists());
        manager.cleanup().unwrap();
    }

    #[test]
    fn size_sums_file_bytes_recursively() {
        let dir = tempfile::tempdir().unwrap();
        let manager = CacheManager::open_at(dir.path().join("role_abc"), false, false);
        manager.ensure().unwrap();
        std::fs::write(manager.layout().roles().join("a.txt"), b"12345").unwrap();
        std::fs::write(manager.layout().collections().join("b.txt"), b"123").unwrap();
        assert_eq!(manager.size().unwrap(), 8);
        assert_eq!(manager.subdir_size("roles").unwrap(), 5);
    }

    #[test]
    fn has_tarball_reflects_presence() {
        let dir = tempfile::tempdir().unwrap();
        let manager = CacheManager::open_at(dir.path().join("role_abc"), true, false);
        manager.ensure().unwrap();
        assert!(!manager.has_tarball());
        std::fs::write(manager.docker_tarball_path(), b"tar").unwrap();
        assert!(manager.has_tarball());
    }
}
