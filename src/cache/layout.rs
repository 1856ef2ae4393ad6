//! Fixed subdirectory layout under a cache base directory.

use std::path::PathBuf;

use crate::error::Result;

/// The four fixed subdirectories of a role's cache, two of which
/// (`uv`, `docker`) are conditional on manifest settings.
pub struct CacheLayout {
    base: PathBuf,
    docker_cache: bool,
    uv_cache: bool,
}

impl CacheLayout {
    /// Builds a layout rooted at `base`.
    pub fn new(base: PathBuf, docker_cache: bool, uv_cache: bool) -> Self {
        Self {
            base,
            docker_cache,
            uv_cache,
        }
    }

    /// The cache root directory.
    pub fn base(&self) -> &std::path::Path {
        &self.base
    }

    /// `<base>/roles`
    pub fn roles(&self) -> PathBuf {
        self.base.join("roles")
    }

    /// `<base>/collections`
    pub fn collections(&self) -> PathBuf {
        self.base.join("collections")
    }

    /// `<base>/uv`
    pub fn uv(&self) -> PathBuf {
        self.base.join("uv")
    }

    /// `<base>/docker`
    pub fn docker(&self) -> PathBuf {
        self.base.join("docker")
    }

    /// Creates every subdirectory this layout currently requires.
    pub fn ensure(&self) -> Result<()> {
        std::fs::create_dir_all(self.roles())?;
        std::fs::create_dir_all(self.collections())?;
        if self.uv_cache {
            std::fs::create_dir_all(self.uv())?;
        }
        if self.docker_cache {
            std::fs::create_dir_all(self.docker())?;
        }
        Ok(())
    }
}
