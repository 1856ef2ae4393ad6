//! Best-effort teardown (§4.5.6).
//!
//! Every step here is allowed to fail without aborting the sequence: the
//! point of `wipe` is to leave the host as clean as possible even when the
//! run it's cleaning up after went badly. Only the container-removal step
//! determines the overall result.

use bollard::container::RemoveContainerOptions;
use bollard::Docker;
use tracing::warn;

use crate::cache::CacheManager;
use crate::error::Result;
use crate::manifest::Manifest;

use super::phases::{self, Phase};
use super::state::container_name;
use super::transport;

/// Tears down the worker for `manifest`. Returns `Ok(())` if the container
/// was removed, regardless of whether the best-effort steps before it
/// succeeded.
pub async fn wipe(docker: &Docker, manifest: &Manifest, cache: &CacheManager, ci_mode: bool, destroy_command: &str) -> Result<()> {
    let role_name = manifest.role_name();
    let container = container_name(role_name);

    if let Err(e) = phases::run(docker, role_name, Phase::Destroy, destroy_command, false).await {
        warn!("inner destroy phase failed, continuing teardown: {e}");
    }

    if manifest.cache.docker_cache {
        if let Err(e) = transport::harvest_images(&container).await {
            warn!("inner image harvest failed, continuing teardown: {e}");
        }
    }

    if ci_mode {
        if let Err(e) = transport::copy_out(&container, cache, manifest.cache.docker_cache, manifest.cache.uv_cache).await {
            warn!("cache copy-out failed, continuing teardown: {e}");
        }
    }

    docker
        .remove_container(
            &container,
            Some(RemoveContainerOptions {
                force: true,
                ..Default::default()
            }),
        )
        .await
        .map_err(|e| crate::error::Error::ContainerStart(e.to_string()))?;

    if let Err(e) = std::fs::remove_dir_all(std::env::current_dir().unwrap_or_default().join(".molectl-workspace")) {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!("host workspace cleanup failed: {e}");
        }
    }

    Ok(())
}
