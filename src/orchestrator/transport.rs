//! Cache transport (§4.5.4): getting the four cache subtrees and the inner
//! image tarball into and out of the worker.
//!
//! Non-CI relies entirely on the bind mounts [`super::start`] sets up; this
//! module only matters in CI mode, where runner filesystems can't be
//! trusted for bind mounts and everything moves through `docker cp`.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tokio::time::timeout;
use tracing::{info, warn};

use crate::cache::CacheManager;
use crate::error::{Error, Result};

use super::start::{COLLECTIONS_CACHE_PATH, DOCKER_IMAGE_CACHE_PATH, ROLES_CACHE_PATH, UV_CACHE_PATH};

/// Prefix excluded from inner-image harvest even though it is tagged: the
/// worker's own base images, re-pulled every run rather than cached.
const FRAMEWORK_IMAGE_PREFIX: &str = "molectl-framework/";

/// Every `docker` subprocess this module shells out to is a blocking wait
/// capped at this timeout, matching the pattern in `git_client` and
/// `registry_auth`.
const DOCKER_CLI_TIMEOUT: Duration = Duration::from_secs(120);

/// Copies the enabled cache subtrees from the host into the running
/// container. CI-mode only; non-CI uses bind mounts instead.
pub async fn copy_in(container: &str, cache: &CacheManager, docker_cache: bool, uv_cache: bool) -> Result<()> {
    mkdir_in(container, ROLES_CACHE_PATH).await?;
    mkdir_in(container, COLLECTIONS_CACHE_PATH).await?;
    copy_subtree(container, &cache.layout().roles().to_string_lossy(), ROLES_CACHE_PATH).await?;
    copy_subtree(container, &cache.layout().collections().to_string_lossy(), COLLECTIONS_CACHE_PATH).await?;

    if uv_cache {
        mkdir_in(container, UV_CACHE_PATH).await?;
        copy_subtree(container, &cache.layout().uv().to_string_lossy(), UV_CACHE_PATH).await?;
    }
    if docker_cache {
        mkdir_in(container, DOCKER_IMAGE_CACHE_PATH).await?;
        copy_subtree(container, &cache.layout().docker().to_string_lossy(), DOCKER_IMAGE_CACHE_PATH).await?;
    }
    Ok(())
}

/// Copies the enabled cache subtrees back out of the container onto the
/// host, the CI-mode mirror of [`copy_in`].
pub async fn copy_out(container: &str, cache: &CacheManager, docker_cache: bool, uv_cache: bool) -> Result<()> {
    copy_from_container(container, ROLES_CACHE_PATH, &cache.layout().roles().to_string_lossy()).await?;
    copy_from_container(container, COLLECTIONS_CACHE_PATH, &cache.layout().collections().to_string_lossy()).await?;

    if uv_cache {
        copy_from_container(container, UV_CACHE_PATH, &cache.layout().uv().to_string_lossy()).await?;
    }
    if docker_cache {
        copy_from_container(container, DOCKER_IMAGE_CACHE_PATH, &cache.layout().docker().to_string_lossy()).await?;
    }
    Ok(())
}

async fn mkdir_in(container: &str, path: &str) -> Result<()> {
    run_docker(&["exec", container, "mkdir", "-p", path]).await
}

async fn copy_subtree(container: &str, host_path: &str, container_path: &str) -> Result<()> {
    if !Path::new(host_path).is_dir() {
        return Ok(());
    }
    run_docker(&["cp", &format!("{host_path}/."), &format!("{container}:{container_path}")]).await
}

async fn copy_from_container(container: &str, container_path: &str, host_path: &str) -> Result<()> {
    std::fs::create_dir_all(host_path)?;
    run_docker(&["cp", &format!("{container}:{container_path}/."), host_path]).await
}

/// Lists tagged images in the worker's inner daemon, excludes `<none>:<none>`
/// and the framework's own base images, and `docker save`s the rest to the
/// cache's tarball path inside the container.
pub async fn harvest_images(container: &str) -> Result<()> {
    let output = timeout(
        DOCKER_CLI_TIMEOUT,
        Command::new("docker")
            .args([
                "exec",
                container,
                "docker",
                "images",
                "--format",
                "{{.Repository}}:{{.Tag}}",
            ])
            .stderr(Stdio::piped())
            .output(),
    )
    .await
    .map_err(|_| Error::ContainerStart("docker images (inner) timed out".to_string()))?
    .map_err(|e| Error::ContainerStart(e.to_string()))?;

    if !output.status.success() {
        warn!(
            "could not list inner images, skipping harvest: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        return Ok(());
    }

    let images: Vec<String> = String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(str::trim)
        .filter(|image| !image.is_empty())
        .filter(|image| *image != "<none>:<none>")
        .filter(|image| !image.starts_with(FRAMEWORK_IMAGE_PREFIX))
        .map(str::to_string)
        .collect();

    if images.is_empty() {
        info!("no inner images to harvest");
        return Ok(());
    }

    info!("harvesting {} inner image(s) into cache", images.len());
    let mut args = vec![
        "exec".to_string(),
        container.to_string(),
        "docker".to_string(),
        "save".to_string(),
        "-o".to_string(),
        format!("{DOCKER_IMAGE_CACHE_PATH}/image.tar"),
    ];
    args.extend(images);
    run_docker(&args.iter().map(String::as_str).collect::<Vec<_>>()).await
}

async fn run_docker(args: &[&str]) -> Result<()> {
    let output = timeout(DOCKER_CLI_TIMEOUT, Command::new("docker").args(args).output())
        .await
        .map_err(|_| Error::ContainerStart(format!("docker {} timed out", args.join(" "))))?
        .map_err(|e| Error::ContainerStart(e.to_string()))?;

    if !output.status.success() {
        return Err(Error::ContainerStart(format!(
            "docker {} failed: {}",
            args.join(" "),
            String::from_utf8_lossy(&output.stderr)
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn framework_images_are_excluded_from_harvest_by_prefix() {
        let images = vec![
            "<none>:<none>",
            "molectl-framework/base:latest",
            "myregistry/myimage:1.0",
        ];
        let filtered: Vec<&&str> = images
            .iter()
            .filter(|image| **image != "<none>:<none>")
            .filter(|image| !image.starts_with(FRAMEWORK_IMAGE_PREFIX))
            .collect();
        assert_eq!(filtered, vec![&"myregistry/myimage:1.0"]);
    }
}
