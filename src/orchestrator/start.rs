//! Worker container launch (§4.5.2).
//!
//! Environment variables are the tool's message bus to the worker: the map
//! built here is assembled once and handed straight to the container
//! config. It is never written to `std::env` — treating it as process-wide
//! state would leak one role's credentials into another's launch in the
//! same process.

use std::collections::HashMap;

use bollard::container::{Config, CreateContainerOptions};
use bollard::models::{HostConfig, Mount, MountTypeEnum};
use bollard::Docker;
use tracing::{info, warn};

use crate::cache::CacheManager;
use crate::credentials::{extract_fields, CredentialRecord, CredentialStore, ExternalSecretBackend};
use crate::error::{Error, Result};
use crate::manifest::{ArtifactSource, Manifest};
use crate::registry_auth::RegistryToken;

use super::state::{self, WorkerState};

/// Fixed in-container paths. Always literal POSIX strings, never built with
/// a host-aware path join.
pub const WORKSPACE_PATH: &str = "/workspace";
pub const ROLES_CACHE_PATH: &str = "/root/.ansible/roles";
pub const COLLECTIONS_CACHE_PATH: &str = "/root/.ansible/collections";
pub const UV_CACHE_PATH: &str = "/root/.cache/uv";
pub const DOCKER_IMAGE_CACHE_PATH: &str = "/var/lib/docker-cache";
pub const CGROUP_PATH: &str = "/sys/fs/cgroup";

/// Maximum number of artifact-source credential triplets injected.
const MAX_CREDENTIAL_SLOTS: usize = 10;

/// A credential resolved for one artifact source, ready for env injection.
struct ResolvedCredential {
    index: usize,
    username: String,
    token: String,
    url: String,
}

/// Information about the local VCS checkout, injected only in CI mode.
pub struct VcsInfo {
    pub remote_url: String,
    pub commit: String,
}

/// Starts the worker container for `manifest`, or returns a
/// [`Error::StateConflict`] if one is already running.
pub async fn start(
    docker: &Docker,
    manifest: &Manifest,
    cache: &CacheManager,
    registry_token: Option<&RegistryToken>,
    external_backend: Option<&dyn ExternalSecretBackend>,
    pinned_interpreter: &str,
    derived_manifest_b64: Option<&str>,
    ci_mode: bool,
    vcs: Option<&VcsInfo>,
) -> Result<()> {
    let role_name = manifest.role_name();
    let name = state::container_name(role_name);

    if state::inspect(docker, role_name).await? == WorkerState::Running {
        return Err(Error::StateConflict(format!(
            "worker '{name}' is already running"
        )));
    }

    let credentials = resolve_credentials(role_name, &manifest.artifact_sources, external_backend).await;

    let env = build_env(
        registry_token,
        pinned_interpreter,
        derived_manifest_b64,
        &credentials,
        ci_mode,
        vcs,
    );
    let env_vec: Vec<String> = env.iter().map(|(k, v)| format!("{k}={v}")).collect();

    let mounts = if ci_mode {
        Vec::new()
    } else {
        cache.ensure()?;
        build_mounts(manifest, cache)
    };

    let options = CreateContainerOptions {
        name: name.clone(),
        platform: None,
    };
    let config = Config {
        image: Some(format!("{}:{}", manifest.registry.image, manifest.registry.tag)),
        env: Some(env_vec),
        host_config: Some(HostConfig {
            privileged: Some(true),
            mounts: if mounts.is_empty() { None } else { Some(mounts) },
            ..Default::default()
        }),
        ..Default::default()
    };

    info!("starting worker container '{name}'");
    docker
        .create_container(Some(options), config)
        .await
        .map_err(|e| Error::ContainerStart(e.to_string()))?;
    docker
        .start_container::<String>(&name, None)
        .await
        .map_err(|e| Error::ContainerStart(e.to_string()))?;

    Ok(())
}

fn build_mounts(manifest: &Manifest, cache: &CacheManager) -> Vec<Mount> {
    let mut mounts = vec![
        bind(WORKSPACE_PATH, &std::env::current_dir().unwrap_or_default().to_string_lossy()),
        bind(ROLES_CACHE_PATH, &cache.layout().roles().to_string_lossy()),
        bind(COLLECTIONS_CACHE_PATH, &cache.layout().collections().to_string_lossy()),
    ];
    if manifest.cache.uv_cache {
        mounts.push(bind(UV_CACHE_PATH, &cache.layout().uv().to_string_lossy()));
    }
    if manifest.cache.docker_cache {
        mounts.push(bind(DOCKER_IMAGE_CACHE_PATH, &cache.layout().docker().to_string_lossy()));
    }
    if std::path::Path::new(CGROUP_PATH).exists() {
        mounts.push(bind(CGROUP_PATH, CGROUP_PATH));
    }
    mounts
}

fn bind(target: &str, source: &str) -> Mount {
    Mount {
        target: Some(target.to_string()),
        source: Some(source.to_string()),
        typ: Some(MountTypeEnum::BIND),
        ..Default::default()
    }
}

fn build_env(
    registry_token: Option<&RegistryToken>,
    pinned_interpreter: &str,
    derived_manifest_b64: Option<&str>,
    credentials: &[ResolvedCredential],
    ci_mode: bool,
    vcs: Option<&VcsInfo>,
) -> HashMap<String, String> {
    let mut env = HashMap::new();

    if let Some(token) = registry_token {
        env.insert("TOKEN".to_string(), token.token.clone());
    }
    if let Ok(addr) = std::env::var("VAULT_ADDR") {
        env.insert("VAULT_ADDR".to_string(), addr);
    }
    if let Ok(token) = std::env::var("VAULT_TOKEN") {
        env.insert("VAULT_TOKEN".to_string(), token);
    }

    env.insert("PYTHON_VERSION".to_string(), pinned_interpreter.to_string());

    if let Some(b64) = derived_manifest_b64 {
        env.insert("MOLECTL_DERIVED_MANIFEST".to_string(), b64.to_string());
    }

    for cred in credentials {
        if cred.index == 0 || cred.index > MAX_CREDENTIAL_SLOTS {
            continue;
        }
        env.insert(format!("VAR_USER_{}", cred.index), cred.username.clone());
        env.insert(format!("VAR_TOKEN_{}", cred.index), cred.token.clone());
        env.insert(format!("VAR_URL_{}", cred.index), cred.url.clone());
    }

    if ci_mode {
        if let Some(vcs) = vcs {
            env.insert("MOLECTL_REPO_URL".to_string(), vcs.remote_url.clone());
            env.insert("MOLECTL_REPO_COMMIT".to_string(), vcs.commit.clone());
        }
    }

    env
}

async fn resolve_credentials(
    role_name: &str,
    sources: &[ArtifactSource],
    external_backend: Option<&dyn ExternalSecretBackend>,
) -> Vec<ResolvedCredential> {
    let mut resolved = Vec::new();
    let store = match CredentialStore::open(role_name) {
        Ok(store) => Some(store),
        Err(e) => {
            warn!("could not open credential store for '{role_name}': {e}");
            None
        }
    };

    for (zero_based, source) in sources.iter().enumerate() {
        let index = zero_based + 1;
        if source.name.is_empty() {
            continue;
        }

        let record = if source.use_external {
            match external_backend {
                Some(backend) => match backend.fetch(&source.path, &source.secret_name).await {
                    Ok(map) => extract_fields(
                        backend.name(),
                        &source.name,
                        &map,
                        &source.user_field,
                        &source.token_field,
                    )
                    .map(|(username, token)| CredentialRecord {
                        name: source.name.clone(),
                        url: source.url.clone(),
                        username,
                        token,
                    })
                    .map_err(|e| {
                        warn!("external secret for source '{}' incomplete: {e}", source.name);
                        e
                    })
                    .ok(),
                    Err(e) => {
                        warn!("external backend lookup failed for '{}': {e}", source.name);
                        None
                    }
                },
                None => {
                    warn!("source '{}' requests an external backend but none is configured", source.name);
                    None
                }
            }
        } else {
            match &store {
                Some(store) => match store.load(&source.name) {
                    Ok(record) => Some(record),
                    Err(e) => {
                        warn!("no local credentials for source '{}': {e}", source.name);
                        None
                    }
                },
                None => None,
            }
        };

        match record {
            Some(record) => resolved.push(ResolvedCredential {
                index,
                username: record.username,
                token: record.token,
                url: record.url,
            }),
            None => warn!("skipping source '{}': no credentials available", source.name),
        }
    }

    resolved
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_env_injects_indexed_triplets_in_order() {
        let credentials = vec![
            ResolvedCredential {
                index: 1,
                username: "github_user".into(),
                token: "gh_token".into(),
                url: "https://github.com".into(),
            },
            ResolvedCredential {
                index: 2,
                username: "nexus_user".into(),
                token: "nexus_token".into(),
                url: "https://nexus.example.invalid".into(),
            },
        ];

        let env = build_env(None, "3.13", None, &credentials, false, None);

        assert_eq!(env.get("VAR_USER_1"), Some(&"github_user".to_string()));
        assert_eq!(env.get("VAR_TOKEN_1"), Some(&"gh_token".to_string()));
        assert_eq!(env.get("VAR_URL_1"), Some(&"https://github.com".to_string()));
        assert_eq!(env.get("VAR_USER_2"), Some(&"nexus_user".to_string()));
        assert!(!env.contains_key("VAR_USER_3"));
    }

    #[test]
    fn build_env_carries_pinned_interpreter() {
        let env = build_env(None, "3.12", None, &[], false, None);
        assert_eq!(env.get("PYTHON_VERSION"), Some(&"3.12".to_string()));
    }

    #[test]
    fn ci_mode_injects_vcs_metadata() {
        let vcs = VcsInfo {
            remote_url: "https://example.invalid/repo.git".into(),
            commit: "abc123".into(),
        };
        let env = build_env(None, "3.13", None, &[], true, Some(&vcs));
        assert_eq!(env.get("MOLECTL_REPO_COMMIT"), Some(&"abc123".to_string()));
    }
}
