//! Container-workflow orchestrator (C5).
//!
//! Drives the worker container through the phases of a role test run:
//! launch, lint projection, `converge`/`lint`/`verify`/`idempotence`, and
//! teardown. `bollard` is used for container lifecycle and exec; raw
//! `docker` subprocess calls cover `cp`/`save`/`load`, which bollard has no
//! CLI-equivalent API for.

pub mod lint_inject;
pub mod phases;
pub mod start;
pub mod state;
pub mod transport;
pub mod verify;
pub mod wipe;

pub use phases::Phase;
pub use start::VcsInfo;
pub use state::WorkerState;

use bollard::Docker;
use tracing::info;

use crate::cache::CacheManager;
use crate::credentials::ExternalSecretBackend;
use crate::error::Result;
use crate::manifest::Manifest;
use crate::registry_auth::{self, RegistryToken};

/// Coordinates a single role's worker container across a full test run.
pub struct Orchestrator<'a> {
    docker: Docker,
    manifest: &'a Manifest,
    cache: CacheManager,
    ci_mode: bool,
    provider_timeout_secs: u64,
}

impl<'a> Orchestrator<'a> {
    /// Connects to the local Docker daemon via the default socket and
    /// resolves the cache for `manifest`.
    pub fn connect(manifest: &'a Manifest, ci_mode: bool, provider_timeout_secs: u64) -> Result<Self> {
        let docker = Docker::connect_with_local_defaults()
            .map_err(|e| crate::error::Error::ContainerStart(e.to_string()))?;
        let cache = CacheManager::open(&manifest.cache)?;
        Ok(Self {
            docker,
            manifest,
            cache,
            ci_mode,
            provider_timeout_secs,
        })
    }

    /// Starts the worker, resolving registry auth and per-source
    /// credentials first.
    pub async fn start(
        &self,
        pinned_interpreter: &str,
        derived_manifest_b64: Option<&str>,
        external_backend: Option<&dyn ExternalSecretBackend>,
        vcs: Option<&VcsInfo>,
    ) -> Result<()> {
        let token: Option<RegistryToken> = registry_auth::resolve(
            self.manifest.registry.provider,
            &self.manifest.registry.server,
            self.provider_timeout_secs,
        )
        .await?;

        start::start(
            &self.docker,
            self.manifest,
            &self.cache,
            token.as_ref(),
            external_backend,
            pinned_interpreter,
            derived_manifest_b64,
            self.ci_mode,
            vcs,
        )
        .await?;

        if self.ci_mode {
            let container = state::container_name(self.manifest.role_name());
            transport::copy_in(&container, &self.cache, self.manifest.cache.docker_cache, self.manifest.cache.uv_cache).await?;
        }

        Ok(())
    }

    /// Runs a single phase's command and treats a non-zero exit as fatal.
    pub async fn run_phase(&self, phase: Phase, command: &str, interactive: bool) -> Result<()> {
        phases::run_checked(&self.docker, self.manifest.role_name(), phase, command, interactive).await
    }

    /// Runs `converge`, then fixes workspace ownership on non-CI Unix hosts.
    pub async fn converge(&self, runner: &str, playbook: &str, interactive: bool) -> Result<()> {
        let command = phases::converge_command(runner, playbook);
        self.run_phase(Phase::Converge, &command, interactive).await?;

        if !self.ci_mode {
            phases::fix_workspace_ownership(&self.docker, self.manifest.role_name(), start::WORKSPACE_PATH).await;
        }
        Ok(())
    }

    /// Resolves the test source and runs `verify`.
    pub async fn verify(&self, workspace: &std::path::Path, command: &str, interactive: bool, vcs: Option<&VcsInfo>) -> Result<()> {
        let tests_dir = verify::resolve(&self.manifest.tests, workspace, self.ci_mode, vcs).await?;
        info!("running verify against '{}'", tests_dir.display());
        self.run_phase(Phase::Verify, command, interactive).await
    }

    /// Projects the manifest's lint profiles and runs `lint`.
    pub async fn lint(&self, workspace: &std::path::Path, command: &str, interactive: bool) -> Result<()> {
        if self.ci_mode {
            lint_inject::inject_into_container(&self.docker, self.manifest.role_name(), &self.manifest.lint).await?;
        } else {
            lint_inject::write_to_workspace(&self.manifest.lint, workspace)?;
        }
        self.run_phase(Phase::Lint, command, interactive).await
    }

    /// Tears the worker down, best-effort.
    pub async fn wipe(&self, destroy_command: &str) -> Result<()> {
        wipe::wipe(&self.docker, self.manifest, &self.cache, self.ci_mode, destroy_command).await
    }

    /// The underlying daemon connection, for callers that need raw access.
    pub fn docker(&self) -> &Docker {
        &self.docker
    }

    /// The resolved cache manager for this role.
    pub fn cache(&self) -> &CacheManager {
        &self.cache
    }
}
