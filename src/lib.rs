//! # molectl
//!
//! molectl drives Ansible role testing inside a disposable, privileged
//! Docker-in-Docker worker container. It covers four concerns:
//!
//! - **Dependency resolution** ([`deps`]): merges a role's own metadata,
//!   a per-scenario requirements descriptor, and the project manifest into
//!   a reproducible, content-hashed lock file, resolving against a package
//!   index and Git remotes with an index → git → literal fallback chain.
//! - **Container orchestration** ([`orchestrator`]): launches the worker,
//!   drives it through `converge`/`lint`/`verify`/`idempotence`, and tears
//!   it down, moving caches in and out via bind mounts or copy-in/copy-out
//!   depending on whether the run is local or CI.
//! - **Credential vault** ([`credentials`]): encrypts per-artifact-source
//!   credentials at rest with a machine-bound key, scoped to a single role.
//! - **Cache manager** ([`cache`]): owns the on-disk layout of the
//!   multi-layer cache (roles, collections, uv, Docker image tarball) a
//!   role's runs accumulate across invocations.
//!
//! The [`manifest`] module ties these together as a single declarative
//! project file, and [`registry_auth`] and [`lint_config`] are small
//! supporting adapters the orchestrator depends on.
//!
//! ## Quick example
//!
//! ```rust,ignore
//! use molectl::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let manifest = Manifest::load_from_dir(".".as_ref())?;
//!     let orchestrator = Orchestrator::connect(&manifest, false, 30)?;
//!     orchestrator.start("3.11", None, None, None).await?;
//!     orchestrator.converge("ansible-playbook", "playbook.yml", true).await?;
//!     orchestrator.wipe("ansible-playbook playbook.yml --tags never").await?;
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

/// Error types and the crate-wide [`Result`](error::Result) alias.
pub mod error;

/// The declarative project manifest: registry, vault, artifact sources,
/// lint profiles, tests policy, cache settings, and dependencies.
pub mod manifest;

/// Dependency resolver and lock engine.
pub mod deps;

/// Per-source encrypted credential vault.
pub mod credentials;

/// Multi-layer, per-role on-disk cache manager.
pub mod cache;

/// Container-workflow orchestrator.
pub mod orchestrator;

/// Registry authentication adapter (YC, AWS ECR, GCP Artifact Registry).
pub mod registry_auth;

/// Lint configuration projector, turning manifest lint profiles into the
/// file shapes `yamllint` and `ansible-lint` expect.
pub mod lint_config;

/// Convenient re-exports of the most commonly used types.
pub mod prelude {
    pub use crate::cache::{CacheId, CacheManager};
    pub use crate::credentials::{CredentialRecord, CredentialStore, ExternalSecretBackend, Vault};
    pub use crate::deps::{Lock, LOCK_FILE_NAME};
    pub use crate::error::{Error, Result};
    pub use crate::manifest::{Manifest, MANIFEST_FILE_NAME};
    pub use crate::orchestrator::{Orchestrator, Phase, WorkerState};
    pub use crate::registry_auth::{resolve as resolve_registry_auth, RegistryToken};
}

/// Crate version, as set in `Cargo.toml`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
