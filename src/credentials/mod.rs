//! Per-source credential vault.
//!
//! Credentials for artifact sources (package registries, Git hosts) are
//! encrypted at rest with a machine-bound key and scoped to a single role
//! under `<user-home>/.credentials/<role>/`. There is no user-supplied
//! password: the key is derived deterministically from the host identity, so
//! a credential file copied to another machine or user account simply fails
//! to decrypt.

mod external;
mod store;
mod vault;

pub use external::{extract_fields, ExternalSecretBackend, HashiCorpVaultBackend, InMemoryBackend, SecretMap};
pub use store::CredentialStore;
pub use vault::Vault;

use serde::{Deserialize, Serialize};

/// A single artifact source's credentials, at rest and in memory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRecord {
    /// Source name, matches the manifest's artifact source name.
    pub name: String,
    /// Source URL.
    pub url: String,
    /// Username.
    pub username: String,
    /// Token or password.
    pub token: String,
}
