//! Pluggable external secret backend.
//!
//! An artifact source can be marked `use_external`, in which case its
//! credentials are not read from the on-disk vault but fetched from a
//! backend such as HashiCorp Vault at orchestration time.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::{Error, Result};

/// The `{username, token}` pair (or arbitrary field set) returned by a
/// backend fetch.
pub type SecretMap = HashMap<String, String>;

/// A pluggable source of `{username, token}` pairs, keyed by `(path, name)`.
///
/// Implementations must not assume any particular secret-engine shape beyond
/// "returns a flat string map"; field name lookup (`user_field`/`token_field`)
/// is the caller's responsibility.
#[async_trait]
pub trait ExternalSecretBackend: Send + Sync {
    /// Human-readable backend name, used in error messages and logs.
    fn name(&self) -> &str;

    /// Fetches the secret at `path` named `name`, returning its full field
    /// map.
    async fn fetch(&self, path: &str, name: &str) -> Result<SecretMap>;
}

/// Looks up `user_field`/`token_field` in a fetched [`SecretMap`], producing
/// a structured error naming the missing field rather than panicking.
pub fn extract_fields(
    backend_name: &str,
    source_name: &str,
    map: &SecretMap,
    user_field: &str,
    token_field: &str,
) -> Result<(String, String)> {
    let username = map.get(user_field).cloned().ok_or_else(|| Error::ExternalBackend {
        backend: backend_name.to_string(),
        name: source_name.to_string(),
        message: format!("missing field '{user_field}'"),
    })?;
    let token = map.get(token_field).cloned().ok_or_else(|| Error::ExternalBackend {
        backend: backend_name.to_string(),
        name: source_name.to_string(),
        message: format!("missing field '{token_field}'"),
    })?;
    Ok((username, token))
}

/// HashiCorp Vault KV-v2 backend, authenticating with `VAULT_ADDR`/`VAULT_TOKEN`.
pub struct HashiCorpVaultBackend {
    addr: String,
    token: String,
    client: reqwest::Client,
}

impl HashiCorpVaultBackend {
    /// Builds a backend from the standard Vault environment variables.
    pub fn from_env() -> Result<Self> {
        let addr = std::env::var("VAULT_ADDR")
            .map_err(|_| Error::Config("VAULT_ADDR is not set".into()))?;
        let token = std::env::var("VAULT_TOKEN")
            .map_err(|_| Error::Config("VAULT_TOKEN is not set".into()))?;
        Ok(Self {
            addr,
            token,
            client: reqwest::Client::new(),
        })
    }
}

#[async_trait]
impl ExternalSecretBackend for HashiCorpVaultBackend {
    fn name(&self) -> &str {
        "hashicorp_vault"
    }

    async fn fetch(&self, path: &str, name: &str) -> Result<SecretMap> {
        let url = format!("{}/v1/secret/data/{}", self.addr.trim_end_matches('/'), path);
        let response = self
            .client
            .get(&url)
            .header("X-Vault-Token", &self.token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Error::ExternalBackend {
                backend: self.name().to_string(),
                name: name.to_string(),
                message: format!("vault returned status {}", response.status()),
            });
        }

        #[derive(serde::Deserialize)]
        struct KvResponse {
            data: KvData,
        }
        #[derive(serde::Deserialize)]
        struct KvData {
            data: SecretMap,
        }

        let body: KvResponse = response.json().await?;
        Ok(body.data.data)
    }
}

/// In-memory backend used by tests to substitute for a real secret store.
#[derive(Default)]
pub struct InMemoryBackend {
    entries: HashMap<String, SecretMap>,
}

impl InMemoryBackend {
    /// Creates an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a fixture entry at `path/name`.
    pub fn insert(&mut self, path: &str, name: &str, map: SecretMap) {
        self.entries.insert(format!("{path}/{name}"), map);
    }
}

#[async_trait]
impl ExternalSecretBackend for InMemoryBackend {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn fetch(&self, path: &str, name: &str) -> Result<SecretMap> {
        self.entries
            .get(&format!("{path}/{name}"))
            .cloned()
            .ok_or_else(|| Error::ExternalBackend {
                backend: self.name().to_string(),
                name: name.to_string(),
                message: "no such secret".into(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_backend_round_trips() {
        let mut backend = InMemoryBackend::new();
        let mut map = SecretMap::new();
        map.insert("user".into(), "u".into());
        map.insert("token".into(), "t".into());
        backend.insert("secret/ci", "nexus", map);

        let fetched = backend.fetch("secret/ci", "nexus").await.unwrap();
        let (user, token) = extract_fields("in_memory", "nexus", &fetched, "user", "token").unwrap();
        assert_eq!(user, "u");
        assert_eq!(token, "t");
    }

    #[tokio::test]
    async fn missing_field_is_a_structured_error() {
        let mut backend = InMemoryBackend::new();
        backend.insert("secret/ci", "nexus", SecretMap::new());
        let fetched = backend.fetch("secret/ci", "nexus").await.unwrap();
        let err = extract_fields("in_memory", "nexus", &fetched, "user", "token").unwrap_err();
        assert!(matches!(err, Error::ExternalBackend { .. }));
    }

    #[tokio::test]
    async fn unknown_path_is_an_error() {
        let backend = InMemoryBackend::new();
        assert!(backend.fetch("secret/ci", "missing").await.is_err());
    }
}
