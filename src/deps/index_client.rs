//! HTTP client for the collection package index.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Default package index server URL.
pub const DEFAULT_INDEX_SERVER: &str = "https://galaxy.ansible.com";

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_RETRY_DELAY_MS: u64 = 500;

/// Configuration for [`IndexClient`].
#[derive(Debug, Clone)]
pub struct IndexClientConfig {
    pub server_url: String,
    pub timeout: Duration,
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub token: Option<String>,
}

impl Default for IndexClientConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_INDEX_SERVER.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: Duration::from_millis(DEFAULT_RETRY_DELAY_MS),
            token: None,
        }
    }
}

/// HTTP client over the collection package index, with bounded retries and
/// no fallback server logic of its own — the index -> git -> literal
/// fallback chain lives one layer up, in the resolver.
pub struct IndexClient {
    client: Client,
    config: IndexClientConfig,
}

impl IndexClient {
    /// Builds a client from `config`.
    pub fn new(config: IndexClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(Error::from)?;
        Ok(Self { client, config })
    }

    /// Builds a client with default configuration.
    pub fn with_defaults() -> Result<Self> {
        Self::new(IndexClientConfig::default())
    }

    /// Lists all published versions for `namespace.name`, newest-unordered
    /// (the resolver picks the greatest satisfying version itself).
    pub async fn list_versions(&self, name: &str) -> Result<Vec<String>> {
        let Some((namespace, collection_name)) = name.split_once('.') else {
            return Err(Error::DependencyValidation(format!(
                "collection name '{name}' must be in 'namespace.name' form"
            )));
        };
        let url = format!(
            "{}/api/v3/plugin/ansible/content/published/collections/index/{}/{}/versions/",
            self.config.server_url.trim_end_matches('/'),
            namespace,
            collection_name
        );

        let response = self.get_with_retry(&url).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        if !response.status().is_success() {
            return Err(Error::Config(format!(
                "index returned {} for {name}",
                response.status()
            )));
        }

        #[derive(Deserialize)]
        struct VersionEntry {
            version: String,
        }
        #[derive(Deserialize)]
        struct VersionsResponse {
            data: Vec<VersionEntry>,
        }

        let body: VersionsResponse = response.json().await?;
        Ok(body.data.into_iter().map(|v| v.version).collect())
    }

    async fn get_with_retry(&self, url: &str) -> Result<reqwest::Response> {
        let mut attempt = 0;
        loop {
            let mut request = self.client.get(url);
            if let Some(token) = &self.config.token {
                request = request.header("Authorization", format!("Token {token}"));
            }

            match request.send().await {
                Ok(response) if response.status().is_server_error() && attempt < self.config.max_retries => {
                    attempt += 1;
                    let delay = self.config.retry_delay * attempt;
                    debug!("index request to {url} returned {}, retrying in {delay:?}", response.status());
                    tokio::time::sleep(delay).await;
                }
                Ok(response) => return Ok(response),
                Err(e) if attempt < self.config.max_retries => {
                    attempt += 1;
                    warn!("index request to {url} failed ({e}), retry {attempt}/{}", self.config.max_retries);
                    tokio::time::sleep(self.config.retry_delay * attempt).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn lists_versions_from_the_index() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v3/plugin/ansible/content/published/collections/index/community/docker/versions/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{"version": "3.0.0"}, {"version": "3.1.0"}]
            })))
            .mount(&server)
            .await;

        let client = IndexClient::new(IndexClientConfig {
            server_url: server.uri(),
            ..Default::default()
        })
        .unwrap();

        let versions = client.list_versions("community.docker").await.unwrap();
        assert_eq!(versions, vec!["3.0.0", "3.1.0"]);
    }

    #[tokio::test]
    async fn not_found_yields_an_empty_list() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = IndexClient::new(IndexClientConfig {
            server_url: server.uri(),
            max_retries: 0,
            ..Default::default()
        })
        .unwrap();

        let versions = client.list_versions("community.absent").await.unwrap();
        assert!(versions.is_empty());
    }

    #[tokio::test]
    async fn malformed_name_is_rejected_before_any_request() {
        let client = IndexClient::with_defaults().unwrap();
        assert!(client.list_versions("noNamespace").await.is_err());
    }
}
