//! Registry authentication adapter (C6).
//!
//! Obtains a short-lived pull token for the worker image's registry by
//! shelling out to the provider's own CLI. A provider failure never aborts
//! a run — the worker can still start against a public or already-cached
//! image — so every branch here is `warn!`-and-continue rather than
//! propagating.

use std::time::Duration;

use tokio::process::Command;
use tokio::time::timeout;
use tracing::warn;

use crate::manifest::RegistryProvider;

/// Used only if a caller somehow passes `0`; a real timeout should always
/// come from configuration.
const DEFAULT_AUTH_TIMEOUT_SECS: u64 = 30;

/// A resolved pull token for the worker's registry.
#[derive(Debug, Clone)]
pub struct RegistryToken {
    pub provider: RegistryProvider,
    pub token: String,
}

/// Resolves a pull token for `provider`. Never propagates a provider
/// failure as an error: an unavailable CLI or an empty token is logged and
/// reported as `Ok(None)`, since the worker can often still start against a
/// public or already-cached image.
pub async fn resolve(provider: RegistryProvider, server: &str, timeout_secs: u64) -> crate::error::Result<Option<RegistryToken>> {
    let command = match provider {
        RegistryProvider::Public => return Ok(None),
        RegistryProvider::Yc => yc_token_command(),
        RegistryProvider::Aws => aws_token_command(server),
        RegistryProvider::Gcp => gcp_token_command(),
    };

    let timeout_secs = if timeout_secs == 0 { DEFAULT_AUTH_TIMEOUT_SECS } else { timeout_secs };
    match run_with_timeout(command, timeout_secs).await {
        Ok(token) if !token.is_empty() => Ok(Some(RegistryToken { provider, token })),
        Ok(_) => {
            warn!("{provider:?} registry auth produced an empty token");
            Ok(None)
        }
        Err(e) => {
            warn!("{provider:?} registry auth failed: {e}");
            Ok(None)
        }
    }
}

fn yc_token_command() -> Command {
    let mut cmd = Command::new("yc");
    cmd.args(["iam", "create-token"]);
    cmd
}

fn aws_token_command(server: &str) -> Command {
    let region = server.split('.').nth(3).unwrap_or("us-east-1");
    let mut cmd = Command::new("aws");
    cmd.args(["ecr", "get-login-password", "--region", region]);
    cmd
}

fn gcp_token_command() -> Command {
    let mut cmd = Command::new("gcloud");
    cmd.args(["auth", "print-access-token"]);
    cmd
}

async fn run_with_timeout(mut command: Command, timeout_secs: u64) -> crate::error::Result<String> {
    let output = timeout(Duration::from_secs(timeout_secs), command.output())
        .await
        .map_err(|_| {
            crate::error::Error::registry_auth("timed-out", format!("command did not complete within {timeout_secs}s"))
        })?
        .map_err(|e| crate::error::Error::registry_auth("spawn", e.to_string()))?;

    if !output.status.success() {
        return Err(crate::error::Error::registry_auth(
            "cli",
            String::from_utf8_lossy(&output.stderr).trim().to_string(),
        ));
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn public_provider_never_attempts_auth() {
        let token = resolve(RegistryProvider::Public, "", 30).await.unwrap();
        assert!(token.is_none());
    }

    #[test]
    fn aws_region_is_extracted_from_server_host() {
        let server = "123456789.dkr.ecr.eu-central-1.amazonaws.com";
        let region = server.split('.').nth(3).unwrap_or("us-east-1");
        assert_eq!(region, "eu-central-1");
    }
}
