//! Process-level tool configuration for molectl.
//!
//! Distinct from [`molectl::manifest::Manifest`], which describes a single
//! project's roles/dependencies/cache policy. This module covers molectl's
//! own behavior: defaults → `molectl.cfg`/`.molectl.cfg` → `MOLECTL_*`
//! environment variables → CLI flags (highest precedence, applied by the
//! CLI layer after `Config::load`).

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use molectl::error::{Error, ErrorContext, Result};

/// Process-level molectl configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Default log verbosity when `-v` is not passed (0=warn, 1=info, 2=debug, 3+=trace).
    pub verbosity: u8,
    /// Disable colored output.
    pub no_color: bool,
    /// Default package index server URL, overridable per-manifest.
    pub index_server: String,
    /// Docker daemon socket, passed to bollard's connection builder.
    pub docker_host: Option<String>,
    /// Whether to run in CI mode (copy-in/copy-out transport) by default.
    pub ci_mode: bool,
    /// Default timeout, in seconds, for provider CLI calls (registry auth).
    pub provider_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            verbosity: 0,
            no_color: false,
            index_server: molectl::deps::index_client::DEFAULT_INDEX_SERVER.to_string(),
            docker_host: None,
            ci_mode: false,
            provider_timeout_secs: 30,
        }
    }
}

impl Config {
    /// Loads configuration from the standard search path, then applies
    /// `MOLECTL_*` environment overrides. CLI flags are applied afterward
    /// by the caller, which has the highest precedence.
    pub fn load(explicit_path: Option<&PathBuf>) -> Result<Self> {
        let mut config = Config::default();

        for path in Self::config_paths(explicit_path) {
            if path.exists() {
                config = config.merge_from_file(&path)?;
            }
        }

        config.apply_env_overrides();
        Ok(config)
    }

    fn config_paths(explicit_path: Option<&PathBuf>) -> Vec<PathBuf> {
        if let Some(path) = explicit_path {
            return vec![path.clone()];
        }

        let mut paths = Vec::new();
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".molectl.cfg"));
        }
        paths.push(PathBuf::from("molectl.cfg"));
        paths.push(PathBuf::from(".molectl.cfg"));
        paths
    }

    fn merge_from_file(&self, path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path).context(format!(
            "failed to read config file '{}'",
            path.display()
        ))?;

        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        let file_config: Config = match extension {
            "yml" | "yaml" => serde_yaml::from_str(&content)?,
            _ => toml::from_str(&content)
                .or_else(|_| serde_yaml::from_str(&content))
                .map_err(|e: serde_yaml::Error| {
                    Error::Config(format!("failed to parse config file '{}': {e}", path.display()))
                })?,
        };

        Ok(file_config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("MOLECTL_VERBOSITY") {
            if let Ok(n) = val.parse() {
                self.verbosity = n;
            }
        }
        if let Ok(val) = std::env::var("MOLECTL_NO_COLOR") {
            self.no_color = val == "1" || val.eq_ignore_ascii_case("true");
        }
        if let Ok(val) = std::env::var("MOLECTL_INDEX_SERVER") {
            self.index_server = val;
        }
        if let Ok(val) = std::env::var("MOLECTL_DOCKER_HOST") {
            self.docker_host = Some(val);
        }
        if let Ok(val) = std::env::var("MOLECTL_CI") {
            self.ci_mode = val == "1" || val.eq_ignore_ascii_case("true");
        }
        if let Ok(val) = std::env::var("MOLECTL_PROVIDER_TIMEOUT_SECS") {
            if let Ok(n) = val.parse() {
                self.provider_timeout_secs = n;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_the_default_index_server() {
        let config = Config::default();
        assert_eq!(config.index_server, molectl::deps::index_client::DEFAULT_INDEX_SERVER);
    }

    #[test]
    fn explicit_path_short_circuits_the_search() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.cfg");
        std::fs::write(&path, "verbosity = 2\n").unwrap();
        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.verbosity, 2);
    }

    #[test]
    fn env_override_takes_precedence_over_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.cfg");
        std::fs::write(&path, "verbosity = 1\n").unwrap();
        std::env::set_var("MOLECTL_VERBOSITY", "3");
        let config = Config::load(Some(&path)).unwrap();
        std::env::remove_var("MOLECTL_VERBOSITY");
        assert_eq!(config.verbosity, 3);
    }
}
