//! Error types for molectl.
//!
//! This module defines the error types used throughout molectl, providing
//! rich error information for debugging and user feedback.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for molectl operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for molectl.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Manifest / config errors
    // ========================================================================
    /// Error parsing a manifest file.
    #[error("Failed to parse manifest '{path}': {message}")]
    ManifestParse {
        /// Path to the manifest file
        path: PathBuf,
        /// Error message
        message: String,
        /// Source error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// No manifest file found.
    #[error("No manifest found (looked for molectl.yml in '{0}' and its ancestors)")]
    ManifestNotFound(PathBuf),

    /// Manifest failed validation.
    #[error("Manifest validation failed: {0}")]
    ManifestValidation(String),

    /// Tool configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid configuration value.
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidConfig {
        /// Configuration key
        key: String,
        /// Error message
        message: String,
    },

    // ========================================================================
    // Credential vault errors
    // ========================================================================
    /// Failed to derive the machine-bound encryption key.
    #[error("Failed to derive credential key: {0}")]
    KeyDerivation(String),

    /// Credential encryption failed.
    #[error("Failed to encrypt credential '{name}': {message}")]
    CredentialEncryption {
        /// Credential name
        name: String,
        /// Error message
        message: String,
    },

    /// Credential decryption failed (wrong machine, corrupted store, etc).
    #[error("Failed to decrypt credential '{name}': {message}")]
    CredentialDecryption {
        /// Credential name
        name: String,
        /// Error message
        message: String,
    },

    /// Named credential not present in the store.
    #[error("Credential '{0}' not found for role '{1}'")]
    CredentialNotFound(String, String),

    /// External secret backend failed to resolve a credential.
    #[error("External secret backend '{backend}' failed for '{name}': {message}")]
    ExternalBackend {
        /// Backend name
        backend: String,
        /// Credential name
        name: String,
        /// Error message
        message: String,
    },

    // ========================================================================
    // Cache errors
    // ========================================================================
    /// Cache layout could not be created or read.
    #[error("Cache error at '{path}': {message}")]
    Cache {
        /// Path involved
        path: PathBuf,
        /// Error message
        message: String,
    },

    /// Cache id is malformed (must be 16 lowercase hex characters).
    #[error("Invalid cache id: '{0}'")]
    InvalidCacheId(String),

    /// No active cache is configured or enabled.
    #[error("No cache is currently enabled for this project")]
    CacheNotEnabled,

    // ========================================================================
    // Dependency / lock errors
    // ========================================================================
    /// A version constraint string could not be parsed.
    #[error("Invalid version constraint '{0}'")]
    ConstraintParse(String),

    /// A dependency descriptor failed validation (disallowed interpreter, empty name, etc).
    #[error("Dependency validation failed: {0}")]
    DependencyValidation(String),

    /// No source (index, git, or literal) could resolve the dependency.
    #[error("Could not resolve '{name}' from any configured source")]
    ResolutionFailed {
        /// Dependency name
        name: String,
    },

    /// Lock file could not be parsed.
    #[error("Failed to parse lock file '{path}': {message}")]
    LockParse {
        /// Path to the lock file
        path: PathBuf,
        /// Error message
        message: String,
    },

    /// Lock file is stale relative to its inputs.
    #[error("Lock file is stale: {0}")]
    LockStale(String),

    // ========================================================================
    // Orchestrator errors
    // ========================================================================
    /// Failed to start the worker container.
    #[error("Failed to start container: {0}")]
    ContainerStart(String),

    /// A workflow phase failed.
    #[error("Phase '{phase}' failed for scenario '{scenario}': {message}")]
    PhaseFailed {
        /// Phase name (create, converge, lint, verify, idempotence, destroy)
        phase: String,
        /// Scenario name
        scenario: String,
        /// Error message
        message: String,
    },

    /// A command inside the container exited non-zero.
    #[error("Command failed in container (exit {exit_code}): {message}")]
    ExecFailed {
        /// Exit code
        exit_code: i32,
        /// Error message
        message: String,
    },

    /// The orchestrator is already running or the container already exists.
    #[error("State conflict: {0}")]
    StateConflict(String),

    // ========================================================================
    // Registry auth errors
    // ========================================================================
    /// A registry auth provider CLI failed (non-fatal in most call sites).
    #[error("Registry auth provider '{provider}' failed: {message}")]
    RegistryAuth {
        /// Provider name (yc, aws, gcp)
        provider: String,
        /// Error message
        message: String,
    },

    // ========================================================================
    // Lint profile errors
    // ========================================================================
    /// Failed to write a lint configuration file.
    #[error("Failed to write lint config '{path}': {message}")]
    LintWrite {
        /// Path written to
        path: PathBuf,
        /// Error message
        message: String,
    },

    // ========================================================================
    // IO / serialization errors
    // ========================================================================
    /// File not found.
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error.
    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    /// JSON parsing error.
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// HTTP client error talking to the package index.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    // ========================================================================
    // Other
    // ========================================================================
    /// Internal error that should not normally surface.
    #[error("Internal error: {0}")]
    Internal(String),

    /// Generic error with attached source, used by `ErrorContext`.
    #[error("{message}")]
    Other {
        /// Error message
        message: String,
        /// Source error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl Error {
    /// Creates a new manifest parse error.
    pub fn manifest_parse(
        path: impl Into<PathBuf>,
        message: impl Into<String>,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::ManifestParse {
            path: path.into(),
            message: message.into(),
            source,
        }
    }

    /// Creates a new phase-failed error.
    pub fn phase_failed(
        phase: impl Into<String>,
        scenario: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::PhaseFailed {
            phase: phase.into(),
            scenario: scenario.into(),
            message: message.into(),
        }
    }

    /// Creates a new exec-failed error.
    pub fn exec_failed(exit_code: i32, message: impl Into<String>) -> Self {
        Self::ExecFailed {
            exit_code,
            message: message.into(),
        }
    }

    /// Creates a new registry auth error.
    pub fn registry_auth(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RegistryAuth {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Returns true if this error represents something that should be logged
    /// and bypassed rather than aborting the whole run (e.g. a single
    /// registry auth provider being unavailable).
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::RegistryAuth { .. })
    }

    /// Returns the process exit code for this error.
    ///
    /// molectl uses a two-code contract: 0 for success, 1 for any fatal
    /// error. This keeps the contract simple for CI callers; finer-grained
    /// failure reasons are conveyed through structured output and logs, not
    /// the exit code.
    pub fn exit_code(&self) -> i32 {
        1
    }
}

/// Extension trait for adding context to errors.
pub trait ErrorContext<T> {
    /// Adds context to an error.
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Adds context with a closure that is only evaluated on error.
    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::Other {
            message: message.into(),
            source: Some(Box::new(e)),
        })
    }

    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|e| Error::Other {
            message: f().into(),
            source: Some(Box::new(e)),
        })
    }
}
