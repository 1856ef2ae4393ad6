//! The declarative project manifest (C1): registry, vault, artifact sources,
//! lint profiles, tests policy, cache settings, and dependencies.
//!
//! Unknown fields are preserved on write via a flattened catch-all map, so a
//! human edit to a section this tool doesn't yet understand survives a
//! `save()` round trip untouched.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default manifest file name, resolved in the current working directory.
pub const MANIFEST_FILE_NAME: &str = "molectl.yml";

/// Maximum number of artifact sources a manifest may declare.
pub const MAX_ARTIFACT_SOURCES: usize = 10;

/// Image registry provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RegistryProvider {
    Yc,
    Aws,
    Gcp,
    Public,
}

impl Default for RegistryProvider {
    fn default() -> Self {
        RegistryProvider::Public
    }
}

/// Registry descriptor for the worker's image.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryDescriptor {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub server: String,
    pub provider: RegistryProvider,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub image: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub tag: String,
}

/// Whether the external secret backend is enabled for this project.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExternalSecretDescriptor {
    pub enabled: bool,
}

/// A single artifact source (package registry or Git host), with optional
/// on-disk or externally-backed credentials. Position in the containing
/// `Vec` is the source's 1-based index, used for indexed env injection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactSource {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub url: String,
    pub use_external: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub path: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub secret_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub user_field: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub token_field: String,
}

/// The two lint profiles a project carries: a general YAML lint and a
/// role-specific lint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LintProfiles {
    pub yaml: YamlLintProfile,
    pub role: RoleLintProfile,
}

/// YAML lint settings, projected by C7 into the consuming tool's config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct YamlLintProfile {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub extends: String,
    pub ignore: Vec<String>,
    #[serde(flatten)]
    pub extra: serde_yaml::Mapping,
}

/// Role lint settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RoleLintProfile {
    pub enabled: bool,
    pub skip_list: Vec<String>,
    #[serde(flatten)]
    pub extra: serde_yaml::Mapping,
}

/// Where `verify` finds its test suite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TestsSourceType {
    Local,
    Remote,
    FrameworkManaged,
}

impl Default for TestsSourceType {
    fn default() -> Self {
        TestsSourceType::Local
    }
}

/// Tests source policy (§4.5.3).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TestsSource {
    #[serde(rename = "type")]
    pub kind: TestsSourceType,
    pub remotes: Vec<String>,
    pub overwrite: bool,
}

/// Cache settings (C3).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub enabled: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub cache_id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub custom_path: String,
    pub docker_cache: bool,
    pub uv_cache: bool,
}

/// Interpreter version constraints.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InterpreterSpec {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub min: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub max: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub pinned: String,
}

/// One of the four tool version constraints tracked for the worker.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolVersions {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub runner: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub linter: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub lint_yaml: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub test_harness: String,
}

/// Where a collection or role is resolved from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Index,
    Git,
}

impl Default for SourceKind {
    fn default() -> Self {
        SourceKind::Index
    }
}

/// A collection dependency as declared in the manifest.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionRequirement {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub constraint: String,
    pub source: SourceKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
}

/// A role dependency as declared in the manifest. `name` is
/// scenario-qualified (`<scenario>.<role-name>`); `src`/`scm` may be omitted
/// and backfilled from the role's own requirements descriptor during merge.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RoleRequirement {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub src: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scm: Option<SourceKind>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub constraint: String,
}

/// The dependencies block: interpreter, tool versions, and the
/// manifest-declared collection/role requirement lists.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Dependencies {
    pub interpreter: InterpreterSpec,
    pub tools: ToolVersions,
    pub collections: Vec<CollectionRequirement>,
    pub roles: Vec<RoleRequirement>,
}

/// The project manifest, loaded from and saved to a single YAML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Manifest {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub role_name: String,
    pub registry: RegistryDescriptor,
    pub external_secrets: ExternalSecretDescriptor,
    pub artifact_sources: Vec<ArtifactSource>,
    pub lint: LintProfiles,
    pub tests: TestsSource,
    pub cache: CacheSettings,
    pub dependencies: Dependencies,

    /// Unknown top-level fields, preserved verbatim across load/save.
    #[serde(flatten)]
    pub extra: serde_yaml::Mapping,
}

impl Manifest {
    /// Loads the manifest from `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::ManifestNotFound(path.to_path_buf())
            } else {
                Error::Io(e)
            }
        })?;
        serde_yaml::from_str(&content)
            .map_err(|e| Error::manifest_parse(path, e.to_string(), Some(Box::new(e.clone()))))
    }

    /// Loads the manifest from the default file name in `dir`, or returns
    /// [`Error::ManifestNotFound`] if it does not exist.
    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        Self::load(&dir.join(MANIFEST_FILE_NAME))
    }

    /// Validates required invariants that load alone does not enforce
    /// (interpreter whitelist, non-empty names, source count).
    pub fn validate(&self) -> Result<()> {
        if self.artifact_sources.len() > MAX_ARTIFACT_SOURCES {
            return Err(Error::ManifestValidation(format!(
                "at most {MAX_ARTIFACT_SOURCES} artifact sources are supported, found {}",
                self.artifact_sources.len()
            )));
        }
        for source in &self.artifact_sources {
            if source.name.is_empty() {
                return Err(Error::ManifestValidation(
                    "artifact source name must not be empty".into(),
                ));
            }
        }
        for collection in &self.dependencies.collections {
            if collection.name.is_empty() {
                return Err(Error::ManifestValidation(
                    "collection requirement name must not be empty".into(),
                ));
            }
        }
        for role in &self.dependencies.roles {
            if role.name.is_empty() {
                return Err(Error::ManifestValidation(
                    "role requirement name must not be empty".into(),
                ));
            }
        }
        Ok(())
    }

    /// Saves the manifest to `path` atomically: written to a temp file in
    /// the same directory, then renamed over the target.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        std::io::Write::write_all(&mut tmp, content.as_bytes())?;
        tmp.persist(path).map_err(|e| Error::Io(e.error))?;
        Ok(())
    }

    /// Returns the role name to scope the credential store and worker
    /// container under, defaulting to `"default"` when unset.
    pub fn role_name(&self) -> &str {
        if self.role_name.is_empty() {
            "default"
        } else {
            &self.role_name
        }
    }

    /// A manifest with reasonable defaults, used by commands that can
    /// synthesize one when no manifest file exists yet.
    pub fn synthesize_default(role_name: impl Into<String>) -> Self {
        Self {
            role_name: role_name.into(),
            ..Default::default()
        }
    }

    /// Convenience accessor: the manifest path for a given project
    /// directory.
    pub fn path_in(dir: &Path) -> PathBuf {
        dir.join(MANIFEST_FILE_NAME)
    }
}
