//! Lint configuration projector (C7).
//!
//! Projects the manifest's two lint sections into the file shapes the
//! consuming linters actually read — a `.yamllint` document and an
//! `ansible-lint`-shaped config — rather than invoking any lint engine
//! itself.

use std::path::Path;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::manifest::LintProfiles;

/// Default file name for the projected YAML-lint config.
pub const YAML_LINT_FILE_NAME: &str = ".yamllint";

/// Default file name for the projected role-lint config.
pub const ROLE_LINT_FILE_NAME: &str = ".ansible-lint";

/// The rendered YAML-lint document. `ignore` is intentionally a single
/// newline-joined string rather than a native list: the consuming tool's
/// own config schema expects that exact scalar shape under this key, so
/// this is the one place the projector denormalizes a `Vec<String>` on
/// purpose.
#[derive(Debug, Serialize)]
struct YamlLintDocument {
    extends: String,
    ignore: String,
    #[serde(flatten)]
    extra: serde_yaml::Mapping,
}

/// The rendered role-lint document.
#[derive(Debug, Serialize)]
struct RoleLintDocument {
    enabled: bool,
    skip_list: Vec<String>,
    #[serde(flatten)]
    extra: serde_yaml::Mapping,
}

/// Renders both lint documents and writes them to `dir`, each via an atomic
/// temp-then-rename so a reader never observes a half-written config.
pub fn write_to(profiles: &LintProfiles, dir: &Path) -> Result<()> {
    write_yaml_lint(profiles, &dir.join(YAML_LINT_FILE_NAME))?;
    write_role_lint(profiles, &dir.join(ROLE_LINT_FILE_NAME))?;
    Ok(())
}

/// Renders the YAML-lint document to a YAML string, without writing it.
pub fn render_yaml_lint(profiles: &LintProfiles) -> Result<String> {
    let document = YamlLintDocument {
        extends: profiles.yaml.extends.clone(),
        ignore: profiles.yaml.ignore.join("\n"),
        extra: profiles.yaml.extra.clone(),
    };
    Ok(serde_yaml::to_string(&document)?)
}

/// Renders the role-lint document to a YAML string, without writing it.
pub fn render_role_lint(profiles: &LintProfiles) -> Result<String> {
    let document = RoleLintDocument {
        enabled: profiles.role.enabled,
        skip_list: profiles.role.skip_list.clone(),
        extra: profiles.role.extra.clone(),
    };
    Ok(serde_yaml::to_string(&document)?)
}

fn write_yaml_lint(profiles: &LintProfiles, path: &Path) -> Result<()> {
    atomic_write(path, &render_yaml_lint(profiles)?)
}

fn write_role_lint(profiles: &LintProfiles, path: &Path) -> Result<()> {
    atomic_write(path, &render_role_lint(profiles)?)
}

fn atomic_write(path: &Path, content: &str) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| Error::LintWrite {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    std::io::Write::write_all(&mut tmp, content.as_bytes()).map_err(|e| Error::LintWrite {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    tmp.persist(path).map_err(|e| Error::LintWrite {
        path: path.to_path_buf(),
        message: e.error.to_string(),
    })?;
    Ok(())
}
