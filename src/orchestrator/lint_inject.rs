//! Lint document injection (§4.5.5).
//!
//! Non-CI writes the projected lint files straight to the host workspace,
//! where the bind mount already makes them visible inside the container.
//! CI mode has no such mount, so the same content is piped in through a
//! base64-decode — the same quoting-proof idiom the retrieved `devc`
//! credential-injection example uses for writing files into a container.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use bollard::Docker;
use std::path::Path;

use crate::error::Result;
use crate::manifest::LintProfiles;

use super::phases::{self, Phase};
use super::start::WORKSPACE_PATH;

/// Writes both lint documents directly into the host workspace.
pub fn write_to_workspace(profiles: &LintProfiles, workspace: &Path) -> Result<()> {
    crate::lint_config::write_to(profiles, workspace)
}

/// Pipes both lint documents into the container via a base64-decode
/// redirection, for CI mode where no bind mount exposes the host workspace.
pub async fn inject_into_container(docker: &Docker, role_name: &str, profiles: &LintProfiles) -> Result<()> {
    let yaml_lint = crate::lint_config::render_yaml_lint(profiles)?;
    let role_lint = crate::lint_config::render_role_lint(profiles)?;

    inject_file(docker, role_name, &yaml_lint, &format!("{WORKSPACE_PATH}/.yamllint")).await?;
    inject_file(docker, role_name, &role_lint, &format!("{WORKSPACE_PATH}/.ansible-lint")).await?;
    Ok(())
}

async fn inject_file(docker: &Docker, role_name: &str, content: &str, container_path: &str) -> Result<()> {
    let encoded = BASE64.encode(content.as_bytes());
    let command = format!("echo '{encoded}' | base64 -d > {container_path}");
    phases::run_checked(docker, role_name, Phase::Lint, &command, false).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::{RoleLintProfile, YamlLintProfile};

    #[test]
    fn write_to_workspace_renders_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let profiles = LintProfiles {
            yaml: YamlLintProfile {
                extends: "default".into(),
                ignore: vec![],
                extra: serde_yaml::Mapping::new(),
            },
            role: RoleLintProfile {
                enabled: true,
                skip_list: vec![],
                extra: serde_yaml::Mapping::new(),
            },
        };
        write_to_workspace(&profiles, dir.path()).unwrap();
        assert!(dir.path().join(".yamllint").is_file());
        assert!(dir.path().join(".ansible-lint").is_file());
    }
}
