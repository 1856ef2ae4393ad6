//! Workflow phase dispatch (§4.5.1/§4.5.5).
//!
//! Each phase runs as a single shell command inside the worker, executed
//! through bollard's exec API rather than a `docker exec` subprocess — the
//! worker is already a container we hold a live connection to, so there is
//! no reason to shell out twice. The post-converge ownership fix is the one
//! exception requiring `nix` on the host side, to know which uid/gid the
//! in-container `chown` should target.
use std::collections::HashMap;

use bollard::exec::{CreateExecOptions, StartExecResults};
use bollard::Docker;
use futures::StreamExt;
use nix::unistd::{Gid, Uid};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

use super::state::container_name;

/// A single workflow phase, run against an already-running worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Converge,
    Lint,
    Verify,
    Idempotence,
    Destroy,
}

impl Phase {
    fn label(self) -> &'static str {
        match self {
            Phase::Converge => "converge",
            Phase::Lint => "lint",
            Phase::Verify => "verify",
            Phase::Idempotence => "idempotence",
            Phase::Destroy => "destroy",
        }
    }
}

/// Runs `command` as `/bin/sh -c "<command>"` inside the worker for
/// `role_name`, attaching a TTY only when `interactive` is set (never in CI
/// mode). Returns the exit code; a non-zero exit does not itself raise an
/// error — callers decide whether that is fatal for the phase.
pub async fn run(
    docker: &Docker,
    role_name: &str,
    phase: Phase,
    command: &str,
    interactive: bool,
) -> Result<i64> {
    let container = container_name(role_name);
    info!("running phase '{}' in '{container}'", phase.label());

    let exec = docker
        .create_exec(
            &container,
            CreateExecOptions {
                cmd: Some(vec!["/bin/sh", "-c", command]),
                attach_stdout: Some(true),
                attach_stderr: Some(true),
                tty: Some(interactive),
                ..Default::default()
            },
        )
        .await
        .map_err(|e| Error::phase_failed(phase.label(), role_name, e.to_string()))?;

    match docker
        .start_exec(&exec.id, None)
        .await
        .map_err(|e| Error::phase_failed(phase.label(), role_name, e.to_string()))?
    {
        StartExecResults::Attached { mut output, .. } => {
            while let Some(chunk) = output.next().await {
                match chunk {
                    Ok(msg) => debug!(target: "molectl::worker", "{msg}"),
                    Err(e) => warn!("error reading exec output: {e}"),
                }
            }
        }
        StartExecResults::Detached => {}
    }

    let inspect = docker
        .inspect_exec(&exec.id)
        .await
        .map_err(|e| Error::phase_failed(phase.label(), role_name, e.to_string()))?;

    Ok(inspect.exit_code.unwrap_or(-1))
}

/// Runs `phase` and maps a non-zero exit into [`Error::PhaseFailed`].
pub async fn run_checked(
    docker: &Docker,
    role_name: &str,
    phase: Phase,
    command: &str,
    interactive: bool,
) -> Result<()> {
    let exit_code = run(docker, role_name, phase, command, interactive).await?;
    if exit_code != 0 {
        return Err(Error::phase_failed(
            phase.label(),
            role_name,
            format!("exited with code {exit_code}"),
        ));
    }
    Ok(())
}

/// Recursively `chown`s the in-container workspace to the host's invoking
/// uid/gid, so files created by the worker remain editable on the host
/// after the container is gone. Best-effort: a failure here is logged, not
/// propagated, since it never invalidates a successful converge.
pub async fn fix_workspace_ownership(docker: &Docker, role_name: &str, workspace_path: &str) {
    let uid = Uid::current();
    let gid = Gid::current();
    let command = format!("chown -R {uid}:{gid} {workspace_path}");

    match run(docker, role_name, Phase::Converge, &command, false).await {
        Ok(0) => debug!("workspace ownership fixed to {uid}:{gid}"),
        Ok(code) => warn!("ownership fix exited with code {code}, leaving workspace as-is"),
        Err(e) => warn!("could not fix workspace ownership: {e}"),
    }
}

/// Builds the shell command that runs a role's converge step, scoped to the
/// fixed in-container workspace layout.
pub fn converge_command(runner: &str, playbook: &str) -> String {
    format!("cd {} && {runner} {playbook}", super::start::WORKSPACE_PATH)
}

/// Environment overrides passed as an inline prefix to a phase command
/// (`FOO=bar BAZ=qux <command>`), used when a phase needs per-invocation
/// variables rather than container-wide env.
pub fn with_env_prefix(command: &str, env: &HashMap<String, String>) -> String {
    if env.is_empty() {
        return command.to_string();
    }
    let prefix: Vec<String> = env
        .iter()
        .map(|(k, v)| format!("{k}={}", shell_quote(v)))
        .collect();
    format!("{} {command}", prefix.join(" "))
}

fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "'\\''"))
}
