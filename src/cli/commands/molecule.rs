//! `molectl molecule` — drives the worker container through test phases.

use async_trait::async_trait;
use clap::{Args, Subcommand};

use molectl::deps::derived::DerivedManifest;
use molectl::deps::lock_path_in;
use molectl::deps::Lock;
use molectl::error::Result;
use molectl::orchestrator::{Orchestrator, VcsInfo};

use super::{CommandContext, Runnable};

#[derive(Debug, Args)]
pub struct MoleculeArgs {
    #[command(subcommand)]
    pub command: MoleculeCommand,

    /// Run phases non-interactively (no TTY attached to the exec).
    #[arg(long, global = true)]
    pub non_interactive: bool,
}

/// Default command for the inner `destroy` phase: a no-op play tagged so
/// that nothing the role does actually runs, matching how `idempotence`
/// reuses the regular converge command but `destroy` needs its own.
const DESTROY_COMMAND: &str =
    "ansible-playbook playbook.yml -i localhost, -e ansible_connection=local --tags never,molecule-idempotence-notest";

#[derive(Debug, Subcommand)]
pub enum MoleculeCommand {
    /// Starts the worker container.
    Create,
    /// Runs the converge phase.
    Converge,
    /// Runs the lint phase.
    Lint,
    /// Runs the verify phase.
    Verify,
    /// Runs converge twice and fails if the second run reports changes.
    Idempotence,
    /// Tears the worker container down.
    Destroy,
    /// Runs the full sequence: create, converge, lint, verify, idempotence, destroy.
    Test,
}

#[async_trait]
impl Runnable for MoleculeArgs {
    async fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        let manifest = ctx.load_manifest()?;
        let orchestrator = Orchestrator::connect(&manifest, ctx.ci_mode, ctx.config.provider_timeout_secs)?;
        let workspace = ctx.project_dir.clone();
        let interactive = !self.non_interactive;
        let vcs = if ctx.ci_mode { discover_vcs_info(&workspace) } else { None };

        match &self.command {
            MoleculeCommand::Create => create(ctx, &orchestrator, &manifest).await?,
            MoleculeCommand::Converge => converge(ctx, &orchestrator, &manifest, interactive).await?,
            MoleculeCommand::Lint => orchestrator.lint(&workspace, "ansible-lint", interactive).await?,
            MoleculeCommand::Verify => orchestrator.verify(&workspace, "pytest", interactive, vcs.as_ref()).await?,
            MoleculeCommand::Idempotence => idempotence(ctx, &orchestrator, &manifest, interactive).await?,
            MoleculeCommand::Destroy => orchestrator.wipe(DESTROY_COMMAND).await?,
            MoleculeCommand::Test => {
                create(ctx, &orchestrator, &manifest).await?;
                converge(ctx, &orchestrator, &manifest, interactive).await?;
                orchestrator.lint(&workspace, "ansible-lint", interactive).await?;
                orchestrator.verify(&workspace, "pytest", interactive, vcs.as_ref()).await?;
                idempotence(ctx, &orchestrator, &manifest, interactive).await?;
                orchestrator.wipe(DESTROY_COMMAND).await?;
            }
        }

        ctx.output.success("done");
        Ok(0)
    }
}

/// Reads the current checkout's origin remote and `HEAD` commit via the
/// local `git` binary. Used only in CI mode, where the scenario workspace is
/// a disposable runner checkout rather than a persistent dev machine.
fn discover_vcs_info(workspace: &std::path::Path) -> Option<VcsInfo> {
    let remote_url = run_git(workspace, &["remote", "get-url", "origin"])?;
    let commit = run_git(workspace, &["rev-parse", "HEAD"])?;
    Some(VcsInfo { remote_url, commit })
}

fn run_git(workspace: &std::path::Path, args: &[&str]) -> Option<String> {
    let output = std::process::Command::new("git").args(args).current_dir(workspace).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let value = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

async fn create(
    ctx: &mut CommandContext,
    orchestrator: &Orchestrator<'_>,
    manifest: &molectl::manifest::Manifest,
) -> Result<()> {
    let derived_b64 = match Lock::load(&lock_path_in(&ctx.project_dir)) {
        Ok(lock) => Some(DerivedManifest::from_lock(&lock).to_base64()?),
        Err(_) => {
            ctx.output.warn("no lock file found, starting the worker without a derived dependency manifest");
            None
        }
    };

    orchestrator
        .start(&manifest.dependencies.interpreter.pinned, derived_b64.as_deref(), None, None)
        .await
}

async fn converge(
    _ctx: &mut CommandContext,
    orchestrator: &Orchestrator<'_>,
    _manifest: &molectl::manifest::Manifest,
    interactive: bool,
) -> Result<()> {
    orchestrator.converge("ansible-playbook", "playbook.yml", interactive).await
}

async fn idempotence(
    ctx: &mut CommandContext,
    orchestrator: &Orchestrator<'_>,
    manifest: &molectl::manifest::Manifest,
    interactive: bool,
) -> Result<()> {
    let runner = "ansible-playbook";
    let playbook = "playbook.yml";
    let command = molectl::orchestrator::phases::converge_command(runner, playbook);
    let output = molectl::orchestrator::phases::run(
        orchestrator.docker(),
        manifest.role_name(),
        molectl::orchestrator::Phase::Idempotence,
        &command,
        interactive,
    )
    .await?;

    if output != 0 {
        ctx.output.warn("second converge run reported a non-zero exit; role is not idempotent");
        return Err(molectl::error::Error::Config("idempotence check failed".into()));
    }
    Ok(())
}
