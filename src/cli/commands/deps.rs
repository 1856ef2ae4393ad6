//! `molectl deps` — dependency resolution and lock file maintenance.

use async_trait::async_trait;
use clap::{Args, Subcommand};

use molectl::deps::merge::{RequirementsDescriptor, RoleMeta};
use molectl::deps::{self, lock_path_in};
use molectl::error::Result;

use super::{CommandContext, Runnable};

#[derive(Debug, Args)]
pub struct DepsArgs {
    #[command(subcommand)]
    pub command: DepsCommand,
}

#[derive(Debug, Subcommand)]
pub enum DepsCommand {
    /// Resolves the manifest's dependencies and writes `molectl.lock.yml`.
    Lock,
    /// Compares the existing lock against a fresh resolution and reports staleness.
    Check,
    /// Resolves without writing a lock file, printing a summary.
    Resolve,
    /// Writes an empty lock-compatible manifest scaffold if one does not exist.
    Init,
    /// Alias for `lock`, re-resolving and overwriting the existing lock file.
    Sync,
}

#[async_trait]
impl Runnable for DepsArgs {
    async fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        match &self.command {
            DepsCommand::Lock | DepsCommand::Sync => lock(ctx).await,
            DepsCommand::Check => check(ctx).await,
            DepsCommand::Resolve => resolve(ctx).await,
            DepsCommand::Init => init(ctx),
        }
    }
}

async fn lock(ctx: &mut CommandContext) -> Result<i32> {
    let manifest = ctx.load_manifest()?;
    let meta = RoleMeta::default();
    let requirements = RequirementsDescriptor::default();

    let resolved = deps::lock(&manifest, &meta, &requirements, &ctx.project_dir).await?;
    ctx.output
        .success(&format!("wrote {} (hash {})", lock_path_in(&ctx.project_dir).display(), resolved.hash));
    Ok(0)
}

async fn check(ctx: &mut CommandContext) -> Result<i32> {
    let manifest = ctx.load_manifest()?;
    let meta = RoleMeta::default();
    let requirements = RequirementsDescriptor::default();

    let report = deps::check(&manifest, &meta, &requirements, &ctx.project_dir).await?;
    if report.stale {
        ctx.output.warn(&format!(
            "lock is stale: recorded {} != fresh {}",
            report.recorded_hash, report.fresh_hash
        ));
        Ok(1)
    } else {
        ctx.output.success("lock is up to date");
        Ok(0)
    }
}

async fn resolve(ctx: &mut CommandContext) -> Result<i32> {
    let manifest = ctx.load_manifest()?;
    let meta = RoleMeta::default();
    let requirements = RequirementsDescriptor::default();
    let index = molectl::deps::index_client::IndexClient::with_defaults()?;

    let resolved = molectl::deps::resolver::resolve(&manifest, &meta, &requirements, &index).await?;
    ctx.output.info(&format!("interpreter: {}", resolved.interpreter.pinned));
    for collection in &resolved.collections {
        ctx.output.info(&format!(
            "collection {} -> {}",
            collection.name,
            if collection.resolved_version.is_empty() { "unresolved" } else { &collection.resolved_version }
        ));
    }
    for role in &resolved.roles {
        ctx.output.info(&format!(
            "role {} -> {}",
            role.name,
            if role.resolved_version.is_empty() { "unresolved" } else { &role.resolved_version }
        ));
    }
    Ok(0)
}

fn init(ctx: &mut CommandContext) -> Result<i32> {
    let path = ctx.manifest_path();
    if path.exists() {
        ctx.output.info(&format!("'{}' already exists, nothing to do", path.display()));
        return Ok(0);
    }

    let manifest = molectl::manifest::Manifest::synthesize_default("default");
    manifest.save(&path)?;
    ctx.output.success(&format!("wrote {}", path.display()));
    Ok(0)
}
