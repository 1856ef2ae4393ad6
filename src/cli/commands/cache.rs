//! `molectl cache` — inspects and manages the per-role multi-layer cache.

use async_trait::async_trait;
use clap::{Args, Subcommand};

use molectl::cache::CacheManager;
use molectl::error::Result;

use super::{CommandContext, Runnable};

#[derive(Debug, Args)]
pub struct CacheArgs {
    #[command(subcommand)]
    pub command: CacheCommand,
}

#[derive(Debug, Subcommand)]
pub enum CacheCommand {
    /// Enables the cache in the manifest and assigns a cache id if missing.
    Enable,
    /// Disables the cache in the manifest, leaving any existing directory untouched.
    Disable,
    /// Prints the cache location, size, and presence of the Docker tarball.
    Status,
    /// Recursively removes the cache directory for this role.
    Clean,
    /// Lists the top-level subdirectories present in the cache.
    List,
}

#[async_trait]
impl Runnable for CacheArgs {
    async fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        match &self.command {
            CacheCommand::Enable => enable(ctx),
            CacheCommand::Disable => disable(ctx),
            CacheCommand::Status => status(ctx),
            CacheCommand::Clean => clean(ctx),
            CacheCommand::List => list(ctx),
        }
    }
}

fn enable(ctx: &mut CommandContext) -> Result<i32> {
    let mut manifest = ctx.load_manifest()?;
    if manifest.cache.cache_id.is_empty() {
        manifest.cache.cache_id = molectl::cache::CacheId::generate().to_string();
    }
    manifest.cache.enabled = true;
    manifest.save(&ctx.manifest_path())?;
    ctx.output.success(&format!("cache enabled (id {})", manifest.cache.cache_id));
    Ok(0)
}

fn disable(ctx: &mut CommandContext) -> Result<i32> {
    let mut manifest = ctx.load_manifest()?;
    manifest.cache.enabled = false;
    manifest.save(&ctx.manifest_path())?;
    ctx.output.success("cache disabled");
    Ok(0)
}

fn status(ctx: &mut CommandContext) -> Result<i32> {
    let manifest = ctx.load_manifest()?;
    if !manifest.cache.enabled {
        ctx.output.info("cache disabled");
        return Ok(0);
    }

    let cache = CacheManager::open(&manifest.cache)?;
    ctx.output.info(&format!("location: {}", cache.layout().base().display()));
    ctx.output.info(&format!("size: {} bytes", cache.size()?));
    ctx.output.info(&format!("docker tarball present: {}", cache.has_tarball()));
    Ok(0)
}

fn clean(ctx: &mut CommandContext) -> Result<i32> {
    let manifest = ctx.load_manifest()?;
    let cache = CacheManager::open(&manifest.cache)?;
    cache.cleanup()?;
    ctx.output.success("cache directory removed");
    Ok(0)
}

fn list(ctx: &mut CommandContext) -> Result<i32> {
    let manifest = ctx.load_manifest()?;
    let cache = CacheManager::open(&manifest.cache)?;
    for name in cache.list()? {
        ctx.output.info(&name);
    }
    Ok(0)
}
