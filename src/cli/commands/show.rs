//! `molectl show` — prints a summary of the resolved manifest and lock.

use async_trait::async_trait;
use clap::Args;

use molectl::deps::{lock_path_in, Lock};
use molectl::error::Result;

use super::{CommandContext, Runnable};

#[derive(Debug, Args)]
pub struct ShowArgs {}

#[async_trait]
impl Runnable for ShowArgs {
    async fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        let manifest = ctx.load_manifest()?;

        ctx.output.section("manifest");
        ctx.output.info(&format!("role:      {}", manifest.role_name()));
        ctx.output.info(&format!("registry:  {} ({:?})", manifest.registry.image, manifest.registry.provider));
        ctx.output.info(&format!("cache:     enabled={} id={}", manifest.cache.enabled, manifest.cache.cache_id));
        ctx.output.info(&format!("sources:   {}", manifest.artifact_sources.len()));

        ctx.output.section("lock");
        match Lock::load(&lock_path_in(&ctx.project_dir)) {
            Ok(lock) => {
                ctx.output.info(&format!("hash:        {}", lock.hash));
                ctx.output.info(&format!("interpreter: {}", lock.interpreter.pinned));
                ctx.output.info(&format!("collections: {}", lock.collections.len()));
                ctx.output.info(&format!("roles:       {}", lock.roles.len()));
            }
            Err(_) => ctx.output.info("no lock file found"),
        }

        Ok(0)
    }
}
