//! `molectl artifact` — manages the manifest's artifact sources.

use async_trait::async_trait;
use clap::{Args, Subcommand};

use molectl::error::{Error, Result};
use molectl::manifest::{ArtifactSource, MAX_ARTIFACT_SOURCES};

use super::{CommandContext, Runnable};

#[derive(Debug, Args)]
pub struct ArtifactArgs {
    #[command(subcommand)]
    pub command: ArtifactCommand,
}

#[derive(Debug, Subcommand)]
pub enum ArtifactCommand {
    /// Adds a new artifact source, identified by its 1-based position.
    Add {
        name: String,
        #[arg(long)]
        url: String,
        /// Use the external secret backend instead of the local vault.
        #[arg(long)]
        use_external: bool,
        #[arg(long, default_value = "")]
        path: String,
        #[arg(long, default_value = "")]
        secret_name: String,
        #[arg(long, default_value = "")]
        user_field: String,
        #[arg(long, default_value = "")]
        token_field: String,
    },
    /// Removes an artifact source by name.
    Remove {
        name: String,
    },
    /// Lists configured artifact sources with their indices.
    List,
    /// Prints the full record for a single artifact source.
    Show {
        name: String,
    },
}

#[async_trait]
impl Runnable for ArtifactArgs {
    async fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        match &self.command {
            ArtifactCommand::Add {
                name,
                url,
                use_external,
                path,
                secret_name,
                user_field,
                token_field,
            } => add(ctx, name, url, *use_external, path, secret_name, user_field, token_field),
            ArtifactCommand::Remove { name } => remove(ctx, name),
            ArtifactCommand::List => list(ctx),
            ArtifactCommand::Show { name } => show(ctx, name),
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn add(
    ctx: &mut CommandContext,
    name: &str,
    url: &str,
    use_external: bool,
    path: &str,
    secret_name: &str,
    user_field: &str,
    token_field: &str,
) -> Result<i32> {
    let mut manifest = ctx.load_manifest()?;

    if manifest.artifact_sources.iter().any(|s| s.name == name) {
        ctx.output.error(&format!("artifact source '{name}' already exists"));
        return Ok(1);
    }
    if manifest.artifact_sources.len() >= MAX_ARTIFACT_SOURCES {
        return Err(Error::ManifestValidation(format!(
            "at most {MAX_ARTIFACT_SOURCES} artifact sources are supported"
        )));
    }

    manifest.artifact_sources.push(ArtifactSource {
        name: name.to_string(),
        url: url.to_string(),
        use_external,
        path: path.to_string(),
        secret_name: secret_name.to_string(),
        user_field: user_field.to_string(),
        token_field: token_field.to_string(),
    });
    manifest.save(&ctx.manifest_path())?;
    ctx.output.success(&format!("added artifact source '{name}'"));
    Ok(0)
}

fn remove(ctx: &mut CommandContext, name: &str) -> Result<i32> {
    let mut manifest = ctx.load_manifest()?;
    let before = manifest.artifact_sources.len();
    manifest.artifact_sources.retain(|s| s.name != name);

    if manifest.artifact_sources.len() == before {
        ctx.output.error(&format!("no artifact source named '{name}'"));
        return Ok(1);
    }

    manifest.save(&ctx.manifest_path())?;
    ctx.output.success(&format!("removed artifact source '{name}'"));
    Ok(0)
}

fn list(ctx: &mut CommandContext) -> Result<i32> {
    let manifest = ctx.load_manifest()?;
    for (index, source) in manifest.artifact_sources.iter().enumerate() {
        ctx.output.info(&format!("{}. {} ({})", index + 1, source.name, source.url));
    }
    Ok(0)
}

fn show(ctx: &mut CommandContext, name: &str) -> Result<i32> {
    let manifest = ctx.load_manifest()?;
    match manifest.artifact_sources.iter().find(|s| s.name == name) {
        Some(source) => {
            ctx.output.info(&format!("name:         {}", source.name));
            ctx.output.info(&format!("url:          {}", source.url));
            ctx.output.info(&format!("use_external: {}", source.use_external));
            ctx.output.info(&format!("path:         {}", source.path));
            Ok(0)
        }
        None => {
            ctx.output.error(&format!("no artifact source named '{name}'"));
            Ok(1)
        }
    }
}
