//! `molectl role` — manifest lifecycle and per-source credential management.

use async_trait::async_trait;
use clap::{Args, Subcommand};

use molectl::credentials::{CredentialRecord, CredentialStore};
use molectl::error::Result;
use molectl::manifest::Manifest;

use super::{CommandContext, Runnable};

#[derive(Debug, Args)]
pub struct RoleArgs {
    #[command(subcommand)]
    pub command: RoleCommand,
}

#[derive(Debug, Subcommand)]
pub enum RoleCommand {
    /// Writes a default `molectl.yml` for a new role in the project directory.
    Init {
        /// Role name, stored in the manifest and used to scope the cache and credential store.
        name: String,
    },
    /// Manages per-artifact-source credentials in the local vault.
    Credential {
        #[command(subcommand)]
        command: CredentialCommand,
    },
}

#[derive(Debug, Subcommand)]
pub enum CredentialCommand {
    /// Stores a username/token pair for an artifact source.
    Set {
        /// Artifact source name, matches an entry in `molectl.yml`.
        name: String,
        #[arg(long)]
        url: String,
        #[arg(long)]
        username: String,
        #[arg(long)]
        token: String,
    },
    /// Prints the stored username and URL for a source (never the token).
    Get {
        name: String,
    },
    /// Lists the credential names stored for this role.
    List,
    /// Removes a stored credential.
    Delete {
        name: String,
    },
}

#[async_trait]
impl Runnable for RoleArgs {
    async fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        match &self.command {
            RoleCommand::Init { name } => init(ctx, name),
            RoleCommand::Credential { command } => credential(ctx, command),
        }
    }
}

fn init(ctx: &mut CommandContext, name: &str) -> Result<i32> {
    let path = ctx.manifest_path();
    if path.exists() {
        ctx.output.error(&format!("'{}' already exists", path.display()));
        return Ok(1);
    }

    let manifest = Manifest::synthesize_default(name);
    manifest.save(&path)?;
    ctx.output.success(&format!("wrote {}", path.display()));
    Ok(0)
}

fn credential(ctx: &mut CommandContext, command: &CredentialCommand) -> Result<i32> {
    let manifest = ctx.load_manifest()?;
    let store = CredentialStore::open(manifest.role_name())?;

    match command {
        CredentialCommand::Set { name, url, username, token } => {
            store.save(&CredentialRecord {
                name: name.clone(),
                url: url.clone(),
                username: username.clone(),
                token: token.clone(),
            })?;
            ctx.output.success(&format!("stored credentials for '{name}'"));
            Ok(0)
        }
        CredentialCommand::Get { name } => {
            let record = store.load(name)?;
            ctx.output.info(&format!("{}\t{}", record.username, record.url));
            Ok(0)
        }
        CredentialCommand::List => {
            for name in store.list()? {
                ctx.output.info(&name);
            }
            Ok(0)
        }
        CredentialCommand::Delete { name } => {
            store.delete(name)?;
            ctx.output.success(&format!("deleted credentials for '{name}'"));
            Ok(0)
        }
    }
}
