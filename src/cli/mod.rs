//! CLI module for molectl.
//!
//! Provides argument parsing and subcommand dispatch. Each verb owns its
//! `*Args` struct and implements [`commands::Runnable`]; `main.rs` only
//! constructs the shared [`commands::CommandContext`] and dispatches.

pub mod commands;
pub mod output;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use commands::artifact::ArtifactArgs;
use commands::cache::CacheArgs;
use commands::deps::DepsArgs;
use commands::molecule::MoleculeArgs;
use commands::role::RoleArgs;
use commands::show::ShowArgs;

/// molectl - drives Ansible role testing inside a disposable worker container.
#[derive(Parser, Debug)]
#[command(name = "molectl")]
#[command(version)]
#[command(about = "Drives Ansible role testing inside a disposable container", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short = 'v', long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Path to a molectl.cfg config file, overriding the default search path.
    #[arg(short = 'c', long, global = true, env = "MOLECTL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Project directory containing molectl.yml. Defaults to the current directory.
    #[arg(short = 'C', long, global = true)]
    pub project_dir: Option<PathBuf>,

    /// Disable colored output.
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Run in CI mode: copy-in/copy-out cache transport instead of bind mounts,
    /// non-interactive phase execution.
    #[arg(long, global = true, env = "MOLECTL_CI")]
    pub ci: bool,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manifest lifecycle and per-source credential management.
    Role(RoleArgs),
    /// Drives the worker container through test phases.
    Molecule(MoleculeArgs),
    /// Inspects and manages the per-role cache.
    Cache(CacheArgs),
    /// Manages the manifest's artifact sources.
    Artifact(ArtifactArgs),
    /// Dependency resolution and lock file maintenance.
    Deps(DepsArgs),
    /// Prints a summary of the resolved manifest and lock.
    Show(ShowArgs),
}

impl Cli {
    /// Parses arguments from `std::env::args`.
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    /// Effective verbosity, capped at 3 (trace).
    pub fn verbosity(&self) -> u8 {
        self.verbose.min(3)
    }

    /// Resolves the project directory, defaulting to the current directory.
    pub fn resolved_project_dir(&self) -> std::io::Result<PathBuf> {
        match &self.project_dir {
            Some(dir) => Ok(dir.clone()),
            None => std::env::current_dir(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_role_init() {
        let cli = Cli::try_parse_from(["molectl", "role", "init", "geerlingguy.docker"]).unwrap();
        assert!(matches!(cli.command, Commands::Role(_)));
    }

    #[test]
    fn verbosity_is_capped_at_three() {
        let cli = Cli::try_parse_from(["molectl", "-vvvvvv", "show"]).unwrap();
        assert_eq!(cli.verbosity(), 3);
    }

    #[test]
    fn ci_flag_is_global() {
        let cli = Cli::try_parse_from(["molectl", "--ci", "molecule", "create"]).unwrap();
        assert!(cli.ci);
    }
}
