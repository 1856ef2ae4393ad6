//! Subcommand implementations for the molectl CLI.

pub mod artifact;
pub mod cache;
pub mod deps;
pub mod molecule;
pub mod role;
pub mod show;

use std::path::PathBuf;

use async_trait::async_trait;

use crate::cli::output::OutputFormatter;
use crate::config::Config;
use molectl::error::Result;
use molectl::manifest::Manifest;

/// Shared state threaded through every subcommand.
pub struct CommandContext {
    /// Process-level configuration (resolved before the manifest).
    pub config: Config,
    /// Console output.
    pub output: OutputFormatter,
    /// Project directory, defaults to the current working directory.
    pub project_dir: PathBuf,
    /// CI mode, forces copy-in/copy-out cache transport and non-interactive phases.
    pub ci_mode: bool,
}

impl CommandContext {
    /// Builds a context from parsed global CLI flags and a loaded config.
    pub fn new(verbosity: u8, no_color: bool, project_dir: PathBuf, ci_mode: bool, config: Config) -> Self {
        Self {
            output: OutputFormatter::new(!no_color && !config.no_color, verbosity.max(config.verbosity)),
            config,
            project_dir,
            ci_mode,
        }
    }

    /// Loads the manifest from the project directory, or synthesizes a
    /// default one with a warning when missing.
    pub fn load_manifest(&self) -> Result<Manifest> {
        match Manifest::load_from_dir(&self.project_dir) {
            Ok(manifest) => Ok(manifest),
            Err(molectl::error::Error::ManifestNotFound(_)) => {
                self.output.warn("no molectl.yml found, using defaults for this invocation");
                Ok(Manifest::synthesize_default("default"))
            }
            Err(e) => Err(e),
        }
    }

    /// Path to the manifest file in the project directory.
    pub fn manifest_path(&self) -> PathBuf {
        Manifest::path_in(&self.project_dir)
    }
}

/// A subcommand that can be dispatched against a shared [`CommandContext`].
#[async_trait]
pub trait Runnable {
    /// Executes the command, returning the process exit code.
    async fn execute(&self, ctx: &mut CommandContext) -> Result<i32>;
}
