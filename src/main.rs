//! molectl - drives Ansible role testing inside a disposable worker container.
//!
//! This is the main entry point for the molectl CLI.

mod cli;
mod config;

use clap::Parser;
use cli::commands::{CommandContext, Runnable};
use cli::{Cli, Commands};
use config::Config;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const VERSION: &str = env!("CARGO_PKG_VERSION");
const AUTHORS: &str = env!("CARGO_PKG_AUTHORS");

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse_args();

    init_logging(cli.verbosity());

    if cli.verbosity() >= 2 {
        eprintln!("molectl v{VERSION} by {AUTHORS}");
    }

    let config = Config::load(cli.config.as_ref()).unwrap_or_else(|e| {
        if cli.verbosity() >= 1 {
            eprintln!("Warning: failed to load config: {e}");
        }
        Config::default()
    });

    let project_dir = cli.resolved_project_dir()?;
    let mut ctx = CommandContext::new(cli.verbosity(), cli.no_color, project_dir, cli.ci, config);

    let result = match &cli.command {
        Commands::Role(args) => args.execute(&mut ctx).await,
        Commands::Molecule(args) => args.execute(&mut ctx).await,
        Commands::Cache(args) => args.execute(&mut ctx).await,
        Commands::Artifact(args) => args.execute(&mut ctx).await,
        Commands::Deps(args) => args.execute(&mut ctx).await,
        Commands::Show(args) => args.execute(&mut ctx).await,
    };

    let exit_code = match result {
        Ok(code) => code,
        Err(e) => {
            ctx.output.error(&e.to_string());
            e.exit_code()
        }
    };

    std::process::exit(exit_code);
}

/// Initializes the tracing subscriber based on `-v` count, respecting
/// `RUST_LOG` if set.
fn init_logging(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(verbosity >= 3))
        .with(env_filter)
        .init();
}
