//! depsync CLI
//!
//! The command-line interface for syncing a tree of repositories from their
//! dependency manifests.

mod cli;
mod commands;
mod error;

use clap::Parser;
use colored::Colorize;
use tracing::Level;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use cli::{Cli, Commands};
use error::{CliError, Result};

/// Exit status of a sync that finished with failures or skips
const EXIT_INCOMPLETE: i32 = 2;

fn main() {
    match run() {
        Ok(true) => {}
        Ok(false) => std::process::exit(EXIT_INCOMPLETE),
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            std::process::exit(1);
        }
    }
}

/// Returns `false` when the command completed but not cleanly.
fn run() -> Result<bool> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    match cli.command {
        Some(cmd) => execute_command(cmd),
        None => {
            println!("{} dependency tree synchronizer", "depsync".green().bold());
            println!();
            println!("Run {} for available commands.", "depsync --help".cyan());
            Ok(true)
        }
    }
}

/// Debug output with `--verbose`, otherwise `RUST_LOG` or warnings only.
fn init_tracing(verbose: bool) -> Result<()> {
    let builder = FmtSubscriber::builder().with_writer(std::io::stderr);
    let result = if verbose {
        let subscriber = builder
            .with_max_level(Level::DEBUG)
            .with_target(true)
            .finish();
        tracing::subscriber::set_global_default(subscriber)
    } else {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        let subscriber = builder.with_env_filter(filter).with_target(false).finish();
        tracing::subscriber::set_global_default(subscriber)
    };
    result.map_err(|e| CliError::user(format!("Failed to set tracing subscriber: {}", e)))?;
    tracing::debug!("Verbose mode enabled");
    Ok(())
}

fn execute_command(cmd: Commands) -> Result<bool> {
    match cmd {
        Commands::Sync(args) => commands::run_sync(&args),
        Commands::Plan(args) => commands::run_plan(&args).map(|()| true),
        Commands::Tree { root } => commands::run_tree(&root).map(|()| true),
        Commands::Check { json, root } => commands::run_check(&root, json).map(|()| true),
        Commands::Clean { root } => commands::run_clean(&root).map(|()| true),
    }
}
