//! Check and clean command implementations

use std::path::Path;

use colored::Colorize;
use depsync_core::{CheckStatus, DriftKind};

use super::open;
use crate::error::Result;

/// Run the check command
///
/// Compares the checkouts with the recorded state and the current plan.
pub fn run_check(path: &Path, json: bool) -> Result<()> {
    if !json {
        println!("{} Checking managed tree...", "=>".blue().bold());
    }

    let report = open(path)?.check()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    match report.status {
        CheckStatus::Healthy => {
            println!("{} Tree is healthy. No drift detected.", "OK".green().bold());
            return Ok(());
        }
        CheckStatus::Missing => println!("{} Some dependencies are missing:", "MISSING".yellow().bold()),
        CheckStatus::Drifted => println!("{} The tree has drifted:", "DRIFTED".red().bold()),
    }
    for item in &report.items {
        let marker = match item.kind {
            DriftKind::NotSynced | DriftKind::MissingCheckout => "-".yellow(),
            _ => "!".red(),
        };
        println!("   {} {}: {}", marker, item.path.cyan(), item.description);
    }
    println!();
    println!("Run {} to repair.", "depsync sync".cyan());
    Ok(())
}

/// Run the clean command
pub fn run_clean(path: &Path) -> Result<()> {
    if open(path)?.clean()? {
        println!("{} Sync state removed.", "OK".green().bold());
    } else {
        println!("{} No sync state to remove.", "OK".green().bold());
    }
    Ok(())
}
