//! Sync command implementation
//!
//! The sync itself runs on a blocking task while the runtime watches for
//! Ctrl-C, which trips the cancellation token: running operations finish,
//! nothing new starts.

use colored::Colorize;
use depsync_core::{Outcome, SyncOptions, SyncReport};

use super::open;
use super::plan::{PlanFilter, print_diagnostics, print_plan};
use crate::cli::SyncArgs;
use crate::error::Result;

/// Run the sync command. Returns whether every node succeeded.
pub fn run_sync(args: &SyncArgs) -> Result<bool> {
    let synchronizer = open(&args.root)?;

    let options = SyncOptions {
        force: args.force.then_some(true),
        jobs: args.jobs,
        shallow: args.no_history.then_some(true),
        strict: args.strict.then_some(true),
        include_solutions: args.include_solutions,
        dry_run: args.dry_run,
        ..Default::default()
    };

    if options.dry_run {
        // Settings and strict conflicts are checked before anything is shown
        synchronizer.sync(&options)?;
        let outcome = synchronizer.plan()?;
        print_plan(&outcome, &PlanFilter::default(), args.json)?;
        return Ok(true);
    }

    if !args.json {
        println!("{} Synchronizing dependencies...", "=>".blue().bold());
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()?;
    let report = runtime.block_on(async move {
        let cancel = options.cancel.clone();
        let watcher = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupted, waiting for running operations");
                cancel.cancel();
            }
        });
        let result = tokio::task::spawn_blocking(move || synchronizer.sync(&options)).await;
        watcher.abort();
        result
    })??;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(report.status.is_clean())
}

fn print_report(report: &SyncReport) {
    for result in &report.results {
        let path = result.path.as_str().cyan();
        match &result.outcome {
            Outcome::Updated => {
                let revision = match (&result.previous, &result.current) {
                    (Some(previous), Some(current)) if previous != current => {
                        format!("{} -> {}", short(previous), short(current))
                    }
                    (_, Some(current)) => short(current).to_string(),
                    _ => String::new(),
                };
                println!("   {} {} {}", "+".green(), path, revision.dimmed());
            }
            Outcome::Unchanged => println!("   {} {}", "=".dimmed(), path),
            Outcome::Failed { reason } => println!("   {} {}: {}", "!".red(), path, reason),
            Outcome::Skipped { reason } => {
                println!("   {} {} {}", "-".yellow(), path, format!("(skipped: {})", reason).dimmed())
            }
        }
    }
    print_diagnostics(&report.diagnostics);

    println!();
    let summary = format!(
        "{} updated, {} unchanged, {} failed, {} skipped in {} pass(es)",
        report.count(|o| matches!(o, Outcome::Updated)),
        report.count(|o| matches!(o, Outcome::Unchanged)),
        report.count(Outcome::is_failure),
        report.count(Outcome::is_skip),
        report.passes
    );
    if report.status.is_clean() {
        println!("{} {}", "OK".green().bold(), summary);
    } else {
        println!("{} {} ({})", "INCOMPLETE".yellow().bold(), summary, report.status);
    }
}

/// Abbreviated commit id; digests and short ids pass through.
fn short(revision: &str) -> &str {
    if revision.len() == 40 && revision.bytes().all(|b| b.is_ascii_hexdigit()) {
        &revision[..10]
    } else {
        revision
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_abbreviates_full_commit_ids() {
        assert_eq!(short("0123456789abcdef0123456789abcdef01234567"), "0123456789");
        assert_eq!(short("abc1234"), "abc1234");
        assert_eq!(short("sha256:00ff"), "sha256:00ff");
    }
}
