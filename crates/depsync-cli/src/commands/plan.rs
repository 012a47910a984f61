//! Plan and tree command implementations

use std::path::Path;

use colored::Colorize;
use depsync_core::{
    DependencyKind, Diagnostic, PlanOutcome, ResolvedDependency, StateStore, render_tree,
};

use super::open;
use crate::cli::PlanArgs;
use crate::error::Result;

/// Which plan entries to show. The default shows everything.
#[derive(Debug, Clone, Default)]
pub(crate) struct PlanFilter {
    pub name: Option<String>,
    pub kind: Option<DependencyKind>,
}

impl PlanFilter {
    fn matches(&self, entry: &ResolvedDependency) -> bool {
        let name_matches = self
            .name
            .as_deref()
            .is_none_or(|n| entry.name == n || entry.path.as_str() == n);
        name_matches && self.kind.is_none_or(|k| entry.kind == k)
    }
}

/// Run the plan command
///
/// Builds and resolves the graph from the current tree without syncing.
pub fn run_plan(args: &PlanArgs) -> Result<()> {
    let synchronizer = open(&args.root)?;
    let outcome = synchronizer.plan()?;
    let filter = PlanFilter {
        name: args.name.clone(),
        kind: args.kind.map(DependencyKind::from),
    };

    if args.stamps {
        let state = StateStore::load(synchronizer.config().state_path())?;
        for entry in outcome.plan.entries().iter().filter(|e| filter.matches(e)) {
            println!("{}", stamp(entry, &state));
        }
        return Ok(());
    }
    print_plan(&outcome, &filter, args.json)
}

/// `path: url@revision`, preferring the revision id recorded by the last sync.
fn stamp(entry: &ResolvedDependency, state: &StateStore) -> String {
    let revision = state
        .record_of(&entry.path)
        .filter(|r| r.matches(&entry.locator, &entry.revision, entry.kind) && !r.revision.is_empty())
        .map(|r| r.revision.clone())
        .unwrap_or_else(|| entry.revision.to_string());
    format!("{}: {}@{}", entry.path.as_str(), entry.locator.url, revision)
}

/// Print the entries of a plan selected by `filter`, as text or as JSON.
pub(crate) fn print_plan(outcome: &PlanOutcome, filter: &PlanFilter, json: bool) -> Result<()> {
    let entries: Vec<&ResolvedDependency> = outcome
        .plan
        .entries()
        .iter()
        .filter(|e| filter.matches(e))
        .collect();

    if json {
        let value = serde_json::json!({
            "entries": entries,
            "pending": outcome.graph.pending(),
            "diagnostics": outcome.diagnostics,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("{} Nothing to sync.", "OK".green().bold());
    }
    for entry in entries {
        let marker = if entry.is_conflicted() {
            "!".red()
        } else if entry.is_solution {
            "*".blue()
        } else {
            "+".green()
        };
        let mut line = format!(
            "   {} {} {} @ {}",
            marker,
            entry.path.as_str().cyan(),
            entry.locator,
            entry.revision
        );
        if outcome.graph.is_pending(&entry.path) {
            line.push_str(&format!(" {}", "(not yet cloned)".dimmed()));
        }
        if !entry.overridden.is_empty() {
            line.push_str(&format!(
                " {}",
                format!("(overrides {} request(s))", entry.overridden.len()).dimmed()
            ));
        }
        println!("{}", line);
    }
    print_diagnostics(&outcome.diagnostics);
    Ok(())
}

pub(crate) fn print_diagnostics(diagnostics: &[Diagnostic]) {
    if diagnostics.is_empty() {
        return;
    }
    println!();
    println!("{} {} diagnostic(s):", "WARN".yellow().bold(), diagnostics.len());
    for diagnostic in diagnostics {
        println!("   {} {}", "!".yellow(), diagnostic);
    }
}

/// Run the tree command
pub fn run_tree(path: &Path) -> Result<()> {
    let outcome = open(path)?.plan()?;
    print!("{}", render_tree(&outcome.graph));
    print_diagnostics(&outcome.diagnostics);
    Ok(())
}
