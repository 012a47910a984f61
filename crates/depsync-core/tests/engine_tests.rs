//! Tests for SyncEngine wave scheduling and skip rules

use std::collections::BTreeSet;
use std::sync::Arc;

use depsync_core::{
    ApplyOptions, CancellationToken, DependencyKind, Outcome, ResolutionStatus, ResolvedDependency,
    SkipReason, StateStore, SyncEngine,
};
use depsync_fs::{NormalizedPath, RelativePath};
use depsync_test_utils::fake::RecordingVcs;
use depsync_vcs::{AdapterSet, RevisionSpec, SourceLocator};
use pretty_assertions::assert_eq;
use rstest::rstest;
use tempfile::TempDir;

fn entry(path: &str, url: &str) -> ResolvedDependency {
    ResolvedDependency {
        path: RelativePath::parse(path).unwrap(),
        name: path.to_string(),
        locator: SourceLocator::git(url),
        revision: RevisionSpec::Default,
        kind: DependencyKind::SourceCheckout,
        manifest: "DEPS".to_string(),
        digest: None,
        overridden: Vec::new(),
        status: ResolutionStatus::Resolved,
        is_solution: false,
    }
}

struct Fixture {
    temp: TempDir,
    vcs: Arc<RecordingVcs>,
    state: StateStore,
}

impl Fixture {
    fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let vcs = Arc::new(RecordingVcs::git());
        for name in ["a", "b", "c"] {
            vcs.add_remote(&format!("https://example.com/{name}.git"), &format!("{name}000001"));
        }
        let state = StateStore::new(NormalizedPath::new(temp.path().join(".depsync/state.toml")));
        Self { temp, vcs, state }
    }

    fn engine(&self) -> SyncEngine {
        SyncEngine::new(self.temp.path(), AdapterSet::new().with(self.vcs.clone()))
    }
}

#[test]
fn results_follow_entry_order() {
    let mut fx = Fixture::new();
    let entries = vec![
        entry("a", "https://example.com/a.git"),
        entry("a/b", "https://example.com/b.git"),
        entry("c", "https://example.com/c.git"),
    ];

    let results = fx
        .engine()
        .apply(&entries, &mut fx.state, &ApplyOptions::default())
        .unwrap();

    let paths: Vec<&str> = results.iter().map(|r| r.path.as_str()).collect();
    assert_eq!(paths, vec!["a", "a/b", "c"]);
    assert!(results.iter().all(|r| r.outcome == Outcome::Updated));
    assert_eq!(results[1].current.as_deref(), Some("b000001"));
    assert_eq!(fx.state.records().len(), 3);
}

#[rstest]
#[case::cancelled(true, false)]
#[case::blocked(false, true)]
fn nothing_runs_when_skipped_up_front(#[case] cancelled: bool, #[case] blocked: bool) {
    let mut fx = Fixture::new();
    let cancel = CancellationToken::new();
    if cancelled {
        cancel.cancel();
    }
    let options = ApplyOptions {
        cancel,
        blocked: if blocked {
            BTreeSet::from([RelativePath::parse("a").unwrap()])
        } else {
            BTreeSet::new()
        },
        ..Default::default()
    };

    let results = fx
        .engine()
        .apply(&[entry("a/b", "https://example.com/b.git")], &mut fx.state, &options)
        .unwrap();

    let expected = if cancelled {
        SkipReason::Cancelled
    } else {
        SkipReason::Parent {
            path: RelativePath::parse("a").unwrap(),
        }
    };
    assert_eq!(results[0].outcome, Outcome::Skipped { reason: expected });
    assert!(fx.vcs.calls().is_empty());
    assert!(fx.state.records().is_empty());
}

#[test]
fn conflicted_entries_block_their_subtree() {
    let mut fx = Fixture::new();
    let mut conflicted = entry("a", "https://example.com/a.git");
    conflicted.status = ResolutionStatus::ConflictedUnresolved;
    let entries = vec![conflicted, entry("a/b", "https://example.com/b.git")];

    let results = fx
        .engine()
        .apply(&entries, &mut fx.state, &ApplyOptions::default())
        .unwrap();

    assert_eq!(
        results[0].outcome,
        Outcome::Skipped {
            reason: SkipReason::Conflict
        }
    );
    assert!(matches!(
        results[1].outcome,
        Outcome::Skipped {
            reason: SkipReason::Parent { .. }
        }
    ));
    assert!(fx.vcs.calls().is_empty());
}

#[test]
fn missing_adapter_fails_the_node() {
    let mut fx = Fixture::new();
    let mut binary = entry("tool", "https://example.com/tool.zip");
    binary.kind = DependencyKind::OpaqueBinary;

    let results = fx
        .engine()
        .apply(&[binary], &mut fx.state, &ApplyOptions::default())
        .unwrap();

    match &results[0].outcome {
        Outcome::Failed { reason } => assert!(reason.contains("archive"), "got {reason}"),
        other => panic!("expected failure, got {other:?}"),
    }
}

#[test]
fn unmanaged_files_survive_a_first_clone() {
    let mut fx = Fixture::new();
    std::fs::create_dir_all(fx.temp.path().join("a")).unwrap();
    std::fs::write(fx.temp.path().join("a/notes.txt"), "mine").unwrap();
    // No state record, so the directory is not treated as a stale checkout
    let results = fx
        .engine()
        .apply(
            &[entry("a", "https://example.com/a.git")],
            &mut fx.state,
            &ApplyOptions::default(),
        )
        .unwrap();

    assert_eq!(results[0].outcome, Outcome::Updated);
    assert!(fx.temp.path().join("a/notes.txt").exists(), "unmanaged files are not removed");
}
