//! Tests for breadth-first graph discovery

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use depsync_core::{
    DependencyGraphBuilder, DiagnosticKind, Rewrites, Solution, TomlManifestSource, render_tree,
};
use depsync_fs::RelativePath;
use depsync_vcs::{RevisionSpec, SourceLocator};
use pretty_assertions::assert_eq;
use rstest::rstest;
use tempfile::TempDir;

fn solution(name: &str) -> Solution {
    Solution {
        name: name.to_string(),
        path: RelativePath::parse(name).unwrap(),
        locator: SourceLocator::git(format!("https://example.com/{name}.git")),
        manifest: "DEPS".to_string(),
        revision: RevisionSpec::Default,
    }
}

/// Materialize a checkout at `path` carrying `manifest` as its DEPS file.
fn checkout(root: &Path, path: &str, manifest: &str) {
    let dir = root.join(path);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("DEPS"), manifest).unwrap();
}

fn rel(path: &str) -> RelativePath {
    RelativePath::parse(path).unwrap()
}

#[test]
fn unmaterialized_nodes_are_pending() {
    let temp = TempDir::new().unwrap();
    checkout(
        temp.path(),
        "app",
        "[deps.lib]\nurl = \"https://example.com/lib.git\"\n",
    );

    let source = TomlManifestSource;
    let (graph, diagnostics) = DependencyGraphBuilder::new(temp.path(), &source)
        .build(&[solution("app")])
        .unwrap();

    assert!(diagnostics.is_empty());
    assert_eq!(graph.len(), 2);
    assert!(graph.is_pending(&rel("app/lib")));
    assert!(!graph.is_pending(&rel("app")));
    assert_eq!(graph.children_of(&rel("app")), vec![&rel("app/lib")]);
}

#[test]
fn shared_dependency_keeps_every_requester() {
    let temp = TempDir::new().unwrap();
    let shared = "[deps.\"../shared\"]\nurl = \"https://example.com/shared.git\"\n";
    checkout(temp.path(), "one", shared);
    checkout(temp.path(), "two", shared);

    let source = TomlManifestSource;
    let (graph, _) = DependencyGraphBuilder::new(temp.path(), &source)
        .jobs(4)
        .build(&[solution("one"), solution("two")])
        .unwrap();

    // Same value from both sides collapses to one request
    let node = graph.node(&rel("shared")).unwrap();
    assert_eq!(node.requests.len(), 1);
    assert_eq!(node.requests[0].origin, vec![rel("one")]);
    assert_eq!(
        node.requesters.iter().map(|p| p.as_str()).collect::<Vec<_>>(),
        vec!["one", "two"]
    );
}

#[rstest]
#[case::escape("[deps.\"../../outside\"]\nurl = \"https://example.com/x.git\"\n", DiagnosticKind::PathEscape)]
#[case::unknown_kind("[deps.x]\nurl = \"https://example.com/x\"\nkind = \"svn\"\n", DiagnosticKind::UnsupportedKind)]
#[case::bad_toml("[deps.x\nurl = ", DiagnosticKind::MalformedManifest)]
#[case::unknown_key("[deps.x]\nurl = \"https://example.com/x.git\"\nrevision = \"main\"\n", DiagnosticKind::MalformedManifest)]
#[case::two_refs("[deps.x]\nurl = \"https://example.com/x.git\"\nbranch = \"a\"\ntag = \"b\"\n", DiagnosticKind::MalformedManifest)]
fn manifest_problems_become_diagnostics(#[case] manifest: &str, #[case] expected: DiagnosticKind) {
    let temp = TempDir::new().unwrap();
    checkout(temp.path(), "app", manifest);
    checkout(temp.path(), "other", "[deps.ok]\nurl = \"https://example.com/ok.git\"\n");

    let source = TomlManifestSource;
    let (graph, diagnostics) = DependencyGraphBuilder::new(temp.path(), &source)
        .build(&[solution("app"), solution("other")])
        .unwrap();

    assert_eq!(diagnostics.len(), 1, "{diagnostics:?}");
    assert_eq!(diagnostics[0].kind, expected);
    // The healthy Solution is unaffected
    assert!(graph.node(&rel("other/ok")).is_some());
}

#[test]
fn cycle_is_cut_where_it_closes() {
    let temp = TempDir::new().unwrap();
    checkout(temp.path(), "app", "[deps.a]\nurl = \"https://example.com/a.git\"\n");
    checkout(temp.path(), "app/a", "[deps.\"..\"]\nurl = \"https://example.com/app.git\"\n");

    let source = TomlManifestSource;
    let (graph, diagnostics) = DependencyGraphBuilder::new(temp.path(), &source)
        .build(&[solution("app")])
        .unwrap();

    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].kind, DiagnosticKind::CycleDetected);
    assert!(diagnostics[0].message.contains("app -> app/a"));
    assert_eq!(graph.node(&rel("app")).unwrap().requests.len(), 1);
}

#[test]
fn rewrites_apply_to_declared_urls() {
    let temp = TempDir::new().unwrap();
    checkout(temp.path(), "app", "[deps.lib]\nurl = \"https://github.com/org/lib.git\"\n");

    let rewrites = Rewrites::new(BTreeMap::from([(
        "https://github.com/".to_string(),
        "https://mirror.internal/gh/".to_string(),
    )]));
    let source = TomlManifestSource;
    let (graph, _) = DependencyGraphBuilder::new(temp.path(), &source)
        .rewrites(rewrites)
        .build(&[solution("app")])
        .unwrap();

    let node = graph.node(&rel("app/lib")).unwrap();
    assert_eq!(node.requests[0].locator.url, "https://mirror.internal/gh/org/lib.git");
}

#[test]
fn non_recursive_build_reads_only_solution_manifests() {
    let temp = TempDir::new().unwrap();
    checkout(temp.path(), "app", "[deps.lib]\nurl = \"https://example.com/lib.git\"\n");
    checkout(temp.path(), "app/lib", "[deps.sub]\nurl = \"https://example.com/sub.git\"\n");

    let source = TomlManifestSource;
    let (graph, _) = DependencyGraphBuilder::new(temp.path(), &source)
        .recursive(false)
        .build(&[solution("app")])
        .unwrap();

    assert!(graph.node(&rel("app/lib")).is_some());
    assert!(graph.node(&rel("app/lib/sub")).is_none());
}

#[test]
fn concurrent_builds_are_identical() {
    let temp = TempDir::new().unwrap();
    for (name, deps) in [("one", ["a", "b", "c"]), ("two", ["c", "d", "e"])] {
        let manifest: String = deps
            .iter()
            .map(|d| format!("[deps.\"../{d}\"]\nurl = \"https://example.com/{name}-{d}.git\"\n"))
            .collect();
        checkout(temp.path(), name, &manifest);
    }
    let solutions = [solution("one"), solution("two")];
    let source = TomlManifestSource;

    let serial = DependencyGraphBuilder::new(temp.path(), &source)
        .jobs(1)
        .build(&solutions)
        .unwrap();
    for _ in 0..5 {
        let parallel = DependencyGraphBuilder::new(temp.path(), &source)
            .jobs(8)
            .build(&solutions)
            .unwrap();
        assert_eq!(parallel, serial);
    }
    assert!(render_tree(&serial.0).contains("[2 requests]"));
}
