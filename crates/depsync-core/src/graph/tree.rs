//! Text rendering of the dependency tree.

use std::fmt::Write;

use depsync_fs::RelativePath;

use super::{Graph, GraphNode};

/// Render `graph` as an indented tree rooted at each Solution.
///
/// A node declared by several parents appears under each of them.
pub fn render_tree(graph: &Graph) -> String {
    let mut out = String::new();
    let roots: Vec<&GraphNode> = graph.nodes().filter(|n| n.is_solution()).collect();
    for root in roots {
        let _ = writeln!(out, "{}", label(graph, root));
        let mut stack = vec![root.path.clone()];
        render_children(graph, &root.path, "", &mut stack, &mut out);
    }
    out
}

fn render_children(
    graph: &Graph,
    parent: &RelativePath,
    prefix: &str,
    stack: &mut Vec<RelativePath>,
    out: &mut String,
) {
    let children = graph.children_of(parent);
    let count = children.len();
    for (i, path) in children.into_iter().enumerate() {
        let Some(node) = graph.node(path) else {
            continue;
        };
        let last = i + 1 == count;
        let (branch, indent) = if last {
            ("└── ", "    ")
        } else {
            ("├── ", "│   ")
        };

        if stack.contains(path) {
            let _ = writeln!(out, "{}{}{} [cycle]", prefix, branch, path);
            continue;
        }
        let _ = writeln!(out, "{}{}{}", prefix, branch, label(graph, node));

        stack.push(path.clone());
        render_children(graph, path, &format!("{}{}", prefix, indent), stack, out);
        stack.pop();
    }
}

fn label(graph: &Graph, node: &GraphNode) -> String {
    let mut text = node.path.to_string();
    if let Some(first) = node.requests.first() {
        let _ = write!(text, " ({} @ {})", first.locator.url, first.revision);
    }
    if node.requests.len() > 1 {
        let _ = write!(text, " [{} requests]", node.requests.len());
    }
    if graph.is_pending(&node.path) {
        text.push_str(" [pending]");
    }
    text
}
