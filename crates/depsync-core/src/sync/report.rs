//! Per-node outcomes and the run report

use depsync_fs::RelativePath;
use serde::{Deserialize, Serialize};

use crate::model::Diagnostic;

/// Why a node was not attempted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "kebab-case")]
pub enum SkipReason {
    /// The node itself is conflicted-unresolved
    Conflict,
    /// An enclosing node was conflicted, failed or skipped
    Parent { path: RelativePath },
    /// Cancellation was requested before the node started
    Cancelled,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Conflict => write!(f, "conflict"),
            Self::Parent { path } => write!(f, "parent {} not synced", path),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// What happened to one plan entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "kebab-case")]
pub enum Outcome {
    Unchanged,
    Updated,
    Failed { reason: String },
    Skipped { reason: SkipReason },
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Unchanged | Self::Updated)
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    pub fn is_skip(&self) -> bool {
        matches!(self, Self::Skipped { .. })
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unchanged => write!(f, "unchanged"),
            Self::Updated => write!(f, "updated"),
            Self::Failed { reason } => write!(f, "failed: {}", reason),
            Self::Skipped { reason } => write!(f, "skipped: {}", reason),
        }
    }
}

/// Outcome of one path plus the revisions the adapter reported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncResult {
    pub path: RelativePath,
    #[serde(flatten)]
    pub outcome: Outcome,
    pub previous: Option<String>,
    pub current: Option<String>,
}

impl SyncResult {
    pub fn new(path: RelativePath, outcome: Outcome) -> Self {
        Self {
            path,
            outcome,
            previous: None,
            current: None,
        }
    }

    pub fn skipped(path: RelativePath, reason: SkipReason) -> Self {
        Self::new(path, Outcome::Skipped { reason })
    }

    pub fn failed(path: RelativePath, reason: impl Into<String>) -> Self {
        Self::new(
            path,
            Outcome::Failed {
                reason: reason.into(),
            },
        )
    }

    pub fn with_revisions(mut self, previous: Option<String>, current: Option<String>) -> Self {
        self.previous = previous;
        self.current = current;
        self
    }
}

/// Overall verdict of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SummaryStatus {
    AllSucceeded,
    SucceededWithSkips,
    SucceededWithFailures,
    /// Nothing succeeded and at least one node failed
    Failed,
}

impl SummaryStatus {
    pub fn from_results(results: &[SyncResult]) -> Self {
        let failures = results.iter().filter(|r| r.outcome.is_failure()).count();
        let skips = results.iter().filter(|r| r.outcome.is_skip()).count();
        let successes = results.len() - failures - skips;

        match (failures, skips) {
            (0, 0) => Self::AllSucceeded,
            (0, _) => Self::SucceededWithSkips,
            (_, _) if successes == 0 => Self::Failed,
            _ => Self::SucceededWithFailures,
        }
    }

    pub fn is_clean(&self) -> bool {
        matches!(self, Self::AllSucceeded)
    }
}

impl std::fmt::Display for SummaryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Self::AllSucceeded => "all succeeded",
            Self::SucceededWithSkips => "succeeded with skips",
            Self::SucceededWithFailures => "succeeded with failures",
            Self::Failed => "failed",
        };
        f.write_str(text)
    }
}

/// Report of a sync run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub status: SummaryStatus,
    /// One entry per attempted path, in plan order
    pub results: Vec<SyncResult>,
    pub diagnostics: Vec<Diagnostic>,
    /// Discovery passes run before the plan settled
    pub passes: usize,
    pub dry_run: bool,
}

impl SyncReport {
    pub fn new(results: Vec<SyncResult>, diagnostics: Vec<Diagnostic>, passes: usize) -> Self {
        Self {
            status: SummaryStatus::from_results(&results),
            results,
            diagnostics,
            passes,
            dry_run: false,
        }
    }

    pub fn result_for(&self, path: &str) -> Option<&SyncResult> {
        self.results.iter().find(|r| r.path.as_str() == path)
    }

    pub fn count(&self, predicate: impl Fn(&Outcome) -> bool) -> usize {
        self.results.iter().filter(|r| predicate(&r.outcome)).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn result(outcome: Outcome) -> SyncResult {
        SyncResult::new(RelativePath::parse("x").unwrap(), outcome)
    }

    fn failed() -> Outcome {
        Outcome::Failed {
            reason: "boom".into(),
        }
    }

    fn skipped() -> Outcome {
        Outcome::Skipped {
            reason: SkipReason::Conflict,
        }
    }

    #[rstest]
    #[case(vec![], SummaryStatus::AllSucceeded)]
    #[case(vec![Outcome::Updated, Outcome::Unchanged], SummaryStatus::AllSucceeded)]
    #[case(vec![Outcome::Updated, skipped()], SummaryStatus::SucceededWithSkips)]
    #[case(vec![Outcome::Updated, failed(), skipped()], SummaryStatus::SucceededWithFailures)]
    #[case(vec![failed(), skipped()], SummaryStatus::Failed)]
    fn summary_status(#[case] outcomes: Vec<Outcome>, #[case] expected: SummaryStatus) {
        let results: Vec<SyncResult> = outcomes.into_iter().map(result).collect();
        assert_eq!(SummaryStatus::from_results(&results), expected);
    }
}
