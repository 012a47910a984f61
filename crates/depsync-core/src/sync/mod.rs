//! Applying a plan to the working tree

mod cancel;
mod check;
mod driver;
mod engine;
mod report;

pub use cancel::CancellationToken;
pub use check::{CheckReport, CheckStatus, DriftItem, DriftKind, check_tree};
pub use driver::{PlanOutcome, SyncOptions, Synchronizer};
pub use engine::{ApplyOptions, SyncEngine};
pub use report::{Outcome, SkipReason, SummaryStatus, SyncReport, SyncResult};
