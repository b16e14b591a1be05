//! Aggregation engine
//!
//! - paging: cursor walks over a paged source
//! - retry: bounded retry with fixed delay
//! - merge: ledger reconciliation keyed by repository URL
//! - window / score: trailing-window score and commit count
//! - rank: standard competition ranking
//! - filter: region and blocklist predicates

pub mod filter;
pub mod merge;
pub mod paging;
pub mod rank;
pub mod retry;
pub mod score;
pub mod window;

pub use filter::{Blocklist, LocationClassifier};
pub use merge::{ContributionMerger, MergeStats, ledger_value};
pub use paging::{Page, PageSource, PageWalker, Walk};
pub use rank::{RankEntry, assign_ranks};
pub use retry::RetryExecutor;
pub use score::{ScoreCard, score_ledger};
pub use window::TimeWindow;
