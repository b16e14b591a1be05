//! Orchestration of one ingestion run
//!
//! Stages run strictly one after another, one subject at a time:
//! - users: discovery, profile refresh, contribution sync
//! - orgs: discovery, repository listing, members
//! - derive: score, commit count, repository count, ranks, stats
//! - pipeline: wires the stages into the CLI commands

pub mod derive;
pub mod orgs;
pub mod pipeline;
pub mod users;

use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};

use crate::config::Config;
use crate::engine::{Blocklist, LocationClassifier, PageWalker, RetryExecutor};
use crate::github::GraphqlTransport;
use crate::storage::Storage;

pub use derive::{RankMetric, rank_users, record_stats, update_repository_counts, update_scores};
pub use orgs::{discover_orgs, sync_org_members, sync_org_repositories};
pub use pipeline::{Pipeline, RunReport};
pub use users::{UserSyncOutcome, discover_users, save_users, sync_all_contributions, sync_user};

/// Everything a sync stage needs, borrowed for the duration of a run
pub struct SyncContext<'a, S: Storage, T: GraphqlTransport + ?Sized> {
    pub storage: &'a S,
    pub transport: &'a T,
    pub walker: PageWalker,
    pub blocklist: &'a Blocklist,
    pub classifier: &'a LocationClassifier,
    pub config: &'a Config,
}

impl<'a, S: Storage, T: GraphqlTransport + ?Sized> SyncContext<'a, S, T> {
    pub fn new(
        storage: &'a S,
        transport: &'a T,
        blocklist: &'a Blocklist,
        classifier: &'a LocationClassifier,
        config: &'a Config,
    ) -> Self {
        let retry = RetryExecutor::from_config(&config.retry);
        Self {
            storage,
            transport,
            walker: PageWalker::new(retry, config.github.max_pages),
            blocklist,
            classifier,
            config,
        }
    }

    pub fn retry(&self) -> &RetryExecutor {
        self.walker.retry()
    }

    pub fn page_size(&self) -> u32 {
        self.config.github.page_size
    }
}

/// Subjects touched by one stage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageReport {
    pub inserted: usize,
    pub updated: usize,
    pub removed: usize,
}

impl std::ops::AddAssign for StageReport {
    fn add_assign(&mut self, other: Self) {
        self.inserted += other.inserted;
        self.updated += other.updated;
        self.removed += other.removed;
    }
}

/// Date part (`YYYY-MM-DD`) of a stored creation timestamp
pub(crate) fn date_part(created_at: &str) -> Option<&str> {
    created_at.get(..10)
}

/// Contribution fetch range: from the earlier of Jan 1st and the window start, up to now
pub fn fetch_range(now: DateTime<Utc>, window_days: u32) -> (DateTime<Utc>, DateTime<Utc>) {
    let window_start = now - Duration::days(i64::from(window_days));
    let year_start = Utc
        .with_ymd_and_hms(now.year(), 1, 1, 0, 0, 0)
        .single()
        .unwrap_or(window_start);
    (year_start.min(window_start), now)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_range_mid_year_starts_jan_first() {
        let now = Utc.with_ymd_and_hms(2024, 6, 30, 12, 0, 0).unwrap();
        let (from, to) = fetch_range(now, 30);
        assert_eq!(from, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(to, now);
    }

    #[test]
    fn test_fetch_range_early_january_covers_window() {
        let now = Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap();
        let (from, _) = fetch_range(now, 30);
        assert_eq!(from, Utc.with_ymd_and_hms(2023, 12, 11, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_date_part() {
        assert_eq!(date_part("2015-04-02T10:00:00Z"), Some("2015-04-02"));
        assert_eq!(date_part("2015"), None);
    }
}
