//! Reconciles fetched contributions with stored ledgers.
//!
//! Buckets are keyed by repository URL and events by `occurredAt`, so merging
//! the same batch twice leaves the ledger unchanged.

use crate::domain::{
    ActivityEvent, CommitEvent, ContributionKind, ContributionRecord, Ledger, LedgerEvent, OrgRepository,
    RepositoryBucket, RepositoryRef, User,
};
use crate::engine::filter::Blocklist;

impl<E: LedgerEvent> Ledger<E> {
    /// Add `event` to the bucket for `repository`, creating the bucket if needed.
    ///
    /// The bucket's stars are overwritten with the observed value either way.
    /// Returns true if a new event was stored.
    pub fn merge_event(&mut self, repository: &RepositoryRef, event: E) -> bool {
        match self.buckets.iter_mut().find(|b| b.url == repository.url) {
            Some(bucket) => {
                bucket.stars_count = repository.stars_count;
                if bucket.contains(event.occurred_at()) {
                    false
                } else {
                    bucket.events.push(event);
                    true
                }
            }
            None => {
                self.buckets.push(RepositoryBucket {
                    repository_name: repository.name.clone(),
                    url: repository.url.clone(),
                    stars_count: repository.stars_count,
                    events: vec![event],
                });
                true
            }
        }
    }
}

/// Counts from one merge pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    pub added: usize,
    pub duplicates: usize,
    pub skipped_private: usize,
    pub skipped_blocked: usize,
}

impl MergeStats {
    pub fn skipped(&self) -> usize {
        self.skipped_private + self.skipped_blocked
    }
}

impl std::ops::AddAssign for MergeStats {
    fn add_assign(&mut self, other: Self) {
        self.added += other.added;
        self.duplicates += other.duplicates;
        self.skipped_private += other.skipped_private;
        self.skipped_blocked += other.skipped_blocked;
    }
}

/// Applies contribution records to a user's ledgers
#[derive(Debug, Clone, Copy)]
pub struct ContributionMerger<'a> {
    blocklist: &'a Blocklist,
}

impl<'a> ContributionMerger<'a> {
    pub fn new(blocklist: &'a Blocklist) -> Self {
        Self { blocklist }
    }

    /// Merge `records` into the ledger matching each record's kind.
    ///
    /// Private and blocked repositories are never stored.
    pub fn merge_into<I>(&self, user: &mut User, records: I) -> MergeStats
    where
        I: IntoIterator<Item = ContributionRecord>,
    {
        let mut stats = MergeStats::default();

        for record in records {
            if record.is_private() {
                stats.skipped_private += 1;
                continue;
            }
            if self.blocklist.blocks(record.repository()) {
                stats.skipped_blocked += 1;
                continue;
            }

            let added = match record {
                ContributionRecord::Commit {
                    repository,
                    commit_count,
                    occurred_at,
                } => user
                    .commit_contributions
                    .merge_event(&repository, CommitEvent::new(commit_count, occurred_at)),
                ContributionRecord::Issue {
                    repository,
                    occurred_at,
                } => user
                    .issue_contributions
                    .merge_event(&repository, ActivityEvent::new(occurred_at)),
                ContributionRecord::PullRequest {
                    repository,
                    occurred_at,
                } => user
                    .pr_contributions
                    .merge_event(&repository, ActivityEvent::new(occurred_at)),
                ContributionRecord::Review {
                    repository,
                    occurred_at,
                } => user
                    .code_review_contributions
                    .merge_event(&repository, ActivityEvent::new(occurred_at)),
            };

            if added {
                stats.added += 1;
            } else {
                stats.duplicates += 1;
            }
        }

        stats
    }

    /// Merge a fresh repository listing into an organization's stored list.
    ///
    /// Keyed by URL; stars are refreshed, blocked repositories are dropped.
    /// Returns the number of repositories added.
    pub fn merge_repositories<I>(&self, stored: &mut Vec<OrgRepository>, fetched: I) -> usize
    where
        I: IntoIterator<Item = OrgRepository>,
    {
        let mut added = 0;
        for repo in fetched {
            let reference = RepositoryRef::new(repo.name.clone(), repo.url.clone(), repo.stars_count);
            if self.blocklist.blocks(&reference) {
                continue;
            }
            match stored.iter_mut().find(|r| r.url == repo.url) {
                Some(existing) => existing.stars_count = repo.stars_count,
                None => {
                    stored.push(repo);
                    added += 1;
                }
            }
        }
        added
    }
}

/// Serialize the ledger of `kind` from `user`, for a single-field write
pub fn ledger_value(user: &User, kind: ContributionKind) -> serde_json::Result<serde_json::Value> {
    match kind {
        ContributionKind::Commit => serde_json::to_value(&user.commit_contributions),
        ContributionKind::Issue => serde_json::to_value(&user.issue_contributions),
        ContributionKind::PullRequest => serde_json::to_value(&user.pr_contributions),
        ContributionKind::Review => serde_json::to_value(&user.code_review_contributions),
    }
}
