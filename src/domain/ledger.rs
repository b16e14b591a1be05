//! Per-repository contribution ledgers.
//!
//! A ledger holds at most one bucket per repository URL, and each bucket holds
//! at most one event per `occurredAt` timestamp. New buckets and events only
//! enter through `Ledger::merge_event` (see `engine::merge`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Anything that can be stored in a bucket
pub trait LedgerEvent: Clone {
    /// Identity of the event within its bucket
    fn occurred_at(&self) -> DateTime<Utc>;
}

/// A commit contribution day for one repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitEvent {
    pub commit_count: u64,
    pub occurred_at: DateTime<Utc>,
}

impl CommitEvent {
    pub fn new(commit_count: u64, occurred_at: DateTime<Utc>) -> Self {
        Self {
            commit_count,
            occurred_at,
        }
    }
}

impl LedgerEvent for CommitEvent {
    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
}

/// An issue, pull request, or review contribution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEvent {
    pub occurred_at: DateTime<Utc>,
}

impl ActivityEvent {
    pub fn new(occurred_at: DateTime<Utc>) -> Self {
        Self { occurred_at }
    }
}

impl LedgerEvent for ActivityEvent {
    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
}

/// All contributions of one subject to one repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryBucket<E> {
    pub repository_name: String,
    pub url: String,
    /// Latest observed value, overwritten on every merge
    pub stars_count: u64,
    #[serde(alias = "commits")]
    pub(crate) events: Vec<E>,
}

impl<E: LedgerEvent> RepositoryBucket<E> {
    pub fn events(&self) -> &[E] {
        &self.events
    }

    pub fn contains(&self, occurred_at: DateTime<Utc>) -> bool {
        self.events.iter().any(|e| e.occurred_at() == occurred_at)
    }
}

/// The set of buckets for one subject and one contribution kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ledger<E> {
    pub(crate) buckets: Vec<RepositoryBucket<E>>,
}

impl<E> Default for Ledger<E> {
    fn default() -> Self {
        Self { buckets: Vec::new() }
    }
}

impl<E: LedgerEvent> Ledger<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn buckets(&self) -> &[RepositoryBucket<E>] {
        &self.buckets
    }

    /// Look up a bucket by repository URL
    pub fn bucket(&self, url: &str) -> Option<&RepositoryBucket<E>> {
        self.buckets.iter().find(|b| b.url == url)
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Total number of events across all buckets
    pub fn event_count(&self) -> usize {
        self.buckets.iter().map(|b| b.events.len()).sum()
    }
}

pub type CommitLedger = Ledger<CommitEvent>;
pub type ActivityLedger = Ledger<ActivityEvent>;
