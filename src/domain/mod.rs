//! Domain types for ghledger
//!
//! - ContributionRecord: one decoded contribution, tagged by kind
//! - Ledger / RepositoryBucket: the persisted per-repository aggregation
//! - User / Organization: the tracked subjects
//! - Stat: run-level totals

pub mod ledger;
pub mod record;
pub mod stat;
pub mod subject;

pub use ledger::{ActivityEvent, ActivityLedger, CommitEvent, CommitLedger, Ledger, LedgerEvent, RepositoryBucket};
pub use record::{ContributionKind, ContributionRecord, RepositoryRef};
pub use stat::Stat;
pub use subject::{Member, OrgProfile, OrgRepository, Organization, User, UserProfile, fields};
