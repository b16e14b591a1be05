//! Storage layer for ghledger - JSONL document collections.
//!
//! Users, organizations and run statistics each live in their own collection
//! file. Every write of a single document is a whole-file replace through a
//! temp file, so one ledger update is atomic on its own.

mod jsonl;
mod subjects;
mod traits;

pub use jsonl::JsonlStorage;
pub use subjects::{
    Document, ORGS_COLLECTION, OrgStore, STATS_COLLECTION, StatStore, SubjectStore, USERS_COLLECTION, UserStore,
};
pub use traits::{Filter, HasId, Sort, Storage};
