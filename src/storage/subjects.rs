//! Subject-specific storage helpers.
//!
//! Wraps a `Storage` with the document operations the sync stages need:
//! find by key, upsert one ledger field, set scalar fields, delete by key, and
//! list with a sort.

use std::marker::PhantomData;

use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};

use super::traits::{Filter, HasId, Sort, Storage};
use crate::domain::{Organization, Stat, User};
use crate::error::Result;

/// Collection name for users.
pub const USERS_COLLECTION: &str = "users";
/// Collection name for organizations.
pub const ORGS_COLLECTION: &str = "organizations";
/// Collection name for run statistics.
pub const STATS_COLLECTION: &str = "stats";

/// A document type stored in a named collection.
pub trait Document: Serialize + DeserializeOwned + HasId {
    const COLLECTION: &'static str;
}

impl Document for User {
    const COLLECTION: &'static str = USERS_COLLECTION;
}

impl Document for Organization {
    const COLLECTION: &'static str = ORGS_COLLECTION;
}

impl Document for Stat {
    const COLLECTION: &'static str = STATS_COLLECTION;
}

/// Typed view over one collection.
pub struct SubjectStore<'a, S: Storage, T: Document> {
    storage: &'a S,
    _marker: PhantomData<T>,
}

impl<'a, S: Storage, T: Document> SubjectStore<'a, S, T> {
    /// Create a new SubjectStore wrapping the given storage.
    pub fn new(storage: &'a S) -> Self {
        Self {
            storage,
            _marker: PhantomData,
        }
    }

    pub fn find_by_key(&self, key: &str) -> Result<Option<T>> {
        self.storage.get(T::COLLECTION, key)
    }

    pub fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.find_by_key(key)?.is_some())
    }

    pub fn insert(&self, record: &T) -> Result<()> {
        self.storage.create(T::COLLECTION, record)
    }

    /// Replace the whole document.
    pub fn replace(&self, record: &T) -> Result<()> {
        self.storage.update(T::COLLECTION, record.id(), record)
    }

    /// Overwrite one ledger-valued field.
    pub fn upsert_ledger<L: Serialize>(&self, key: &str, field: &str, ledger: &L) -> Result<()> {
        let mut fields = Map::new();
        fields.insert(field.to_string(), serde_json::to_value(ledger)?);
        self.storage.patch::<T>(T::COLLECTION, key, fields)
    }

    /// Overwrite the given scalar fields, leaving everything else untouched.
    pub fn set_scalar_fields(&self, key: &str, fields: Map<String, Value>) -> Result<()> {
        self.storage.patch::<T>(T::COLLECTION, key, fields)
    }

    pub fn delete_by_key(&self, key: &str) -> Result<bool> {
        self.storage.delete::<T>(T::COLLECTION, key)
    }

    pub fn list_sorted(&self, sort: &[Sort]) -> Result<Vec<T>> {
        self.storage.query_sorted(T::COLLECTION, &[], sort)
    }

    /// List records decoded into a narrower projection type.
    pub fn list_projected<P: DeserializeOwned>(&self, sort: &[Sort]) -> Result<Vec<P>> {
        self.storage.query_sorted(T::COLLECTION, &[], sort)
    }

    pub fn find_where(&self, filters: &[Filter]) -> Result<Vec<T>> {
        self.storage.query(T::COLLECTION, filters)
    }

    pub fn count(&self) -> Result<usize> {
        self.storage.count(T::COLLECTION)
    }
}

pub type UserStore<'a, S> = SubjectStore<'a, S, User>;
pub type OrgStore<'a, S> = SubjectStore<'a, S, Organization>;
pub type StatStore<'a, S> = SubjectStore<'a, S, Stat>;
