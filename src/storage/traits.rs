//! Storage trait definitions, filter and sort types.

use std::cmp::Ordering;

use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};

use crate::error::Result;

/// Top-level field equality, the only selection the collections need.
///
/// A missing field compares equal to `null`.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub value: Value,
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn matches(&self, record: &Value) -> bool {
        record.get(&self.field).unwrap_or(&Value::Null) == &self.value
    }
}

/// Sort order over one top-level field.
#[derive(Debug, Clone, PartialEq)]
pub struct Sort {
    pub field: String,
    pub descending: bool,
}

impl Sort {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: false,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: true,
        }
    }

    /// Compare two records on the sort field.
    ///
    /// Missing and null values sort before everything else in ascending order.
    pub fn compare(&self, a: &Value, b: &Value) -> Ordering {
        let ord = compare_values(a.get(&self.field), b.get(&self.field));
        if self.descending { ord.reverse() } else { ord }
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let x = x.as_f64().unwrap_or(0.0);
            let y = y.as_f64().unwrap_or(0.0);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (None | Some(Value::Null), None | Some(Value::Null)) => Ordering::Equal,
        (None | Some(Value::Null), _) => Ordering::Less,
        (_, None | Some(Value::Null)) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

/// Documents addressed by a natural key.
pub trait HasId {
    fn id(&self) -> &str;

    /// Name of the field holding the identifier in the stored document.
    fn id_field() -> &'static str {
        "id"
    }
}

/// Document collections keyed by [`HasId`].
pub trait Storage: Send + Sync {
    /// Insert a document; fails if the key is taken.
    fn create<T: Serialize + DeserializeOwned + HasId>(&self, collection: &str, record: &T) -> Result<()>;

    fn get<T: DeserializeOwned + HasId>(&self, collection: &str, id: &str) -> Result<Option<T>>;

    /// Replace a whole document.
    fn update<T: Serialize + DeserializeOwned + HasId>(&self, collection: &str, id: &str, record: &T) -> Result<()>;

    /// Overwrite individual top-level fields of an existing record.
    fn patch<T: HasId>(&self, collection: &str, id: &str, fields: Map<String, Value>) -> Result<()>;

    /// Delete a record by ID. Returns false if nothing was deleted.
    fn delete<T: HasId>(&self, collection: &str, id: &str) -> Result<bool>;

    /// Documents matching every filter, in file order.
    fn query<T: DeserializeOwned>(&self, collection: &str, filters: &[Filter]) -> Result<Vec<T>>;

    /// Query records with filters, ordered by the given sort keys in priority order.
    fn query_sorted<T: DeserializeOwned>(&self, collection: &str, filters: &[Filter], sort: &[Sort]) -> Result<Vec<T>>;

    fn list<T: DeserializeOwned>(&self, collection: &str) -> Result<Vec<T>> {
        self.query(collection, &[])
    }

    fn count(&self, collection: &str) -> Result<usize>;
}
