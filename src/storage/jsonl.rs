//! JSONL-based document storage with in-memory caching.
//!
//! One file per collection, one JSON document per line. Appends go straight to
//! the file; replacements rewrite the collection through a temp file and a
//! rename, so a crash mid-write leaves the previous file intact.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};

use super::traits::{Filter, HasId, Sort, Storage};
use crate::error::{LedgerError, Result};

/// JSONL-based storage with in-memory caching.
pub struct JsonlStorage {
    base_path: PathBuf,
    cache: RwLock<HashMap<String, Vec<Value>>>,
}

impl std::fmt::Debug for JsonlStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonlStorage")
            .field("base_path", &self.base_path)
            .finish_non_exhaustive()
    }
}

fn lock_err<E: std::fmt::Display>(e: E) -> LedgerError {
    LedgerError::Store(e.to_string())
}

fn not_loaded(collection: &str) -> LedgerError {
    LedgerError::Store(format!("Collection not loaded: {}", collection))
}

fn id_matches(record: &Value, id_field: &str, id: &str) -> bool {
    record.get(id_field).and_then(|v| v.as_str()) == Some(id)
}

impl JsonlStorage {
    /// Create a new JsonlStorage at the given path.
    pub fn new(base_path: impl AsRef<Path>) -> Result<Self> {
        let base_path = base_path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path)?;
        Ok(Self {
            base_path,
            cache: RwLock::new(HashMap::new()),
        })
    }

    /// Get the file path for a collection.
    fn collection_path(&self, collection: &str) -> PathBuf {
        self.base_path.join(format!("{}.jsonl", collection))
    }

    /// Load a collection into cache if not already loaded.
    fn ensure_loaded(&self, collection: &str) -> Result<()> {
        {
            let cache = self.cache.read().map_err(lock_err)?;
            if cache.contains_key(collection) {
                return Ok(());
            }
        }

        let mut cache = self.cache.write().map_err(lock_err)?;
        if cache.contains_key(collection) {
            return Ok(());
        }

        let path = self.collection_path(collection);
        let records = if path.exists() {
            let file = File::open(&path)?;
            let reader = BufReader::new(file);
            let mut records = Vec::new();
            for line in reader.lines() {
                let line = line?;
                if !line.trim().is_empty() {
                    let record: Value = serde_json::from_str(&line)?;
                    records.push(record);
                }
            }
            log::debug!("Loaded {} records from {}", records.len(), path.display());
            records
        } else {
            Vec::new()
        };

        cache.insert(collection.to_string(), records);
        Ok(())
    }

    /// Append a record to the JSONL file.
    fn append_to_file(&self, collection: &str, record: &Value) -> Result<()> {
        let path = self.collection_path(collection);
        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        writeln!(file, "{}", serde_json::to_string(record)?)?;
        Ok(())
    }

    /// Rewrite the entire collection file from cache.
    fn rewrite_file(&self, collection: &str) -> Result<()> {
        let cache = self.cache.read().map_err(lock_err)?;
        let records = cache.get(collection).ok_or_else(|| not_loaded(collection))?;

        let path = self.collection_path(collection);
        let tmp_path = path.with_extension("jsonl.tmp");
        {
            let mut writer = BufWriter::new(File::create(&tmp_path)?);
            for record in records {
                writeln!(writer, "{}", serde_json::to_string(record)?)?;
            }
            writer.flush()?;
        }
        fs::rename(&tmp_path, &path)?;
        Ok(())
    }

    /// Apply `f` to the record with the given id, then persist the collection.
    fn modify(&self, collection: &str, id_field: &str, id: &str, f: impl FnOnce(&mut Value)) -> Result<()> {
        self.ensure_loaded(collection)?;

        {
            let mut cache = self.cache.write().map_err(lock_err)?;
            let records = cache.get_mut(collection).ok_or_else(|| not_loaded(collection))?;

            let record = records
                .iter_mut()
                .find(|r| id_matches(r, id_field, id))
                .ok_or_else(|| LedgerError::Store(format!("Record not found in {}: {}", collection, id)))?;
            f(record);
        }

        self.rewrite_file(collection)
    }
}

impl Storage for JsonlStorage {
    fn create<T: Serialize + DeserializeOwned + HasId>(&self, collection: &str, record: &T) -> Result<()> {
        self.ensure_loaded(collection)?;

        {
            let cache = self.cache.read().map_err(lock_err)?;
            let records = cache.get(collection).ok_or_else(|| not_loaded(collection))?;
            if records.iter().any(|r| id_matches(r, T::id_field(), record.id())) {
                return Err(LedgerError::Store(format!(
                    "Record already exists in {}: {}",
                    collection,
                    record.id()
                )));
            }
        }

        let value = serde_json::to_value(record)?;

        // Append to file first (source of truth)
        self.append_to_file(collection, &value)?;

        let mut cache = self.cache.write().map_err(lock_err)?;
        cache
            .get_mut(collection)
            .ok_or_else(|| not_loaded(collection))?
            .push(value);

        Ok(())
    }

    fn get<T: DeserializeOwned + HasId>(&self, collection: &str, id: &str) -> Result<Option<T>> {
        self.ensure_loaded(collection)?;

        let cache = self.cache.read().map_err(lock_err)?;
        let records = cache.get(collection).ok_or_else(|| not_loaded(collection))?;

        match records.iter().find(|r| id_matches(r, T::id_field(), id)) {
            Some(record) => Ok(Some(serde_json::from_value(record.clone())?)),
            None => Ok(None),
        }
    }

    fn update<T: Serialize + DeserializeOwned + HasId>(&self, collection: &str, id: &str, record: &T) -> Result<()> {
        let value = serde_json::to_value(record)?;
        self.modify(collection, T::id_field(), id, |r| *r = value)
    }

    fn patch<T: HasId>(&self, collection: &str, id: &str, fields: Map<String, Value>) -> Result<()> {
        self.modify(collection, T::id_field(), id, |r| {
            if let Value::Object(obj) = r {
                for (key, value) in fields {
                    obj.insert(key, value);
                }
            }
        })
    }

    fn delete<T: HasId>(&self, collection: &str, id: &str) -> Result<bool> {
        self.ensure_loaded(collection)?;

        {
            let mut cache = self.cache.write().map_err(lock_err)?;
            let records = cache.get_mut(collection).ok_or_else(|| not_loaded(collection))?;

            let original_len = records.len();
            records.retain(|r| !id_matches(r, T::id_field(), id));

            if records.len() == original_len {
                return Ok(false);
            }
        }

        self.rewrite_file(collection)?;
        Ok(true)
    }

    fn query<T: DeserializeOwned>(&self, collection: &str, filters: &[Filter]) -> Result<Vec<T>> {
        self.query_sorted(collection, filters, &[])
    }

    fn query_sorted<T: DeserializeOwned>(&self, collection: &str, filters: &[Filter], sort: &[Sort]) -> Result<Vec<T>> {
        self.ensure_loaded(collection)?;

        let cache = self.cache.read().map_err(lock_err)?;
        let records = cache.get(collection).ok_or_else(|| not_loaded(collection))?;

        let mut matched: Vec<&Value> = records
            .iter()
            .filter(|record| filters.iter().all(|f| f.matches(record)))
            .collect();

        if !sort.is_empty() {
            matched.sort_by(|a, b| {
                sort.iter()
                    .map(|s| s.compare(a, b))
                    .find(|o| o.is_ne())
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
        }

        matched
            .into_iter()
            .map(|record| serde_json::from_value(record.clone()).map_err(LedgerError::from))
            .collect()
    }

    fn count(&self, collection: &str) -> Result<usize> {
        self.ensure_loaded(collection)?;
        let cache = self.cache.read().map_err(lock_err)?;
        Ok(cache.get(collection).map(|r| r.len()).unwrap_or(0))
    }
}
