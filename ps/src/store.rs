//! In-memory record store
//!
//! Collections of JSON-encoded records with indexed-field filtering.
//! Safe for shared use behind an `Arc`; all mutation happens under a
//! single `RwLock` per store.

use std::collections::HashMap;
use std::sync::RwLock;

use tracing::debug;

use crate::error::StoreError;
use crate::record::{Filter, IndexValue, Record};

/// One stored record: serialized body plus its index snapshot
#[derive(Debug, Clone)]
struct StoredRecord {
    body: serde_json::Value,
    indexed: HashMap<String, IndexValue>,
    updated_at: i64,
}

/// In-memory store keyed by collection name, then record id
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, HashMap<String, StoredRecord>>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a record
    pub fn put<T: Record>(&self, record: &T) -> Result<(), StoreError> {
        debug!(collection = T::collection_name(), id = record.id(), "put: called");
        let body = serde_json::to_value(record)?;
        let stored = StoredRecord {
            body,
            indexed: record.indexed_fields(),
            updated_at: record.updated_at(),
        };

        let mut collections = self
            .collections
            .write()
            .map_err(|e| StoreError::Poisoned(e.to_string()))?;
        collections
            .entry(T::collection_name().to_string())
            .or_default()
            .insert(record.id().to_string(), stored);
        Ok(())
    }

    /// Fetch a record by id
    pub fn get<T: Record>(&self, id: &str) -> Result<T, StoreError> {
        debug!(collection = T::collection_name(), %id, "get: called");
        let collections = self
            .collections
            .read()
            .map_err(|e| StoreError::Poisoned(e.to_string()))?;

        let stored = collections
            .get(T::collection_name())
            .and_then(|c| c.get(id))
            .ok_or_else(|| StoreError::NotFound {
                collection: T::collection_name().to_string(),
                id: id.to_string(),
            })?;

        Ok(serde_json::from_value(stored.body.clone())?)
    }

    /// Delete a record by id
    pub fn delete<T: Record>(&self, id: &str) -> Result<(), StoreError> {
        debug!(collection = T::collection_name(), %id, "delete: called");
        let mut collections = self
            .collections
            .write()
            .map_err(|e| StoreError::Poisoned(e.to_string()))?;

        let removed = collections
            .get_mut(T::collection_name())
            .and_then(|c| c.remove(id));

        if removed.is_none() {
            return Err(StoreError::NotFound {
                collection: T::collection_name().to_string(),
                id: id.to_string(),
            });
        }
        Ok(())
    }

    /// List records matching all the given filters, oldest update first
    pub fn list<T: Record>(&self, filters: &[Filter]) -> Result<Vec<T>, StoreError> {
        debug!(
            collection = T::collection_name(),
            filter_count = filters.len(),
            "list: called"
        );
        let collections = self
            .collections
            .read()
            .map_err(|e| StoreError::Poisoned(e.to_string()))?;

        let Some(collection) = collections.get(T::collection_name()) else {
            return Ok(Vec::new());
        };

        let mut matched: Vec<&StoredRecord> = collection
            .values()
            .filter(|stored| filters.iter().all(|f| f.matches(&stored.indexed)))
            .collect();
        matched.sort_by_key(|stored| stored.updated_at);

        matched
            .into_iter()
            .map(|stored| serde_json::from_value(stored.body.clone()).map_err(StoreError::from))
            .collect()
    }

    /// Count records in a collection
    pub fn count<T: Record>(&self) -> Result<usize, StoreError> {
        let collections = self
            .collections
            .read()
            .map_err(|e| StoreError::Poisoned(e.to_string()))?;
        Ok(collections.get(T::collection_name()).map_or(0, HashMap::len))
    }
}
