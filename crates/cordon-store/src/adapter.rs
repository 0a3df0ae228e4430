//! Persistence adapter boundary
//!
//! The adapter is an external collaborator: opaque JSON rows keyed by an
//! application-chosen string id, with get/put/delete/query-by-index
//! primitives. The in-memory implementation backs tests and demo use.

use async_trait::async_trait;
use cordon_core::{CordonError, Result};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

/// A stored row: an opaque JSON object carrying its own `id` field
pub type Row = Map<String, Value>;

/// Key/value persistence boundary used by the composed storage.
///
/// Implementations provide durability and single-key ordering only; no
/// cross-key atomicity is promised and none is assumed.
#[async_trait]
pub trait PersistenceAdapter: Send + Sync {
    /// Persist a row under its `id` field, returning the key
    async fn put(&self, store: &str, row: Row) -> Result<String>;

    /// Fetch a row by key
    async fn get(&self, store: &str, key: &str) -> Result<Option<Row>>;

    /// Remove a row by key
    async fn delete(&self, store: &str, key: &str) -> Result<()>;

    /// All rows whose `index` field equals `value`
    async fn query_by_index(&self, store: &str, index: &str, value: &str) -> Result<Vec<Row>>;

    /// Every row in the store
    async fn get_all(&self, store: &str) -> Result<Vec<Row>>;
}

/// In-memory adapter: per-store ordered maps behind one lock.
///
/// Index queries scan; this is the reference adapter for tests and the
/// demo profile, not a production backend.
#[derive(Debug, Default)]
pub struct MemoryAdapter {
    stores: RwLock<HashMap<String, BTreeMap<String, Row>>>,
}

impl MemoryAdapter {
    /// Create an empty adapter
    pub fn new() -> Self {
        Self::default()
    }

    fn read_lock(
        &self,
    ) -> Result<std::sync::RwLockReadGuard<'_, HashMap<String, BTreeMap<String, Row>>>> {
        self.stores
            .read()
            .map_err(|e| CordonError::storage(format!("Adapter lock poisoned: {e}")))
    }

    fn write_lock(
        &self,
    ) -> Result<std::sync::RwLockWriteGuard<'_, HashMap<String, BTreeMap<String, Row>>>> {
        self.stores
            .write()
            .map_err(|e| CordonError::storage(format!("Adapter lock poisoned: {e}")))
    }
}

#[async_trait]
impl PersistenceAdapter for MemoryAdapter {
    async fn put(&self, store: &str, row: Row) -> Result<String> {
        let key = row
            .get("id")
            .and_then(Value::as_str)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| CordonError::storage("Row has no id field"))?
            .to_string();
        let mut stores = self.write_lock()?;
        stores
            .entry(store.to_string())
            .or_default()
            .insert(key.clone(), row);
        Ok(key)
    }

    async fn get(&self, store: &str, key: &str) -> Result<Option<Row>> {
        let stores = self.read_lock()?;
        Ok(stores.get(store).and_then(|rows| rows.get(key)).cloned())
    }

    async fn delete(&self, store: &str, key: &str) -> Result<()> {
        let mut stores = self.write_lock()?;
        if let Some(rows) = stores.get_mut(store) {
            rows.remove(key);
        }
        Ok(())
    }

    async fn query_by_index(&self, store: &str, index: &str, value: &str) -> Result<Vec<Row>> {
        let stores = self.read_lock()?;
        Ok(stores
            .get(store)
            .map(|rows| {
                rows.values()
                    .filter(|row| row.get(index).and_then(Value::as_str) == Some(value))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn get_all(&self, store: &str) -> Result<Vec<Row>> {
        let stores = self.read_lock()?;
        Ok(stores
            .get(store)
            .map(|rows| rows.values().cloned().collect())
            .unwrap_or_default())
    }
}
