//! In-process registry store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use globset::Glob;
use tokio::sync::RwLock;

use aiverify_core::StoreError;

use crate::store::{BoxFuture, Fields, RegistryStore, StoreBatch, StoreOp, StoreResult};

/// Registry store held in memory.
///
/// Batches are staged and committed under a single write lock, so readers
/// never see a partially applied batch. [`MemoryStore::fail_next_batch`]
/// makes the next batch fail halfway through staging, leaving the store
/// untouched.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<String, Fields>>,
    fail_next_batch: AtomicBool,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next [`RegistryStore::execute`] call fail.
    pub fn fail_next_batch(&self) {
        self.fail_next_batch.store(true, Ordering::SeqCst);
    }

    /// Number of records held.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Check if the store holds no records.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// All keys, sorted.
    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.records.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }
}

impl RegistryStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn hash_set<'a>(&'a self, key: &'a str, field: &'a str, value: &'a str) -> BoxFuture<'a, StoreResult<()>> {
        Box::pin(async move {
            self.records
                .write()
                .await
                .entry(key.to_string())
                .or_default()
                .insert(field.to_string(), value.to_string());
            Ok(())
        })
    }

    fn hash_get<'a>(&'a self, key: &'a str, field: &'a str) -> BoxFuture<'a, StoreResult<Option<String>>> {
        Box::pin(async move {
            Ok(self
                .records
                .read()
                .await
                .get(key)
                .and_then(|fields| fields.get(field).cloned()))
        })
    }

    fn hash_get_all<'a>(&'a self, key: &'a str) -> BoxFuture<'a, StoreResult<Fields>> {
        Box::pin(async move { Ok(self.records.read().await.get(key).cloned().unwrap_or_default()) })
    }

    fn keys_matching<'a>(&'a self, pattern: &'a str) -> BoxFuture<'a, StoreResult<Vec<String>>> {
        Box::pin(async move {
            let matcher = Glob::new(pattern)
                .map_err(StoreError::backend)?
                .compile_matcher();
            let mut keys: Vec<String> = self
                .records
                .read()
                .await
                .keys()
                .filter(|k| matcher.is_match(k.as_str()))
                .cloned()
                .collect();
            keys.sort();
            Ok(keys)
        })
    }

    fn delete<'a>(&'a self, key: &'a str) -> BoxFuture<'a, StoreResult<()>> {
        Box::pin(async move {
            self.records.write().await.remove(key);
            Ok(())
        })
    }

    fn execute(&self, batch: StoreBatch) -> BoxFuture<'_, StoreResult<()>> {
        Box::pin(async move {
            let mut records = self.records.write().await;
            let fail = self.fail_next_batch.swap(false, Ordering::SeqCst);
            let fail_at = batch.len() / 2;

            // Stage into a copy of the touched records; commit only at the end.
            let mut staged: HashMap<String, Option<Fields>> = HashMap::new();
            for (i, op) in batch.ops().iter().enumerate() {
                if fail && i == fail_at {
                    return Err(StoreError::backend("batch interrupted"));
                }
                match op {
                    StoreOp::HashSet { key, fields } => {
                        let current = staged
                            .entry(key.clone())
                            .or_insert_with(|| records.get(key).cloned());
                        current
                            .get_or_insert_with(Fields::new)
                            .extend(fields.iter().map(|(f, v)| (f.clone(), v.clone())));
                    }
                    StoreOp::Delete { key } => {
                        staged.insert(key.clone(), None);
                    }
                }
            }
            if fail {
                return Err(StoreError::backend("batch interrupted"));
            }

            for (key, fields) in staged {
                match fields {
                    Some(fields) => {
                        records.insert(key, fields);
                    }
                    None => {
                        records.remove(&key);
                    }
                }
            }
            Ok(())
        })
    }
}
