//! Registry store trait and write batches.

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;

use aiverify_core::{RegistryKey, StoreError};

/// Type alias for boxed futures returned by store methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Field set of one hash record, ordered by field name.
pub type Fields = BTreeMap<String, String>;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// A single queued write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOp {
    /// Set every given field of a hash record.
    HashSet { key: String, fields: Fields },
    /// Remove a record entirely.
    Delete { key: String },
}

/// Writes applied together, all or nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreBatch {
    ops: Vec<StoreOp>,
}

impl StoreBatch {
    /// Create an empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a multi-field write to one record.
    pub fn hash_set(&mut self, key: &RegistryKey, fields: Fields) -> &mut Self {
        self.hash_set_raw(key.to_string(), fields)
    }

    /// Queue a multi-field write by raw key.
    pub fn hash_set_raw(&mut self, key: impl Into<String>, fields: Fields) -> &mut Self {
        self.ops.push(StoreOp::HashSet {
            key: key.into(),
            fields,
        });
        self
    }

    /// Queue removal of one record.
    pub fn delete(&mut self, key: &RegistryKey) -> &mut Self {
        self.delete_raw(key.to_string())
    }

    /// Queue removal of a record by raw key.
    pub fn delete_raw(&mut self, key: impl Into<String>) -> &mut Self {
        self.ops.push(StoreOp::Delete { key: key.into() });
        self
    }

    /// Queued operations in submission order.
    pub fn ops(&self) -> &[StoreOp] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// Key-value store of hash records backing the plugin registry.
///
/// Implementations must apply [`RegistryStore::execute`] atomically: a reader
/// observes either none or all of a batch's writes.
pub trait RegistryStore: Send + Sync {
    /// Name of this backend, for logging.
    fn name(&self) -> &'static str;

    /// Set one field of a hash record.
    fn hash_set<'a>(&'a self, key: &'a str, field: &'a str, value: &'a str) -> BoxFuture<'a, StoreResult<()>>;

    /// Get one field of a hash record.
    fn hash_get<'a>(&'a self, key: &'a str, field: &'a str) -> BoxFuture<'a, StoreResult<Option<String>>>;

    /// Get every field of a hash record; empty when the key is absent.
    fn hash_get_all<'a>(&'a self, key: &'a str) -> BoxFuture<'a, StoreResult<Fields>>;

    /// List keys matching a glob pattern (`*` wildcards).
    fn keys_matching<'a>(&'a self, pattern: &'a str) -> BoxFuture<'a, StoreResult<Vec<String>>>;

    /// Remove a record.
    fn delete<'a>(&'a self, key: &'a str) -> BoxFuture<'a, StoreResult<()>>;

    /// Apply a batch atomically.
    fn execute(&self, batch: StoreBatch) -> BoxFuture<'_, StoreResult<()>>;
}

#[cfg(test)]
mod tests {
    use aiverify_core::ComponentKind;

    use super::*;

    #[test]
    fn test_batch_records_ops_in_order() {
        let mut fields = Fields::new();
        fields.insert("data".to_string(), "{}".to_string());

        let mut batch = StoreBatch::new();
        batch
            .hash_set(&RegistryKey::component(ComponentKind::Widget, "p", "w"), fields.clone())
            .delete(&RegistryKey::plugin_index("p"));

        assert_eq!(batch.len(), 2);
        assert_eq!(
            batch.ops()[0],
            StoreOp::HashSet {
                key: "widget:p:w".to_string(),
                fields
            }
        );
        assert_eq!(
            batch.ops()[1],
            StoreOp::Delete {
                key: "plugin:list:p".to_string()
            }
        );
    }
}
