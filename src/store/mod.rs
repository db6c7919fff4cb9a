/// Durable key-value persistence for session records
///
/// The engine sees storage only through [`KeyValueStore`]: string keys, opaque
/// string values, and an atomic [`WriteBatch`] commit. Two backends ship:
///
/// - [`FjallStore`]: embedded LSM key-value store (Fjall), durable on commit
/// - [`MemoryStore`]: in-process map for tests and throwaway sessions, with
///   write-failure and write-latency injection
///
/// ## Atomicity
///
/// Every mutation is expressed as a batch of `Set`/`Remove` operations that is
/// applied all-or-nothing. The employer profile and the job list always travel
/// in the same batch, so a crash between the two writes cannot leave a debited
/// wallet without its job (or the reverse).
///
/// ## Usage
///
/// ```rust,ignore
/// use livora::store::{FjallStore, KeyValueStore, WriteBatch, keys};
///
/// let store = FjallStore::open("data/livora")?;
/// let mut batch = WriteBatch::new();
/// batch.set(keys::FIRST_LAUNCH, "false");
/// store.commit(batch).await?;
/// ```

pub mod error;
pub mod embedded;
pub mod keys;
pub mod memory;

use async_trait::async_trait;

pub use error::{Result, StoreError};
pub use embedded::{FjallStore, StoreStats};
pub use memory::MemoryStore;

/// A single write inside a batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOp {
    Set { key: String, value: String },
    Remove { key: String },
}

impl WriteOp {
    pub fn key(&self) -> &str {
        match self {
            WriteOp::Set { key, .. } | WriteOp::Remove { key } => key,
        }
    }
}

/// Ordered set of writes applied atomically by [`KeyValueStore::commit`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.ops.push(WriteOp::Set {
            key: key.into(),
            value: value.into(),
        });
        self
    }

    pub fn remove(&mut self, key: impl Into<String>) -> &mut Self {
        self.ops.push(WriteOp::Remove { key: key.into() });
        self
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn into_ops(self) -> Vec<WriteOp> {
        self.ops
    }
}

/// Durable string key-value store
///
/// `commit` is the only required write primitive; `set`, `remove` and
/// `remove_many` are batches of one or more operations. Success means the
/// writes are durable.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Apply every operation in `batch`, or none of them
    async fn commit(&self, batch: WriteBatch) -> Result<()>;

    async fn set(&self, key: &str, value: String) -> Result<()> {
        let mut batch = WriteBatch::new();
        batch.set(key, value);
        self.commit(batch).await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let mut batch = WriteBatch::new();
        batch.remove(key);
        self.commit(batch).await
    }

    async fn remove_many(&self, keys: &[&str]) -> Result<()> {
        let mut batch = WriteBatch::new();
        for key in keys {
            batch.remove(*key);
        }
        self.commit(batch).await
    }

    /// Cheap liveness check used by the health endpoint
    async fn health_check(&self) -> Result<()> {
        self.get(keys::FIRST_LAUNCH).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_preserves_order() {
        let mut batch = WriteBatch::new();
        batch.set("a", "1").remove("b").set("c", "3");

        let keys: Vec<&str> = batch.ops().iter().map(WriteOp::key).collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
        assert_eq!(batch.len(), 3);
    }

    #[test]
    fn test_empty_batch() {
        let batch = WriteBatch::new();
        assert!(batch.is_empty());
        assert!(batch.into_ops().is_empty());
    }
}
