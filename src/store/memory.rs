use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::error::{Result, StoreError};
use super::{KeyValueStore, WriteBatch, WriteOp};

/// In-process store; contents vanish with the value
///
/// Writes can be forced to fail or slowed down so callers can exercise their
/// persistence-failure and timeout paths.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<BTreeMap<String, String>>,
    fail_writes: AtomicBool,
    write_delay: Option<Duration>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every commit by `delay` before applying it
    pub fn with_write_delay(delay: Duration) -> Self {
        Self {
            write_delay: Some(delay),
            ..Self::default()
        }
    }

    /// When set, every commit fails and leaves the records untouched
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.records.read().await.get(key).cloned())
    }

    async fn commit(&self, batch: WriteBatch) -> Result<()> {
        if let Some(delay) = self.write_delay {
            tokio::time::sleep(delay).await;
        }

        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("writes disabled".to_string()));
        }

        let mut records = self.records.write().await;
        for op in batch.into_ops() {
            match op {
                WriteOp::Set { key, value } => {
                    records.insert(key, value);
                }
                WriteOp::Remove { key } => {
                    records.remove(&key);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::keys;

    #[tokio::test]
    async fn test_set_get_remove() {
        let store = MemoryStore::new();
        store.set(keys::USER_ROLE, "worker".to_string()).await.unwrap();
        assert_eq!(store.get(keys::USER_ROLE).await.unwrap().as_deref(), Some("worker"));

        store.remove(keys::USER_ROLE).await.unwrap();
        assert!(store.get(keys::USER_ROLE).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_failed_commit_leaves_records_untouched() {
        let store = MemoryStore::new();
        store.set(keys::JOBS, "[]".to_string()).await.unwrap();
        store.set_fail_writes(true);

        let mut batch = WriteBatch::new();
        batch.set(keys::JOBS, "[1]").set(keys::EMPLOYER_PROFILE, "{}");
        let result = store.commit(batch).await;

        assert!(matches!(result, Err(StoreError::Unavailable(_))));
        assert_eq!(store.get(keys::JOBS).await.unwrap().as_deref(), Some("[]"));
        assert!(store.get(keys::EMPLOYER_PROFILE).await.unwrap().is_none());
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_writes_resume_after_failure_cleared() {
        let store = MemoryStore::new();
        store.set_fail_writes(true);
        assert!(store.set(keys::ONBOARDING, "true".to_string()).await.is_err());

        store.set_fail_writes(false);
        store.set(keys::ONBOARDING, "true".to_string()).await.unwrap();
        assert!(!store.is_empty().await);
    }

    #[tokio::test]
    async fn test_write_delay() {
        let store = MemoryStore::with_write_delay(Duration::from_millis(50));
        let started = tokio::time::Instant::now();
        store.set(keys::JOBS, "[]".to_string()).await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(50));
    }
}
