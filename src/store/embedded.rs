use std::path::Path;

use async_trait::async_trait;
use fjall::{Config, Keyspace, PartitionCreateOptions, PartitionHandle, PersistMode};
use tracing::{debug, info};

use super::error::{Result, StoreError};
use super::{KeyValueStore, WriteBatch, WriteOp, keys};

/// Fjall-backed durable storage for session records
#[derive(Clone)]
pub struct FjallStore {
    keyspace: Keyspace,
    records: PartitionHandle,
}

impl FjallStore {
    /// Open or create a Fjall store at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening Fjall store at: {}", path.display());

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let keyspace = Config::new(path).open()?;
        let records = keyspace.open_partition("records", PartitionCreateOptions::default())?;

        info!("Fjall store opened successfully");
        Ok(Self { keyspace, records })
    }

    /// Write the batch and sync the journal; blocking
    fn commit_blocking(&self, batch: WriteBatch) -> Result<()> {
        let op_count = batch.len();
        let mut fjall_batch = self.keyspace.batch();

        for op in batch.into_ops() {
            match op {
                WriteOp::Set { key, value } => {
                    debug!(record = keys::short_name(&key), bytes = value.len(), "Staging set");
                    fjall_batch.insert(&self.records, key, value);
                }
                WriteOp::Remove { key } => {
                    debug!(record = keys::short_name(&key), "Staging remove");
                    fjall_batch.remove(&self.records, key);
                }
            }
        }

        fjall_batch.commit()?;
        self.keyspace.persist(PersistMode::SyncAll)?;
        debug!(op_count, "Committed batch");
        Ok(())
    }

    /// Get internal statistics (for debugging/monitoring)
    pub fn stats(&self) -> Result<StoreStats> {
        let mut record_count = 0;
        let mut value_bytes = 0;

        for item in self.records.iter() {
            let (_, value) = item?;
            record_count += 1;
            value_bytes += value.len();
        }

        Ok(StoreStats {
            record_count,
            value_bytes,
        })
    }
}

#[async_trait]
impl KeyValueStore for FjallStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        match self.records.get(key)? {
            Some(value) => {
                let text = String::from_utf8(value.to_vec())
                    .map_err(|e| StoreError::Unavailable(format!("non-utf8 record {key}: {e}")))?;
                Ok(Some(text))
            }
            None => Ok(None),
        }
    }

    async fn commit(&self, batch: WriteBatch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }

        let store = self.clone();
        tokio::task::spawn_blocking(move || store.commit_blocking(batch))
            .await
            .map_err(|e| StoreError::Unavailable(format!("commit task failed: {e}")))?
    }
}

#[derive(Debug, Clone)]
pub struct StoreStats {
    pub record_count: usize,
    pub value_bytes: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_store() -> (FjallStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = FjallStore::open(temp_dir.path().join("test_store")).unwrap();
        (store, temp_dir)
    }

    #[test]
    fn test_open_store() {
        let temp_dir = TempDir::new().unwrap();
        let store = FjallStore::open(temp_dir.path().join("nested").join("test_store"));
        assert!(store.is_ok());
    }

    #[tokio::test]
    async fn test_set_and_get() {
        let (store, _temp) = create_test_store();

        store.set(keys::USER_ROLE, "employer".to_string()).await.unwrap();

        let value = store.get(keys::USER_ROLE).await.unwrap();
        assert_eq!(value.as_deref(), Some("employer"));
    }

    #[tokio::test]
    async fn test_get_missing_key() {
        let (store, _temp) = create_test_store();
        assert!(store.get(keys::JOBS).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_batch_commit_applies_sets_and_removes() {
        let (store, _temp) = create_test_store();
        store.set(keys::ONBOARDING, "true".to_string()).await.unwrap();

        let mut batch = WriteBatch::new();
        batch
            .set(keys::EMPLOYER_PROFILE, r#"{"id":"e1"}"#)
            .set(keys::JOBS, "[]")
            .remove(keys::ONBOARDING);
        store.commit(batch).await.unwrap();

        assert!(store.get(keys::EMPLOYER_PROFILE).await.unwrap().is_some());
        assert_eq!(store.get(keys::JOBS).await.unwrap().as_deref(), Some("[]"));
        assert!(store.get(keys::ONBOARDING).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_remove_many() {
        let (store, _temp) = create_test_store();
        for key in keys::ALL {
            store.set(key, "x".to_string()).await.unwrap();
        }

        store.remove_many(&keys::ALL).await.unwrap();

        for key in keys::ALL {
            assert!(store.get(key).await.unwrap().is_none());
        }
        assert_eq!(store.stats().unwrap().record_count, 0);
    }

    #[tokio::test]
    async fn test_records_survive_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("reopen");

        {
            let store = FjallStore::open(&path).unwrap();
            store.set(keys::FIRST_LAUNCH, "false".to_string()).await.unwrap();
        }

        let store = FjallStore::open(&path).unwrap();
        assert_eq!(
            store.get(keys::FIRST_LAUNCH).await.unwrap().as_deref(),
            Some("false")
        );
    }

    #[tokio::test]
    async fn test_stats() {
        let (store, _temp) = create_test_store();
        store.set(keys::JOBS, "[]".to_string()).await.unwrap();

        let stats = store.stats().unwrap();
        assert_eq!(stats.record_count, 1);
        assert_eq!(stats.value_bytes, 2);
    }
}
