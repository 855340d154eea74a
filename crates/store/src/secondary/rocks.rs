use std::path::Path;
use std::sync::Arc;

use alloy_primitives::{Bytes, B256};
use async_trait::async_trait;
use rocksdb::{Options, DB};
use tracing::info;

use super::{SecondaryBackendKind, SecondaryError, SecondaryStore};

const KIND: SecondaryBackendKind = SecondaryBackendKind::RocksDb;

/// Persistent store backed by a local RocksDB instance. RocksDB calls block, so they run on
/// the blocking thread pool.
#[derive(Clone)]
pub struct RocksDbStore {
    db: Arc<DB>,
}

impl RocksDbStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SecondaryError> {
        let path = path.as_ref();
        let mut options = Options::default();
        options.create_if_missing(true);
        let db = DB::open(&options, path).map_err(|e| SecondaryError::backend(KIND, e))?;
        info!(target: "secondary_store", "opened rocksdb secondary store at {}", path.display());
        Ok(Self { db: Arc::new(db) })
    }

    async fn blocking<T, F>(&self, f: F) -> Result<T, SecondaryError>
    where
        T: Send + 'static,
        F: FnOnce(&DB) -> Result<T, rocksdb::Error> + Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || f(&db))
            .await
            .map_err(|e| SecondaryError::backend(KIND, e))?
            .map_err(|e| SecondaryError::backend(KIND, e))
    }
}

#[async_trait]
impl SecondaryStore for RocksDbStore {
    fn backend_kind(&self) -> SecondaryBackendKind {
        KIND
    }

    async fn put(&self, key: B256, value: &Bytes) -> Result<(), SecondaryError> {
        let value = value.clone();
        self.blocking(move |db| db.put(key, value)).await
    }

    async fn get(&self, key: B256) -> Result<Option<Bytes>, SecondaryError> {
        let value = self.blocking(move |db| db.get(key)).await?;
        Ok(value.map(Bytes::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::keccak256;

    #[tokio::test]
    async fn test_rocksdb_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let key = keccak256(b"cert");
        {
            let store = RocksDbStore::open(dir.path()).unwrap();
            assert_eq!(store.get(key).await.unwrap(), None);
            store.put(key, &Bytes::from_static(b"payload")).await.unwrap();
            assert!(store.exists(key).await.unwrap());
        }
        let store = RocksDbStore::open(dir.path()).unwrap();
        assert_eq!(
            store.get(key).await.unwrap(),
            Some(Bytes::from_static(b"payload"))
        );
        assert_eq!(store.backend_kind(), SecondaryBackendKind::RocksDb);
    }
}
