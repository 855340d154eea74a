use std::num::NonZeroUsize;

use alloy_primitives::{Bytes, B256};
use async_trait::async_trait;
use lru::LruCache;
use tokio::sync::Mutex;

use super::{SecondaryBackendKind, SecondaryError, SecondaryStore};

/// Bounded in-memory store, least recently used entries are evicted first.
pub struct MemoryStore {
    cache: Mutex<LruCache<B256, Bytes>>,
}

impl MemoryStore {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }
}

#[async_trait]
impl SecondaryStore for MemoryStore {
    fn backend_kind(&self) -> SecondaryBackendKind {
        SecondaryBackendKind::Memory
    }

    async fn put(&self, key: B256, value: &Bytes) -> Result<(), SecondaryError> {
        self.cache.lock().await.put(key, value.clone());
        Ok(())
    }

    async fn get(&self, key: B256) -> Result<Option<Bytes>, SecondaryError> {
        Ok(self.cache.lock().await.get(&key).cloned())
    }

    async fn exists(&self, key: B256) -> Result<bool, SecondaryError> {
        Ok(self.cache.lock().await.contains(&key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::keccak256;

    #[tokio::test]
    async fn test_lru_eviction() {
        let store = MemoryStore::new(NonZeroUsize::new(2).unwrap());
        let (a, b, c) = (keccak256(b"a"), keccak256(b"b"), keccak256(b"c"));
        store.put(a, &Bytes::from_static(b"a")).await.unwrap();
        store.put(b, &Bytes::from_static(b"b")).await.unwrap();
        // touch a so b becomes the eviction candidate
        assert!(store.get(a).await.unwrap().is_some());
        store.put(c, &Bytes::from_static(b"c")).await.unwrap();

        assert!(store.exists(a).await.unwrap());
        assert!(!store.exists(b).await.unwrap());
        assert_eq!(store.get(c).await.unwrap(), Some(Bytes::from_static(b"c")));
    }
}
