//! Secondary storage: side stores that sit in front of EigenDA as caches, or behind it as
//! fallbacks once a blob is no longer retrievable. Also holds the keccak256 keyed preimages
//! of optimism_keccak256 commitments.
//!
//! Stores are content addressed. Cert keyed entries use the digest of the serialized cert,
//! keccak pair entries use keccak256 of the value.
use std::fmt;
use std::sync::Arc;

use alloy_primitives::{keccak256, Bytes, B256};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::config::SecondaryConfig;
use crate::errors::ProxyError;

mod memory;
mod rocks;
mod worker;

pub use memory::MemoryStore;
pub use rocks::RocksDbStore;
use worker::WritePool;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecondaryBackendKind {
    Memory,
    RocksDb,
}

impl fmt::Display for SecondaryBackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecondaryBackendKind::Memory => f.write_str("memory"),
            SecondaryBackendKind::RocksDb => f.write_str("rocksdb"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SecondaryError {
    #[error("{kind} secondary store: {msg}")]
    Backend {
        kind: SecondaryBackendKind,
        msg: String,
    },
    #[error("secondary writes failed: {}", .0.join("; "))]
    WriteFailed(Vec<String>),
    #[error("secondary write pool is closed")]
    PoolClosed,
    #[error("no secondary store is configured")]
    NoBackends,
}

impl SecondaryError {
    pub(crate) fn backend(kind: SecondaryBackendKind, err: impl fmt::Display) -> Self {
        SecondaryError::Backend {
            kind,
            msg: err.to_string(),
        }
    }
}

#[async_trait]
pub trait SecondaryStore: Send + Sync {
    fn backend_kind(&self) -> SecondaryBackendKind;

    async fn put(&self, key: B256, value: &Bytes) -> Result<(), SecondaryError>;

    async fn get(&self, key: B256) -> Result<Option<Bytes>, SecondaryError>;

    async fn exists(&self, key: B256) -> Result<bool, SecondaryError> {
        Ok(self.get(key).await?.is_some())
    }
}

/// Where a secondary read is served from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecondaryRole {
    Cache,
    Fallback,
}

/// Every store a put is replicated to, caches and fallbacks alike.
pub(crate) struct WriteTargets(Vec<Arc<dyn SecondaryStore>>);

impl WriteTargets {
    /// Writes to every target, even after a failure, and reports all failures.
    pub(crate) async fn write_all(&self, key: B256, value: &Bytes) -> Result<(), SecondaryError> {
        let mut errors = Vec::new();
        for store in &self.0 {
            if let Err(e) = store.put(key, value).await {
                warn!(target: "secondary_store", "write {} to {} failed: {}", key, store.backend_kind(), e);
                errors.push(e.to_string());
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(SecondaryError::WriteFailed(errors))
        }
    }
}

/// Checks that `key` is the keccak256 commitment of `value`.
pub fn verify_keccak_pair(key: B256, value: &[u8]) -> Result<(), ProxyError> {
    let actual = keccak256(value);
    if actual != key {
        return Err(ProxyError::KeyValueMismatch {
            expected: key,
            actual,
        });
    }
    Ok(())
}

pub struct SecondaryManager {
    caches: Vec<Arc<dyn SecondaryStore>>,
    fallbacks: Vec<Arc<dyn SecondaryStore>>,
    targets: Arc<WriteTargets>,
    pool: Option<WritePool>,
    config: SecondaryConfig,
}

impl SecondaryManager {
    /// Spawns the write pool when `config.async_put_workers > 0`, so this must be called from
    /// within a tokio runtime in that case.
    pub fn new(
        caches: Vec<Arc<dyn SecondaryStore>>,
        fallbacks: Vec<Arc<dyn SecondaryStore>>,
        config: SecondaryConfig,
    ) -> Self {
        let targets = Arc::new(WriteTargets(
            caches.iter().chain(fallbacks.iter()).cloned().collect(),
        ));
        let pool = (config.async_put_workers > 0 && !targets.0.is_empty()).then(|| {
            WritePool::spawn(
                config.async_put_workers,
                config.async_put_queue_size,
                targets.clone(),
            )
        });
        Self {
            caches,
            fallbacks,
            targets,
            pool,
            config,
        }
    }

    pub fn disabled() -> Self {
        Self::new(Vec::new(), Vec::new(), SecondaryConfig::default())
    }

    pub fn enabled(&self) -> bool {
        !self.targets.0.is_empty()
    }

    pub fn caching_enabled(&self) -> bool {
        !self.caches.is_empty()
    }

    pub fn fallback_enabled(&self) -> bool {
        !self.fallbacks.is_empty()
    }

    pub fn write_on_cache_miss(&self) -> bool {
        self.config.write_on_cache_miss && self.caching_enabled()
    }

    /// First hit among the stores of `role`, in configuration order. Store errors are logged
    /// and treated as misses.
    pub async fn read(&self, key: B256, role: SecondaryRole) -> Option<Bytes> {
        let stores = match role {
            SecondaryRole::Cache => &self.caches,
            SecondaryRole::Fallback => &self.fallbacks,
        };
        for store in stores {
            match store.get(key).await {
                Ok(Some(value)) => {
                    debug!(target: "secondary_store", "{:?} hit for {} in {}", role, key, store.backend_kind());
                    return Some(value);
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(target: "secondary_store", "{:?} read from {} failed: {}", role, store.backend_kind(), e);
                }
            }
        }
        None
    }

    /// Replicates `value` to every store, through the write pool when one is configured.
    pub async fn write(&self, key: B256, value: Bytes) -> Result<(), SecondaryError> {
        if !self.enabled() {
            return Err(SecondaryError::NoBackends);
        }
        match &self.pool {
            Some(pool) => pool.submit(key, value).await,
            None => self.targets.write_all(key, &value).await,
        }
    }

    /// [Self::write] with the insert failure policy applied. A tolerated failure is logged and
    /// reported as success.
    pub async fn backup(&self, key: B256, value: Bytes) -> Result<(), SecondaryError> {
        match self.write(key, value).await {
            Ok(()) => Ok(()),
            Err(e) if self.config.error_on_secondary_insert_failure => Err(e),
            Err(e) => {
                error!(target: "secondary_store", "secondary insertions failed: {}", e);
                Ok(())
            }
        }
    }

    /// Stores an optimism_keccak256 preimage. Secondary storage is the only home of these
    /// values, so write failures always propagate.
    pub async fn put_keccak_pair(&self, key: B256, value: Bytes) -> Result<(), ProxyError> {
        verify_keccak_pair(key, &value)?;
        self.write(key, value).await?;
        Ok(())
    }

    /// Reads an optimism_keccak256 preimage from caches, then fallbacks, and rehashes it.
    pub async fn get_keccak_value(&self, key: B256) -> Result<Bytes, ProxyError> {
        if !self.enabled() {
            return Err(SecondaryError::NoBackends.into());
        }
        let value = match self.read(key, SecondaryRole::Cache).await {
            Some(value) => value,
            None => self
                .read(key, SecondaryRole::Fallback)
                .await
                .ok_or_else(|| ProxyError::NotFound(format!("keccak256 commitment {key}")))?,
        };
        verify_keccak_pair(key, &value)?;
        Ok(value)
    }
}
