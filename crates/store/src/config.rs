//! Store configuration. Values are set once at construction and read-only afterwards, except
//! for the dispersal backend which is held by [crate::manager::DispersalBackendCell].
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const MIB: usize = 1024 * 1024;
/// Largest blob accepted by the EigenDA V2 network.
pub const MAX_BLOB_SIZE_BYTES: usize = 16 * MIB;

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("put_tries must not be 0, use a positive count or a negative value to retry forever")]
    ZeroPutTries,
    #[error("max blob size {0} bytes exceeds the protocol limit of {MAX_BLOB_SIZE_BYTES} bytes")]
    MaxBlobSizeTooLarge(usize),
    #[error("unknown eigenda backend {0:?}, expected one of v1, v2")]
    UnknownBackend(String),
    #[error("{0} backend is not enabled")]
    BackendNotEnabled(EigenDABackend),
    #[error("no offchain derivation parameters for derivation version {0}")]
    UnknownDerivationVersion(u8),
}

/// Number of dispersal attempts. A positive value N tries exactly N times, a negative value
/// retries until success or cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PutTries(i32);

impl PutTries {
    pub const UNBOUNDED: PutTries = PutTries(-1);

    pub fn new(tries: i32) -> Result<Self, ConfigError> {
        if tries == 0 {
            return Err(ConfigError::ZeroPutTries);
        }
        Ok(Self(tries))
    }

    /// None when retrying indefinitely.
    pub fn max_attempts(&self) -> Option<u32> {
        u32::try_from(self.0).ok()
    }

    pub(crate) fn is_exhausted(&self, attempts: u32) -> bool {
        self.max_attempts().is_some_and(|max| attempts >= max)
    }
}

impl TryFrom<i32> for PutTries {
    type Error = ConfigError;

    fn try_from(tries: i32) -> Result<Self, Self::Error> {
        Self::new(tries)
    }
}

/// EigenDA network generation a backend talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EigenDABackend {
    V1,
    V2,
}

impl FromStr for EigenDABackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "v1" | "V1" => Ok(EigenDABackend::V1),
            "v2" | "V2" => Ok(EigenDABackend::V2),
            other => Err(ConfigError::UnknownBackend(other.to_string())),
        }
    }
}

impl fmt::Display for EigenDABackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EigenDABackend::V1 => f.write_str("v1"),
            EigenDABackend::V2 => f.write_str("v2"),
        }
    }
}

/// Offchain parameters of a derivation version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffchainDerivationParameters {
    /// Allowed distance in L1 blocks between a cert's rbn and its L1 inclusion block, 0 skips
    /// the recency check.
    pub rbn_recency_window_size: u64,
}

pub type OffchainDerivationMap = HashMap<u8, OffchainDerivationParameters>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub put_tries: i32,
    pub max_blob_size_bytes: usize,
    pub rbn_recency_window_size: u64,
    pub contract_call_timeout: Duration,
    /// Base of the exponential backoff between dispersal attempts.
    pub retry_delay: Duration,
    /// Added to the backoff when the disperser rate limits us.
    pub resource_exhausted_backoff: Duration,
    pub backends_to_enable: Vec<EigenDABackend>,
    /// Backend puts are dispersed to at startup.
    pub dispersal_backend: EigenDABackend,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            put_tries: 3,
            max_blob_size_bytes: MAX_BLOB_SIZE_BYTES,
            rbn_recency_window_size: 0,
            contract_call_timeout: Duration::from_secs(5),
            retry_delay: Duration::from_millis(100),
            resource_exhausted_backoff: Duration::from_secs(1),
            backends_to_enable: vec![EigenDABackend::V2],
            dispersal_backend: EigenDABackend::V2,
        }
    }
}

impl StoreConfig {
    pub fn put_tries(&self) -> Result<PutTries, ConfigError> {
        PutTries::new(self.put_tries)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.put_tries()?;
        if self.max_blob_size_bytes > MAX_BLOB_SIZE_BYTES {
            return Err(ConfigError::MaxBlobSizeTooLarge(self.max_blob_size_bytes));
        }
        if !self.backends_to_enable.contains(&self.dispersal_backend) {
            return Err(ConfigError::BackendNotEnabled(self.dispersal_backend));
        }
        Ok(())
    }

    /// Derivation version 0 is the only version so far, its window comes from config.
    pub fn offchain_derivation_map(&self) -> OffchainDerivationMap {
        HashMap::from([(
            0,
            OffchainDerivationParameters {
                rbn_recency_window_size: self.rbn_recency_window_size,
            },
        )])
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecondaryConfig {
    /// Fail a put when a secondary write fails, instead of only logging it.
    pub error_on_secondary_insert_failure: bool,
    /// Backfill caches after a read served by EigenDA.
    pub write_on_cache_miss: bool,
    /// Size of the secondary write pool. 0 writes synchronously on the request task.
    pub async_put_workers: usize,
    /// Bound of the queue feeding the write pool.
    pub async_put_queue_size: usize,
}

impl Default for SecondaryConfig {
    fn default() -> Self {
        Self {
            error_on_secondary_insert_failure: false,
            write_on_cache_miss: false,
            async_put_workers: 0,
            async_put_queue_size: 64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemstoreConfig {
    /// Blobs older than this are evicted, zero keeps blobs forever.
    pub blob_expiration: Duration,
    pub put_latency: Duration,
    pub get_latency: Duration,
    /// Makes every put fail with a failover error, to exercise batcher failover.
    pub put_returns_failover_error: bool,
    pub max_blob_size_bytes: usize,
}

impl Default for MemstoreConfig {
    fn default() -> Self {
        Self {
            blob_expiration: Duration::from_secs(25 * 60),
            put_latency: Duration::ZERO,
            get_latency: Duration::ZERO,
            put_returns_failover_error: false,
            max_blob_size_bytes: MAX_BLOB_SIZE_BYTES,
        }
    }
}
