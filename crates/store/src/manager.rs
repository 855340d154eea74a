//! Facade over the EigenDA backends and secondary storage, consumed by the transports.
//!
//! Puts go to the backend currently selected for dispersal. Gets are routed by the version
//! byte of the cert: legacy `0x00` certs to the V1 backend, everything else to V2. Secondary
//! storage is read before (caches) and after (fallbacks) the primary backend.
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use alloy_primitives::{keccak256, Bytes, B256};
use eigenda_cert::{Commitment, CommitmentMode, VersionedCert};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{ConfigError, EigenDABackend};
use crate::errors::ProxyError;
use crate::secondary::{SecondaryManager, SecondaryRole};
use crate::traits::{EigenDAStore, GetOpts};

/// Backend new payloads are dispersed to. Shared between the manager and whoever reports it
/// (admin endpoint, metrics), and only written through [EigenDAManager::set_dispersal_backend].
#[derive(Debug)]
pub struct DispersalBackendCell(AtomicU8);

impl DispersalBackendCell {
    pub fn new(backend: EigenDABackend) -> Self {
        Self(AtomicU8::new(Self::to_tag(backend)))
    }

    pub fn load(&self) -> EigenDABackend {
        match self.0.load(Ordering::Acquire) {
            1 => EigenDABackend::V1,
            _ => EigenDABackend::V2,
        }
    }

    fn store(&self, backend: EigenDABackend) {
        self.0.store(Self::to_tag(backend), Ordering::Release);
    }

    const fn to_tag(backend: EigenDABackend) -> u8 {
        match backend {
            EigenDABackend::V1 => 1,
            EigenDABackend::V2 => 2,
        }
    }
}

pub struct EigenDAManager {
    v1: Option<Arc<dyn EigenDAStore>>,
    v2: Option<Arc<dyn EigenDAStore>>,
    secondary: SecondaryManager,
    dispersal_backend: Arc<DispersalBackendCell>,
}

impl EigenDAManager {
    pub fn new(
        v1: Option<Arc<dyn EigenDAStore>>,
        v2: Option<Arc<dyn EigenDAStore>>,
        secondary: SecondaryManager,
        dispersal_backend: Arc<DispersalBackendCell>,
    ) -> Result<Self, ConfigError> {
        for (slot, expected) in [(&v1, EigenDABackend::V1), (&v2, EigenDABackend::V2)] {
            if let Some(store) = slot {
                if store.backend() != expected {
                    return Err(ConfigError::BackendNotEnabled(expected));
                }
            }
        }
        let manager = Self {
            v1,
            v2,
            secondary,
            dispersal_backend,
        };
        manager.store(manager.dispersal_backend.load())?;
        Ok(manager)
    }

    pub fn dispersal_backend(&self) -> EigenDABackend {
        self.dispersal_backend.load()
    }

    /// Switches the backend new puts are dispersed to. Fails if that backend is not enabled.
    pub fn set_dispersal_backend(&self, backend: EigenDABackend) -> Result<(), ConfigError> {
        self.store(backend)?;
        let previous = self.dispersal_backend.load();
        self.dispersal_backend.store(backend);
        info!(target: "eigenda_manager", "dispersal backend changed from {} to {}", previous, backend);
        Ok(())
    }

    fn store(&self, backend: EigenDABackend) -> Result<&Arc<dyn EigenDAStore>, ConfigError> {
        let slot = match backend {
            EigenDABackend::V1 => &self.v1,
            EigenDABackend::V2 => &self.v2,
        };
        slot.as_ref().ok_or(ConfigError::BackendNotEnabled(backend))
    }

    fn store_for(&self, cert: &VersionedCert) -> Result<&Arc<dyn EigenDAStore>, ProxyError> {
        let backend = if cert.version.is_legacy() {
            EigenDABackend::V1
        } else {
            EigenDABackend::V2
        };
        Ok(self.store(backend)?)
    }

    /// Disperses `payload` and returns its commitment encoded for `mode`. In
    /// optimism_keccak256 mode the payload is only stored in secondary storage, under its hash.
    pub async fn put(
        &self,
        payload: &[u8],
        mode: CommitmentMode,
        cancel: &CancellationToken,
    ) -> Result<Bytes, ProxyError> {
        let commitment = match mode {
            CommitmentMode::OptimismKeccak256 => {
                let key = keccak256(payload);
                self.secondary
                    .put_keccak_pair(key, Bytes::copy_from_slice(payload))
                    .await?;
                Commitment::Keccak256(key)
            }
            CommitmentMode::Standard | CommitmentMode::OptimismGeneric => {
                Commitment::Cert(self.put_versioned(payload, cancel).await?)
            }
        };
        Ok(commitment.encode(mode)?)
    }

    /// Reads the payload behind a commitment received in `mode`.
    pub async fn get(
        &self,
        commitment: &[u8],
        mode: CommitmentMode,
        opts: GetOpts,
    ) -> Result<Bytes, ProxyError> {
        match mode.decode(commitment)? {
            Commitment::Cert(cert) => self.get_versioned(&cert, opts).await,
            Commitment::Keccak256(key) => self.secondary.get_keccak_value(key).await,
        }
    }

    pub async fn put_versioned(
        &self,
        payload: &[u8],
        cancel: &CancellationToken,
    ) -> Result<VersionedCert, ProxyError> {
        let backend = self.dispersal_backend.load();
        let cert = self.store(backend)?.put(payload, cancel).await?;
        debug!(target: "eigenda_manager", "dispersed {} bytes to {}, cert {}", payload.len(), backend, cert.version);

        if self.secondary.enabled() {
            self.secondary
                .backup(cert.digest(), Bytes::copy_from_slice(payload))
                .await?;
        }
        Ok(cert)
    }

    /// Caches, then the primary backend, then fallbacks. Payloads served by secondary storage
    /// are only returned once the cert itself verifies. Reads asking for the encoded payload
    /// bypass secondary storage, which holds decoded payloads.
    pub async fn get_versioned(
        &self,
        cert: &VersionedCert,
        opts: GetOpts,
    ) -> Result<Bytes, ProxyError> {
        let store = self.store_for(cert)?;
        let use_secondary = !opts.return_encoded_payload;
        let key = cert.digest();

        if use_secondary && self.secondary.caching_enabled() {
            if let Some(payload) = self.secondary.read(key, SecondaryRole::Cache).await {
                Self::verify_secondary_read(store, cert, opts).await?;
                return Ok(payload);
            }
        }

        let err = match store.get(cert, opts).await {
            Ok(payload) => {
                if use_secondary && self.secondary.write_on_cache_miss() {
                    if let Err(e) = self.secondary.write(key, payload.clone()).await {
                        warn!(target: "eigenda_manager", "write on cache miss for {} failed: {}", key, e);
                    }
                }
                return Ok(payload);
            }
            // an invalid cert stays invalid whichever store the payload comes from
            Err(e) if e.derivation().is_some() => return Err(e),
            Err(e) => e,
        };

        if !use_secondary || !self.secondary.fallback_enabled() {
            return Err(err);
        }
        warn!(target: "eigenda_manager", "primary read of {} failed, trying fallbacks: {}", key, err);
        let Some(payload) = self.secondary.read(key, SecondaryRole::Fallback).await else {
            return Err(err);
        };
        Self::verify_secondary_read(store, cert, opts).await?;
        Ok(payload)
    }

    /// Legacy certs predate cert verification and are served as is.
    async fn verify_secondary_read(
        store: &Arc<dyn EigenDAStore>,
        cert: &VersionedCert,
        opts: GetOpts,
    ) -> Result<(), ProxyError> {
        if cert.version.is_legacy() {
            return Ok(());
        }
        store.verify(cert, opts.l1_inclusion_block_num).await
    }

    /// Stores `value` under an optimism_keccak256 commitment, which must be its hash.
    pub async fn put_op_keccak(&self, commitment: &[u8], value: Bytes) -> Result<(), ProxyError> {
        let key = Self::keccak_key(commitment)?;
        self.secondary.put_keccak_pair(key, value).await
    }

    pub async fn get_op_keccak(&self, commitment: &[u8]) -> Result<Bytes, ProxyError> {
        let key = Self::keccak_key(commitment)?;
        self.secondary.get_keccak_value(key).await
    }

    fn keccak_key(commitment: &[u8]) -> Result<B256, ProxyError> {
        match CommitmentMode::OptimismKeccak256.decode(commitment)? {
            Commitment::Keccak256(key) => Ok(key),
            Commitment::Cert(_) => Err(ProxyError::internal_bug(
                "optimism_keccak256 decoder returned a cert",
            )),
        }
    }
}
