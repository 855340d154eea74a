//! In-memory emulations of the EigenDA networks, for local testing without a disperser.
//!
//! Blobs are evicted after `blob_expiration` to mimic the limited retention of EigenDA
//! operators, and certs are random but well formed, with an rbn far in the future so the
//! recency check never trips.
use std::collections::HashMap;
use std::time::{Duration, Instant};

use alloy_primitives::{keccak256, Bytes, B256, U256};
use async_trait::async_trait;
use eigenda_cert::{
    BatchHeaderV2, BlobCertificate, BlobCommitment, BlobHeaderV2, BlobInclusionInfo,
    EigenDACertV3, G1Point, G2Point, NonSignerStakesAndSignature, VersionByte, VersionedCert,
};
use rand::Rng;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::{EigenDABackend, MemstoreConfig};
use crate::errors::{DerivationError, ProxyError};
use crate::payload::{decode_payload, encode_payload, max_payload_size, BYTES_PER_FIELD_ELEMENT};
use crate::traits::{EigenDAStore, GetOpts};

/// Lowest rbn of a memstore cert. u32::MAX minus a small margin, so that the random offset
/// still fits.
const MEMSTORE_BASE_RBN: u32 = 4_294_967_200;

struct Entry {
    encoded_payload: Bytes,
    inserted_at: Instant,
}

/// Expiring key value store shared by both memstore generations.
struct EphemeralDb {
    config: MemstoreConfig,
    entries: Mutex<HashMap<B256, Entry>>,
}

impl EphemeralDb {
    fn new(config: MemstoreConfig) -> Self {
        Self {
            config,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn is_expired(&self, entry: &Entry, now: Instant) -> bool {
        !self.config.blob_expiration.is_zero()
            && now.duration_since(entry.inserted_at) > self.config.blob_expiration
    }

    async fn sleep(&self, latency: Duration, cancel: &CancellationToken) -> Result<(), ProxyError> {
        if latency.is_zero() {
            return Ok(());
        }
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ProxyError::Cancelled),
            _ = tokio::time::sleep(latency) => Ok(()),
        }
    }

    /// Checks the put switches and the payload size, then returns the encoded payload.
    async fn prepare_put(
        &self,
        payload: &[u8],
        cancel: &CancellationToken,
    ) -> Result<Bytes, ProxyError> {
        self.sleep(self.config.put_latency, cancel).await?;
        if self.config.put_returns_failover_error {
            return Err(ProxyError::Failover(
                "memstore configured to return a failover error on put".to_string(),
            ));
        }
        let max = max_payload_size(self.config.max_blob_size_bytes);
        if payload.len() > max {
            return Err(ProxyError::OversizedBlob {
                size: payload.len(),
                max,
            });
        }
        Ok(encode_payload(payload))
    }

    async fn insert(&self, key: B256, encoded_payload: Bytes) -> Result<(), ProxyError> {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        entries.retain(|_, entry| !self.is_expired(entry, now));
        if entries.contains_key(&key) {
            return Err(ProxyError::internal_bug(format!(
                "memstore key {key} already exists"
            )));
        }
        entries.insert(
            key,
            Entry {
                encoded_payload,
                inserted_at: now,
            },
        );
        Ok(())
    }

    /// Gets carry no cancellation signal, dropping the future aborts the latency sleep.
    async fn fetch(&self, key: B256) -> Result<Bytes, ProxyError> {
        if !self.config.get_latency.is_zero() {
            tokio::time::sleep(self.config.get_latency).await;
        }
        let mut entries = self.entries.lock().await;
        let expired = entries
            .get(&key)
            .map(|entry| self.is_expired(entry, Instant::now()));
        match expired {
            None => Err(ProxyError::NotFound(format!("memstore blob {key}"))),
            Some(true) => {
                entries.remove(&key);
                Err(ProxyError::NotFound(format!("memstore blob {key} expired")))
            }
            Some(false) => Ok(entries[&key].encoded_payload.clone()),
        }
    }
}

fn payload_or_encoded(encoded_payload: Bytes, opts: GetOpts) -> Result<Bytes, ProxyError> {
    if opts.return_encoded_payload {
        return Ok(encoded_payload);
    }
    Ok(decode_payload(&encoded_payload).map_err(DerivationError::from)?)
}

/// Emulates the EigenDA V2 network, producing V3 certs behind version byte 0x02.
pub struct MemStore {
    db: EphemeralDb,
}

impl MemStore {
    pub fn new(config: MemstoreConfig) -> Self {
        info!(
            target: "memstore",
            "memstore enabled, blob expiration {:?}",
            config.blob_expiration
        );
        Self {
            db: EphemeralDb::new(config),
        }
    }
}

fn random_g1<R: Rng>(rng: &mut R) -> G1Point {
    G1Point {
        x: U256::from(rng.random_range(0..1000u64)),
        y: U256::from(rng.random_range(0..1000u64)),
    }
}

fn random_g2<R: Rng>(rng: &mut R) -> G2Point {
    G2Point {
        x: vec![U256::from(rng.random_range(0..1000u64)); 2],
        y: vec![U256::from(rng.random_range(0..1000u64)); 2],
    }
}

fn random_bytes<R: Rng>(rng: &mut R, len: usize) -> Bytes {
    let mut bytes = vec![0u8; len];
    rng.fill(bytes.as_mut_slice());
    bytes.into()
}

/// A well formed cert committing to nothing in particular. Only the blob length is taken
/// from the blob.
fn random_v3_cert(encoded_payload: &[u8]) -> EigenDACertV3 {
    let mut rng = rand::rng();
    EigenDACertV3 {
        batch_header_v2: BatchHeaderV2 {
            batch_root: rng.random(),
            reference_block_number: MEMSTORE_BASE_RBN + rng.random_range(0..32u32),
        },
        blob_inclusion_info: BlobInclusionInfo {
            blob_certificate: BlobCertificate {
                blob_header: BlobHeaderV2 {
                    version: 0,
                    quorum_numbers: Bytes::from_static(&[0, 1]),
                    commitment: BlobCommitment {
                        commitment: random_g1(&mut rng),
                        length_commitment: random_g2(&mut rng),
                        length_proof: random_g2(&mut rng),
                        length: (encoded_payload.len() / BYTES_PER_FIELD_ELEMENT) as u32,
                    },
                    payment_header_hash: rng.random(),
                },
                signature: random_bytes(&mut rng, 48),
                relay_keys: vec![rng.random_range(0..32u32), rng.random_range(0..32u32)],
            },
            blob_index: rng.random_range(0..1000u32),
            inclusion_proof: random_bytes(&mut rng, 128),
        },
        nonsigner_stake_and_signature: NonSignerStakesAndSignature {
            non_signer_quorum_bitmap_indices: vec![rng.random_range(0..32u32); 2],
            non_signer_pubkeys: vec![random_g1(&mut rng)],
            quorum_apks: vec![random_g1(&mut rng)],
            apk_g2: random_g2(&mut rng),
            sigma: random_g1(&mut rng),
            quorum_apk_indices: vec![rng.random_range(0..32u32); 2],
            total_stake_indices: vec![rng.random_range(0..32u32); 3],
            non_signer_stake_indices: vec![vec![rng.random_range(0..32u32); 2]; 2],
        },
        signed_quorum_numbers: Bytes::from_static(&[0, 1]),
    }
}

#[async_trait]
impl EigenDAStore for MemStore {
    fn backend(&self) -> EigenDABackend {
        EigenDABackend::V2
    }

    async fn put(
        &self,
        payload: &[u8],
        cancel: &CancellationToken,
    ) -> Result<VersionedCert, ProxyError> {
        let encoded_payload = self.db.prepare_put(payload, cancel).await?;
        let cert = VersionedCert::from_v3(&random_v3_cert(&encoded_payload));
        self.db.insert(cert.digest(), encoded_payload).await?;
        debug!(target: "memstore", "stored blob under {}", cert.digest());
        Ok(cert)
    }

    async fn get(&self, cert: &VersionedCert, opts: GetOpts) -> Result<Bytes, ProxyError> {
        // malformed certs fail the same way they would against the network
        cert.decode_v3()
            .map_err(|e| DerivationError::cert_parsing(cert, e))?;
        let encoded_payload = self.db.fetch(cert.digest()).await?;
        payload_or_encoded(encoded_payload, opts)
    }

    async fn verify(&self, _cert: &VersionedCert, _l1_inclusion_block_num: u64) -> Result<(), ProxyError> {
        Ok(())
    }
}

/// Emulates the legacy EigenDA V1 network. Its certs are opaque to this crate and carry
/// version byte 0x00.
pub struct LegacyMemStore {
    db: EphemeralDb,
}

impl LegacyMemStore {
    pub fn new(config: MemstoreConfig) -> Self {
        Self {
            db: EphemeralDb::new(config),
        }
    }
}

#[async_trait]
impl EigenDAStore for LegacyMemStore {
    fn backend(&self) -> EigenDABackend {
        EigenDABackend::V1
    }

    async fn put(
        &self,
        payload: &[u8],
        cancel: &CancellationToken,
    ) -> Result<VersionedCert, ProxyError> {
        let encoded_payload = self.db.prepare_put(payload, cancel).await?;
        let mut serialized_cert = keccak256(&encoded_payload).to_vec();
        serialized_cert.extend_from_slice(&random_bytes(&mut rand::rng(), 32));
        let cert = VersionedCert::new(VersionByte::V0, serialized_cert);
        self.db.insert(cert.digest(), encoded_payload).await?;
        Ok(cert)
    }

    async fn get(&self, cert: &VersionedCert, opts: GetOpts) -> Result<Bytes, ProxyError> {
        let encoded_payload = self.db.fetch(cert.digest()).await?;
        payload_or_encoded(encoded_payload, opts)
    }

    async fn verify(&self, _cert: &VersionedCert, _l1_inclusion_block_num: u64) -> Result<(), ProxyError> {
        Ok(())
    }
}
