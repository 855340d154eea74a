//! Handlers of the Arbitrum Custom DA server. Nitro hands over sequencer messages made of a
//! 40 byte message header followed by an arbitrum commitment, see
//! [eigenda_cert::decode_arbitrum_sequencer_msg].
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use alloy_primitives::{keccak256, Bytes, B256};
use eigenda_cert::{decode_arbitrum_sequencer_msg, encode_arbitrum, ARB_CUSTOM_DA_HEADER_BYTE, ARB_MESSAGE_HEADER_LEN};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{ConfigError, EigenDABackend, StoreConfig};
use crate::errors::ProxyError;
use crate::manager::EigenDAManager;
use crate::payload::max_payload_size;
use crate::traits::GetOpts;

/// Preimage type nitro files custom da payloads under.
pub const CUSTOM_DA_PREIMAGE_TYPE: u8 = 3;

/// Preimages by type, then by hash.
pub type PreimagesMap = HashMap<u8, HashMap<B256, Bytes>>;

/// Values a nitro node can compare against its own to detect a misconfigured proxy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompatibilityConfig {
    pub version: String,
    pub max_payload_size_bytes: usize,
    pub rbn_recency_window_size: u64,
}

impl CompatibilityConfig {
    pub fn new(config: &StoreConfig) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            max_payload_size_bytes: max_payload_size(config.max_blob_size_bytes),
            rbn_recency_window_size: config.rbn_recency_window_size,
        }
    }
}

pub struct ArbitrumHandlers {
    manager: Arc<EigenDAManager>,
    compatibility: CompatibilityConfig,
}

impl ArbitrumHandlers {
    pub fn new(manager: Arc<EigenDAManager>, compatibility: CompatibilityConfig) -> Self {
        Self {
            manager,
            compatibility,
        }
    }

    pub fn get_supported_header_bytes(&self) -> Bytes {
        Bytes::from_static(&[ARB_CUSTOM_DA_HEADER_BYTE])
    }

    /// Payload behind the commitment of a sequencer message. `None` tells nitro to discard the
    /// batch: the message does not carry a well formed commitment, or its cert is invalid.
    pub async fn recover_payload(
        &self,
        batch_num: u64,
        batch_block_hash: B256,
        sequencer_msg: &[u8],
    ) -> Result<Option<Bytes>, ProxyError> {
        let started = Instant::now();
        let res = self.read_batch(sequencer_msg).await;
        debug!(
            target: "arbitrum_custom_da",
            "recover_payload batch {} ({}) took {:?}",
            batch_num,
            batch_block_hash,
            started.elapsed()
        );
        res
    }

    /// Same lookup as [Self::recover_payload], with the payload recorded under
    /// keccak256 of the commitment, which is how the replay binary asks for it.
    pub async fn collect_preimages(
        &self,
        batch_num: u64,
        batch_block_hash: B256,
        sequencer_msg: &[u8],
    ) -> Result<Option<PreimagesMap>, ProxyError> {
        let Some(payload) = self.read_batch(sequencer_msg).await? else {
            return Ok(None);
        };
        debug!(target: "arbitrum_custom_da", "collected preimage of batch {} ({})", batch_num, batch_block_hash);
        let cert_hash = keccak256(&sequencer_msg[ARB_MESSAGE_HEADER_LEN..]);
        let preimages = HashMap::from([(
            CUSTOM_DA_PREIMAGE_TYPE,
            HashMap::from([(cert_hash, payload)]),
        )]);
        Ok(Some(preimages))
    }

    async fn read_batch(&self, sequencer_msg: &[u8]) -> Result<Option<Bytes>, ProxyError> {
        let cert = match decode_arbitrum_sequencer_msg(sequencer_msg) {
            Ok(cert) => cert,
            Err(e) => {
                warn!(target: "arbitrum_custom_da", "discarding sequencer message: {}", e);
                return Ok(None);
            }
        };
        match self.manager.get_versioned(&cert, GetOpts::default()).await {
            Ok(payload) => Ok(Some(payload)),
            Err(ProxyError::Derivation(e)) => {
                warn!(target: "arbitrum_custom_da", "discarding batch with cert {}: {}", cert.digest(), e);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Disperses a rollup payload and returns its arbitrum commitment. A zero `timeout` waits
    /// for as long as dispersal takes.
    pub async fn store(&self, message: &[u8], timeout: Duration) -> Result<Bytes, ProxyError> {
        let backend = self.manager.dispersal_backend();
        if backend != EigenDABackend::V2 {
            return Err(ConfigError::BackendNotEnabled(EigenDABackend::V2).into());
        }
        if message.is_empty() {
            return Err(ProxyError::BadRequest("received empty rollup payload".into()));
        }

        let cancel = CancellationToken::new();
        let put = self.manager.put_versioned(message, &cancel);
        let cert = if timeout.is_zero() {
            put.await?
        } else {
            tokio::time::timeout(timeout, put)
                .await
                .map_err(|_| ProxyError::Dispersal(format!("store timed out after {timeout:?}")))??
        };
        info!(target: "arbitrum_custom_da", "stored {} bytes under cert {}", message.len(), cert.digest());
        Ok(encode_arbitrum(&cert))
    }

    /// Needs a kzg opening proof over the blob, which is not produced yet.
    pub async fn generate_read_preimage_proof(
        &self,
        _cert_hash: B256,
        _offset: u64,
        _certificate: &[u8],
    ) -> Result<Bytes, ProxyError> {
        Err(ProxyError::NotImplemented("generate_read_preimage_proof"))
    }

    /// The cert is already committed to the inbox and checked against agreed upon state, a
    /// one step proof needs no extra data.
    pub async fn generate_certificate_validity_proof(
        &self,
        _certificate: &[u8],
    ) -> Result<Bytes, ProxyError> {
        Ok(Bytes::new())
    }

    pub fn compatibility_config(&self) -> &CompatibilityConfig {
        &self.compatibility
    }
}
