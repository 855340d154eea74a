//! Capabilities the store is assembled from. The network clients are collaborators, the
//! store only relies on the behavior declared here.
use alloy_primitives::Bytes;
use async_trait::async_trait;
use eigenda_cert::{EigenDACertV3, VersionedCert};
use tokio_util::sync::CancellationToken;

use crate::config::EigenDABackend;
use crate::errors::ProxyError;

#[derive(Debug, thiserror::Error)]
pub enum DisperserError {
    /// The disperser answered with a gRPC status.
    #[error("disperser returned {:?}: {}", .0.code(), .0.message())]
    Transport(tonic::Status),
    /// EigenDA is not accepting blobs, the caller should fail over once retries are exhausted.
    #[error("failover: {0}")]
    Failover(String),
    /// Failure before any status was assigned, e.g. a dropped connection.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<DisperserError> for ProxyError {
    fn from(e: DisperserError) -> Self {
        match e {
            DisperserError::Failover(msg) => ProxyError::Failover(msg),
            DisperserError::Transport(status)
                if status.code() == tonic::Code::ResourceExhausted =>
            {
                ProxyError::ResourceExhausted(status.message().to_string())
            }
            DisperserError::Transport(status)
                if status.code() == tonic::Code::InvalidArgument =>
            {
                ProxyError::BadRequest(status.message().to_string())
            }
            e => ProxyError::Dispersal(e.to_string()),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RetrieverError {
    #[error("blob not found")]
    NotFound,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Disperses a blob and waits until it is certified.
#[async_trait]
pub trait BlobDisperser: Send + Sync {
    async fn disperse_blob(&self, encoded_payload: &Bytes) -> Result<EigenDACertV3, DisperserError>;
}

/// Fetches the encoded payload a cert commits to, e.g. from relays or validators.
#[async_trait]
pub trait BlobRetriever: Send + Sync {
    fn name(&self) -> &'static str;

    async fn get_encoded_payload(&self, cert: &EigenDACertV3) -> Result<Bytes, RetrieverError>;
}

/// Per request options of a get.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GetOpts {
    /// L1 block the cert was included at, 0 skips the recency check.
    pub l1_inclusion_block_num: u64,
    /// Return the encoded payload rather than the payload, for clients that decode it
    /// themselves.
    pub return_encoded_payload: bool,
}

/// An EigenDA network generation, as seen by the manager.
#[async_trait]
pub trait EigenDAStore: Send + Sync {
    fn backend(&self) -> EigenDABackend;

    /// Disperses `payload`, aborting between attempts once `cancel` fires.
    async fn put(
        &self,
        payload: &[u8],
        cancel: &CancellationToken,
    ) -> Result<VersionedCert, ProxyError>;

    /// Retrieves and verifies the payload of `cert`.
    async fn get(&self, cert: &VersionedCert, opts: GetOpts) -> Result<Bytes, ProxyError>;

    /// Checks `cert` without retrieving its blob. Used to vet data served by secondary
    /// storage.
    async fn verify(&self, cert: &VersionedCert, l1_inclusion_block_num: u64)
        -> Result<(), ProxyError>;
}
