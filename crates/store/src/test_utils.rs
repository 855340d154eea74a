//! Fakes of the network collaborators for tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use alloy_primitives::{keccak256, Bytes, B256};
use async_trait::async_trait;
use eigenda_cert::{BatchHeaderV2, BlobCertificate, BlobCommitment, BlobHeaderV2, BlobInclusionInfo, EigenDACertV3};
use eigenda_cert_verifier::{check_status_code, CertVerifier, CertVerifierError};

use crate::payload::BYTES_PER_FIELD_ELEMENT;
use crate::secondary::{SecondaryBackendKind, SecondaryError, SecondaryStore};
use crate::traits::{BlobDisperser, BlobRetriever, DisperserError, RetrieverError};

/// Blobs dispersed by [TestDisperser] and served by [TestRetriever], keyed by cert digest.
#[derive(Debug, Default)]
pub(crate) struct TestNetwork {
    blobs: Mutex<HashMap<B256, Bytes>>,
}

impl TestNetwork {
    pub(crate) fn insert(&self, digest: B256, encoded_payload: Bytes) {
        self.blobs.lock().unwrap().insert(digest, encoded_payload);
    }

    /// Emulates blobs expiring from the network.
    pub(crate) fn clear(&self) {
        self.blobs.lock().unwrap().clear();
    }

    fn get(&self, digest: &B256) -> Option<Bytes> {
        self.blobs.lock().unwrap().get(digest).cloned()
    }
}

/// A cert unique to `encoded_payload`, signed at `rbn`.
pub(crate) fn test_cert(encoded_payload: &[u8], rbn: u32) -> EigenDACertV3 {
    EigenDACertV3 {
        batch_header_v2: BatchHeaderV2 {
            batch_root: keccak256(encoded_payload).0,
            reference_block_number: rbn,
        },
        blob_inclusion_info: BlobInclusionInfo {
            blob_certificate: BlobCertificate {
                blob_header: BlobHeaderV2 {
                    quorum_numbers: Bytes::from_static(&[0, 1]),
                    commitment: BlobCommitment {
                        length: (encoded_payload.len() / BYTES_PER_FIELD_ELEMENT) as u32,
                        ..Default::default()
                    },
                    ..Default::default()
                },
                ..Default::default()
            },
            ..Default::default()
        },
        ..Default::default()
    }
}

#[derive(Debug, Default)]
pub(crate) struct TestDisperser {
    network: Arc<TestNetwork>,
    rbn: u32,
    // returned by the next attempts, in order, before dispersal succeeds
    failures: Mutex<VecDeque<DisperserError>>,
    pub calls: AtomicU32,
}

impl TestDisperser {
    pub(crate) fn new(network: Arc<TestNetwork>, rbn: u32) -> Self {
        Self {
            network,
            rbn,
            ..Default::default()
        }
    }

    pub(crate) fn fail_with(&self, errors: impl IntoIterator<Item = DisperserError>) {
        self.failures.lock().unwrap().extend(errors);
    }
}

#[async_trait]
impl BlobDisperser for TestDisperser {
    async fn disperse_blob(&self, encoded_payload: &Bytes) -> Result<EigenDACertV3, DisperserError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.failures.lock().unwrap().pop_front() {
            return Err(err);
        }
        let cert = test_cert(encoded_payload, self.rbn);
        self.network.insert(cert.to_digest(), encoded_payload.clone());
        Ok(cert)
    }
}

#[derive(Debug)]
pub(crate) struct TestRetriever {
    pub network: Arc<TestNetwork>,
    pub should_err: bool,
    pub calls: AtomicU32,
}

impl TestRetriever {
    pub(crate) fn new(network: Arc<TestNetwork>) -> Self {
        Self {
            network,
            should_err: false,
            calls: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl BlobRetriever for TestRetriever {
    fn name(&self) -> &'static str {
        "test"
    }

    async fn get_encoded_payload(&self, cert: &EigenDACertV3) -> Result<Bytes, RetrieverError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.should_err {
            return Err(anyhow::anyhow!("relay unreachable").into());
        }
        self.network
            .get(&cert.to_digest())
            .ok_or(RetrieverError::NotFound)
    }
}

/// Answers every `checkDACert` with a fixed status code.
#[derive(Debug)]
pub(crate) struct TestCertVerifier {
    pub status: u8,
    pub delay: Duration,
    pub calls: AtomicU32,
}

impl TestCertVerifier {
    pub(crate) fn new(status: u8) -> Self {
        Self {
            status,
            delay: Duration::ZERO,
            calls: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl CertVerifier for TestCertVerifier {
    async fn check_da_cert(&self, _cert: &EigenDACertV3) -> Result<(), CertVerifierError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        check_status_code(self.status)
    }
}

#[derive(Debug, Default)]
pub(crate) struct TestSecondaryStore {
    pub entries: tokio::sync::Mutex<HashMap<B256, Bytes>>,
    pub should_put_err: bool,
    pub should_get_err: bool,
}

#[async_trait]
impl SecondaryStore for TestSecondaryStore {
    fn backend_kind(&self) -> SecondaryBackendKind {
        SecondaryBackendKind::Memory
    }

    async fn put(&self, key: B256, value: &Bytes) -> Result<(), SecondaryError> {
        if self.should_put_err {
            return Err(SecondaryError::backend(self.backend_kind(), "put failed"));
        }
        self.entries.lock().await.insert(key, value.clone());
        Ok(())
    }

    async fn get(&self, key: B256) -> Result<Option<Bytes>, SecondaryError> {
        if self.should_get_err {
            return Err(SecondaryError::backend(self.backend_kind(), "get failed"));
        }
        Ok(self.entries.lock().await.get(&key).cloned())
    }
}
