//! Store backed by the EigenDA V2 network: disperses through a [BlobDisperser], reads
//! through a priority list of [BlobRetriever]s and verifies certs before any payload is
//! handed back.
use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::Bytes;
use async_trait::async_trait;
use eigenda_cert::{CertDecodeError, EigenDACertV3, VersionedCert};
use eigenda_cert_verifier::{verify_rbn_recency, CertVerifier, CertVerifierError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{ConfigError, EigenDABackend, OffchainDerivationMap, PutTries, StoreConfig};
use crate::errors::{DerivationError, ProxyError};
use crate::payload::{decode_payload, encode_payload, max_payload_size};
use crate::retry::{classify_dispersal_error, exponential_backoff, RetryError, RetryPolicy};
use crate::traits::{BlobDisperser, BlobRetriever, EigenDAStore, GetOpts};

/// Offchain derivation version whose parameters apply to the certs served today.
pub const DERIVATION_VERSION_0: u8 = 0;

pub struct EigenDAV2Store {
    disperser: Option<Arc<dyn BlobDisperser>>,
    retrievers: Vec<Arc<dyn BlobRetriever>>,
    cert_verifier: Arc<dyn CertVerifier>,
    put_tries: PutTries,
    max_payload_size: usize,
    contract_call_timeout: Duration,
    retry_delay: Duration,
    resource_exhausted_backoff: Duration,
    offchain_derivation_map: OffchainDerivationMap,
}

impl EigenDAV2Store {
    /// A store without a disperser serves reads only.
    pub fn new(
        disperser: Option<Arc<dyn BlobDisperser>>,
        retrievers: Vec<Arc<dyn BlobRetriever>>,
        cert_verifier: Arc<dyn CertVerifier>,
        config: &StoreConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            disperser,
            retrievers,
            cert_verifier,
            put_tries: config.put_tries()?,
            max_payload_size: max_payload_size(config.max_blob_size_bytes),
            contract_call_timeout: config.contract_call_timeout,
            retry_delay: config.retry_delay,
            resource_exhausted_backoff: config.resource_exhausted_backoff,
            offchain_derivation_map: config.offchain_derivation_map(),
        })
    }

    pub fn max_payload_size(&self) -> usize {
        self.max_payload_size
    }

    pub fn rbn_recency_window_size(&self) -> Result<u64, ConfigError> {
        self.offchain_derivation_map
            .get(&DERIVATION_VERSION_0)
            .map(|params| params.rbn_recency_window_size)
            .ok_or(ConfigError::UnknownDerivationVersion(DERIVATION_VERSION_0))
    }

    fn decode_cert(cert: &VersionedCert) -> Result<EigenDACertV3, ProxyError> {
        cert.decode_v3().map_err(|e| match e {
            CertDecodeError::LegacyCert(_) => ProxyError::from(e),
            e => DerivationError::cert_parsing(cert, e).into(),
        })
    }

    /// Tries each retriever in order, the first success wins.
    async fn retrieve(&self, cert: &EigenDACertV3) -> Result<Bytes, ProxyError> {
        let mut errors = Vec::with_capacity(self.retrievers.len());
        for retriever in &self.retrievers {
            match retriever.get_encoded_payload(cert).await {
                Ok(encoded_payload) => return Ok(encoded_payload),
                Err(e) => {
                    debug!(target: "eigenda_retrieval", "retriever {} failed: {}", retriever.name(), e);
                    errors.push(format!("{}: {}", retriever.name(), e));
                }
            }
        }
        Err(ProxyError::Retrieval(errors))
    }

    /// Recency first, it needs no network round trip.
    async fn verify_decoded(
        &self,
        cert: &EigenDACertV3,
        l1_inclusion_block_num: u64,
    ) -> Result<(), ProxyError> {
        verify_rbn_recency(
            cert.reference_block_number(),
            l1_inclusion_block_num,
            self.rbn_recency_window_size()?,
        )?;

        let call = self.cert_verifier.check_da_cert(cert);
        match tokio::time::timeout(self.contract_call_timeout, call).await {
            Err(_) => Err(CertVerifierError::Timeout(self.contract_call_timeout).into()),
            Ok(res) => res.map_err(Into::into),
        }
    }
}

#[async_trait]
impl EigenDAStore for EigenDAV2Store {
    fn backend(&self) -> EigenDABackend {
        EigenDABackend::V2
    }

    async fn put(
        &self,
        payload: &[u8],
        cancel: &CancellationToken,
    ) -> Result<VersionedCert, ProxyError> {
        let Some(disperser) = self.disperser.as_deref() else {
            return Err(ProxyError::NotImplemented("put without a configured disperser"));
        };
        if payload.len() > self.max_payload_size {
            return Err(ProxyError::OversizedBlob {
                size: payload.len(),
                max: self.max_payload_size,
            });
        }

        let encoded_payload = encode_payload(payload);
        let encoded_payload = &encoded_payload;
        let policy = RetryPolicy::new(
            self.put_tries,
            classify_dispersal_error,
            exponential_backoff(self.retry_delay),
        )
        .with_rate_limit_delay(self.resource_exhausted_backoff);
        debug!(target: "eigenda_dispersal", "dispersing {} byte payload", payload.len());

        let cert = policy
            .run(cancel, move |_| disperser.disperse_blob(encoded_payload))
            .await
            .map_err(|e| match e {
                RetryError::Failed { attempts, error } => {
                    warn!(target: "eigenda_dispersal", "dispersal failed after {} attempts: {}", attempts, error);
                    ProxyError::from(error)
                }
                RetryError::Cancelled { .. } => ProxyError::Cancelled,
            })?;

        info!(
            target: "eigenda_dispersal",
            "dispersed blob, rbn {} digest {}",
            cert.reference_block_number(),
            cert.to_digest()
        );
        Ok(VersionedCert::from_v3(&cert))
    }

    async fn get(&self, cert: &VersionedCert, opts: GetOpts) -> Result<Bytes, ProxyError> {
        let decoded = Self::decode_cert(cert)?;
        let encoded_payload = self.retrieve(&decoded).await?;
        self.verify_decoded(&decoded, opts.l1_inclusion_block_num)
            .await?;

        if opts.return_encoded_payload {
            return Ok(encoded_payload);
        }
        let payload = decode_payload(&encoded_payload).map_err(DerivationError::from)?;
        Ok(payload)
    }

    async fn verify(
        &self,
        cert: &VersionedCert,
        l1_inclusion_block_num: u64,
    ) -> Result<(), ProxyError> {
        let decoded = Self::decode_cert(cert)?;
        self.verify_decoded(&decoded, l1_inclusion_block_num).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{TestCertVerifier, TestDisperser, TestNetwork, TestRetriever};
    use crate::traits::DisperserError;
    use eigenda_cert::VersionByte;
    use std::sync::atomic::Ordering;

    struct Harness {
        network: Arc<TestNetwork>,
        disperser: Arc<TestDisperser>,
        verifier: Arc<TestCertVerifier>,
        store: EigenDAV2Store,
    }

    fn harness(config: StoreConfig, verifier: TestCertVerifier, retrievers: usize) -> Harness {
        let network = Arc::new(TestNetwork::default());
        let disperser = Arc::new(TestDisperser::new(network.clone(), 1000));
        let verifier = Arc::new(verifier);
        let retrievers = (0..retrievers)
            .map(|_| Arc::new(TestRetriever::new(network.clone())) as Arc<dyn BlobRetriever>)
            .collect();
        let store = EigenDAV2Store::new(
            Some(disperser.clone()),
            retrievers,
            verifier.clone(),
            &StoreConfig {
                retry_delay: Duration::from_millis(1),
                resource_exhausted_backoff: Duration::from_millis(1),
                ..config
            },
        )
        .unwrap();
        Harness {
            network,
            disperser,
            verifier,
            store,
        }
    }

    #[tokio::test]
    async fn test_put_then_get() {
        let h = harness(StoreConfig::default(), TestCertVerifier::new(1), 1);
        let cert = h
            .store
            .put(b"my-eigenda-payload", &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(cert.version, VersionByte::CURRENT);

        let payload = h.store.get(&cert, GetOpts::default()).await.unwrap();
        assert_eq!(payload.as_ref(), b"my-eigenda-payload");

        let encoded = h
            .store
            .get(
                &cert,
                GetOpts {
                    return_encoded_payload: true,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(encoded, encode_payload(b"my-eigenda-payload"));
        assert_eq!(h.verifier.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_oversized_payload_is_never_dispersed() {
        let h = harness(
            StoreConfig {
                max_blob_size_bytes: 128,
                ..Default::default()
            },
            TestCertVerifier::new(1),
            1,
        );
        // 128 bytes is 4 field elements, 3 of them carry payload
        assert_eq!(h.store.max_payload_size(), 93);
        let err = h
            .store
            .put(&[7u8; 94], &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ProxyError::OversizedBlob { size: 94, max: 93 }));
        assert_eq!(err.http_status(), 413);
        assert_eq!(h.disperser.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_put_surfaces_last_error() {
        let h = harness(
            StoreConfig {
                put_tries: 2,
                ..Default::default()
            },
            TestCertVerifier::new(1),
            1,
        );
        h.disperser.fail_with([
            DisperserError::Transport(tonic::Status::unavailable("first")),
            DisperserError::Failover("eigenda is down".into()),
        ]);
        let err = h
            .store
            .put(b"payload", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ProxyError::Failover(_)));
        assert_eq!(err.http_status(), 503);
        assert_eq!(h.disperser.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_put_recovers_from_rate_limiting() {
        let h = harness(StoreConfig::default(), TestCertVerifier::new(1), 1);
        h.disperser.fail_with([
            DisperserError::Transport(tonic::Status::resource_exhausted("slow down")),
            DisperserError::Transport(tonic::Status::resource_exhausted("slow down")),
        ]);
        let cert = h
            .store
            .put(b"payload", &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(h.disperser.calls.load(Ordering::SeqCst), 3);
        assert!(h.store.get(&cert, GetOpts::default()).await.is_ok());
    }

    #[tokio::test]
    async fn test_retriever_fallback_chain() {
        let network = Arc::new(TestNetwork::default());
        let disperser = Arc::new(TestDisperser::new(network.clone(), 1000));
        let failing = Arc::new(TestRetriever {
            should_err: true,
            ..TestRetriever::new(network.clone())
        });
        let healthy = Arc::new(TestRetriever::new(network.clone()));
        let unused = Arc::new(TestRetriever::new(network.clone()));
        let store = EigenDAV2Store::new(
            Some(disperser),
            vec![failing.clone(), healthy.clone(), unused.clone()],
            Arc::new(TestCertVerifier::new(1)),
            &StoreConfig::default(),
        )
        .unwrap();

        let cert = store.put(b"payload", &CancellationToken::new()).await.unwrap();
        assert_eq!(
            store.get(&cert, GetOpts::default()).await.unwrap().as_ref(),
            b"payload"
        );
        assert_eq!(failing.calls.load(Ordering::SeqCst), 1);
        assert_eq!(healthy.calls.load(Ordering::SeqCst), 1);
        // the first success short circuits
        assert_eq!(unused.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_all_retrievers_fail() {
        let h = harness(StoreConfig::default(), TestCertVerifier::new(1), 2);
        let cert = h
            .store
            .put(b"payload", &CancellationToken::new())
            .await
            .unwrap();
        h.network.clear();
        let err = h.store.get(&cert, GetOpts::default()).await.unwrap_err();
        match err {
            ProxyError::Retrieval(errors) => assert_eq!(errors.len(), 2),
            other => panic!("expected a retrieval error, got {other}"),
        }
        // nothing was retrieved, so nothing was verified
        assert_eq!(h.verifier.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_get_verification_failures() {
        struct Case {
            window: u64,
            l1_inclusion_block_num: u64,
            status: u8,
            derivation_code: Option<u8>,
            internal_bug: bool,
            verifier_calls: u32,
        }
        // the test disperser signs certs at rbn 1000
        let cases = [
            // stale cert never reaches the contract
            Case {
                window: 100,
                l1_inclusion_block_num: 1101,
                status: 1,
                derivation_code: Some(2),
                internal_bug: false,
                verifier_calls: 0,
            },
            Case {
                window: 100,
                l1_inclusion_block_num: 1100,
                status: 1,
                derivation_code: None,
                internal_bug: false,
                verifier_calls: 1,
            },
            Case {
                window: 100,
                l1_inclusion_block_num: 900,
                status: 1,
                derivation_code: None,
                internal_bug: true,
                verifier_calls: 0,
            },
            Case {
                window: 0,
                l1_inclusion_block_num: 5000,
                status: 2,
                derivation_code: Some(3),
                internal_bug: false,
                verifier_calls: 1,
            },
            Case {
                window: 0,
                l1_inclusion_block_num: 0,
                status: 0,
                derivation_code: None,
                internal_bug: false,
                verifier_calls: 1,
            },
        ];
        for case in cases {
            let h = harness(
                StoreConfig {
                    rbn_recency_window_size: case.window,
                    ..Default::default()
                },
                TestCertVerifier::new(case.status),
                1,
            );
            let cert = h
                .store
                .put(b"payload", &CancellationToken::new())
                .await
                .unwrap();
            let res = h
                .store
                .get(
                    &cert,
                    GetOpts {
                        l1_inclusion_block_num: case.l1_inclusion_block_num,
                        ..Default::default()
                    },
                )
                .await;
            let expect_ok = case.derivation_code.is_none() && !case.internal_bug && case.status == 1;
            assert_eq!(res.is_ok(), expect_ok);
            if let Err(e) = res {
                assert_eq!(e.derivation().map(|d| d.status_code()), case.derivation_code);
                assert_eq!(e.is_internal_bug(), case.internal_bug);
            }
            assert_eq!(h.verifier.calls.load(Ordering::SeqCst), case.verifier_calls);
        }
    }

    #[tokio::test]
    async fn test_check_da_cert_timeout() {
        let h = harness(
            StoreConfig {
                contract_call_timeout: Duration::from_millis(10),
                ..Default::default()
            },
            TestCertVerifier {
                delay: Duration::from_secs(60),
                ..TestCertVerifier::new(1)
            },
            1,
        );
        let cert = h
            .store
            .put(b"payload", &CancellationToken::new())
            .await
            .unwrap();
        let err = h.store.get(&cert, GetOpts::default()).await.unwrap_err();
        assert!(matches!(
            err,
            ProxyError::CertVerifier(CertVerifierError::Timeout(_))
        ));
    }

    #[tokio::test]
    async fn test_undecodable_blob_is_a_derivation_error() {
        let h = harness(StoreConfig::default(), TestCertVerifier::new(1), 1);
        let cert = h
            .store
            .put(b"payload", &CancellationToken::new())
            .await
            .unwrap();
        let decoded = cert.decode_v3().unwrap();
        h.network.insert(decoded.to_digest(), Bytes::from(vec![1u8; 64]));

        let err = h.store.get(&cert, GetOpts::default()).await.unwrap_err();
        assert_eq!(err.derivation().map(|d| d.status_code()), Some(4));
    }

    #[tokio::test]
    async fn test_cert_parsing_and_legacy_routing() {
        let h = harness(StoreConfig::default(), TestCertVerifier::new(1), 1);

        let garbage = VersionedCert::new(VersionByte::V2, vec![0xde, 0xad]);
        let err = h.store.get(&garbage, GetOpts::default()).await.unwrap_err();
        assert_eq!(err.derivation().map(|d| d.status_code()), Some(1));

        let legacy = VersionedCert::new(VersionByte::V0, vec![0xde, 0xad]);
        let err = h.store.verify(&legacy, 0).await.unwrap_err();
        assert!(err.is_internal_bug());
        assert_eq!(h.verifier.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_v1_cert_is_verified_after_upgrade() {
        let h = harness(StoreConfig::default(), TestCertVerifier::new(1), 1);
        let cert = h
            .store
            .put(b"payload", &CancellationToken::new())
            .await
            .unwrap();
        let v3 = cert.decode_v3().unwrap();
        let v2 = eigenda_cert::EigenDACertV2::from(&v3);
        let mut rlp = Vec::new();
        alloy_rlp::Encodable::encode(&v2, &mut rlp);

        let v1_cert = VersionedCert::new(VersionByte::V1, rlp);
        assert_eq!(
            h.store.get(&v1_cert, GetOpts::default()).await.unwrap().as_ref(),
            b"payload"
        );
    }

    #[tokio::test]
    async fn test_read_only_store() {
        let store = EigenDAV2Store::new(
            None,
            vec![],
            Arc::new(TestCertVerifier::new(1)),
            &StoreConfig::default(),
        )
        .unwrap();
        let err = store
            .put(b"payload", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ProxyError::NotImplemented(_)));
    }
}
