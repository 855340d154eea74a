use std::future::IntoFuture;
use std::time::Duration;

use alloy_network::TransactionBuilder;
use alloy_primitives::Bytes;
use alloy_provider::Provider;
use alloy_rpc_types::TransactionRequest;
use alloy_sol_types::SolCall;
use async_trait::async_trait;
use eigenda_bindings::IEigenDACertVerifierBase;
use eigenda_cert::EigenDACertV3;
use tracing::error;

use crate::address::{CertVerifierAddressError, CertVerifierAddressProvider};
use crate::status_code::CheckDACertStatusCode;

#[derive(Debug, thiserror::Error)]
pub enum CertVerifierError {
    /// The verifier contract rejected the cert. Retrying cannot change the outcome.
    #[error("invalid cert: checkDACert returned {status_code}")]
    InvalidCert { status_code: CheckDACertStatusCode },
    /// The contract returned NULL_ERROR, which points at a bug in the contract.
    #[error("checkDACert eth-call bug: {0}")]
    ContractBug(CheckDACertStatusCode),
    #[error(transparent)]
    Address(#[from] CertVerifierAddressError),
    #[error("checkDACert eth call: {0}")]
    Rpc(String),
    #[error("unpack checkDACert return data: {0}")]
    Abi(#[from] alloy_sol_types::Error),
    #[error("checkDACert eth call timed out after {0:?}")]
    Timeout(Duration),
}

impl CertVerifierError {
    pub const fn is_invalid_cert(&self) -> bool {
        matches!(self, CertVerifierError::InvalidCert { .. })
    }
}

/// Independent on-chain check of a cert.
#[async_trait]
pub trait CertVerifier: Send + Sync {
    async fn check_da_cert(&self, cert: &EigenDACertV3) -> Result<(), CertVerifierError>;
}

/// Maps the `checkDACert` return value onto the verification outcome.
pub fn check_status_code(status: u8) -> Result<(), CertVerifierError> {
    match CheckDACertStatusCode::from(status) {
        CheckDACertStatusCode::Success => Ok(()),
        CheckDACertStatusCode::NullError => {
            Err(CertVerifierError::ContractBug(CheckDACertStatusCode::NullError))
        }
        status_code => Err(CertVerifierError::InvalidCert { status_code }),
    }
}

/// Calldata of `checkDACert(abi.encode(cert))`.
pub fn check_da_cert_calldata(cert: &EigenDACertV3) -> Bytes {
    IEigenDACertVerifierBase::checkDACertCall {
        abiEncodedCert: cert.to_abi_bytes(),
    }
    .abi_encode()
    .into()
}

/// Calls `checkDACert` through an alloy provider with an `eth_call`.
#[derive(Debug, Clone)]
pub struct EthCertVerifier<P, A> {
    provider: P,
    address_provider: A,
    call_timeout: Duration,
}

impl<P, A> EthCertVerifier<P, A> {
    pub fn new(provider: P, address_provider: A, call_timeout: Duration) -> Self {
        Self {
            provider,
            address_provider,
            call_timeout,
        }
    }
}

#[async_trait]
impl<P, A> CertVerifier for EthCertVerifier<P, A>
where
    P: Provider + Send + Sync,
    A: CertVerifierAddressProvider,
{
    async fn check_da_cert(&self, cert: &EigenDACertV3) -> Result<(), CertVerifierError> {
        let to = self
            .address_provider
            .cert_verifier_address(cert.reference_block_number())?;
        let calldata = check_da_cert_calldata(cert);
        let tx = TransactionRequest::default()
            .with_to(to)
            .with_input(calldata.clone());

        let call = self.provider.call(tx).into_future();
        let returned = match tokio::time::timeout(self.call_timeout, call).await {
            Err(_) => return Err(CertVerifierError::Timeout(self.call_timeout)),
            Ok(Err(e)) => {
                error!(
                    target: "cert_verifier",
                    "checkDACert call failed to:{} calldata:{}",
                    to,
                    calldata
                );
                return Err(CertVerifierError::Rpc(e.to_string()));
            }
            Ok(Ok(returned)) => returned,
        };

        let status = IEigenDACertVerifierBase::checkDACertCall::abi_decode_returns(&returned)?;
        check_status_code(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(1, true, false)]
    #[case(2, false, true)]
    #[case(3, false, true)]
    #[case(4, false, true)]
    #[case(5, false, true)]
    #[case(42, false, true)]
    #[case(0, false, false)]
    fn test_check_status_code(#[case] status: u8, #[case] ok: bool, #[case] invalid: bool) {
        let res = check_status_code(status);
        assert_eq!(res.is_ok(), ok);
        assert_eq!(res.as_ref().is_err_and(|e| e.is_invalid_cert()), invalid);
    }

    #[test]
    fn test_null_error_is_a_contract_bug() {
        assert!(matches!(
            check_status_code(0),
            Err(CertVerifierError::ContractBug(CheckDACertStatusCode::NullError))
        ));
    }

    #[test]
    fn test_calldata_wraps_abi_encoded_cert() {
        let cert = EigenDACertV3::default();
        let calldata = check_da_cert_calldata(&cert);
        assert_eq!(
            &calldata[..4],
            IEigenDACertVerifierBase::checkDACertCall::SELECTOR.as_slice()
        );
        let decoded = IEigenDACertVerifierBase::checkDACertCall::abi_decode(&calldata).unwrap();
        assert_eq!(decoded.abiEncodedCert, cert.to_abi_bytes());
    }

    mod eth {
        use super::*;
        use crate::address::StaticCertVerifierAddress;
        use alloy_primitives::Address;
        use alloy_provider::{mock::Asserter, ProviderBuilder};

        fn verifier(
            asserter: &Asserter,
        ) -> EthCertVerifier<impl Provider, StaticCertVerifierAddress> {
            let provider = ProviderBuilder::new()
                .disable_recommended_fillers()
                .connect_mocked_client(asserter.clone());
            EthCertVerifier::new(
                provider,
                StaticCertVerifierAddress(Address::repeat_byte(0x11)),
                Duration::from_secs(5),
            )
        }

        fn returns(status: u8) -> Bytes {
            IEigenDACertVerifierBase::checkDACertCall::abi_encode_returns(&status).into()
        }

        #[tokio::test]
        async fn test_eth_call_status() {
            let asserter = Asserter::new();
            let verifier = verifier(&asserter);
            let cert = EigenDACertV3::default();

            asserter.push_success(&returns(1));
            verifier.check_da_cert(&cert).await.unwrap();

            asserter.push_success(&returns(2));
            let err = verifier.check_da_cert(&cert).await.unwrap_err();
            assert!(matches!(
                err,
                CertVerifierError::InvalidCert {
                    status_code: CheckDACertStatusCode::InvalidInclusionProof
                }
            ));

            asserter.push_success(&returns(0));
            assert!(matches!(
                verifier.check_da_cert(&cert).await,
                Err(CertVerifierError::ContractBug(_))
            ));
        }

        #[tokio::test]
        async fn test_eth_call_failures() {
            let asserter = Asserter::new();
            let verifier = verifier(&asserter);
            let cert = EigenDACertV3::default();

            asserter.push_failure_msg("execution reverted");
            let err = verifier.check_da_cert(&cert).await.unwrap_err();
            assert!(
                matches!(&err, CertVerifierError::Rpc(msg) if msg.contains("execution reverted"))
            );
            assert!(!err.is_invalid_cert());

            asserter.push_success(&Bytes::from_static(&[0xde, 0xad]));
            assert!(matches!(
                verifier.check_da_cert(&cert).await,
                Err(CertVerifierError::Abi(_))
            ));
        }
    }
}
