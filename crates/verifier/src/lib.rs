//! Cert verification: the offchain RBN recency check and the on-chain `checkDACert` call.
pub mod address;
pub mod recency;
pub mod status_code;
pub mod verifier;

pub use address::{CertVerifierAddressError, CertVerifierAddressProvider, StaticCertVerifierAddress};
pub use recency::{verify_rbn_recency, RecencyError};
pub use status_code::CheckDACertStatusCode;
pub use verifier::{
    check_da_cert_calldata, check_status_code, CertVerifier, CertVerifierError, EthCertVerifier,
};
