//! Error taxonomy of the proxy store. Every stage returns a typed error so that the serving
//! layer maps kind to status without string matching.

use alloy_primitives::B256;
use eigenda_cert::{CertDecodeError, CommitmentParseError, VersionedCert};
use eigenda_cert_verifier::{CertVerifierError, RecencyError};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::config::ConfigError;
use crate::payload::EncodedPayloadDecodingError;
use crate::secondary::SecondaryError;

/// Derivation errors are returned to clients inside a HTTP TEAPOT json body.
pub const HTTP_RESPONSE_STATUS_CODE_TEAPOT: u16 = 418;

// Status codes shared with the derivation pipelines consuming the proxy,
// https://github.com/Layr-Labs/eigenda/blob/4fa89635da76a0dbde6ad48f4de15c6059c7f11a/api/clients/v2/coretypes/derivation_errors.go#L67
pub const STATUS_CODE_CERT_PARSE_ERROR: u8 = 1;
pub const STATUS_CODE_RECENCY_ERROR: u8 = 2;
pub const STATUS_CODE_INVALID_CERT_ERROR: u8 = 3;
pub const STATUS_CODE_BLOB_DECODING_ERROR: u8 = 4;

/// Signals to a derivation pipeline that the cert must be dropped. Retrying a request that
/// failed with one of these never succeeds.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum DerivationError {
    #[error("cert parsing failed: {0}")]
    CertParsingFailed(String),
    #[error("cert is not recent: rbn {cert_rbn}, l1 inclusion block {cert_l1_ibn}, window {window}")]
    RecencyCheckFailed {
        cert_rbn: u64,
        cert_l1_ibn: u64,
        window: u64,
    },
    #[error("invalid cert: {0}")]
    InvalidCert(String),
    #[error("blob decoding failed: {0}")]
    BlobDecodingFailed(String),
}

/// Json body of a derivation error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivationErrorBody {
    #[serde(rename = "StatusCode")]
    pub status_code: u8,
    #[serde(rename = "Msg")]
    pub msg: String,
}

impl DerivationErrorBody {
    /// Parses a body returned by a proxy, the client side of [DerivationError::to_json].
    pub fn from_json(body: &str) -> Result<Self, DerivationErrorParseError> {
        let body: Self = serde_json::from_str(body)?;
        match body.status_code {
            STATUS_CODE_CERT_PARSE_ERROR..=STATUS_CODE_BLOB_DECODING_ERROR => Ok(body),
            other => Err(DerivationErrorParseError::UnknownStatusCode(other)),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DerivationErrorParseError {
    #[error("invalid derivation error body: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unknown derivation error status code {0}")]
    UnknownStatusCode(u8),
}

impl DerivationError {
    pub const fn status_code(&self) -> u8 {
        match self {
            DerivationError::CertParsingFailed(_) => STATUS_CODE_CERT_PARSE_ERROR,
            DerivationError::RecencyCheckFailed { .. } => STATUS_CODE_RECENCY_ERROR,
            DerivationError::InvalidCert(_) => STATUS_CODE_INVALID_CERT_ERROR,
            DerivationError::BlobDecodingFailed(_) => STATUS_CODE_BLOB_DECODING_ERROR,
        }
    }

    pub fn to_body(&self) -> DerivationErrorBody {
        DerivationErrorBody {
            status_code: self.status_code(),
            msg: self.to_string(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.to_body())
    }

    pub(crate) fn cert_parsing(cert: &VersionedCert, reason: impl std::fmt::Display) -> Self {
        DerivationError::CertParsingFailed(format!("{reason}, cert {}", cert.serialized_cert))
    }
}

impl From<CommitmentParseError> for DerivationError {
    fn from(e: CommitmentParseError) -> Self {
        DerivationError::CertParsingFailed(e.to_string())
    }
}

impl From<EncodedPayloadDecodingError> for DerivationError {
    fn from(e: EncodedPayloadDecodingError) -> Self {
        DerivationError::BlobDecodingFailed(e.to_string())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    /// Corrupt wire framing, always caused by the client.
    #[error("parsing error: {0}")]
    Parsing(#[from] CommitmentParseError),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("blob size {size} bytes exceeds max payload size {max} bytes")]
    OversizedBlob { size: usize, max: usize },
    #[error("disperser is rate limiting, retry later: {0}")]
    ResourceExhausted(String),
    #[error(transparent)]
    Derivation(#[from] DerivationError),
    /// EigenDA is temporarily unusable, the client should fail over to another DA layer.
    #[error("failover: {0}")]
    Failover(String),
    #[error("internal bug: {0}")]
    InternalBug(String),
    #[error("dispersal failed: {0}")]
    Dispersal(String),
    #[error("all retrievers failed: {}", .0.join("; "))]
    Retrieval(Vec<String>),
    #[error("cert verifier: {0}")]
    CertVerifier(CertVerifierError),
    #[error("key {expected} does not match keccak256 of the stored value {actual}")]
    KeyValueMismatch { expected: B256, actual: B256 },
    #[error("not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    Secondary(#[from] SecondaryError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("{0} is not implemented")]
    NotImplemented(&'static str),
    #[error("operation cancelled")]
    Cancelled,
}

impl ProxyError {
    /// Builds an internal bug error and logs it, these never happen in normal control flow.
    pub fn internal_bug(msg: impl Into<String>) -> Self {
        let msg = msg.into();
        error!(target: "eigenda_proxy", "internal bug: {}", msg);
        ProxyError::InternalBug(msg)
    }

    pub const fn is_internal_bug(&self) -> bool {
        matches!(self, ProxyError::InternalBug(_))
    }

    pub fn derivation(&self) -> Option<&DerivationError> {
        match self {
            ProxyError::Derivation(e) => Some(e),
            _ => None,
        }
    }

    /// Status code a HTTP transport renders this error with.
    pub const fn http_status(&self) -> u16 {
        match self {
            ProxyError::Parsing(_)
            | ProxyError::BadRequest(_)
            | ProxyError::KeyValueMismatch { .. } => 400,
            ProxyError::NotFound(_) => 404,
            ProxyError::OversizedBlob { .. } => 413,
            ProxyError::Derivation(_) => HTTP_RESPONSE_STATUS_CODE_TEAPOT,
            ProxyError::ResourceExhausted(_) => 429,
            ProxyError::NotImplemented(_) => 501,
            ProxyError::Failover(_) => 503,
            ProxyError::InternalBug(_)
            | ProxyError::Dispersal(_)
            | ProxyError::Retrieval(_)
            | ProxyError::CertVerifier(_)
            | ProxyError::Secondary(_)
            | ProxyError::Config(_)
            | ProxyError::Cancelled => 500,
        }
    }
}

impl From<CertVerifierError> for ProxyError {
    fn from(e: CertVerifierError) -> Self {
        match e {
            CertVerifierError::InvalidCert { .. } => {
                ProxyError::Derivation(DerivationError::InvalidCert(e.to_string()))
            }
            e => ProxyError::CertVerifier(e),
        }
    }
}

impl From<RecencyError> for ProxyError {
    fn from(e: RecencyError) -> Self {
        match e {
            RecencyError::Stale {
                cert_rbn,
                cert_l1_ibn,
                window,
            } => ProxyError::Derivation(DerivationError::RecencyCheckFailed {
                cert_rbn,
                cert_l1_ibn,
                window,
            }),
            e => ProxyError::internal_bug(e.to_string()),
        }
    }
}

impl From<CertDecodeError> for ProxyError {
    fn from(e: CertDecodeError) -> Self {
        match e {
            CertDecodeError::LegacyCert(v) => {
                ProxyError::internal_bug(format!("{v} cert routed to the v2 pipeline"))
            }
            e => ProxyError::Derivation(DerivationError::CertParsingFailed(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eigenda_cert_verifier::CheckDACertStatusCode;

    #[test]
    fn test_derivation_error_body() {
        let err = DerivationError::RecencyCheckFailed {
            cert_rbn: 100,
            cert_l1_ibn: 250,
            window: 100,
        };
        let json = err.to_json().unwrap();
        let body: DerivationErrorBody = serde_json::from_str(&json).unwrap();
        assert_eq!(body.status_code, STATUS_CODE_RECENCY_ERROR);
        assert_eq!(body.msg, err.to_string());
        assert!(json.starts_with(r#"{"StatusCode":2,"Msg":"#));

        assert_eq!(DerivationErrorBody::from_json(&json).unwrap(), body);
        assert!(matches!(
            DerivationErrorBody::from_json(r#"{"StatusCode":9,"Msg":"x"}"#),
            Err(DerivationErrorParseError::UnknownStatusCode(9))
        ));
        assert!(matches!(
            DerivationErrorBody::from_json("not json"),
            Err(DerivationErrorParseError::Json(_))
        ));
    }

    #[test]
    fn test_error_kinds_map_to_status() {
        let recency: ProxyError = RecencyError::Stale {
            cert_rbn: 1,
            cert_l1_ibn: 10,
            window: 2,
        }
        .into();
        assert_eq!(recency.http_status(), 418);
        assert_eq!(recency.derivation().map(|e| e.status_code()), Some(2));

        let bug: ProxyError = RecencyError::ZeroReferenceBlock.into();
        assert!(bug.is_internal_bug());
        assert_eq!(bug.http_status(), 500);

        let invalid: ProxyError = CertVerifierError::InvalidCert {
            status_code: CheckDACertStatusCode::InvalidInclusionProof,
        }
        .into();
        assert_eq!(invalid.derivation().map(|e| e.status_code()), Some(3));

        let rpc: ProxyError = CertVerifierError::Rpc("connection refused".into()).into();
        assert!(rpc.derivation().is_none());
        assert_eq!(rpc.http_status(), 500);

        assert_eq!(ProxyError::Failover("down".into()).http_status(), 503);
        assert_eq!(ProxyError::NotImplemented("collect_preimages").http_status(), 501);
        assert_eq!(
            ProxyError::OversizedBlob { size: 10, max: 5 }.http_status(),
            413
        );
    }
}
