//! Byte layouts that wrap a [VersionedCert] for each client protocol.
//!
//! | mode                | layout                                        |
//! |---------------------|-----------------------------------------------|
//! | standard            | `[version][cert]`                             |
//! | optimism_keccak256  | `[0x00][keccak256(preimage)]`                 |
//! | optimism_generic    | `[0x01][0x00][version][cert]`                 |
//! | arbitrum custom da  | `[0x01][version][cert]` after a 40 byte header |
//!
//! The OP stack prepends its own tx version byte when posting a generic commitment to L1;
//! that byte is handled by op-node, not here.
//! <https://specs.optimism.io/experimental/alt-da.html#input-commitment-submission>
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use alloy_primitives::{keccak256, Bytes, B256};
use core::fmt;
use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::{UnsupportedVersionError, VersionByte, VersionedCert};

/// OP commitment type for keccak256 commitments
pub const OP_KECCAK256_COMMITMENT_BYTE: u8 = 0x00;
/// OP commitment type for commitments interpreted by a da-service
pub const OP_GENERIC_COMMITMENT_BYTE: u8 = 0x01;
/// da layer byte of OP generic commitments, eigenda is 0
pub const EIGENDA_DA_LAYER_BYTE: u8 = 0x00;
/// Header byte arbitrum nitro uses to route a sequencer message to the eigenda custom da
pub const ARB_CUSTOM_DA_HEADER_BYTE: u8 = 0x01;
/// Length of the nitro sequencer message header preceding the custom da payload
pub const ARB_MESSAGE_HEADER_LEN: usize = 40;

const KECCAK256_COMMITMENT_LEN: usize = 33;

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum CommitmentParseError {
    #[error("insufficient commitment data: need at least {expected} bytes, got {actual}")]
    InsufficientData { expected: usize, actual: usize },
    #[error("unsupported commitment type byte {0:#04x}")]
    UnsupportedCommitmentType(u8),
    #[error("unsupported da layer byte {0:#04x}")]
    UnsupportedDaLayerType(u8),
    #[error("unsupported arbitrum header byte {0:#04x}")]
    UnsupportedArbitrumHeaderByte(u8),
    #[error("keccak256 commitment must be exactly {expected} bytes, got {actual}")]
    InvalidKeccakCommitmentLength { expected: usize, actual: usize },
    #[error(transparent)]
    UnsupportedVersion(#[from] UnsupportedVersionError),
    #[error("{commitment} commitment cannot be encoded in {mode} mode")]
    ModeMismatch {
        commitment: &'static str,
        mode: CommitmentMode,
    },
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
#[error("unknown commitment mode {0:?}")]
pub struct UnknownCommitmentModeError(pub String);

/// Selects the codec used on the get/put path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitmentMode {
    Standard,
    #[serde(rename = "optimism_keccak256")]
    OptimismKeccak256,
    OptimismGeneric,
}

impl CommitmentMode {
    pub const fn as_str(&self) -> &'static str {
        match self {
            CommitmentMode::Standard => "standard",
            CommitmentMode::OptimismKeccak256 => "optimism_keccak256",
            CommitmentMode::OptimismGeneric => "optimism_generic",
        }
    }

    /// Decodes wire bytes received in this mode.
    pub fn decode(&self, data: &[u8]) -> Result<Commitment, CommitmentParseError> {
        match self {
            CommitmentMode::Standard => decode_versioned(data).map(Commitment::Cert),
            CommitmentMode::OptimismKeccak256 => {
                decode_op_keccak256(data).map(Commitment::Keccak256)
            }
            CommitmentMode::OptimismGeneric => decode_op_generic(data).map(Commitment::Cert),
        }
    }
}

impl FromStr for CommitmentMode {
    type Err = UnknownCommitmentModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "standard" => Ok(CommitmentMode::Standard),
            "optimism_keccak256" => Ok(CommitmentMode::OptimismKeccak256),
            "optimism_generic" => Ok(CommitmentMode::OptimismGeneric),
            other => Err(UnknownCommitmentModeError(other.to_string())),
        }
    }
}

impl fmt::Display for CommitmentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decoded commitment. Keccak256 commitments address a preimage in secondary storage
/// and carry no cert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Commitment {
    Cert(VersionedCert),
    Keccak256(B256),
}

impl Commitment {
    /// Commitment over a preimage stored by hash.
    pub fn keccak256_of(preimage: &[u8]) -> Self {
        Commitment::Keccak256(keccak256(preimage))
    }

    pub fn encode(&self, mode: CommitmentMode) -> Result<Bytes, CommitmentParseError> {
        match (self, mode) {
            (Commitment::Cert(cert), CommitmentMode::Standard) => Ok(encode_standard(cert)),
            (Commitment::Cert(cert), CommitmentMode::OptimismGeneric) => {
                Ok(encode_op_generic(cert))
            }
            (Commitment::Keccak256(hash), CommitmentMode::OptimismKeccak256) => {
                let mut out = Vec::with_capacity(KECCAK256_COMMITMENT_LEN);
                out.push(OP_KECCAK256_COMMITMENT_BYTE);
                out.extend_from_slice(hash.as_slice());
                Ok(out.into())
            }
            (Commitment::Cert(_), mode) => Err(CommitmentParseError::ModeMismatch {
                commitment: "cert",
                mode,
            }),
            (Commitment::Keccak256(_), mode) => Err(CommitmentParseError::ModeMismatch {
                commitment: "keccak256",
                mode,
            }),
        }
    }
}

fn with_prefix(prefix: &[u8], cert: &VersionedCert) -> Bytes {
    let mut out = Vec::with_capacity(prefix.len() + 1 + cert.serialized_cert.len());
    out.extend_from_slice(prefix);
    out.push(cert.version.into());
    out.extend_from_slice(&cert.serialized_cert);
    out.into()
}

fn encode_standard(cert: &VersionedCert) -> Bytes {
    with_prefix(&[], cert)
}

fn encode_op_generic(cert: &VersionedCert) -> Bytes {
    with_prefix(&[OP_GENERIC_COMMITMENT_BYTE, EIGENDA_DA_LAYER_BYTE], cert)
}

/// Arbitrum custom da commitment, without the sequencer message header.
pub fn encode_arbitrum(cert: &VersionedCert) -> Bytes {
    with_prefix(&[ARB_CUSTOM_DA_HEADER_BYTE], cert)
}

/// `[version][cert]`, the suffix shared by every cert carrying layout. The cert itself is
/// kept opaque, decoding it into a struct is left to the retrieval path.
fn decode_versioned(data: &[u8]) -> Result<VersionedCert, CommitmentParseError> {
    let Some((&version, cert)) = data.split_first() else {
        return Err(CommitmentParseError::InsufficientData {
            expected: 2,
            actual: data.len(),
        });
    };
    let version = VersionByte::try_from(version)?;
    if cert.is_empty() {
        return Err(CommitmentParseError::InsufficientData {
            expected: 2,
            actual: data.len(),
        });
    }
    Ok(VersionedCert::new(version, Bytes::copy_from_slice(cert)))
}

fn decode_op_keccak256(data: &[u8]) -> Result<B256, CommitmentParseError> {
    let expected = KECCAK256_COMMITMENT_LEN;
    match data.first() {
        None => Err(CommitmentParseError::InsufficientData {
            expected,
            actual: 0,
        }),
        Some(&OP_KECCAK256_COMMITMENT_BYTE) if data.len() == expected => {
            Ok(B256::from_slice(&data[1..]))
        }
        Some(&OP_KECCAK256_COMMITMENT_BYTE) => {
            Err(CommitmentParseError::InvalidKeccakCommitmentLength {
                expected,
                actual: data.len(),
            })
        }
        Some(&other) => Err(CommitmentParseError::UnsupportedCommitmentType(other)),
    }
}

fn decode_op_generic(data: &[u8]) -> Result<VersionedCert, CommitmentParseError> {
    if data.len() < 4 {
        return Err(CommitmentParseError::InsufficientData {
            expected: 4,
            actual: data.len(),
        });
    }
    if data[0] != OP_GENERIC_COMMITMENT_BYTE {
        return Err(CommitmentParseError::UnsupportedCommitmentType(data[0]));
    }
    if data[1] != EIGENDA_DA_LAYER_BYTE {
        return Err(CommitmentParseError::UnsupportedDaLayerType(data[1]));
    }
    decode_versioned(&data[2..])
}

/// Decodes an arbitrum custom da commitment, without the sequencer message header.
pub fn decode_arbitrum(data: &[u8]) -> Result<VersionedCert, CommitmentParseError> {
    match data.first() {
        None => Err(CommitmentParseError::InsufficientData {
            expected: 3,
            actual: 0,
        }),
        Some(&ARB_CUSTOM_DA_HEADER_BYTE) => decode_versioned(&data[1..]).map_err(|e| match e {
            CommitmentParseError::InsufficientData { expected, actual } => {
                CommitmentParseError::InsufficientData {
                    expected: expected + 1,
                    actual: actual + 1,
                }
            }
            e => e,
        }),
        Some(&other) => Err(CommitmentParseError::UnsupportedArbitrumHeaderByte(other)),
    }
}

/// Skips the nitro message header of a sequencer message and decodes the commitment after it.
pub fn decode_arbitrum_sequencer_msg(msg: &[u8]) -> Result<VersionedCert, CommitmentParseError> {
    if msg.len() <= ARB_MESSAGE_HEADER_LEN {
        return Err(CommitmentParseError::InsufficientData {
            expected: ARB_MESSAGE_HEADER_LEN + 3,
            actual: msg.len(),
        });
    }
    decode_arbitrum(&msg[ARB_MESSAGE_HEADER_LEN..])
}
