use alloy_primitives::{keccak256, Bytes, B256};
use alloy_rlp::Decodable;
use serde::{Deserialize, Serialize};

use crate::{EigenDACertV2, EigenDACertV3, VersionByte};

#[derive(Debug, thiserror::Error, Clone, Copy, PartialEq, Eq)]
pub enum CertDecodeError {
    /// v0 certs have no v3 shape
    #[error("legacy {0} cert cannot be decoded into a v3 cert")]
    LegacyCert(VersionByte),
    #[error("unable to decode rlp cert: {0}")]
    InvalidRlpCert(alloy_rlp::Error),
    #[error("{0} trailing bytes after rlp cert")]
    TrailingBytes(usize),
}

/// A version byte plus the serialized cert it tags. This is what every commitment mode
/// wraps, and what the store backends accept and return.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VersionedCert {
    pub version: VersionByte,
    pub serialized_cert: Bytes,
}

impl VersionedCert {
    pub fn new(version: VersionByte, serialized_cert: impl Into<Bytes>) -> Self {
        Self {
            version,
            serialized_cert: serialized_cert.into(),
        }
    }

    /// Wraps a freshly dispersed cert with the current version byte.
    pub fn from_v3(cert: &EigenDACertV3) -> Self {
        Self::new(VersionByte::CURRENT, cert.to_rlp_bytes())
    }

    /// Key under which the blob of this cert is stored, keccak(serialized cert).
    pub fn digest(&self) -> B256 {
        keccak256(&self.serialized_cert)
    }

    /// Decodes the serialized cert into the current cert shape. V1 certs carry the same
    /// fields as V2 certs and are upgraded on read, so everything downstream of this call
    /// handles exactly one cert type.
    pub fn decode_v3(&self) -> Result<EigenDACertV3, CertDecodeError> {
        match self.version {
            VersionByte::V0 => Err(CertDecodeError::LegacyCert(self.version)),
            VersionByte::V1 => decode_exact::<EigenDACertV2>(&self.serialized_cert).map(Into::into),
            VersionByte::V2 => decode_exact::<EigenDACertV3>(&self.serialized_cert),
        }
    }
}

fn decode_exact<T: Decodable>(data: &[u8]) -> Result<T, CertDecodeError> {
    let mut buf = data;
    let cert = T::decode(&mut buf).map_err(CertDecodeError::InvalidRlpCert)?;
    if !buf.is_empty() {
        return Err(CertDecodeError::TrailingBytes(buf.len()));
    }
    Ok(cert)
}
