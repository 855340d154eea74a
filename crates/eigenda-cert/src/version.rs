use core::fmt;
use serde::{Deserialize, Serialize};

/// The leading byte of every serialized cert. It names the cert generation, which decides
/// how the bytes after it are decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum VersionByte {
    /// EigenDA v1 cert. Retrieved through the v1 backend, never verified by this proxy.
    V0 = 0x00,
    /// EigenDACertV2, rlp encoded
    V1 = 0x01,
    /// EigenDACertV3, rlp encoded
    V2 = 0x02,
}

#[derive(Debug, thiserror::Error, Clone, Copy, PartialEq, Eq)]
#[error("unsupported cert version byte {0:#04x}")]
pub struct UnsupportedVersionError(pub u8);

impl VersionByte {
    /// The generation every dispersal produces.
    pub const CURRENT: VersionByte = VersionByte::V2;

    /// Legacy certs predate on-chain verification and must never reach it.
    pub const fn is_legacy(self) -> bool {
        matches!(self, VersionByte::V0)
    }
}

impl TryFrom<u8> for VersionByte {
    type Error = UnsupportedVersionError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(VersionByte::V0),
            0x01 => Ok(VersionByte::V1),
            0x02 => Ok(VersionByte::V2),
            other => Err(UnsupportedVersionError(other)),
        }
    }
}

impl From<VersionByte> for u8 {
    fn from(version: VersionByte) -> Self {
        version as u8
    }
}

impl fmt::Display for VersionByte {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionByte::V0 => f.write_str("v0"),
            VersionByte::V1 => f.write_str("v1"),
            VersionByte::V2 => f.write_str("v2"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_known_version_bytes_are_accepted() {
        for b in 0..=u8::MAX {
            let parsed = VersionByte::try_from(b);
            match b {
                0..=2 => assert_eq!(u8::from(parsed.unwrap()), b),
                _ => assert_eq!(parsed, Err(UnsupportedVersionError(b))),
            }
        }
    }

    #[test]
    fn test_only_v0_is_legacy() {
        assert!(VersionByte::V0.is_legacy());
        assert!(!VersionByte::V1.is_legacy());
        assert!(!VersionByte::CURRENT.is_legacy());
    }
}
