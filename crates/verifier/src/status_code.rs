use std::fmt;

/// Return value of `checkDACert`.
/// <https://github.com/Layr-Labs/eigenda/blob/master/contracts/src/integrations/cert/libraries/EigenDACertVerificationLib.sol>
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CheckDACertStatusCode {
    /// Never returned by a correct contract
    NullError,
    Success,
    InvalidInclusionProof,
    SecurityAssumptionsNotMet,
    BlobQuorumsNotSubset,
    RequiredQuorumsNotSubset,
    /// A code added by a newer verifier. Anything but success is a rejection.
    Unknown(u8),
}

impl From<u8> for CheckDACertStatusCode {
    fn from(code: u8) -> Self {
        match code {
            0 => CheckDACertStatusCode::NullError,
            1 => CheckDACertStatusCode::Success,
            2 => CheckDACertStatusCode::InvalidInclusionProof,
            3 => CheckDACertStatusCode::SecurityAssumptionsNotMet,
            4 => CheckDACertStatusCode::BlobQuorumsNotSubset,
            5 => CheckDACertStatusCode::RequiredQuorumsNotSubset,
            other => CheckDACertStatusCode::Unknown(other),
        }
    }
}

impl From<CheckDACertStatusCode> for u8 {
    fn from(code: CheckDACertStatusCode) -> Self {
        match code {
            CheckDACertStatusCode::NullError => 0,
            CheckDACertStatusCode::Success => 1,
            CheckDACertStatusCode::InvalidInclusionProof => 2,
            CheckDACertStatusCode::SecurityAssumptionsNotMet => 3,
            CheckDACertStatusCode::BlobQuorumsNotSubset => 4,
            CheckDACertStatusCode::RequiredQuorumsNotSubset => 5,
            CheckDACertStatusCode::Unknown(other) => other,
        }
    }
}

impl fmt::Display for CheckDACertStatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckDACertStatusCode::NullError => f.write_str("NULL_ERROR"),
            CheckDACertStatusCode::Success => f.write_str("SUCCESS"),
            CheckDACertStatusCode::InvalidInclusionProof => f.write_str("INVALID_INCLUSION_PROOF"),
            CheckDACertStatusCode::SecurityAssumptionsNotMet => {
                f.write_str("SECURITY_ASSUMPTIONS_NOT_MET")
            }
            CheckDACertStatusCode::BlobQuorumsNotSubset => f.write_str("BLOB_QUORUMS_NOT_SUBSET"),
            CheckDACertStatusCode::RequiredQuorumsNotSubset => {
                f.write_str("REQUIRED_QUORUMS_NOT_SUBSET")
            }
            CheckDACertStatusCode::Unknown(code) => write!(f, "UNKNOWN_STATUS_CODE({code})"),
        }
    }
}
