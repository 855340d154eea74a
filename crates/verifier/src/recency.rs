//! RBN recency check.
//! <https://layr-labs.github.io/eigenda/integration/spec/6-secure-integration.html#1-rbn-recency-validation>
//!
//! A cert is recent when `cert.RBN < certL1InclusionBlock <= cert.RBN + window`. Stale certs
//! are rejected so a batcher cannot post a cert signed against an old operator set.

#[derive(Debug, thiserror::Error, Clone, Copy, PartialEq, Eq)]
pub enum RecencyError {
    /// The cert was included too late. Callers discard it.
    #[error("cert is not recent: rbn {cert_rbn}, l1 inclusion block {cert_l1_ibn}, window {window}")]
    Stale {
        cert_rbn: u64,
        cert_l1_ibn: u64,
        window: u64,
    },
    /// Signing always fixes a nonzero rbn, so this is a bug upstream of the check.
    #[error("cert rbn is 0, which no signed cert can have")]
    ZeroReferenceBlock,
    /// A cert can only be included after the block it references.
    #[error("l1 inclusion block {cert_l1_ibn} is not after cert rbn {cert_rbn}")]
    InclusionNotAfterReference { cert_rbn: u64, cert_l1_ibn: u64 },
}

impl RecencyError {
    /// Only [RecencyError::Stale] is a property of the cert, the rest are bugs.
    pub const fn is_internal_bug(&self) -> bool {
        !matches!(self, RecencyError::Stale { .. })
    }
}

/// Passes trivially when `cert_l1_ibn` or `window` is zero.
pub fn verify_rbn_recency(cert_rbn: u64, cert_l1_ibn: u64, window: u64) -> Result<(), RecencyError> {
    if cert_l1_ibn == 0 || window == 0 {
        return Ok(());
    }
    if cert_rbn == 0 {
        return Err(RecencyError::ZeroReferenceBlock);
    }
    if cert_l1_ibn <= cert_rbn {
        return Err(RecencyError::InclusionNotAfterReference {
            cert_rbn,
            cert_l1_ibn,
        });
    }
    if cert_l1_ibn > cert_rbn.saturating_add(window) {
        return Err(RecencyError::Stale {
            cert_rbn,
            cert_l1_ibn,
            window,
        });
    }
    Ok(())
}
