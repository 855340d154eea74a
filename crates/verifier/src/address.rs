//! Resolution of the contract `checkDACert` is called on. EigenLabs deploys a router on each
//! chain which picks the verification logic from the rbn inside the abi encoded cert. A rollup
//! may deploy its own router or an immutable verifier instead.
use alloy_primitives::{address, Address};

#[derive(Debug, thiserror::Error, Clone, Copy, PartialEq, Eq)]
pub enum CertVerifierAddressError {
    #[error("no cert verifier router known for chain id {0}")]
    UnknownChainId(u64),
}

pub trait CertVerifierAddressProvider: Send + Sync {
    /// Address of the verifier responsible for a cert with the given reference block number.
    fn cert_verifier_address(
        &self,
        reference_block_number: u64,
    ) -> Result<Address, CertVerifierAddressError>;
}

/// A single router or immutable verifier used for every cert.
#[derive(Debug, Clone, Copy)]
pub struct StaticCertVerifierAddress(pub Address);

impl CertVerifierAddressProvider for StaticCertVerifierAddress {
    fn cert_verifier_address(&self, _: u64) -> Result<Address, CertVerifierAddressError> {
        Ok(self.0)
    }
}

impl StaticCertVerifierAddress {
    /// The router deployed by EigenLabs on a known chain.
    pub fn eigenlabs_router(chain_id: u64) -> Result<Self, CertVerifierAddressError> {
        let address = match chain_id {
            // mainnet
            1 => address!("0x61692e93b6B045c444e942A91EcD1527F23A3FB7"),
            // sepolia
            11155111 => address!("0x58D2B844a894f00b7E6F9F492b9F43aD54Cd4429"),
            // holesky
            17000 => address!("0xDD735AFFe77A5ED5b21ED47219f95ED841f8Ffbd"),
            chain_id => return Err(CertVerifierAddressError::UnknownChainId(chain_id)),
        };
        Ok(Self(address))
    }
}
