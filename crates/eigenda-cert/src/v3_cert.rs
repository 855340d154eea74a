use alloy_primitives::Bytes;
use alloy_primitives::{keccak256, B256};
use alloy_rlp::{Encodable, RlpDecodable, RlpEncodable};
use alloy_sol_types::SolValue;
use serde::{Deserialize, Serialize};

use crate::{BatchHeaderV2, BlobInclusionInfo, NonSignerStakesAndSignature};

extern crate alloc;
use alloc::vec::Vec;

/// EigenDA CertV3, the current cert generation, serialized behind version byte 0x02.
#[derive(Debug, Clone, Default, RlpEncodable, RlpDecodable, PartialEq, Serialize, Deserialize)]
pub struct EigenDACertV3 {
    pub batch_header_v2: BatchHeaderV2,
    pub blob_inclusion_info: BlobInclusionInfo,
    pub nonsigner_stake_and_signature: NonSignerStakesAndSignature,
    pub signed_quorum_numbers: Bytes,
}

impl EigenDACertV3 {
    pub fn to_rlp_bytes(&self) -> Vec<u8> {
        let mut cert_rlp_bytes = Vec::<u8>::with_capacity(self.length());
        self.encode(&mut cert_rlp_bytes);
        cert_rlp_bytes
    }

    /// keccak of the rlp encoded cert
    pub fn to_digest(&self) -> B256 {
        keccak256(self.to_rlp_bytes())
    }

    pub fn reference_block_number(&self) -> u64 {
        self.batch_header_v2.reference_block_number as u64
    }

    /// blob length in field elements, as committed by the disperser
    pub fn blob_length(&self) -> u32 {
        self.blob_inclusion_info
            .blob_certificate
            .blob_header
            .commitment
            .length
    }

    pub fn to_sol(&self) -> eigenda_bindings::EigenDACertV3 {
        eigenda_bindings::EigenDACertV3 {
            batchHeader: self.batch_header_v2.to_sol(),
            blobInclusionInfo: self.blob_inclusion_info.to_sol(),
            nonSignerStakesAndSignature: self.nonsigner_stake_and_signature.to_sol(),
            signedQuorumNumbers: self.signed_quorum_numbers.clone(),
        }
    }

    /// The `abiEncodedCert` argument of `checkDACert`.
    pub fn to_abi_bytes(&self) -> Bytes {
        self.to_sol().abi_encode().into()
    }
}
