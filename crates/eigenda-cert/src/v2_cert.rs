use alloy_primitives::Bytes;
use alloy_rlp::{RlpDecodable, RlpEncodable};
use serde::{Deserialize, Serialize};

use crate::{BatchHeaderV2, BlobInclusionInfo, EigenDACertV3, NonSignerStakesAndSignature};

/// EigenDA CertV2, serialized behind version byte 0x01. Only ever decoded, the proxy
/// disperses V3 certs.
#[derive(Debug, Clone, Default, RlpEncodable, RlpDecodable, PartialEq, Serialize, Deserialize)]
pub struct EigenDACertV2 {
    pub blob_inclusion_info: BlobInclusionInfo,
    pub batch_header_v2: BatchHeaderV2,
    pub nonsigner_stake_and_signature: NonSignerStakesAndSignature,
    pub signed_quorum_numbers: Bytes,
}

// The V2 cert carries the same fields as the V3 cert, in a different order.
// https://github.com/Layr-Labs/eigenda/blob/e51dcc5f2919c952bc8f603d1269528ee5373ad1/api/clients/v2/coretypes/eigenda_cert.go#L341
impl From<EigenDACertV2> for EigenDACertV3 {
    fn from(v2cert: EigenDACertV2) -> EigenDACertV3 {
        EigenDACertV3 {
            batch_header_v2: v2cert.batch_header_v2,
            blob_inclusion_info: v2cert.blob_inclusion_info,
            nonsigner_stake_and_signature: v2cert.nonsigner_stake_and_signature,
            signed_quorum_numbers: v2cert.signed_quorum_numbers,
        }
    }
}

impl From<&EigenDACertV3> for EigenDACertV2 {
    fn from(v3cert: &EigenDACertV3) -> EigenDACertV2 {
        EigenDACertV2 {
            blob_inclusion_info: v3cert.blob_inclusion_info.clone(),
            batch_header_v2: v3cert.batch_header_v2.clone(),
            nonsigner_stake_and_signature: v3cert.nonsigner_stake_and_signature.clone(),
            signed_quorum_numbers: v3cert.signed_quorum_numbers.clone(),
        }
    }
}
