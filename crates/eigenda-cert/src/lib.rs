//! EigenDA certificate types, the version byte that tags a serialized cert, and the
//! commitment encodings that wrap a cert for each rollup stack.
#![no_std]
use alloy_primitives::Bytes;
use alloy_primitives::{FixedBytes, U256};
use alloy_rlp::{RlpDecodable, RlpEncodable};
use eigenda_bindings as sol_struct;
use serde::{Deserialize, Serialize};

extern crate alloc;
use alloc::vec::Vec;

pub mod commitment;
pub mod v2_cert;
pub mod v3_cert;
pub mod version;
pub mod versioned_cert;

pub use commitment::{
    decode_arbitrum, decode_arbitrum_sequencer_msg, encode_arbitrum, Commitment, CommitmentMode,
    CommitmentParseError, UnknownCommitmentModeError, ARB_CUSTOM_DA_HEADER_BYTE,
    ARB_MESSAGE_HEADER_LEN, EIGENDA_DA_LAYER_BYTE, OP_GENERIC_COMMITMENT_BYTE,
    OP_KECCAK256_COMMITMENT_BYTE,
};
pub use v2_cert::EigenDACertV2;
pub use v3_cert::EigenDACertV3;
pub use version::{UnsupportedVersionError, VersionByte};
pub use versioned_cert::{CertDecodeError, VersionedCert};

// G1Point represents a point on the BN254 G1 curve
#[derive(Debug, Clone, Copy, Default, RlpEncodable, RlpDecodable, PartialEq, Serialize, Deserialize)]
pub struct G1Point {
    pub x: U256,
    pub y: U256,
}

impl G1Point {
    pub fn to_sol(&self) -> sol_struct::G1Point {
        sol_struct::G1Point {
            X: self.x,
            Y: self.y,
        }
    }
}

// G2Point represents a point on the BN254 G2 curve, each coordinate is an Fp2 element
// stored as two U256 limbs.
#[derive(Debug, Clone, Default, RlpEncodable, RlpDecodable, PartialEq, Serialize, Deserialize)]
pub struct G2Point {
    pub x: Vec<U256>,
    pub y: Vec<U256>,
}

impl G2Point {
    pub fn to_sol(&self) -> sol_struct::G2Point {
        sol_struct::G2Point {
            X: fp2_limbs(&self.x),
            Y: fp2_limbs(&self.y),
        }
    }
}

// a malformed coordinate is padded with zeros, the verifier contract rejects it
fn fp2_limbs(limbs: &[U256]) -> [U256; 2] {
    [
        limbs.first().copied().unwrap_or_default(),
        limbs.get(1).copied().unwrap_or_default(),
    ]
}

// BlobCommitment contains commitment information for a blob
#[derive(Debug, Clone, Default, RlpEncodable, RlpDecodable, PartialEq, Serialize, Deserialize)]
pub struct BlobCommitment {
    pub commitment: G1Point,
    pub length_commitment: G2Point,
    pub length_proof: G2Point,
    /// blob length in field elements
    pub length: u32,
}

impl BlobCommitment {
    pub fn to_sol(&self) -> sol_struct::BlobCommitment {
        sol_struct::BlobCommitment {
            commitment: self.commitment.to_sol(),
            lengthCommitment: self.length_commitment.to_sol(),
            lengthProof: self.length_proof.to_sol(),
            length: self.length,
        }
    }
}

// BlobHeaderV2 is the version 2 of blob header. The V2 is a tag of the EigenDA protocol and
// is unrelated to the cert version byte.
#[derive(Debug, Clone, Default, RlpEncodable, RlpDecodable, PartialEq, Serialize, Deserialize)]
pub struct BlobHeaderV2 {
    pub version: u16,
    pub quorum_numbers: Bytes,
    pub commitment: BlobCommitment,
    pub payment_header_hash: [u8; 32],
}

impl BlobHeaderV2 {
    pub fn to_sol(&self) -> sol_struct::BlobHeaderV2 {
        sol_struct::BlobHeaderV2 {
            version: self.version,
            quorumNumbers: self.quorum_numbers.clone(),
            paymentHeaderHash: FixedBytes::<32>(self.payment_header_hash),
            commitment: self.commitment.to_sol(),
        }
    }
}

#[derive(Debug, Clone, Default, RlpEncodable, RlpDecodable, PartialEq, Serialize, Deserialize)]
pub struct BlobCertificate {
    pub blob_header: BlobHeaderV2,
    pub signature: Bytes,
    pub relay_keys: Vec<u32>,
}

impl BlobCertificate {
    pub fn to_sol(&self) -> sol_struct::BlobCertificate {
        sol_struct::BlobCertificate {
            signature: self.signature.clone(),
            relayKeys: self.relay_keys.clone(),
            blobHeader: self.blob_header.to_sol(),
        }
    }
}

/// BlobInclusionInfo proves that a blob certificate is a leaf of the batch merkle tree.
#[derive(Debug, Clone, Default, RlpEncodable, RlpDecodable, PartialEq, Serialize, Deserialize)]
pub struct BlobInclusionInfo {
    pub blob_certificate: BlobCertificate,
    pub blob_index: u32,
    pub inclusion_proof: Bytes,
}

impl BlobInclusionInfo {
    pub fn to_sol(&self) -> sol_struct::BlobInclusionInfo {
        sol_struct::BlobInclusionInfo {
            blobIndex: self.blob_index,
            inclusionProof: self.inclusion_proof.clone(),
            blobCertificate: self.blob_certificate.to_sol(),
        }
    }
}

/// BatchHeaderV2 pins the batch root and the reference block number (RBN) at which operator
/// stakes were snapshotted when the batch was signed.
/// <https://github.com/Layr-Labs/eigenda/blob/510291b9be38cacbed8bc62125f6f9a14bd604e4/contracts/src/core/libraries/v2/EigenDATypesV2.sol#L47>
#[derive(Debug, Clone, Default, RlpEncodable, RlpDecodable, PartialEq, Serialize, Deserialize)]
pub struct BatchHeaderV2 {
    pub batch_root: [u8; 32],
    pub reference_block_number: u32,
}

impl BatchHeaderV2 {
    pub fn to_sol(&self) -> sol_struct::BatchHeaderV2 {
        sol_struct::BatchHeaderV2 {
            batchRoot: FixedBytes::<32>(self.batch_root),
            referenceBlockNumber: self.reference_block_number,
        }
    }
}

/// NonSignerStakesAndSignature carries the aggregate signature and the indices the
/// verifier contract needs to look up non-signer stakes at the RBN.
#[derive(Debug, Clone, Default, RlpEncodable, RlpDecodable, PartialEq, Serialize, Deserialize)]
pub struct NonSignerStakesAndSignature {
    pub non_signer_quorum_bitmap_indices: Vec<u32>,
    pub non_signer_pubkeys: Vec<G1Point>,
    pub quorum_apks: Vec<G1Point>,
    pub apk_g2: G2Point,
    pub sigma: G1Point,
    pub quorum_apk_indices: Vec<u32>,
    pub total_stake_indices: Vec<u32>,
    pub non_signer_stake_indices: Vec<Vec<u32>>,
}

impl NonSignerStakesAndSignature {
    pub fn to_sol(&self) -> sol_struct::NonSignerStakesAndSignature {
        sol_struct::NonSignerStakesAndSignature {
            nonSignerQuorumBitmapIndices: self.non_signer_quorum_bitmap_indices.clone(),
            nonSignerPubkeys: self.non_signer_pubkeys.iter().map(G1Point::to_sol).collect(),
            quorumApks: self.quorum_apks.iter().map(G1Point::to_sol).collect(),
            apkG2: self.apk_g2.to_sol(),
            sigma: self.sigma.to_sol(),
            quorumApkIndices: self.quorum_apk_indices.clone(),
            totalStakeIndices: self.total_stake_indices.clone(),
            nonSignerStakeIndices: self.non_signer_stake_indices.clone(),
        }
    }
}
