//! Solidity types shared between the EigenDA cert encodings and the on-chain cert verifier.
//!
//! Struct layouts follow `EigenDATypesV2.sol` and `EigenDACertTypes.sol`. Only the ABI shape
//! matters here; field names are kept close to the contract sources for readability.
#![no_std]

use alloy_sol_types::sol;

sol! {
    struct BatchHeaderV2 {
        bytes32 batchRoot;
        uint32 referenceBlockNumber;
    }

    struct BlobInclusionInfo {
        BlobCertificate blobCertificate;
        uint32 blobIndex;
        bytes inclusionProof;
    }

    struct BlobCertificate {
        BlobHeaderV2 blobHeader;
        bytes signature;
        uint32[] relayKeys;
    }

    struct BlobHeaderV2 {
        uint16 version;
        bytes quorumNumbers;
        BlobCommitment commitment;
        bytes32 paymentHeaderHash;
    }

    struct G1Point {
        uint256 X;
        uint256 Y;
    }

    // Encoding of field elements is: X[1] * i + X[0]
    struct G2Point {
        uint256[2] X;
        uint256[2] Y;
    }

    struct BlobCommitment {
        G1Point commitment;
        G2Point lengthCommitment;
        G2Point lengthProof;
        uint32 length;
    }

    struct NonSignerStakesAndSignature {
        uint32[] nonSignerQuorumBitmapIndices;
        G1Point[] nonSignerPubkeys;
        G1Point[] quorumApks;
        G2Point apkG2;
        G1Point sigma;
        uint32[] quorumApkIndices;
        uint32[] totalStakeIndices;
        uint32[][] nonSignerStakeIndices;
    }

    /// The cert shape accepted by `checkDACert`, abi encoded as a single tuple.
    struct EigenDACertV3 {
        BatchHeaderV2 batchHeader;
        BlobInclusionInfo blobInclusionInfo;
        NonSignerStakesAndSignature nonSignerStakesAndSignature;
        bytes signedQuorumNumbers;
    }

    /// Implemented by both the router and immutable cert verifiers.
    /// <https://github.com/Layr-Labs/eigenda/blob/f5032bb8683baa2a9eff58443c013f39005d7680/contracts/src/integrations/cert/interfaces/IEigenDACertVerifierBase.sol#L11>
    interface IEigenDACertVerifierBase {
        function checkDACert(bytes calldata abiEncodedCert) external view returns (uint8 status);
    }
}
