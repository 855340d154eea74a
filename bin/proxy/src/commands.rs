//! Subcommand implementations.
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;

use alloy_primitives::{Bytes, B256};
use alloy_provider::{Provider, ProviderBuilder};
use anyhow::{anyhow, bail, Context, Result};
use eigenda_cert::{
    decode_arbitrum, decode_arbitrum_sequencer_msg, encode_arbitrum, Commitment, CommitmentMode,
    VersionByte, VersionedCert, ARB_MESSAGE_HEADER_LEN,
};
use eigenda_cert_verifier::{
    verify_rbn_recency, CertVerifier, EthCertVerifier, StaticCertVerifierAddress,
};
use eigenda_proxy_store::{
    DispersalBackendCell, EigenDABackend, EigenDAManager, EigenDAStore, GetOpts, LegacyMemStore,
    MemStore, MemoryStore, SecondaryManager, SecondaryStore,
};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::cfg::{CheckCertArgs, MemstoreRoundtripArgs, ParseArgs, ParseMode, VerifyRecencyArgs};

/// What a commitment carries, as printed by the `parse` subcommand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitmentSummary {
    /// Framing bytes in front of the version byte, or of the hash for keccak commitments.
    pub prefix: Vec<u8>,
    pub version: Option<VersionByte>,
    pub reference_block_number: Option<u64>,
    /// Cert digest, or the preimage hash of a keccak commitment.
    pub digest: B256,
    pub cert: Option<VersionedCert>,
}

impl fmt::Display for CommitmentSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "prefix:  0x{}", hex::encode(&self.prefix))?;
        match self.version {
            Some(version) => writeln!(f, "version: {version}")?,
            None => writeln!(f, "version: none (keccak256 commitment)")?,
        }
        if let Some(rbn) = self.reference_block_number {
            writeln!(f, "rbn:     {rbn}")?;
        }
        write!(f, "digest:  {}", self.digest)
    }
}

pub fn decode_hex(input: &str) -> Result<Vec<u8>> {
    hex::decode(input.trim().trim_start_matches("0x")).with_context(|| format!("invalid hex commitment {input:?}"))
}

fn commitment_mode(mode: ParseMode) -> Option<CommitmentMode> {
    match mode {
        ParseMode::Standard => Some(CommitmentMode::Standard),
        ParseMode::OptimismKeccak256 => Some(CommitmentMode::OptimismKeccak256),
        ParseMode::OptimismGeneric => Some(CommitmentMode::OptimismGeneric),
        ParseMode::Arbitrum | ParseMode::ArbitrumSequencerMsg => None,
    }
}

/// Decodes `data` in `mode`. The rbn is only reported for certs that decode into a V3 cert.
pub fn summarize(mode: ParseMode, data: &[u8]) -> Result<CommitmentSummary> {
    let (prefix, commitment) = match mode {
        ParseMode::Arbitrum => {
            let cert = decode_arbitrum(data)?;
            (data[..1].to_vec(), Commitment::Cert(cert))
        }
        ParseMode::ArbitrumSequencerMsg => {
            let cert = decode_arbitrum_sequencer_msg(data)?;
            (data[..=ARB_MESSAGE_HEADER_LEN].to_vec(), Commitment::Cert(cert))
        }
        mode => {
            let mode = commitment_mode(mode).ok_or_else(|| anyhow!("unreachable mode {mode:?}"))?;
            let commitment = mode.decode(data)?;
            let prefix_len = match &commitment {
                Commitment::Cert(cert) => data.len() - cert.serialized_cert.len() - 1,
                Commitment::Keccak256(_) => 1,
            };
            (data[..prefix_len].to_vec(), commitment)
        }
    };

    Ok(match commitment {
        Commitment::Keccak256(hash) => CommitmentSummary {
            prefix,
            version: None,
            reference_block_number: None,
            digest: hash,
            cert: None,
        },
        Commitment::Cert(cert) => CommitmentSummary {
            prefix,
            version: Some(cert.version),
            reference_block_number: cert.decode_v3().ok().map(|c| c.reference_block_number()),
            digest: cert.digest(),
            cert: Some(cert),
        },
    })
}

pub fn parse(args: &ParseArgs) -> Result<()> {
    let data = decode_hex(&args.commitment)?;
    if data.is_empty() {
        bail!("empty commitment");
    }
    println!("{}", summarize(args.mode, &data)?);
    Ok(())
}

pub fn verify_recency(args: &VerifyRecencyArgs) -> Result<()> {
    verify_rbn_recency(args.cert_rbn, args.l1_inclusion_block, args.window)?;
    println!(
        "cert rbn {} is recent enough for l1 inclusion block {} (window {})",
        args.cert_rbn, args.l1_inclusion_block, args.window
    );
    Ok(())
}

pub async fn check_cert(args: &CheckCertArgs) -> Result<()> {
    let data = decode_hex(&args.commitment)?;
    if data.is_empty() {
        bail!("empty commitment");
    }
    let cert = summarize(args.mode, &data)?
        .cert
        .ok_or_else(|| anyhow!("keccak256 commitments carry no cert"))?;
    let cert = cert.decode_v3()?;

    let provider = ProviderBuilder::new().connect_http(args.eth_rpc.clone());
    let address = match args.cert_verifier_address {
        Some(address) => StaticCertVerifierAddress(address),
        None => {
            let chain_id = provider.get_chain_id().await?;
            StaticCertVerifierAddress::eigenlabs_router(chain_id)?
        }
    };
    info!(target: "eigenda_proxy", "calling checkDACert on {}", address.0);

    let verifier = EthCertVerifier::new(provider, address, args.timeout());
    verifier.check_da_cert(&cert).await?;
    println!("cert {} is valid", VersionedCert::from_v3(&cert).digest());
    Ok(())
}

fn memstore_manager(args: &MemstoreRoundtripArgs) -> Result<EigenDAManager> {
    let v1: Arc<dyn EigenDAStore> = Arc::new(LegacyMemStore::new(args.memstore_config()));
    let v2: Arc<dyn EigenDAStore> = Arc::new(MemStore::new(args.memstore_config()));

    let caches: Vec<Arc<dyn SecondaryStore>> = match args.cache_entries {
        Some(entries) => {
            let entries =
                NonZeroUsize::new(entries).ok_or_else(|| anyhow!("cache entries must not be 0"))?;
            vec![Arc::new(MemoryStore::new(entries))]
        }
        None => Vec::new(),
    };
    let secondary = SecondaryManager::new(caches, Vec::new(), args.secondary_config());

    Ok(EigenDAManager::new(
        Some(v1),
        Some(v2),
        secondary,
        Arc::new(DispersalBackendCell::new(args.backend)),
    )?)
}

/// Stores the payload and reads it back, returning the commitment.
pub async fn memstore_roundtrip(args: &MemstoreRoundtripArgs) -> Result<Bytes> {
    let manager = memstore_manager(args)?;
    let payload = args.payload.as_bytes();
    let cancel = CancellationToken::new();

    let commitment = match commitment_mode(args.mode) {
        Some(mode) => {
            let commitment = manager.put(payload, mode, &cancel).await?;
            let read = manager.get(&commitment, mode, GetOpts::default()).await?;
            ensure_same(payload, &read)?;
            commitment
        }
        None => {
            if args.backend != EigenDABackend::V2 {
                bail!("arbitrum commitments require the v2 backend");
            }
            let cert = manager.put_versioned(payload, &cancel).await?;
            let commitment = encode_arbitrum(&cert);
            let read = manager
                .get_versioned(&decode_arbitrum(&commitment)?, GetOpts::default())
                .await?;
            ensure_same(payload, &read)?;
            commitment
        }
    };
    info!(target: "eigenda_proxy", "round trip of {} bytes through {} memstore succeeded", payload.len(), args.backend);
    Ok(commitment)
}

fn ensure_same(expected: &[u8], actual: &[u8]) -> Result<()> {
    if expected != actual {
        bail!(
            "read back 0x{} instead of 0x{}",
            hex::encode(actual),
            hex::encode(expected)
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    use crate::cfg::{Command, ProxyCli};

    fn roundtrip_args(argv: &[&str]) -> MemstoreRoundtripArgs {
        let mut full = vec!["eigenda-proxy", "memstore-roundtrip"];
        full.extend_from_slice(argv);
        match ProxyCli::parse_from(full).command {
            Command::MemstoreRoundtrip(args) => args,
            _ => panic!("expected memstore-roundtrip"),
        }
    }

    #[tokio::test]
    async fn test_memstore_roundtrip_then_parse() {
        struct Case {
            argv: Vec<&'static str>,
            mode: ParseMode,
            prefix: Vec<u8>,
            version: VersionByte,
        }
        let cases = [
            Case {
                argv: vec!["my-eigenda-payload"],
                mode: ParseMode::Standard,
                prefix: vec![],
                version: VersionByte::V2,
            },
            Case {
                argv: vec!["--backend", "v1", "my-eigenda-payload"],
                mode: ParseMode::Standard,
                prefix: vec![],
                version: VersionByte::V0,
            },
            Case {
                argv: vec!["--mode", "optimism_generic", "--cache-entries", "4", "my-eigenda-payload"],
                mode: ParseMode::OptimismGeneric,
                prefix: vec![0x01, 0x00],
                version: VersionByte::V2,
            },
            Case {
                argv: vec!["--mode", "arbitrum", "my-eigenda-payload"],
                mode: ParseMode::Arbitrum,
                prefix: vec![0x01],
                version: VersionByte::V2,
            },
        ];
        for case in cases {
            let commitment = memstore_roundtrip(&roundtrip_args(&case.argv)).await.unwrap();
            let summary = summarize(case.mode, &commitment).unwrap();
            assert_eq!(summary.prefix, case.prefix);
            assert_eq!(summary.version, Some(case.version));
            assert_eq!(
                summary.reference_block_number.is_some(),
                case.version != VersionByte::V0
            );
        }
    }

    #[tokio::test]
    async fn test_keccak_roundtrip_needs_cache() {
        let args = roundtrip_args(&["--mode", "optimism_keccak256", "preimage"]);
        assert!(memstore_roundtrip(&args).await.is_err());

        let args = roundtrip_args(&["--mode", "optimism_keccak256", "--cache-entries", "2", "preimage"]);
        let commitment = memstore_roundtrip(&args).await.unwrap();
        let summary = summarize(ParseMode::OptimismKeccak256, &commitment).unwrap();
        assert_eq!(summary.prefix, vec![0x00]);
        assert_eq!(summary.version, None);
        assert_eq!(summary.digest, alloy_primitives::keccak256(b"preimage"));
    }

    #[test]
    fn test_summarize_sequencer_msg() {
        let cert = VersionedCert::new(VersionByte::V0, vec![7u8; 40]);
        let mut msg = vec![0xaa; ARB_MESSAGE_HEADER_LEN];
        msg.extend_from_slice(&encode_arbitrum(&cert));

        let summary = summarize(ParseMode::ArbitrumSequencerMsg, &msg).unwrap();
        assert_eq!(summary.prefix.len(), ARB_MESSAGE_HEADER_LEN + 1);
        assert_eq!(summary.digest, cert.digest());
        assert!(summary.reference_block_number.is_none());
        assert!(summary.to_string().contains("version: "));
    }

    #[test]
    fn test_decode_hex() {
        assert_eq!(decode_hex("0x0102").unwrap(), vec![1, 2]);
        assert_eq!(decode_hex("0102\n").unwrap(), vec![1, 2]);
        assert!(decode_hex("0xzz").is_err());
    }
}
