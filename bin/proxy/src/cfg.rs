use std::time::Duration;

use alloy_primitives::Address;
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use eigenda_proxy_store::{EigenDABackend, MemstoreConfig, SecondaryConfig};
use url::Url;

/// Command line tooling around the EigenDA proxy storage core.
#[derive(Parser, Debug, Clone)]
#[command(name = "eigenda-proxy", version)]
pub struct ProxyCli {
    /// Verbosity level (0-2)
    #[arg(long, short, action = ArgAction::Count, global = true)]
    pub v: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Decode a hex commitment and print what it carries.
    Parse(ParseArgs),
    /// Check a cert's reference block number against its L1 inclusion block.
    VerifyRecency(VerifyRecencyArgs),
    /// Call checkDACert for the cert inside a commitment.
    CheckCert(CheckCertArgs),
    /// Put then get a payload against the in-memory EigenDA emulation.
    MemstoreRoundtrip(MemstoreRoundtripArgs),
}

/// Wire layouts a commitment can be parsed from.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    Standard,
    #[value(name = "optimism_keccak256")]
    OptimismKeccak256,
    #[value(name = "optimism_generic")]
    OptimismGeneric,
    /// Arbitrum custom da commitment, without the sequencer message header
    Arbitrum,
    /// Arbitrum sequencer message, header included
    ArbitrumSequencerMsg,
}

#[derive(Args, Debug, Clone)]
pub struct ParseArgs {
    #[arg(long, value_enum, default_value = "standard", env = "EIGENDA_PROXY_COMMITMENT_MODE")]
    pub mode: ParseMode,

    /// Hex encoded commitment, with or without 0x prefix.
    pub commitment: String,
}

#[derive(Args, Debug, Clone)]
pub struct VerifyRecencyArgs {
    #[arg(long)]
    pub cert_rbn: u64,

    #[arg(long)]
    pub l1_inclusion_block: u64,

    /// 0 skips the check.
    #[arg(long, default_value_t = 0, env = "EIGENDA_PROXY_RBN_RECENCY_WINDOW_SIZE")]
    pub window: u64,
}

#[derive(Args, Debug, Clone)]
pub struct CheckCertArgs {
    /// URL of the Ethereum RPC endpoint.
    #[arg(long, env = "EIGENDA_PROXY_ETH_RPC")]
    pub eth_rpc: Url,

    /// Verifier or router to call. Defaults to the EigenLabs router of the RPC's chain.
    #[arg(long, env = "EIGENDA_PROXY_CERT_VERIFIER_ADDRESS")]
    pub cert_verifier_address: Option<Address>,

    #[arg(long, default_value_t = 5, env = "EIGENDA_PROXY_CONTRACT_CALL_TIMEOUT_SECS")]
    pub timeout_secs: u64,

    #[arg(long, value_enum, default_value = "standard", env = "EIGENDA_PROXY_COMMITMENT_MODE")]
    pub mode: ParseMode,

    pub commitment: String,
}

impl CheckCertArgs {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Args, Debug, Clone)]
pub struct MemstoreRoundtripArgs {
    #[arg(long, default_value = "v2", env = "EIGENDA_PROXY_DISPERSAL_BACKEND")]
    pub backend: EigenDABackend,

    #[arg(long, value_enum, default_value = "standard", env = "EIGENDA_PROXY_COMMITMENT_MODE")]
    pub mode: ParseMode,

    #[arg(long, default_value_t = 0, env = "EIGENDA_PROXY_MEMSTORE_PUT_LATENCY_MS")]
    pub put_latency_ms: u64,

    #[arg(long, default_value_t = 0, env = "EIGENDA_PROXY_MEMSTORE_GET_LATENCY_MS")]
    pub get_latency_ms: u64,

    /// Also keep payloads in an in-memory LRU cache of this many entries.
    #[arg(long, env = "EIGENDA_PROXY_CACHE_ENTRIES")]
    pub cache_entries: Option<usize>,

    #[arg(long, default_value_t = false, env = "EIGENDA_PROXY_ERROR_ON_SECONDARY_INSERT_FAILURE")]
    pub error_on_secondary_insert_failure: bool,

    #[arg(long, default_value_t = 0, env = "EIGENDA_PROXY_ASYNC_PUT_WORKERS")]
    pub async_put_workers: usize,

    /// Payload to store, as utf8 text.
    pub payload: String,
}

impl MemstoreRoundtripArgs {
    pub fn memstore_config(&self) -> MemstoreConfig {
        MemstoreConfig {
            put_latency: Duration::from_millis(self.put_latency_ms),
            get_latency: Duration::from_millis(self.get_latency_ms),
            ..Default::default()
        }
    }

    pub fn secondary_config(&self) -> SecondaryConfig {
        SecondaryConfig {
            error_on_secondary_insert_failure: self.error_on_secondary_insert_failure,
            async_put_workers: self.async_put_workers,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cli() {
        let cli = ProxyCli::parse_from([
            "eigenda-proxy",
            "-vv",
            "parse",
            "--mode",
            "optimism_generic",
            "0x01000201",
        ]);
        assert_eq!(cli.v, 2);
        let Command::Parse(args) = cli.command else {
            panic!("expected parse");
        };
        assert_eq!(args.mode, ParseMode::OptimismGeneric);

        let cli = ProxyCli::parse_from(["eigenda-proxy", "memstore-roundtrip", "--backend", "v1", "hi"]);
        let Command::MemstoreRoundtrip(args) = cli.command else {
            panic!("expected memstore-roundtrip");
        };
        assert_eq!(args.backend, EigenDABackend::V1);
        assert_eq!(args.memstore_config().put_latency, Duration::ZERO);

        assert!(ProxyCli::try_parse_from(["eigenda-proxy", "parse", "--mode", "keccak", "0x00"]).is_err());
        assert!(ProxyCli::try_parse_from([
            "eigenda-proxy",
            "memstore-roundtrip",
            "--backend",
            "v3",
            "hi"
        ])
        .is_err());
    }
}
