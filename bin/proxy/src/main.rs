//! Main entrypoint for the proxy binary.

use anyhow::Result;
use clap::Parser;
use eigenda_proxy::cfg::{Command, ProxyCli};
use eigenda_proxy::{commands, init_tracing_subscriber};
use tracing::{error, info};

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<()> {
    let cli = ProxyCli::parse();
    init_tracing_subscriber(cli.v)?;

    let res = match &cli.command {
        Command::Parse(args) => commands::parse(args),
        Command::VerifyRecency(args) => commands::verify_recency(args),
        Command::CheckCert(args) => commands::check_cert(args).await,
        Command::MemstoreRoundtrip(args) => commands::memstore_roundtrip(args)
            .await
            .map(|commitment| println!("0x{}", hex::encode(commitment))),
    };
    if let Err(e) = &res {
        error!(target: "eigenda_proxy", "Exited with an error: {:?}", e);
    } else {
        info!(target: "eigenda_proxy", "done");
    }
    res
}
