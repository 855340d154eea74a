pub mod cfg;

pub mod commands;

use tracing_subscriber::{filter::LevelFilter, prelude::*, EnvFilter};

pub fn init_tracing_subscriber(verbosity_level: u8) -> anyhow::Result<()> {
    let level = match verbosity_level {
        0 => LevelFilter::INFO,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };

    let mut filter_builder = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env()?;

    // The http crates are extremely verbose below info and drown out the proxy's own logs.
    filter_builder = filter_builder
        .add_directive("hyper_util=info".parse()?)
        .add_directive("reqwest=info".parse()?)
        .add_directive("alloy_rpc_client=info".parse()?)
        .add_directive("alloy_transport_http=info".parse()?);

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(filter_builder)
        .init();
    Ok(())
}
