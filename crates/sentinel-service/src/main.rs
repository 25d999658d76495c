//! `sentineld` - the Sentinel governance substrate daemon.
//!
//! Serves the policy engine, gated-write kernel, memory store, and
//! eval/promotion/allocation workflow behind one HTTP surface.

use clap::Parser;
use sentinel_service::{SentinelConfig, Server};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Sentinel governance daemon CLI.
#[derive(Parser)]
#[command(name = "sentineld")]
#[command(about = "Sentinel governance substrate daemon", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path (TOML/YAML/JSON, extension-sniffed).
    #[arg(short, long, env = "SENTINEL_CONFIG")]
    config: Option<String>,

    /// Listen address, overrides config/file.
    #[arg(short, long, env = "SENTINEL_LISTEN_ADDR")]
    listen: Option<String>,

    /// Log level.
    #[arg(long, env = "SENTINEL_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Emit structured JSON logs instead of plain text.
    #[arg(long, env = "SENTINEL_LOG_JSON")]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| cli.log_level.clone().into());

    if cli.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    let mut config = SentinelConfig::load(cli.config.as_deref())?;

    if let Some(listen) = cli.listen {
        config.server.listen_addr = listen.parse()?;
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        listen = %config.server.listen_addr,
        "starting sentineld"
    );

    let server = Server::new(config).await?;
    server.run().await
}
