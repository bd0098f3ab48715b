//! Gas station service binary

use anyhow::Context;
use clap::Parser;
use gas_common::utils::logging::init_logging;
use gas_station::api::{self, AppState};
use gas_station::{DispensePolicy, Dispenser, FunderIdentity, RpcChainClient, StationConfig, StationMetrics};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};

/// Gas station CLI
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Config file path (TOML, YAML or JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Server address
    #[arg(long)]
    server_addr: Option<String>,

    /// RPC URL
    #[arg(long)]
    rpc_url: Option<String>,

    /// Dispense amount (in ether)
    #[arg(long)]
    dispense_amount: Option<String>,

    /// Already-funded threshold (in ether)
    #[arg(long)]
    threshold: Option<String>,

    /// Chain id used for signing
    #[arg(long)]
    chain_id: Option<u64>,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration: file, then environment, then CLI
    let mut config = StationConfig::load(args.config.as_deref())?;

    if let Some(addr) = args.server_addr {
        config.server_addr = addr;
    }

    if let Some(rpc_url) = args.rpc_url {
        config.rpc_url = rpc_url;
    }

    if let Some(amount) = args.dispense_amount {
        config.dispense_amount = amount;
    }

    if let Some(threshold) = args.threshold {
        config.threshold = threshold;
    }

    if let Some(chain_id) = args.chain_id {
        config.chain_id = Some(chain_id);
    }

    if args.debug {
        config.logging.level = "debug".to_string();
    }

    init_logging(&config.logging)?;

    info!("Starting Gas Station v{}", env!("CARGO_PKG_VERSION"));

    let settings = config.dispense_settings().context("Invalid dispense configuration")?;

    info!("Configuration:");
    info!("  Server address: {}", config.server_addr);
    info!("  RPC URL: {}", config.rpc_url);
    info!("  Dispense amount: {} ether", settings.amount.to_ether_string());
    info!("  Threshold: {} ether", settings.threshold.to_ether_string());
    match settings.chain_id {
        Some(id) => info!("  Chain id: {}", id),
        None => info!("  Chain id: from node"),
    }

    let identity = FunderIdentity::from_secret(config.funder_private_key.as_ref());
    if !identity.is_configured() {
        warn!("Running without a funder; /api/sendGas and /api/getAddress will report the wallet as not configured");
    }

    let client = Arc::new(RpcChainClient::new(config.rpc_url.clone(), &settings, config.rpc_timeout())?);
    let metrics = Arc::new(StationMetrics::new()?);

    let dispenser = Arc::new(Dispenser::new(
        identity,
        DispensePolicy::from(&settings),
        client.clone(),
        client,
        metrics,
        config.pending_ttl(),
    ));

    let app = api::router(AppState { dispenser }, config.cors_enabled);
    if config.cors_enabled {
        info!("CORS enabled");
    }

    let addr: SocketAddr = config
        .server_addr
        .parse()
        .with_context(|| format!("Invalid server address {}", config.server_addr))?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutting down gracefully");
    Ok(())
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C");
        },
        _ = terminate => {
            info!("Received terminate signal");
        },
    }
}
