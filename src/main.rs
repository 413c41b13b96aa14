//! Ledger client node - runs an in-memory ledger behind the HTTP node service
//!
//! The ledger is bootstrapped from the configured runtime jar; clients reach it
//! through `RemoteLedger`.

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};

use ledger_client::api;
use ledger_client::config::Settings;
use ledger_client::metrics::MetricsServer;
use ledger_client::{LedgerEndpoint, NodeBootstrapper};

/// Stands in for a runtime jar when none is configured
const PLACEHOLDER_RUNTIME: &[u8] = b"ledger-client placeholder runtime";

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    init_logging();

    info!("Starting ledger client node v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let settings = Settings::load()?;
    let consensus = settings.consensus()?;
    info!(
        "Loaded configuration for chain {:?} ({})",
        consensus.chain_id, consensus.signature
    );

    let runtime_jar = match &settings.node.runtime_jar {
        Some(path) => std::fs::read(path)
            .with_context(|| format!("Failed to read runtime jar: {:?}", path))?,
        None => PLACEHOLDER_RUNTIME.to_vec(),
    };

    // Bootstrap the ledger
    let bootstrapper = NodeBootstrapper::for_consensus(&consensus);
    let (ledger, origin) = bootstrapper
        .start_in_memory(
            consensus,
            runtime_jar,
            u128::from(settings.node.green_amount),
            u128::from(settings.node.red_amount),
        )
        .await
        .context("Failed to bootstrap the ledger")?;
    info!(
        "Gamete {} with public key {}",
        origin.reference(),
        origin.account.public_key.to_base64()
    );

    let endpoint: Arc<dyn LedgerEndpoint> = ledger;

    // Start node service
    let api_handle = tokio::spawn({
        let config = settings.api.clone();
        let endpoint = endpoint.clone();
        async move {
            if let Err(e) = api::run_server(config, endpoint).await {
                error!("Node service error: {}", e);
            }
        }
    });

    // Start metrics server
    let metrics_handle = if settings.metrics.enabled {
        let server = MetricsServer::new(settings.metrics.port);
        Some(tokio::spawn(async move {
            if let Err(e) = server.run().await {
                error!("Metrics server error: {}", e);
            }
        }))
    } else {
        None
    };

    info!("Ledger client node is running");
    info!("Node service: http://{}:{}", settings.api.host, settings.api.port);
    if settings.metrics.enabled {
        info!("Metrics: http://0.0.0.0:{}/metrics", settings.metrics.port);
    }

    // Wait for shutdown signal
    shutdown_signal().await;

    info!("Shutdown signal received, stopping...");

    api_handle.abort();
    if let Some(h) = metrics_handle {
        h.abort();
    }

    info!("Ledger client node stopped");
    Ok(())
}

fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,ledger_client=debug,hyper=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
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
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
