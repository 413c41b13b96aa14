//! Prometheus metrics for monitoring
//!
//! Exposes metrics for:
//! - Transaction submission outcomes and latency
//! - Nonce reconciliations
//! - Safe gas price
//! - Provisioned accounts

use crate::error::{ClientError, ClientResult};

use axum::{http::StatusCode, routing::get, Router};
use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_gauge, register_histogram_vec, register_int_counter,
    CounterVec, Encoder, Gauge, HistogramVec, IntCounter, TextEncoder,
};
use std::net::SocketAddr;
use tracing::{error, info};

lazy_static! {
    // Transaction metrics
    pub static ref TX_SUBMITTED: CounterVec = register_counter_vec!(
        "ledger_client_transactions_submitted_total",
        "Transactions included with a successful outcome",
        &["kind"]
    ).expect("metric can be registered");

    pub static ref TX_REJECTED: CounterVec = register_counter_vec!(
        "ledger_client_transactions_rejected_total",
        "Transactions refused before inclusion",
        &["kind"]
    ).expect("metric can be registered");

    pub static ref TX_FAILED: CounterVec = register_counter_vec!(
        "ledger_client_transactions_failed_total",
        "Transactions included whose execution failed",
        &["kind"]
    ).expect("metric can be registered");

    pub static ref TX_LATENCY: HistogramVec = register_histogram_vec!(
        "ledger_client_submission_latency_seconds",
        "Time from nonce reservation to the definitive answer",
        &["kind"],
        vec![0.001, 0.005, 0.025, 0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]
    ).expect("metric can be registered");

    // Nonce metrics
    pub static ref NONCE_RECONCILIATIONS: IntCounter = register_int_counter!(
        "ledger_client_nonce_reconciliations_total",
        "Times a local nonce was re-read from the ledger"
    ).expect("metric can be registered");

    // Gas metrics
    pub static ref SAFE_GAS_PRICE: Gauge = register_gauge!(
        "ledger_client_safe_gas_price",
        "Last safe gas price computed"
    ).expect("metric can be registered");

    // Provisioning metrics
    pub static ref ACCOUNTS_CREATED: IntCounter = register_int_counter!(
        "ledger_client_accounts_created_total",
        "Accounts created by the provisioner"
    ).expect("metric can be registered");
}

/// Prometheus metrics server
pub struct MetricsServer {
    port: u16,
}

impl MetricsServer {
    pub fn new(port: u16) -> Self {
        Self { port }
    }

    pub fn router() -> Router {
        Router::new().route("/metrics", get(metrics_handler))
    }

    pub async fn run(&self) -> ClientResult<()> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        info!("Starting metrics server on {}", addr);

        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| ClientError::Internal(format!("cannot bind {}: {}", addr, e)))?;
        axum::serve(listener, Self::router())
            .await
            .map_err(|e| ClientError::Internal(format!("metrics server failed: {}", e)))
    }
}

async fn metrics_handler() -> Result<String, StatusCode> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).map_err(|e| {
        error!("Failed to encode metrics: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    String::from_utf8(buffer).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

// Helper functions to record metrics

pub fn record_tx_submitted(kind: &str) {
    TX_SUBMITTED.with_label_values(&[kind]).inc();
}

pub fn record_tx_rejected(kind: &str) {
    TX_REJECTED.with_label_values(&[kind]).inc();
}

pub fn record_tx_failed(kind: &str) {
    TX_FAILED.with_label_values(&[kind]).inc();
}

pub fn record_tx_latency(kind: &str, latency_secs: f64) {
    TX_LATENCY.with_label_values(&[kind]).observe(latency_secs);
}

pub fn record_nonce_reconciliation() {
    NONCE_RECONCILIATIONS.inc();
}

pub fn record_gas_price(price: u64) {
    SAFE_GAS_PRICE.set(price as f64);
}

pub fn record_accounts_created(count: usize) {
    ACCOUNTS_CREATED.inc_by(count as u64);
}
