//! Prometheus metrics for the dapp.

use alloy_primitives::U256;
use metrics::{counter, describe_counter, describe_gauge, gauge};

/// Aggregated metrics for the dapp.
///
/// Metrics are registered with the global metrics registry on creation.
#[derive(Debug, Clone)]
pub struct Metrics {
    _private: (),
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    /// Create a new metrics instance and register all metric descriptions.
    pub fn new() -> Self {
        Self::register_descriptions();
        Self { _private: () }
    }

    fn register_descriptions() {
        describe_counter!("dapp_connects_total", "Wallet connection attempts by result");
        describe_counter!("dapp_transfers_total", "Token transfers by outcome");
        describe_gauge!(
            "dapp_balance",
            "Token balance of the active account in base units"
        );
    }

    /// Record a wallet connection attempt.
    pub fn record_connect(&self, result: &'static str) {
        counter!("dapp_connects_total", "result" => result).increment(1);
    }

    /// Record the outcome of a transfer.
    pub fn record_transfer(&self, outcome: &'static str) {
        counter!("dapp_transfers_total", "outcome" => outcome).increment(1);
    }

    /// Set the balance of the active account.
    pub fn set_balance(&self, amount: U256) {
        let amount = u128::try_from(amount).unwrap_or(u128::MAX);
        gauge!("dapp_balance").set(amount as f64);
    }
}

/// Install the Prometheus metrics exporter and start the HTTP server.
///
/// Returns an error if the server fails to bind to the specified port.
pub fn install_prometheus_exporter(port: u16) -> eyre::Result<()> {
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::net::SocketAddr;

    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| eyre::eyre!("Failed to install Prometheus exporter: {}", e))?;

    Ok(())
}
