use ::config::{ContractAddresses, NetworkConfig, NetworkConfigBuilder, NetworkType};
use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use std::{
    path::{Path, PathBuf},
    time::Duration,
};

/// Top-level dapp configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Network the wallet must be connected to
    #[serde(default = "default_network")]
    pub network: NetworkType,

    /// Override of the network's chain id
    #[serde(default)]
    pub chain_id: Option<u64>,

    /// Override of the network's RPC endpoint
    #[serde(default)]
    pub rpc_url: Option<String>,

    /// Token contract address. Takes precedence over `contract_addresses_file`.
    #[serde(default)]
    pub token_address: Option<Address>,

    /// Deployment file holding the token address
    #[serde(default)]
    pub contract_addresses_file: Option<PathBuf>,

    /// Interval between balance reads of the active account
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Interval between wallet account and chain checks
    #[serde(default = "default_watch_interval_secs")]
    pub watch_interval_secs: u64,

    /// Number of blocks scanned by `history`
    #[serde(default = "default_history_lookback_blocks")]
    pub history_lookback_blocks: u64,

    /// Port of the Prometheus exporter, disabled when unset
    #[serde(default)]
    pub metrics_port: Option<u16>,
}

const fn default_network() -> NetworkType {
    NetworkType::Localhost
}

const fn default_poll_interval_secs() -> u64 {
    1
}

const fn default_watch_interval_secs() -> u64 {
    1
}

const fn default_history_lookback_blocks() -> u64 {
    10_000
}

impl Config {
    pub fn from_file(path: impl AsRef<Path>) -> eyre::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> eyre::Result<Self> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;

        Ok(config)
    }

    /// Reject zero intervals.
    fn validate(&self) -> eyre::Result<()> {
        if self.poll_interval_secs == 0 {
            eyre::bail!("poll_interval_secs must be greater than zero");
        }
        if self.watch_interval_secs == 0 {
            eyre::bail!("watch_interval_secs must be greater than zero");
        }

        Ok(())
    }

    /// Network configuration with the overrides of this file applied.
    pub fn network_config(&self) -> NetworkConfig {
        let mut builder = NetworkConfigBuilder::new(self.network);

        if let Some(chain_id) = self.chain_id {
            builder = builder.chain_id(chain_id);
        }
        if let Some(rpc_url) = &self.rpc_url {
            builder = builder.rpc_url(rpc_url.as_str());
        }

        builder.build()
    }

    /// Resolve the token contract address.
    pub fn token_address(&self) -> eyre::Result<Address> {
        if let Some(token) = self.token_address {
            return Ok(token);
        }

        match &self.contract_addresses_file {
            Some(path) => Ok(ContractAddresses::from_file(path)?.token),
            None => eyre::bail!("Either token_address or contract_addresses_file must be set"),
        }
    }

    pub const fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub const fn watch_interval(&self) -> Duration {
        Duration::from_secs(self.watch_interval_secs)
    }
}
