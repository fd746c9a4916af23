//! Network configuration for wallet sessions.
//!
//! Provides the chain id and display name of each supported network. The
//! session manager refuses to connect when the wallet reports a different
//! chain.

use serde::{Deserialize, Serialize};

/// Network type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkType {
    /// Hardhat node on localhost:8545
    Localhost,
    Sepolia,
    Mainnet,
}

/// Network a session is expected to be connected to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Network type
    pub network_type: NetworkType,
    /// Human readable name, used in network error messages
    pub name: String,
    /// Chain ID the wallet must report
    pub chain_id: u64,
    /// Default RPC endpoint
    pub rpc_url: String,
    /// Block time in seconds
    pub block_time_secs: u64,
}

impl NetworkConfig {
    /// Hardhat network configuration.
    ///
    /// See https://docs.metamask.io/guide/ethereum-provider.html#properties
    /// for the list of network ids.
    pub fn localhost() -> Self {
        Self {
            network_type: NetworkType::Localhost,
            name: "Localhost:8545".to_string(),
            chain_id: 1337,
            rpc_url: "http://127.0.0.1:8545".to_string(),
            block_time_secs: 1,
        }
    }

    /// Ethereum Sepolia testnet configuration.
    pub fn sepolia() -> Self {
        Self {
            network_type: NetworkType::Sepolia,
            name: "Sepolia".to_string(),
            chain_id: 11155111,
            rpc_url: "https://ethereum-sepolia-rpc.publicnode.com".to_string(),
            block_time_secs: 12,
        }
    }

    /// Ethereum mainnet configuration.
    pub fn mainnet() -> Self {
        Self {
            network_type: NetworkType::Mainnet,
            name: "Ethereum Mainnet".to_string(),
            chain_id: 1,
            rpc_url: "https://ethereum-rpc.publicnode.com".to_string(),
            block_time_secs: 12,
        }
    }

    /// Create configuration from network type.
    pub fn from_network_type(network_type: NetworkType) -> Self {
        match network_type {
            NetworkType::Localhost => Self::localhost(),
            NetworkType::Sepolia => Self::sepolia(),
            NetworkType::Mainnet => Self::mainnet(),
        }
    }

    /// Message shown when the wallet is on another chain.
    pub fn wrong_network_message(&self) -> String {
        format!(
            "Please connect your wallet to {} (chain id {})",
            self.name, self.chain_id
        )
    }
}

/// Builder for custom network configurations.
#[derive(Debug, Clone)]
pub struct NetworkConfigBuilder {
    config: NetworkConfig,
}

impl NetworkConfigBuilder {
    /// Start from the defaults of a network type.
    pub fn new(network_type: NetworkType) -> Self {
        Self {
            config: NetworkConfig::from_network_type(network_type),
        }
    }

    /// Override the expected chain id.
    ///
    /// Hardhat nodes started without a custom config report 31337.
    pub const fn chain_id(mut self, chain_id: u64) -> Self {
        self.config.chain_id = chain_id;
        self
    }

    /// Override the RPC endpoint.
    pub fn rpc_url(mut self, rpc_url: impl Into<String>) -> Self {
        self.config.rpc_url = rpc_url.into();
        self
    }

    /// Override the display name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    /// Build the network configuration.
    pub fn build(self) -> NetworkConfig {
        self.config
    }
}
