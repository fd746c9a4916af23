//! Deployment output written by the contract deploy script.
//!
//! The deploy task stores the token address in `contract-address.json`:
//!
//! ```json
//! { "Token": "0x5FbDB2315678afecb367f032d93F642f64180aa3" }
//! ```

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Addresses of the deployed contracts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractAddresses {
    /// ERC20 token contract
    #[serde(rename = "Token")]
    pub token: Address,
}

impl ContractAddresses {
    /// Load addresses from a deployment json file.
    pub fn from_file(path: impl AsRef<Path>) -> eyre::Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| eyre::eyre!("Failed to read {}: {}", path.display(), e))?;

        Self::from_json(&contents)
    }

    /// Parse addresses from deployment json.
    pub fn from_json(contents: &str) -> eyre::Result<Self> {
        let addresses: Self = serde_json::from_str(contents)?;
        if addresses.token == Address::ZERO {
            eyre::bail!("Token address must not be zero");
        }

        Ok(addresses)
    }
}
