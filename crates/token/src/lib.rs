//! Token reads for the active session.
//!
//! This crate provides the [`TokenReader`]: token metadata fetched once per
//! token, the balance of the active account, a background balance poller
//! and a scan of recent `Transfer` events.

pub mod history;
pub mod poller;
pub mod reader;

use alloy_primitives::{Address, U256};
use client::WalletError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use poller::spawn_balance_poller;
pub use reader::TokenReader;

/// Immutable token metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenMetadata {
    pub name: String,
    pub symbol: String,
}

/// A token balance at a specific point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    /// The address holding the balance
    pub holder: Address,
    /// The token contract
    pub token: Address,
    /// The balance amount
    pub amount: U256,
}

/// Last fetched values, observable through [`TokenReader::subscribe`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenState {
    pub metadata: Option<TokenMetadata>,
    pub balance: Option<Balance>,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// A read against the token contract failed. Reads are not retried.
    #[error("Failed to read {method} from token contract: {source}")]
    ContractRead {
        method: &'static str,
        source: WalletError,
    },
}
