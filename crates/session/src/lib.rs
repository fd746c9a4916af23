//! Wallet session management.
//!
//! The [`SessionManager`] is the single writer of the [`Session`]: which
//! account the dApp acts for and whether the wallet sits on the wrong network.
//! Consumers observe the session through a `watch` channel and never mutate
//! it.

pub mod manager;

use alloy_primitives::Address;
use client::WalletError;
use thiserror::Error;

pub use manager::SessionManager;

/// Connected-account state of the dApp.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    /// Active wallet account, unset until a connection succeeds
    pub address: Option<Address>,
    /// Message shown while the wallet is connected to the wrong network
    pub network_error: Option<String>,
}

impl Session {
    pub const fn is_connected(&self) -> bool {
        self.address.is_some()
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// No wallet capability is available; the user has to install one
    #[error("No wallet detected")]
    NoWallet,

    /// The user declined the account access request
    #[error("User rejected the connection request")]
    UserRejected,

    /// Access was granted to zero accounts
    #[error("Wallet did not expose any account")]
    NoAccounts,

    /// The wallet is connected to another chain
    #[error("Wallet is on chain {actual}, expected chain {expected}")]
    WrongNetwork { expected: u64, actual: u64 },

    #[error(transparent)]
    Wallet(#[from] WalletError),
}
