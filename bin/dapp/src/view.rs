use alloy_primitives::{Address, TxHash, U256};
use session::Session;
use std::fmt;
use token::{TokenMetadata, TokenState};
use transfer::TransferAttempt;

/// What the user is shown, derived from component state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum View {
    /// No wallet available, the user has to install one
    NoWallet,
    /// Waiting for the user to connect
    Connect { network_error: Option<String> },
    /// Connected, token data not loaded yet
    Loading,
    Ready {
        address: Address,
        metadata: TokenMetadata,
        balance: U256,
        /// Transaction waiting to be mined
        pending_tx: Option<TxHash>,
        error_message: Option<String>,
        /// Transfers are offered only with a positive balance
        can_transfer: bool,
    },
}

impl View {
    pub fn new(
        has_wallet: bool,
        session: &Session,
        token: &TokenState,
        attempt: Option<&TransferAttempt>,
    ) -> Self {
        if !has_wallet {
            return Self::NoWallet;
        }

        let Some(address) = session.address else {
            return Self::Connect {
                network_error: session.network_error.clone(),
            };
        };

        let (Some(metadata), Some(balance)) = (&token.metadata, &token.balance) else {
            return Self::Loading;
        };

        // A balance read for a previous account is not shown.
        if balance.holder != address {
            return Self::Loading;
        }

        Self::Ready {
            address,
            metadata: metadata.clone(),
            balance: balance.amount,
            pending_tx: attempt.and_then(|a| a.tx_hash),
            error_message: attempt.and_then(|a| a.error.as_ref().map(ToString::to_string)),
            can_transfer: !balance.amount.is_zero(),
        }
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoWallet => write!(
                f,
                "No wallet detected. Configure a private key or a signer url."
            ),
            Self::Connect { network_error } => {
                if let Some(message) = network_error {
                    writeln!(f, "{message}")?;
                }
                write!(f, "Please connect to your wallet.")
            }
            Self::Loading => write!(f, "Loading..."),
            Self::Ready {
                address,
                metadata,
                balance,
                pending_tx,
                error_message,
                can_transfer,
            } => {
                writeln!(f, "{} ({})", metadata.name, metadata.symbol)?;
                write!(f, "Welcome {address}, you have {balance} {}.", metadata.symbol)?;
                if let Some(tx_hash) = pending_tx {
                    write!(f, "\nWaiting for transaction {tx_hash} to be mined")?;
                }
                if let Some(message) = error_message {
                    write!(f, "\nError sending transaction: {message}")?;
                }
                if !can_transfer {
                    write!(f, "\nYou don't have tokens to transfer")?;
                }
                Ok(())
            }
        }
    }
}
