//! Classification of wallet and provider failures.
//!
//! Wallets report failures as JSON-RPC error objects. The code identifies
//! the failure class (EIP-1193 reserves 4001 for "user rejected the
//! request") and the optional `data` object often carries a more precise
//! message than the top-level one, e.g. the revert reason of a failed gas
//! estimation.

use alloy_json_rpc::ErrorPayload;
use alloy_provider::PendingTransactionError;
use alloy_transport::TransportError;
use serde::Deserialize;
use thiserror::Error;

/// Error code a wallet returns when the user declines a request.
pub const USER_REJECTED_CODE: i64 = 4001;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WalletError {
    /// No wallet capability is available
    #[error("No wallet detected")]
    NoWallet,

    /// The wallet has not granted access to any account yet
    #[error("Wallet is not connected to an account")]
    NotConnected,

    /// Structured JSON-RPC error returned by the node or the wallet
    #[error("RPC error {code}: {message}")]
    Rpc {
        code: i64,
        message: String,
        /// `error.data.message` when present
        data_message: Option<String>,
    },

    /// Connection or decoding failure below the JSON-RPC layer
    #[error("Transport error: {0}")]
    Transport(String),

    /// Contract call could not be encoded or decoded
    #[error("Contract error: {0}")]
    Contract(String),

    /// Transaction could not be signed
    #[error("Signing error: {0}")]
    Signing(String),
}

#[derive(Debug, Deserialize)]
struct ErrorData {
    message: Option<String>,
}

impl WalletError {
    /// Build an error from a JSON-RPC error payload.
    pub fn from_payload(payload: &ErrorPayload) -> Self {
        let data_message = payload
            .try_data_as::<ErrorData>()
            .and_then(Result::ok)
            .and_then(|data| data.message);

        Self::Rpc {
            code: payload.code,
            message: payload.message.to_string(),
            data_message,
        }
    }

    /// Recover a wallet error carried inside an eyre report.
    pub fn from_report(report: eyre::Report) -> Self {
        report
            .downcast::<Self>()
            .unwrap_or_else(|report| Self::Signing(report.to_string()))
    }

    /// Returns true if the user declined the request in their wallet.
    pub const fn is_user_rejection(&self) -> bool {
        matches!(
            self,
            Self::Rpc {
                code: USER_REJECTED_CODE,
                ..
            }
        )
    }

    /// Human readable message, preferring the structured `data.message`.
    pub fn user_message(&self) -> String {
        match self {
            Self::Rpc {
                data_message: Some(message),
                ..
            } => message.clone(),
            Self::Rpc { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

impl From<TransportError> for WalletError {
    fn from(err: TransportError) -> Self {
        match err.as_error_resp() {
            Some(payload) => Self::from_payload(payload),
            None => Self::Transport(err.to_string()),
        }
    }
}

impl From<alloy_contract::Error> for WalletError {
    fn from(err: alloy_contract::Error) -> Self {
        match err {
            alloy_contract::Error::TransportError(err) => err.into(),
            alloy_contract::Error::PendingTransactionError(err) => err.into(),
            other => Self::Contract(other.to_string()),
        }
    }
}

impl From<PendingTransactionError> for WalletError {
    fn from(err: PendingTransactionError) -> Self {
        match err {
            PendingTransactionError::TransportError(err) => err.into(),
            other => Self::Transport(other.to_string()),
        }
    }
}
