//! Token transfer submission.
//!
//! A transfer moves through `Idle → Submitting → Pending` and ends as
//! succeeded, failed or rejected. Only one transfer can be in flight; the
//! phase is back to `Idle` as soon as the attempt has an outcome.

pub mod submitter;

use alloy_primitives::TxHash;
use client::WalletError;
use thiserror::Error;

pub use submitter::TransferSubmitter;

/// Progress of the current attempt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TransferPhase {
    /// Ready to accept a transfer
    #[default]
    Idle,
    /// Waiting for the wallet to sign and broadcast
    Submitting,
    /// Broadcast, waiting to be mined
    Pending,
}

impl TransferPhase {
    pub const fn is_in_flight(self) -> bool {
        matches!(self, Self::Submitting | Self::Pending)
    }
}

/// How the last attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferOutcome {
    Succeeded,
    Failed,
    /// Cancelled by the user in the wallet; not an error
    Rejected,
}

/// State of the transfer submitter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferAttempt {
    pub phase: TransferPhase,
    /// Hash of the transaction being mined
    pub tx_hash: Option<TxHash>,
    /// Error of the last failed attempt, kept until dismissed or resubmitted
    pub error: Option<TransferError>,
    pub outcome: Option<TransferOutcome>,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransferError {
    /// Another transfer is still in flight
    #[error("A transfer is already in flight")]
    Concurrent,

    /// The user declined the transaction in the wallet
    #[error("Transaction rejected by user")]
    Rejected,

    /// Mined with status 0. The revert reason is not available from the receipt.
    #[error("Transaction failed")]
    MinedFailure { tx_hash: TxHash },

    /// Failed before a receipt was obtained
    #[error("{0}")]
    Submission(String),
}

impl From<WalletError> for TransferError {
    fn from(err: WalletError) -> Self {
        if err.is_user_rejection() {
            Self::Rejected
        } else {
            Self::Submission(err.user_message())
        }
    }
}
