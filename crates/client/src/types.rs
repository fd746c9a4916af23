use alloy_primitives::{Address, TxHash, U256};
use alloy_rpc_types::TransactionReceipt;
use serde::{Deserialize, Serialize};

/// Confirmation record of a mined transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    /// Transaction hash
    pub tx_hash: TxHash,
    /// `false` when the transaction reverted (status 0)
    pub status: bool,
    /// Block number where transaction was included
    pub block_number: Option<u64>,
    /// Gas used
    pub gas_used: u64,
}

impl From<&TransactionReceipt> for Receipt {
    fn from(receipt: &TransactionReceipt) -> Self {
        Self {
            tx_hash: receipt.transaction_hash,
            status: receipt.status(),
            block_number: receipt.block_number,
            gas_used: receipt.gas_used,
        }
    }
}

/// A decoded ERC20 `Transfer` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferLog {
    pub from: Address,
    pub to: Address,
    pub value: U256,
    pub block_number: Option<u64>,
    pub tx_hash: Option<TxHash>,
}
