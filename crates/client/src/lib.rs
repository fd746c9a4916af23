//! Provider and signer capabilities of the token dApp.
//!
//! The dApp never talks to a node or a wallet directly. It goes through two
//! capabilities:
//! - [`TokenProvider`]: read-only chain access (token reads, receipts, logs)
//! - [`Wallet`]: account access, network identity, notifications and
//!   transaction submission
//!
//! [`ChainReader`] and [`ChainWallet`] implement them on top of alloy.

mod error;
mod events;
mod reader;
mod remote_signer;
mod types;
mod wallet;

use alloy_primitives::{Address, TxHash, U256};
use alloy_provider::{Provider, ProviderBuilder};
use alloy_rpc_types::TransactionRequest;
use alloy_signer_local::PrivateKeySigner;
use std::future::Future;
use thiserror::Error;

pub use error::{WalletError, USER_REJECTED_CODE};
pub use events::{Subscription, WalletEvent, WalletEvents};
pub use reader::ChainReader;
pub use remote_signer::RemoteSigner;
pub use types::{Receipt, TransferLog};
pub use wallet::{ChainWallet, WalletSigner};

#[derive(Error, Debug)]
pub enum ClientError {
    /// Error parsing or validating URLs
    #[error("Invalid RPC URL: {0}")]
    InvalidUrl(String),

    /// Error with private key
    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(String),
}

/// Read-only access to token contracts and chain state.
pub trait TokenProvider: Send + Sync {
    /// ERC20 `name()` of `token`.
    fn name(&self, token: Address) -> impl Future<Output = Result<String, WalletError>> + Send;

    /// ERC20 `symbol()` of `token`.
    fn symbol(&self, token: Address)
        -> impl Future<Output = Result<String, WalletError>> + Send;

    /// ERC20 `balanceOf(holder)` of `token`.
    fn balance_of(
        &self,
        token: Address,
        holder: Address,
    ) -> impl Future<Output = Result<U256, WalletError>> + Send;

    /// Wait until the transaction is mined and return its receipt.
    ///
    /// There is no timeout; the future resolves only when the receipt is
    /// available or the provider fails.
    fn wait(&self, tx_hash: TxHash) -> impl Future<Output = Result<Receipt, WalletError>> + Send;

    /// Latest block number.
    fn block_number(&self) -> impl Future<Output = Result<u64, WalletError>> + Send;

    /// `Transfer` events emitted by `token` in the inclusive block range.
    fn transfer_logs(
        &self,
        token: Address,
        from_block: u64,
        to_block: u64,
    ) -> impl Future<Output = Result<Vec<TransferLog>, WalletError>> + Send;
}

/// Account access and transaction submission.
pub trait Wallet: Send + Sync {
    /// Ask the user for account access. The first account is the active one.
    fn request_accounts(&self) -> impl Future<Output = Result<Vec<Address>, WalletError>> + Send;

    /// Chain the wallet is currently connected to.
    fn chain_id(&self) -> impl Future<Output = Result<u64, WalletError>> + Send;

    /// Register for account and network notifications.
    fn subscribe(&self) -> Subscription;

    /// Sign and broadcast an ERC20 `transfer(to, amount)` on `token` from the
    /// active account.
    fn send_transfer(
        &self,
        token: Address,
        to: Address,
        amount: U256,
    ) -> impl Future<Output = Result<TxHash, WalletError>> + Send;
}

/// Convenience function to create an ethereum rpc provider from url.
pub fn create_provider(rpc_url: &str) -> Result<impl Provider + Clone, ClientError> {
    let url = rpc_url
        .parse()
        .map_err(|e| ClientError::InvalidUrl(format!("{}", e)))?;
    let provider = ProviderBuilder::new().connect_http(url);

    Ok(provider)
}

/// Create a local signer from a hex private key (with or without 0x prefix).
pub fn local_signer(private_key: &str) -> Result<WalletSigner, ClientError> {
    let signer: PrivateKeySigner = private_key
        .parse()
        .map_err(|e| ClientError::InvalidPrivateKey(format!("{}", e)))?;

    Ok(WalletSigner::Local(signer))
}

/// Fill missing transaction fields using the provider.
pub async fn fill_transaction<P>(
    mut tx: TransactionRequest,
    provider: &P,
    from: Address,
    chain_id: u64,
) -> Result<TransactionRequest, WalletError>
where
    P: Provider,
{
    if tx.from.is_none() {
        tx.from = Some(from);
    }

    if tx.chain_id.is_none() {
        tx.chain_id = Some(chain_id);
    }

    if tx.nonce.is_none() {
        let nonce = provider.get_transaction_count(from).await?;
        tx.nonce = Some(nonce);
    }

    // Fee parameters first, gas estimation may need them
    if tx.max_fee_per_gas.is_none() || tx.max_priority_fee_per_gas.is_none() {
        let fee_estimate = provider.estimate_eip1559_fees().await?;
        if tx.max_fee_per_gas.is_none() {
            tx.max_fee_per_gas = Some(fee_estimate.max_fee_per_gas);
        }
        if tx.max_priority_fee_per_gas.is_none() {
            tx.max_priority_fee_per_gas = Some(fee_estimate.max_priority_fee_per_gas);
        }
    }

    // A reverting transfer fails here, with the revert reason in the error data
    if tx.gas.is_none() {
        let gas_estimate = provider.estimate_gas(tx.clone()).await?;
        // 20% buffer
        tx.gas = Some(gas_estimate + gas_estimate / 5);
    }

    Ok(tx)
}
