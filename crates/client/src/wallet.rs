use crate::{
    fill_transaction, RemoteSigner, Subscription, Wallet, WalletError, WalletEvent, WalletEvents,
};
use alloy_consensus::TxEnvelope;
use alloy_network::{eip2718::Encodable2718, EthereumWallet, TransactionBuilder};
use alloy_primitives::{Address, Bytes, TxHash, U256};
use alloy_provider::Provider;
use alloy_rpc_types::TransactionRequest;
use alloy_signer_local::PrivateKeySigner;
use alloy_sol_types::SolCall;
use binding::IERC20;
use std::{
    sync::{PoisonError, RwLock},
    time::Duration,
};
use tokio::time;
use tracing::{debug, info, warn};

/// Who signs the transactions of a [`ChainWallet`].
#[derive(Debug, Clone)]
pub enum WalletSigner {
    /// Local private key. Exposes exactly one account and never prompts.
    Local(PrivateKeySigner),
    /// Signer-proxy that owns the keys and approves each request.
    Remote(RemoteSigner),
}

/// Wallet backed by an alloy provider and a local or remote signer.
#[derive(Debug)]
pub struct ChainWallet<P> {
    provider: P,
    signer: WalletSigner,
    active: RwLock<Option<Address>>,
    events: WalletEvents,
}

impl<P> ChainWallet<P>
where
    P: Provider + Clone,
{
    pub fn new(provider: P, signer: WalletSigner) -> Self {
        Self {
            provider,
            signer,
            active: RwLock::new(None),
            events: WalletEvents::new(),
        }
    }

    /// Sender side of the wallet notifications.
    pub const fn events(&self) -> &WalletEvents {
        &self.events
    }

    /// Account transactions are sent from, once access was granted.
    pub fn active_account(&self) -> Option<Address> {
        *self.active.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_active(&self, account: Option<Address>) {
        *self.active.write().unwrap_or_else(PoisonError::into_inner) = account;
    }

    async fn accounts(&self) -> Result<Vec<Address>, WalletError> {
        match &self.signer {
            WalletSigner::Local(signer) => Ok(vec![signer.address()]),
            WalletSigner::Remote(remote) => {
                remote.accounts().await.map_err(WalletError::from_report)
            }
        }
    }

    /// Poll the chain id and the exposed accounts, emitting a notification
    /// whenever either changes. Runs until a baseline read fails.
    pub async fn watch(&self, interval: Duration) -> Result<(), WalletError> {
        let mut last_chain = self.provider.get_chain_id().await?;
        let mut last_accounts = self.accounts().await?;
        let mut ticker = time::interval(interval);

        info!(chain_id = last_chain, accounts = last_accounts.len(), "Watching wallet");

        loop {
            ticker.tick().await;

            match self.provider.get_chain_id().await {
                Ok(chain_id) if chain_id != last_chain => {
                    info!(from = last_chain, to = chain_id, "Wallet chain changed");
                    last_chain = chain_id;
                    self.events.emit(WalletEvent::ChainChanged(chain_id));
                }
                Ok(_) => {}
                Err(e) => warn!(error = %e, "Failed to read chain id"),
            }

            match self.accounts().await {
                Ok(accounts) if accounts != last_accounts => {
                    info!(accounts = ?accounts, "Wallet accounts changed");
                    self.set_active(accounts.first().copied());
                    self.events.emit(WalletEvent::AccountsChanged(accounts.clone()));
                    last_accounts = accounts;
                }
                Ok(_) => {}
                Err(e) => warn!(error = %e, "Failed to read wallet accounts"),
            }
        }
    }

    async fn sign(&self, tx: TransactionRequest) -> Result<Bytes, WalletError> {
        match &self.signer {
            WalletSigner::Local(signer) => {
                let wallet = EthereumWallet::from(signer.clone());

                // Build and sign the typed transaction
                let tx_envelope: TxEnvelope = tx
                    .build(&wallet)
                    .await
                    .map_err(|e| WalletError::Signing(e.to_string()))?;

                // Encode to EIP-2718 bytes
                let mut encoded = Vec::new();
                tx_envelope.encode_2718(&mut encoded);
                Ok(Bytes::from(encoded))
            }
            WalletSigner::Remote(remote) => remote
                .sign_transaction(tx)
                .await
                .map_err(WalletError::from_report),
        }
    }
}

impl<P> Wallet for ChainWallet<P>
where
    P: Provider + Clone,
{
    async fn request_accounts(&self) -> Result<Vec<Address>, WalletError> {
        let accounts = match &self.signer {
            WalletSigner::Local(signer) => vec![signer.address()],
            WalletSigner::Remote(remote) => remote
                .request_accounts()
                .await
                .map_err(WalletError::from_report)?,
        };

        self.set_active(accounts.first().copied());
        Ok(accounts)
    }

    async fn chain_id(&self) -> Result<u64, WalletError> {
        Ok(self.provider.get_chain_id().await?)
    }

    fn subscribe(&self) -> Subscription {
        self.events.subscribe()
    }

    async fn send_transfer(
        &self,
        token: Address,
        to: Address,
        amount: U256,
    ) -> Result<TxHash, WalletError> {
        let from = self.active_account().ok_or(WalletError::NotConnected)?;
        let chain_id = self.provider.get_chain_id().await?;

        let input = IERC20::transferCall {
            recipient: to,
            amount,
        }
        .abi_encode();

        let tx = TransactionRequest::default()
            .with_from(from)
            .with_to(token)
            .with_input(input);

        let tx = fill_transaction(tx, &self.provider, from, chain_id).await?;
        let raw = self.sign(tx).await?;

        let pending = self.provider.send_raw_transaction(&raw).await?;
        let tx_hash = *pending.tx_hash();

        debug!(%tx_hash, %from, %to, %amount, "Transfer broadcast");
        Ok(tx_hash)
    }
}
