pub mod config;
pub mod metrics;
pub mod view;

use ::config::NetworkConfig;
use alloy_primitives::{Address, U256};
use client::{Receipt, TokenProvider, Wallet};
use crate::{metrics::Metrics, view::View};
use eyre::eyre;
use session::{SessionError, SessionManager};
use std::{
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};
use token::{spawn_balance_poller, TokenReader};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use transfer::{TransferError, TransferSubmitter};

/// Wires the session, the token reader and the transfer submitter together.
///
/// Once connected, a sync task follows the session: every account change
/// clears the balance and restarts polling for the new account.
pub struct Dapp<W, P> {
    session: Arc<SessionManager<W>>,
    reader: Arc<TokenReader<P>>,
    submitter: Option<TransferSubmitter<W, P>>,
    poll_interval: Duration,
    metrics: Metrics,
    sync: Mutex<Option<JoinHandle<()>>>,
}

impl<W, P> Dapp<W, P>
where
    W: Wallet + 'static,
    P: TokenProvider + 'static,
{
    pub fn new(
        wallet: Option<Arc<W>>,
        provider: Arc<P>,
        token: Address,
        network: NetworkConfig,
        poll_interval: Duration,
    ) -> Self {
        let reader = Arc::new(TokenReader::new(provider, token));
        let submitter = wallet
            .as_ref()
            .map(|wallet| TransferSubmitter::new(wallet.clone(), reader.clone()));

        Self {
            session: Arc::new(SessionManager::new(wallet, network)),
            reader,
            submitter,
            poll_interval,
            metrics: Metrics::new(),
            sync: Mutex::new(None),
        }
    }

    pub const fn session(&self) -> &Arc<SessionManager<W>> {
        &self.session
    }

    pub const fn reader(&self) -> &Arc<TokenReader<P>> {
        &self.reader
    }

    pub const fn submitter(&self) -> Option<&TransferSubmitter<W, P>> {
        self.submitter.as_ref()
    }

    /// Connect the wallet, start balance polling and load token metadata.
    pub async fn connect(self: &Arc<Self>) -> eyre::Result<Address> {
        let address = match self.session.connect().await {
            Ok(address) => address,
            Err(e) => {
                self.metrics.record_connect(connect_label(&e));
                return Err(e.into());
            }
        };
        self.metrics.record_connect("connected");

        self.reader.clear_balance();
        self.start_polling(address);
        self.spawn_session_sync(address);

        self.reader.ensure_metadata().await?;

        Ok(address)
    }

    fn start_polling(&self, holder: Address) {
        let poller = spawn_balance_poller(self.reader.clone(), holder, self.poll_interval);
        self.session.attach_poller(poller);
    }

    fn spawn_session_sync(self: &Arc<Self>, connected: Address) {
        let mut sessions = self.session.subscribe();
        let dapp = Arc::downgrade(self);

        let handle = tokio::spawn(async move {
            let mut current = Some(connected);

            loop {
                let latest = sessions.borrow_and_update().address;
                if latest != current {
                    let Some(dapp) = dapp.upgrade() else {
                        break;
                    };
                    dapp.on_account_changed(latest);
                    current = latest;
                }

                if sessions.changed().await.is_err() {
                    break;
                }
            }
            debug!("Session sync stopped");
        });

        if let Some(previous) = self
            .sync
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(handle)
        {
            previous.abort();
        }
    }

    fn on_account_changed(&self, address: Option<Address>) {
        self.reader.clear_balance();

        match address {
            Some(address) => {
                info!(%address, "Following new account");
                self.start_polling(address);
            }
            None => {
                self.session.stop_polling();
                self.dismiss_transfer_error();
            }
        }
    }

    fn take_sync(&self) -> Option<JoinHandle<()>> {
        self.sync
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Transfer `amount` base units of the token from the active account.
    pub async fn transfer(&self, to: Address, amount: U256) -> eyre::Result<Receipt> {
        let submitter = self.submitter.as_ref().ok_or(SessionError::NoWallet)?;
        let owner = self
            .session
            .address()
            .ok_or_else(|| eyre!("Wallet is not connected"))?;

        let result = submitter.transfer(owner, to, amount).await;
        self.metrics.record_transfer(transfer_label(&result));

        if let Ok(receipt) = &result {
            if let Some(balance) = self.reader.balance() {
                self.metrics.set_balance(balance.amount);
            }
            info!(tx_hash = %receipt.tx_hash, "Transfer succeeded");
        }

        Ok(result?)
    }

    pub fn dismiss_transfer_error(&self) {
        if let Some(submitter) = &self.submitter {
            submitter.dismiss_error();
        }
    }

    pub fn dismiss_network_error(&self) {
        self.session.dismiss_network_error();
    }

    /// Reset the session and stop all session tasks.
    pub fn disconnect(&self) {
        if let Some(sync) = self.take_sync() {
            sync.abort();
        }
        self.session.disconnect();
        self.reader.clear_balance();
        self.dismiss_transfer_error();
    }

    /// Current view.
    pub fn view(&self) -> View {
        let attempt = self.submitter.as_ref().map(TransferSubmitter::attempt);

        View::new(
            self.session.has_wallet(),
            &self.session.session(),
            &self.reader.state(),
            attempt.as_ref(),
        )
    }

    pub const fn metrics(&self) -> &Metrics {
        &self.metrics
    }
}

impl<W, P> Drop for Dapp<W, P> {
    fn drop(&mut self) {
        if let Some(sync) = self
            .sync
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            sync.abort();
        }
    }
}

const fn connect_label(err: &SessionError) -> &'static str {
    match err {
        SessionError::NoWallet => "no_wallet",
        SessionError::UserRejected => "rejected",
        SessionError::NoAccounts => "no_accounts",
        SessionError::WrongNetwork { .. } => "wrong_network",
        SessionError::Wallet(_) => "error",
    }
}

fn transfer_label(result: &Result<Receipt, TransferError>) -> &'static str {
    match result {
        Ok(_) => "succeeded",
        Err(TransferError::Rejected) => "rejected",
        Err(TransferError::Concurrent) => "concurrent",
        Err(e) => {
            warn!(error = %e, "Transfer did not succeed");
            "failed"
        }
    }
}
