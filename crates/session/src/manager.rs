use crate::{Session, SessionError};
use alloy_primitives::Address;
use client::{Subscription, Wallet, WalletEvent};
use config::NetworkConfig;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::{sync::watch, task::JoinHandle};
use tracing::{debug, info, warn};

/// Owns the wallet session and the tasks that depend on it.
///
/// Besides the [`Session`] itself the manager owns two tasks:
/// - the listener that applies wallet notifications, replaced on every
///   successful [`connect`](Self::connect)
/// - the balance poller registered through
///   [`attach_poller`](Self::attach_poller), stopped whenever the active
///   account changes or the session resets
pub struct SessionManager<W> {
    wallet: Option<Arc<W>>,
    network: NetworkConfig,
    state: watch::Sender<Session>,
    listener: Mutex<Option<JoinHandle<()>>>,
    poller: Mutex<Option<JoinHandle<()>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<W> SessionManager<W>
where
    W: Wallet + 'static,
{
    /// Create a manager. `wallet` is `None` when no wallet is available.
    pub fn new(wallet: Option<Arc<W>>, network: NetworkConfig) -> Self {
        let (state, _) = watch::channel(Session::default());

        Self {
            wallet,
            network,
            state,
            listener: Mutex::new(None),
            poller: Mutex::new(None),
        }
    }

    pub const fn has_wallet(&self) -> bool {
        self.wallet.is_some()
    }

    pub const fn network(&self) -> &NetworkConfig {
        &self.network
    }

    /// Snapshot of the current session.
    pub fn session(&self) -> Session {
        self.state.borrow().clone()
    }

    pub fn address(&self) -> Option<Address> {
        self.state.borrow().address
    }

    /// Observe session changes.
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    /// Request account access and start following wallet notifications.
    ///
    /// On success the session holds the first granted account. If the wallet
    /// is on the wrong chain the session keeps no address, carries a network
    /// error and no listener is registered.
    pub async fn connect(self: &Arc<Self>) -> Result<Address, SessionError> {
        let wallet = self.wallet.as_ref().ok_or(SessionError::NoWallet)?;

        // Subscribe first so nothing emitted during the handshake is lost.
        let subscription = wallet.subscribe();

        let accounts = wallet.request_accounts().await.map_err(|e| {
            if e.is_user_rejection() {
                info!("User rejected the connection request");
                SessionError::UserRejected
            } else {
                SessionError::Wallet(e)
            }
        })?;

        let address = accounts.first().copied().ok_or(SessionError::NoAccounts)?;

        self.check_network(wallet).await?;

        info!(%address, chain_id = self.network.chain_id, "Wallet connected");
        self.state.send_replace(Session {
            address: Some(address),
            network_error: None,
        });

        self.listen(subscription);

        Ok(address)
    }

    async fn check_network(&self, wallet: &W) -> Result<(), SessionError> {
        let actual = wallet.chain_id().await?;
        let expected = self.network.chain_id;

        if actual != expected {
            warn!(expected, actual, "Wallet connected to the wrong network");
            self.stop_listening();
            self.stop_polling();
            self.state.send_replace(Session {
                address: None,
                network_error: Some(self.network.wrong_network_message()),
            });

            return Err(SessionError::WrongNetwork { expected, actual });
        }

        Ok(())
    }

    fn listen(self: &Arc<Self>, mut subscription: Subscription) {
        let manager = Arc::downgrade(self);

        let handle = tokio::spawn(async move {
            while let Some(event) = subscription.next().await {
                let Some(manager) = manager.upgrade() else {
                    break;
                };

                let network_changed = matches!(event, WalletEvent::ChainChanged(_));
                manager.handle_event(event);

                if network_changed {
                    break;
                }
            }
            debug!("Wallet listener stopped");
        });

        if let Some(previous) = lock(&self.listener).replace(handle) {
            previous.abort();
        }
    }

    /// Apply one wallet notification.
    ///
    /// Polling is stopped only when the active account changes.
    pub fn handle_event(&self, event: WalletEvent) {
        match event {
            WalletEvent::AccountsChanged(accounts) => match accounts.first() {
                Some(&address) if self.address() == Some(address) => {
                    debug!(%address, "Active account unchanged");
                }
                Some(&address) => {
                    info!(%address, "Active account changed");
                    self.stop_polling();
                    self.state.send_modify(|session| session.address = Some(address));
                }
                None => {
                    info!("Wallet access revoked, resetting session");
                    self.reset_state();
                }
            },
            WalletEvent::ChainChanged(chain_id) => {
                info!(chain_id, "Wallet network changed, resetting session");
                self.reset_state();
                // A new connect is required.
                self.stop_listening();
            }
        }
    }

    /// Clear the network error without touching the address.
    pub fn dismiss_network_error(&self) {
        self.state.send_if_modified(|session| session.network_error.take().is_some());
    }

    /// Reset the session and stop following wallet notifications.
    pub fn disconnect(&self) {
        self.stop_listening();
        self.reset_state();
    }

    /// Abort the listener. Safe to call from the listener itself, which
    /// returns without awaiting after a network change.
    fn stop_listening(&self) {
        if let Some(listener) = lock(&self.listener).take() {
            listener.abort();
        }
    }

    fn reset_state(&self) {
        self.stop_polling();
        self.state.send_replace(Session::default());
    }

    /// Register the balance poller of the current session, stopping any
    /// previous one.
    pub fn attach_poller(&self, handle: JoinHandle<()>) {
        if let Some(previous) = lock(&self.poller).replace(handle) {
            previous.abort();
        }
    }

    pub fn stop_polling(&self) {
        if let Some(poller) = lock(&self.poller).take() {
            debug!("Stopping balance polling");
            poller.abort();
        }
    }
}

impl<W> Drop for SessionManager<W> {
    fn drop(&mut self) {
        for slot in [&self.listener, &self.poller] {
            if let Some(handle) = lock(slot).take() {
                handle.abort();
            }
        }
    }
}
