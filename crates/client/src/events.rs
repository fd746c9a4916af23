//! Wallet notifications.
//!
//! Wallets notify their clients when the user switches accounts or networks.
//! [`WalletEvents`] is the sending side kept by a wallet implementation;
//! every consumer holds its own [`Subscription`]. Dropping a subscription
//! unsubscribes it.

use alloy_primitives::Address;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::warn;

/// Notifications buffered per subscriber before the oldest are dropped.
const EVENT_CAPACITY: usize = 16;

/// A notification emitted by the wallet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletEvent {
    /// The set of accounts exposed to the dApp changed. An empty list means
    /// the user revoked access.
    AccountsChanged(Vec<Address>),
    /// The wallet switched to another chain.
    ChainChanged(u64),
}

#[derive(Debug, Clone)]
pub struct WalletEvents {
    sender: broadcast::Sender<WalletEvent>,
}

impl Default for WalletEvents {
    fn default() -> Self {
        Self::new()
    }
}

impl WalletEvents {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CAPACITY);
        Self { sender }
    }

    /// Deliver an event to all current subscribers.
    ///
    /// Returns the number of subscribers that received it.
    pub fn emit(&self, event: WalletEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    pub fn subscribe(&self) -> Subscription {
        Subscription {
            receiver: self.sender.subscribe(),
        }
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// Receiving side of wallet notifications.
#[derive(Debug)]
pub struct Subscription {
    receiver: broadcast::Receiver<WalletEvent>,
}

impl Subscription {
    /// Wait for the next notification.
    ///
    /// Returns `None` once the wallet is gone.
    pub async fn next(&mut self) -> Option<WalletEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Wallet subscription lagged, dropping oldest events");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_emit_reaches_subscribers() {
        let events = WalletEvents::new();
        let mut first = events.subscribe();
        let mut second = events.subscribe();

        let delivered = events.emit(WalletEvent::ChainChanged(5));
        assert_eq!(delivered, 2);

        assert_eq!(first.next().await, Some(WalletEvent::ChainChanged(5)));
        assert_eq!(second.next().await, Some(WalletEvent::ChainChanged(5)));
    }

    #[test]
    fn test_emit_without_subscribers() {
        let events = WalletEvents::new();
        assert_eq!(events.emit(WalletEvent::AccountsChanged(vec![])), 0);
    }

    #[test]
    fn test_drop_unsubscribes() {
        let events = WalletEvents::new();
        let subscription = events.subscribe();
        assert_eq!(events.subscriber_count(), 1);

        drop(subscription);
        assert_eq!(events.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_closed_when_wallet_dropped() {
        let events = WalletEvents::new();
        let mut subscription = events.subscribe();
        drop(events);

        assert_eq!(subscription.next().await, None);
    }

    #[tokio::test]
    async fn test_lagged_subscriber_keeps_latest() {
        let events = WalletEvents::new();
        let mut subscription = events.subscribe();

        for chain_id in 0..(EVENT_CAPACITY as u64 + 4) {
            events.emit(WalletEvent::ChainChanged(chain_id));
        }

        let mut last = None;
        while let Ok(Some(event)) =
            tokio::time::timeout(std::time::Duration::from_millis(10), subscription.next()).await
        {
            last = Some(event);
        }

        assert_eq!(
            last,
            Some(WalletEvent::ChainChanged(EVENT_CAPACITY as u64 + 3))
        );
    }
}
