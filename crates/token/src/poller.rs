use crate::TokenReader;
use alloy_primitives::Address;
use client::TokenProvider;
use std::{sync::Arc, time::Duration};
use tokio::{
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};
use tracing::{debug, warn};

/// Keep the balance of `holder` up to date.
///
/// The first read happens immediately. Failed reads are logged and retried
/// on the next tick. The task runs until its handle is aborted.
pub fn spawn_balance_poller<P>(
    reader: Arc<TokenReader<P>>,
    holder: Address,
    interval: Duration,
) -> JoinHandle<()>
where
    P: TokenProvider + 'static,
{
    debug!(%holder, ?interval, "Starting balance polling");

    tokio::spawn(async move {
        let mut ticker = time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            if let Err(e) = reader.refresh_balance(holder).await {
                warn!(%holder, error = %e, "Balance poll failed");
            }
        }
    })
}
