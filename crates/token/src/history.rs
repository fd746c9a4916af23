//! Recent `Transfer` events of the token.
//!
//! Log queries are split into chunks because most RPC providers cap the
//! block range of `eth_getLogs`.

use crate::{TokenError, TokenReader};
use client::{TokenProvider, TransferLog, WalletError};
use std::time::Duration;
use tokio_retry::{strategy::ExponentialBackoff, Retry};
use tracing::{debug, warn};

/// Maximum block range of a single log query.
pub const CHUNK_SIZE: u64 = 9_500;

impl<P> TokenReader<P>
where
    P: TokenProvider,
{
    /// Transfers of the last `lookback_blocks` blocks, newest first.
    pub async fn recent_transfers(
        &self,
        lookback_blocks: u64,
    ) -> Result<Vec<TransferLog>, TokenError> {
        let current_block = self
            .provider()
            .block_number()
            .await
            .map_err(|source| TokenError::ContractRead {
                method: "blockNumber",
                source,
            })?;

        let from_block = current_block.saturating_sub(lookback_blocks);
        self.transfers_between(from_block, current_block).await
    }

    /// Transfers in the inclusive block range, newest first.
    pub async fn transfers_between(
        &self,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<TransferLog>, TokenError> {
        debug!(
            token = %self.token(),
            from = from_block,
            to = to_block,
            "Scanning transfer events"
        );

        let mut logs = Vec::new();
        let mut current = from_block;

        while current <= to_block {
            let chunk_end = current.saturating_add(CHUNK_SIZE - 1).min(to_block);

            let chunk = self
                .scan_chunk_with_retry(current, chunk_end)
                .await
                .map_err(|source| TokenError::ContractRead {
                    method: "Transfer logs",
                    source,
                })?;

            logs.extend(chunk);

            if chunk_end == u64::MAX {
                break;
            }
            current = chunk_end + 1;
        }

        logs.reverse();
        debug!(count = logs.len(), "Transfer events found");

        Ok(logs)
    }

    /// Scan a single chunk with retry logic.
    async fn scan_chunk_with_retry(
        &self,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<TransferLog>, WalletError> {
        let retry_strategy = ExponentialBackoff::from_millis(100)
            .max_delay(Duration::from_secs(2))
            .take(5);

        Retry::spawn(retry_strategy, || async move {
            self.provider()
                .transfer_logs(self.token(), from_block, to_block)
                .await
                .map_err(|e| {
                    warn!(
                        from = from_block,
                        to = to_block,
                        error = %e,
                        "Transfer log scan failed, will retry"
                    );
                    e
                })
        })
        .await
    }
}
