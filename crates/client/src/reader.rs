use crate::{Receipt, TokenProvider, TransferLog, WalletError};
use alloy_primitives::{Address, TxHash, U256};
use alloy_provider::{PendingTransactionBuilder, Provider};
use binding::IERC20;
use tracing::debug;

/// Read side of the chain, backed by an alloy provider.
#[derive(Debug, Clone)]
pub struct ChainReader<P> {
    provider: P,
}

impl<P> ChainReader<P>
where
    P: Provider + Clone,
{
    pub const fn new(provider: P) -> Self {
        Self { provider }
    }

    pub const fn provider(&self) -> &P {
        &self.provider
    }
}

impl<P> TokenProvider for ChainReader<P>
where
    P: Provider + Clone,
{
    async fn name(&self, token: Address) -> Result<String, WalletError> {
        debug!(%token, "Reading token name");

        let contract = IERC20::new(token, &self.provider);
        Ok(contract.name().call().await?)
    }

    async fn symbol(&self, token: Address) -> Result<String, WalletError> {
        debug!(%token, "Reading token symbol");

        let contract = IERC20::new(token, &self.provider);
        Ok(contract.symbol().call().await?)
    }

    async fn balance_of(&self, token: Address, holder: Address) -> Result<U256, WalletError> {
        debug!(%token, %holder, "Querying erc20 balance");

        let contract = IERC20::new(token, &self.provider);
        Ok(contract.balanceOf(holder).call().await?)
    }

    async fn wait(&self, tx_hash: TxHash) -> Result<Receipt, WalletError> {
        debug!(%tx_hash, "Waiting for receipt");

        let receipt = PendingTransactionBuilder::new(self.provider.root().clone(), tx_hash)
            .get_receipt()
            .await?;

        Ok(Receipt::from(&receipt))
    }

    async fn block_number(&self) -> Result<u64, WalletError> {
        Ok(self.provider.get_block_number().await?)
    }

    async fn transfer_logs(
        &self,
        token: Address,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<TransferLog>, WalletError> {
        let contract = IERC20::new(token, &self.provider);

        let events = contract
            .Transfer_filter()
            .from_block(from_block)
            .to_block(to_block)
            .query()
            .await?;

        let logs = events
            .into_iter()
            .map(|(event, log)| TransferLog {
                from: event.from,
                to: event.to,
                value: event.value,
                block_number: log.block_number,
                tx_hash: log.transaction_hash,
            })
            .collect();

        Ok(logs)
    }
}
