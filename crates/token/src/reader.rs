use crate::{Balance, TokenError, TokenMetadata, TokenState};
use alloy_primitives::{Address, U256};
use client::TokenProvider;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

/// Reads metadata and balances of one token contract.
///
/// Stores only the last fetched values; every load goes back to the
/// provider.
pub struct TokenReader<P> {
    provider: Arc<P>,
    token: Address,
    state: watch::Sender<TokenState>,
}

impl<P> TokenReader<P>
where
    P: TokenProvider,
{
    pub fn new(provider: Arc<P>, token: Address) -> Self {
        let (state, _) = watch::channel(TokenState::default());
        Self {
            provider,
            token,
            state,
        }
    }

    /// Token contract address.
    pub const fn token(&self) -> Address {
        self.token
    }

    pub const fn provider(&self) -> &Arc<P> {
        &self.provider
    }

    pub fn state(&self) -> TokenState {
        self.state.borrow().clone()
    }

    pub fn metadata(&self) -> Option<TokenMetadata> {
        self.state.borrow().metadata.clone()
    }

    pub fn balance(&self) -> Option<Balance> {
        self.state.borrow().balance.clone()
    }

    /// Observe metadata and balance updates.
    pub fn subscribe(&self) -> watch::Receiver<TokenState> {
        self.state.subscribe()
    }

    /// Read name and symbol from the contract.
    pub async fn load_metadata(&self) -> Result<TokenMetadata, TokenError> {
        debug!(token = %self.token, "Loading token metadata");

        let (name, symbol) = tokio::try_join!(
            async {
                self.provider
                    .name(self.token)
                    .await
                    .map_err(|source| TokenError::ContractRead {
                        method: "name",
                        source,
                    })
            },
            async {
                self.provider
                    .symbol(self.token)
                    .await
                    .map_err(|source| TokenError::ContractRead {
                        method: "symbol",
                        source,
                    })
            },
        )?;

        let metadata = TokenMetadata { name, symbol };
        self.state
            .send_modify(|state| state.metadata = Some(metadata.clone()));

        Ok(metadata)
    }

    /// Stored metadata, loading it on first use.
    pub async fn ensure_metadata(&self) -> Result<TokenMetadata, TokenError> {
        match self.metadata() {
            Some(metadata) => Ok(metadata),
            None => self.load_metadata().await,
        }
    }

    /// Read the balance of `holder` and replace the stored balance.
    pub async fn refresh_balance(&self, holder: Address) -> Result<U256, TokenError> {
        let amount = self
            .provider
            .balance_of(self.token, holder)
            .await
            .map_err(|source| TokenError::ContractRead {
                method: "balanceOf",
                source,
            })?;

        debug!(token = %self.token, %holder, %amount, "Balance refreshed");

        self.state.send_modify(|state| {
            state.balance = Some(Balance {
                holder,
                token: self.token,
                amount,
            })
        });

        Ok(amount)
    }

    /// Drop the stored balance, e.g. after the session was reset.
    pub fn clear_balance(&self) {
        self.state
            .send_if_modified(|state| state.balance.take().is_some());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{MockToken, TOKEN};
    use std::sync::atomic::Ordering;

    const ALICE: Address = Address::repeat_byte(0xab);
    const BOB: Address = Address::repeat_byte(0xbc);

    fn reader(mock: MockToken) -> TokenReader<MockToken> {
        TokenReader::new(Arc::new(mock), TOKEN)
    }

    #[tokio::test]
    async fn test_load_metadata() {
        let reader = reader(MockToken::default());

        let metadata = reader.load_metadata().await.unwrap();

        assert_eq!(metadata.name, "Test Token");
        assert_eq!(metadata.symbol, "TST");
        assert_eq!(reader.metadata(), Some(metadata));
    }

    #[tokio::test]
    async fn test_load_metadata_failure_propagates() {
        let reader = reader(MockToken {
            fail_symbol: true,
            ..Default::default()
        });

        let result = reader.load_metadata().await;

        assert!(matches!(
            result,
            Err(TokenError::ContractRead {
                method: "symbol",
                ..
            })
        ));
        assert_eq!(reader.metadata(), None);
    }

    #[tokio::test]
    async fn test_load_metadata_rereads() {
        let reader = reader(MockToken::default());

        reader.load_metadata().await.unwrap();
        reader.load_metadata().await.unwrap();

        assert_eq!(reader.provider().name_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_ensure_metadata_reads_once() {
        let reader = reader(MockToken::default());

        reader.ensure_metadata().await.unwrap();
        reader.ensure_metadata().await.unwrap();

        assert_eq!(reader.provider().name_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_refresh_balance_replaces_value() {
        let reader = reader(MockToken::default());
        reader.provider().set_balance(ALICE, 1_000);
        reader.provider().set_balance(BOB, 5);

        assert_eq!(reader.refresh_balance(ALICE).await.unwrap(), U256::from(1_000));
        assert_eq!(
            reader.balance(),
            Some(Balance {
                holder: ALICE,
                token: TOKEN,
                amount: U256::from(1_000),
            })
        );

        reader.refresh_balance(BOB).await.unwrap();
        let balance = reader.balance().unwrap();
        assert_eq!(balance.holder, BOB);
        assert_eq!(balance.amount, U256::from(5));
    }

    #[tokio::test]
    async fn test_balance_beyond_u64() {
        let reader = reader(MockToken::default());
        let large = U256::from(u128::MAX) * U256::from(1_000u64);
        reader.provider().balances.lock().unwrap().insert(ALICE, large);

        assert_eq!(reader.refresh_balance(ALICE).await.unwrap(), large);
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_balance() {
        let mock = MockToken {
            fail_balance: true,
            ..Default::default()
        };
        let reader = reader(mock);
        reader.state.send_modify(|state| {
            state.balance = Some(Balance {
                holder: ALICE,
                token: TOKEN,
                amount: U256::from(7),
            })
        });

        let result = reader.refresh_balance(ALICE).await;

        assert!(matches!(
            result,
            Err(TokenError::ContractRead {
                method: "balanceOf",
                ..
            })
        ));
        assert_eq!(reader.balance().unwrap().amount, U256::from(7));
    }

    #[tokio::test]
    async fn test_clear_balance() {
        let reader = reader(MockToken::default());
        reader.refresh_balance(ALICE).await.unwrap();
        let mut updates = reader.subscribe();
        updates.mark_unchanged();

        reader.clear_balance();

        assert!(updates.has_changed().unwrap());
        assert_eq!(reader.balance(), None);
    }
}
