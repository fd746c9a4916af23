use crate::{TransferAttempt, TransferError, TransferOutcome, TransferPhase};
use alloy_primitives::{Address, U256};
use client::{Receipt, TokenProvider, Wallet};
use std::sync::Arc;
use token::TokenReader;
use tokio::sync::watch;
use tracing::{info, warn};

/// Submits token transfers through the wallet and follows them until mined.
pub struct TransferSubmitter<W, P> {
    wallet: Arc<W>,
    reader: Arc<TokenReader<P>>,
    state: watch::Sender<TransferAttempt>,
}

impl<W, P> TransferSubmitter<W, P>
where
    W: Wallet,
    P: TokenProvider,
{
    pub fn new(wallet: Arc<W>, reader: Arc<TokenReader<P>>) -> Self {
        let (state, _) = watch::channel(TransferAttempt::default());
        Self {
            wallet,
            reader,
            state,
        }
    }

    pub fn attempt(&self) -> TransferAttempt {
        self.state.borrow().clone()
    }

    pub fn is_in_flight(&self) -> bool {
        self.state.borrow().phase.is_in_flight()
    }

    /// Observe phase, hash and error changes.
    pub fn subscribe(&self) -> watch::Receiver<TransferAttempt> {
        self.state.subscribe()
    }

    /// Transfer `amount` of the reader's token from `owner` to `to`.
    ///
    /// Resolves once the transaction is mined or the attempt failed. On
    /// success the balance of `owner` is refreshed once.
    pub async fn transfer(
        &self,
        owner: Address,
        to: Address,
        amount: U256,
    ) -> Result<Receipt, TransferError> {
        let accepted = self.state.send_if_modified(|attempt| {
            if attempt.phase.is_in_flight() {
                return false;
            }
            *attempt = TransferAttempt {
                phase: TransferPhase::Submitting,
                ..TransferAttempt::default()
            };
            true
        });

        if !accepted {
            warn!(%to, "Transfer rejected, another one is in flight");
            return Err(TransferError::Concurrent);
        }

        info!(token = %self.reader.token(), %owner, %to, %amount, "Submitting transfer");

        let result = self.submit(to, amount).await;

        let (outcome, error) = match &result {
            Ok(receipt) => {
                info!(
                    tx_hash = %receipt.tx_hash,
                    block_number = ?receipt.block_number,
                    gas_used = receipt.gas_used,
                    "Transfer confirmed"
                );
                if let Err(e) = self.reader.refresh_balance(owner).await {
                    warn!(%owner, error = %e, "Failed to refresh balance after transfer");
                }
                (TransferOutcome::Succeeded, None)
            }
            Err(TransferError::Rejected) => {
                info!("Transfer rejected by user");
                (TransferOutcome::Rejected, None)
            }
            Err(e) => {
                warn!(error = %e, "Transfer failed");
                (TransferOutcome::Failed, Some(e.clone()))
            }
        };

        self.state.send_replace(TransferAttempt {
            phase: TransferPhase::Idle,
            tx_hash: None,
            error,
            outcome: Some(outcome),
        });

        result
    }

    async fn submit(&self, to: Address, amount: U256) -> Result<Receipt, TransferError> {
        let tx_hash = self
            .wallet
            .send_transfer(self.reader.token(), to, amount)
            .await?;

        info!(%tx_hash, "Transfer broadcast, waiting for receipt");
        self.state.send_modify(|attempt| {
            attempt.phase = TransferPhase::Pending;
            attempt.tx_hash = Some(tx_hash);
        });

        let receipt = self.reader.provider().wait(tx_hash).await?;

        if !receipt.status {
            return Err(TransferError::MinedFailure { tx_hash });
        }

        Ok(receipt)
    }

    /// Clear the error of the last attempt.
    pub fn dismiss_error(&self) {
        self.state
            .send_if_modified(|attempt| attempt.error.take().is_some());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{address, TxHash};
    use client::{Subscription, TransferLog, WalletError, WalletEvents};
    use std::{sync::Mutex, time::Duration};
    use tokio::{sync::Notify, time::timeout};

    const TOKEN: Address = Address::repeat_byte(0x70);
    const OWNER: Address = address!("0x0000000000000000000000000000000000000abc");
    const RECIPIENT: Address = address!("0x0000000000000000000000000000000000000def");
    const TX_HASH: TxHash = TxHash::repeat_byte(0x11);

    #[derive(Default)]
    struct MockWallet {
        sent: Mutex<Vec<(Address, Address, U256)>>,
        error: Mutex<Option<WalletError>>,
        /// When set, sending blocks until notified
        gate: Option<Notify>,
        events: WalletEvents,
    }

    impl Wallet for MockWallet {
        async fn request_accounts(&self) -> Result<Vec<Address>, WalletError> {
            Ok(vec![OWNER])
        }

        async fn chain_id(&self) -> Result<u64, WalletError> {
            Ok(1337)
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
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            self.sent.lock().unwrap().push((token, to, amount));
            match self.error.lock().unwrap().take() {
                Some(e) => Err(e),
                None => Ok(TX_HASH),
            }
        }
    }

    struct MockChain {
        status: Mutex<bool>,
        wait_error: Mutex<Option<WalletError>>,
        /// When set, receipts are held until notified
        gate: Option<Notify>,
        balance_reads: Mutex<Vec<Address>>,
        fail_balance: bool,
    }

    impl Default for MockChain {
        fn default() -> Self {
            Self {
                status: Mutex::new(true),
                wait_error: Mutex::new(None),
                gate: None,
                balance_reads: Mutex::new(Vec::new()),
                fail_balance: false,
            }
        }
    }

    impl TokenProvider for MockChain {
        async fn name(&self, _token: Address) -> Result<String, WalletError> {
            Ok("Test Token".into())
        }

        async fn symbol(&self, _token: Address) -> Result<String, WalletError> {
            Ok("TST".into())
        }

        async fn balance_of(&self, _token: Address, holder: Address) -> Result<U256, WalletError> {
            self.balance_reads.lock().unwrap().push(holder);
            if self.fail_balance {
                return Err(WalletError::Transport("connection reset".into()));
            }
            Ok(U256::from(900))
        }

        async fn wait(&self, tx_hash: TxHash) -> Result<Receipt, WalletError> {
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            if let Some(e) = self.wait_error.lock().unwrap().take() {
                return Err(e);
            }
            Ok(Receipt {
                tx_hash,
                status: *self.status.lock().unwrap(),
                block_number: Some(7),
                gas_used: 51_000,
            })
        }

        async fn block_number(&self) -> Result<u64, WalletError> {
            Ok(7)
        }

        async fn transfer_logs(
            &self,
            _token: Address,
            _from_block: u64,
            _to_block: u64,
        ) -> Result<Vec<TransferLog>, WalletError> {
            Ok(Vec::new())
        }
    }

    type Submitter = TransferSubmitter<MockWallet, MockChain>;

    fn submitter(
        wallet: MockWallet,
        chain: MockChain,
    ) -> (Arc<Submitter>, Arc<MockWallet>, Arc<MockChain>) {
        let wallet = Arc::new(wallet);
        let chain = Arc::new(chain);
        let reader = Arc::new(TokenReader::new(chain.clone(), TOKEN));
        let submitter = Arc::new(TransferSubmitter::new(wallet.clone(), reader));
        (submitter, wallet, chain)
    }

    fn rejection() -> WalletError {
        WalletError::Rpc {
            code: 4001,
            message: "User denied transaction signature.".into(),
            data_message: Some("execution reverted".into()),
        }
    }

    #[tokio::test]
    async fn test_successful_transfer() {
        let (submitter, wallet, chain) = submitter(MockWallet::default(), MockChain::default());

        let receipt = submitter
            .transfer(OWNER, RECIPIENT, U256::from(100))
            .await
            .unwrap();

        assert_eq!(receipt.tx_hash, TX_HASH);
        assert_eq!(
            *wallet.sent.lock().unwrap(),
            vec![(TOKEN, RECIPIENT, U256::from(100))]
        );
        assert_eq!(*chain.balance_reads.lock().unwrap(), vec![OWNER]);
        assert_eq!(
            submitter.reader.balance().map(|b| b.amount),
            Some(U256::from(900))
        );
        assert_eq!(
            submitter.attempt(),
            TransferAttempt {
                phase: TransferPhase::Idle,
                tx_hash: None,
                error: None,
                outcome: Some(TransferOutcome::Succeeded),
            }
        );
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_success() {
        let chain = MockChain {
            fail_balance: true,
            ..MockChain::default()
        };
        let (submitter, _wallet, chain) = submitter(MockWallet::default(), chain);

        assert!(submitter
            .transfer(OWNER, RECIPIENT, U256::from(100))
            .await
            .is_ok());

        assert_eq!(chain.balance_reads.lock().unwrap().len(), 1);
        assert_eq!(submitter.attempt().outcome, Some(TransferOutcome::Succeeded));
        assert!(submitter.attempt().error.is_none());
    }

    #[tokio::test]
    async fn test_reverted_transaction() {
        let (submitter, _wallet, chain) = submitter(MockWallet::default(), MockChain::default());
        *chain.status.lock().unwrap() = false;

        let result = submitter.transfer(OWNER, RECIPIENT, U256::from(100)).await;

        assert_eq!(result, Err(TransferError::MinedFailure { tx_hash: TX_HASH }));
        let attempt = submitter.attempt();
        assert_eq!(attempt.phase, TransferPhase::Idle);
        assert_eq!(attempt.tx_hash, None);
        assert_eq!(attempt.outcome, Some(TransferOutcome::Failed));
        assert_eq!(
            attempt.error.map(|e| e.to_string()).as_deref(),
            Some("Transaction failed")
        );
        assert!(chain.balance_reads.lock().unwrap().is_empty());

        // A new submission is accepted and clears the error.
        *chain.status.lock().unwrap() = true;
        submitter
            .transfer(OWNER, RECIPIENT, U256::from(100))
            .await
            .unwrap();
        assert!(submitter.attempt().error.is_none());
    }

    #[tokio::test]
    async fn test_user_rejection_is_silent() {
        let wallet = MockWallet::default();
        *wallet.error.lock().unwrap() = Some(rejection());
        let (submitter, _wallet, chain) = submitter(wallet, MockChain::default());

        let result = submitter.transfer(OWNER, RECIPIENT, U256::from(100)).await;

        assert_eq!(result, Err(TransferError::Rejected));
        let attempt = submitter.attempt();
        assert_eq!(attempt.phase, TransferPhase::Idle);
        assert_eq!(attempt.error, None);
        assert_eq!(attempt.outcome, Some(TransferOutcome::Rejected));
        assert!(chain.balance_reads.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rejection_while_waiting() {
        let chain = MockChain::default();
        *chain.wait_error.lock().unwrap() = Some(rejection());
        let (submitter, _wallet, _chain) = submitter(MockWallet::default(), chain);

        let result = submitter.transfer(OWNER, RECIPIENT, U256::from(100)).await;

        assert_eq!(result, Err(TransferError::Rejected));
        assert_eq!(submitter.attempt().tx_hash, None);
        assert_eq!(submitter.attempt().error, None);
    }

    #[tokio::test]
    async fn test_submission_error_uses_data_message() {
        let wallet = MockWallet::default();
        *wallet.error.lock().unwrap() = Some(WalletError::Rpc {
            code: -32603,
            message: "Internal JSON-RPC error.".into(),
            data_message: Some("execution reverted: Not enough tokens".into()),
        });
        let (submitter, _wallet, _chain) = submitter(wallet, MockChain::default());

        let result = submitter.transfer(OWNER, RECIPIENT, U256::from(100)).await;

        let expected = TransferError::Submission("execution reverted: Not enough tokens".into());
        assert_eq!(result, Err(expected.clone()));
        assert_eq!(submitter.attempt().error, Some(expected));
        assert_eq!(submitter.attempt().outcome, Some(TransferOutcome::Failed));

        submitter.dismiss_error();
        assert_eq!(submitter.attempt().error, None);
    }

    #[tokio::test]
    async fn test_submission_error_without_data() {
        let wallet = MockWallet::default();
        *wallet.error.lock().unwrap() = Some(WalletError::Rpc {
            code: -32000,
            message: "nonce too low".into(),
            data_message: None,
        });
        let (submitter, _wallet, _chain) = submitter(wallet, MockChain::default());

        let result = submitter.transfer(OWNER, RECIPIENT, U256::from(100)).await;

        assert_eq!(result, Err(TransferError::Submission("nonce too low".into())));
    }

    #[tokio::test]
    async fn test_zero_amount_passed_through() {
        let (submitter, wallet, _chain) = submitter(MockWallet::default(), MockChain::default());

        submitter
            .transfer(OWNER, RECIPIENT, U256::ZERO)
            .await
            .unwrap();

        assert_eq!(wallet.sent.lock().unwrap()[0].2, U256::ZERO);
    }

    #[tokio::test]
    async fn test_concurrent_transfer_while_submitting() {
        let wallet = MockWallet {
            gate: Some(Notify::new()),
            ..MockWallet::default()
        };
        let (submitter, wallet, _chain) = submitter(wallet, MockChain::default());
        let mut attempts = submitter.subscribe();

        let first = tokio::spawn({
            let submitter = submitter.clone();
            async move { submitter.transfer(OWNER, RECIPIENT, U256::from(100)).await }
        });
        timeout(
            Duration::from_secs(1),
            attempts.wait_for(|a| a.phase == TransferPhase::Submitting),
        )
        .await
        .unwrap()
        .unwrap();

        let second = submitter.transfer(OWNER, RECIPIENT, U256::from(5)).await;
        assert_eq!(second, Err(TransferError::Concurrent));

        wallet.gate.as_ref().unwrap().notify_one();
        assert!(first.await.unwrap().is_ok());
        // Only the first transfer reached the wallet.
        assert_eq!(wallet.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_transfer_while_pending() {
        let chain = MockChain {
            gate: Some(Notify::new()),
            ..MockChain::default()
        };
        let (submitter, wallet, chain) = submitter(MockWallet::default(), chain);
        let mut attempts = submitter.subscribe();

        let first = tokio::spawn({
            let submitter = submitter.clone();
            async move { submitter.transfer(OWNER, RECIPIENT, U256::from(100)).await }
        });
        let pending = timeout(
            Duration::from_secs(1),
            attempts.wait_for(|a| a.phase == TransferPhase::Pending),
        )
        .await
        .unwrap()
        .unwrap()
        .clone();
        assert_eq!(pending.tx_hash, Some(TX_HASH));
        assert!(submitter.is_in_flight());

        assert_eq!(
            submitter.transfer(OWNER, RECIPIENT, U256::from(5)).await,
            Err(TransferError::Concurrent)
        );
        // The in-flight attempt is untouched by the rejected call.
        assert_eq!(submitter.attempt().tx_hash, Some(TX_HASH));

        chain.gate.as_ref().unwrap().notify_one();
        assert!(first.await.unwrap().is_ok());
        assert_eq!(wallet.sent.lock().unwrap().len(), 1);
        assert_eq!(submitter.attempt().phase, TransferPhase::Idle);
    }
}
