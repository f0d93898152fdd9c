//! Define the [`MultisigTracker`] that relays signing requests and signatures for multisig
//! transactions to the custodial service.

use std::{collections::HashMap, sync::Arc};

use alloy_primitives::{Address, B256};
use kas_client::traits::WalletApi;
use kas_primitives::{
    multisig::{MultisigSignatureResult, MultisigUpdate, PendingMultisigTx},
    signature::SignatureData,
};
use parking_lot::RwLock;
use tracing::*;

use crate::{
    errors::{MultisigError, MultisigResult},
    state::MultisigTxState,
};

/// Relays multisig operations to the custodial service and keeps an observed view of each
/// transaction.
///
/// The service counts the weights and decides when to submit. Calls for the same transaction from
/// different signers may run concurrently; no lock is held while a request is in flight.
#[derive(Debug)]
pub struct MultisigTracker<W> {
    /// The custodial service.
    wallet: Arc<W>,

    /// What has been observed per transaction id.
    states: RwLock<HashMap<B256, MultisigTxState>>,
}

impl<W: WalletApi> MultisigTracker<W> {
    /// Create a new [`MultisigTracker`].
    pub fn new(wallet: Arc<W>) -> Self {
        Self {
            wallet,
            states: RwLock::new(HashMap::new()),
        }
    }

    /// Ask the service to sign the transaction on behalf of `signer`.
    ///
    /// The service's response is returned as is.
    pub async fn request_signature(
        &self,
        signer: Address,
        transaction_id: B256,
    ) -> MultisigResult<MultisigSignatureResult> {
        let result = self
            .wallet
            .request_multisig_signature(signer, transaction_id)
            .await?;

        debug!(
            %transaction_id,
            %signer,
            weight = %result.weight,
            signed_weight = %result.signed_weight,
            status = ?result.status,
            "Multisig signature requested"
        );

        self.with_state(transaction_id, |state| {
            state.add_signer(signer);
            state.observe(result.signed_weight, result.status, &result.reminders)
        });

        Ok(result)
    }

    /// Add a signature obtained elsewhere to the transaction.
    ///
    /// Appending a signature the service already holds does not add weight.
    pub async fn append_signature(
        &self,
        transaction_id: B256,
        signature: SignatureData,
    ) -> MultisigResult<MultisigUpdate> {
        if signature.is_empty() {
            warn!(%transaction_id, "Refusing to append an empty signature");
            return Err(MultisigError::EmptySignature);
        }

        let update = self
            .wallet
            .append_multisig_signatures(transaction_id, vec![signature])
            .await?;

        debug!(
            %transaction_id,
            signed_weight = %update.signed_weight,
            status = ?update.status,
            "Multisig signature appended"
        );

        self.with_state(transaction_id, |state| {
            state.observe(update.signed_weight, update.status, &update.reminders)
        });

        Ok(update)
    }

    /// List the transactions of `account` that are waiting for signatures.
    pub async fn list_pending(&self, account: Address) -> MultisigResult<Vec<PendingMultisigTx>> {
        let pending = self
            .wallet
            .list_pending_multisig_transactions(account)
            .await?;

        trace!(%account, count = %pending.len(), "Listed pending multisig transactions");

        for tx in &pending {
            self.with_state(tx.transaction_id, |state| state.observe_pending(tx));
        }

        Ok(pending)
    }

    /// Get the observed state of a transaction.
    pub fn state(&self, transaction_id: &B256) -> Option<MultisigTxState> {
        self.states.read().get(transaction_id).cloned()
    }

    /// Stop tracking a transaction, returning what was observed about it.
    ///
    /// Nothing is ever dropped on its own; callers forget a transaction once it is submitted or
    /// no longer of interest.
    pub fn forget(&self, transaction_id: &B256) -> Option<MultisigTxState> {
        let state = self.states.write().remove(transaction_id);
        if let Some(state) = &state {
            trace!(%transaction_id, status = ?state.status(), "Forgot multisig transaction");
        }
        state
    }

    fn with_state(
        &self,
        transaction_id: B256,
        update: impl FnOnce(&mut MultisigTxState) -> bool,
    ) {
        let mut states = self.states.write();
        let state = states
            .entry(transaction_id)
            .or_insert_with(|| MultisigTxState::new(transaction_id));

        let before = state.signed_weight();
        if !update(state) {
            warn!(
                %transaction_id,
                observed = %before,
                "Ignoring stale multisig response"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use alloy_primitives::U256;
    use kas_client::{
        error::{KasError, ServiceError, DATA_NOT_FOUND},
        traits::MockWalletApi,
    };
    use kas_primitives::multisig::MultisigTxStatus;
    use kas_test_utils::{ArbitraryGenerator, FakeKas};

    use super::*;

    const ACCOUNT: Address = Address::repeat_byte(0x01);
    const A: Address = Address::repeat_byte(0x0a);
    const B: Address = Address::repeat_byte(0x0b);
    const C: Address = Address::repeat_byte(0x0c);

    fn setup() -> (Arc<FakeKas>, MultisigTracker<FakeKas>, B256) {
        let fake = Arc::new(FakeKas::new());
        let id = fake.propose_multisig(ACCOUNT, 3, vec![(A, 1), (B, 1), (C, 1)]);
        let tracker = MultisigTracker::new(fake.clone());
        (fake, tracker, id)
    }

    #[tokio::test]
    async fn test_append_is_idempotent() {
        let (fake, tracker, id) = setup();
        let signature = fake.multisig_signature(B, id);

        let first = tracker
            .append_signature(id, signature)
            .await
            .expect("append should succeed");
        let second = tracker
            .append_signature(id, signature)
            .await
            .expect("append should succeed");

        assert_eq!(
            first.signed_weight, second.signed_weight,
            "duplicate signature must not add weight"
        );
        assert_eq!(second.signed_weight, 2);
        assert_eq!(second.status, MultisigTxStatus::Signed);

        let state = tracker.state(&id).expect("state should be tracked");
        assert_eq!(state.signed_weight(), 2);
    }

    #[tokio::test]
    async fn test_request_until_submitted() {
        let (_fake, tracker, id) = setup();

        let result = tracker
            .request_signature(B, id)
            .await
            .expect("request should succeed");
        assert_eq!(result.weight, 1);
        assert_eq!(result.signed_weight, 2);
        assert_eq!(result.reminders, vec![C]);

        let result = tracker
            .request_signature(C, id)
            .await
            .expect("request should succeed");
        assert_eq!(result.status, MultisigTxStatus::Submitted);

        let state = tracker.state(&id).expect("state should be tracked");
        assert!(state.is_submitted());
        assert!(state.signers().contains(&B) && state.signers().contains(&C));
        assert!(state.reminders().is_empty());
    }

    #[tokio::test]
    async fn test_list_pending_seeds_state() {
        let (_fake, tracker, id) = setup();

        let pending = tracker
            .list_pending(ACCOUNT)
            .await
            .expect("listing should succeed");
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].transaction_id, id);

        let state = tracker.state(&id).expect("listing should seed state");
        assert_eq!(state.threshold(), Some(3));
        assert_eq!(state.from(), Some(ACCOUNT));
        assert!(state.signers().contains(&A), "proposer has signed");

        assert!(tracker
            .list_pending(ArbitraryGenerator::new().address())
            .await
            .expect("listing should succeed")
            .is_empty());
    }

    #[tokio::test]
    async fn test_forget_submitted_transaction() {
        let (_fake, tracker, id) = setup();

        for signer in [B, C] {
            tracker
                .request_signature(signer, id)
                .await
                .expect("request should succeed");
        }

        let state = tracker.forget(&id).expect("state should be tracked");
        assert!(state.is_submitted());
        assert!(tracker.state(&id).is_none(), "forgotten state must be dropped");
        assert!(tracker.forget(&id).is_none());
    }

    #[tokio::test]
    async fn test_empty_signature_is_not_sent() {
        let mut wallet = MockWalletApi::new();
        wallet.expect_append_multisig_signatures().times(0);
        let tracker = MultisigTracker::new(Arc::new(wallet));

        let err = tracker
            .append_signature(B256::repeat_byte(1), SignatureData::empty())
            .await
            .unwrap_err();
        assert_eq!(err, MultisigError::EmptySignature);
    }

    #[tokio::test]
    async fn test_stale_responses_do_not_regress() {
        let id = B256::repeat_byte(1);
        let signature = SignatureData::new(0x7f6, U256::from(1), U256::from(2));

        let mut wallet = MockWalletApi::new();
        let mut responses = vec![
            MultisigUpdate {
                signed_weight: 1,
                status: MultisigTxStatus::Pending,
                reminders: vec![A, B],
            },
            MultisigUpdate {
                signed_weight: 2,
                status: MultisigTxStatus::Signed,
                reminders: vec![B],
            },
        ];
        wallet
            .expect_append_multisig_signatures()
            .times(2)
            .returning(move |_, _| Ok(responses.pop().expect("two responses")));

        let tracker = MultisigTracker::new(Arc::new(wallet));
        tracker
            .append_signature(id, signature)
            .await
            .expect("append should succeed");
        let stale = tracker
            .append_signature(id, signature)
            .await
            .expect("append should succeed");

        assert_eq!(stale.signed_weight, 1, "responses are returned unchanged");

        let state = tracker.state(&id).expect("state should be tracked");
        assert_eq!(state.signed_weight(), 2);
        assert_eq!(state.status(), MultisigTxStatus::Signed);
        assert_eq!(state.reminders(), &[B]);
    }

    #[tokio::test]
    async fn test_service_errors_are_returned() {
        let (_fake, tracker, _id) = setup();

        let err = tracker
            .request_signature(A, B256::repeat_byte(0x42))
            .await
            .unwrap_err();

        assert_eq!(
            err,
            MultisigError::Api(KasError::Service(ServiceError {
                code: DATA_NOT_FOUND,
                message: "data don't exist".to_string(),
            }))
        );
        assert!(tracker.state(&B256::repeat_byte(0x42)).is_none());
    }
}
