//! Defines the [`MultisigTxState`] type that tracks what has been observed about the signature
//! collection of a multisig transaction.

use std::collections::BTreeSet;

use alloy_primitives::{Address, B256};
use kas_primitives::multisig::{MultisigTxStatus, PendingMultisigTx};

/// The observed progress of a multisig transaction.
///
/// The custodial service is the authority; this is what its responses have shown so far. Weight
/// and status only ever move forward here, whatever order responses arrive in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultisigTxState {
    /// Id assigned by the custodial service.
    transaction_id: B256,

    /// The sending account, once a listing has reported it.
    from: Option<Address>,

    /// The weight required for submission, once a listing has reported it.
    threshold: Option<u32>,

    /// The highest signed weight observed.
    signed_weight: u32,

    /// The most advanced status observed.
    status: MultisigTxStatus,

    /// Signers known to have signed.
    signers: BTreeSet<Address>,

    /// Signers that had not signed as of the latest accepted observation.
    reminders: Vec<Address>,
}

impl MultisigTxState {
    /// Create a new [`MultisigTxState`] for a transaction nothing is known about yet.
    pub fn new(transaction_id: B256) -> Self {
        Self {
            transaction_id,
            from: None,
            threshold: None,
            signed_weight: 0,
            status: MultisigTxStatus::Pending,
            signers: BTreeSet::new(),
            reminders: Vec::new(),
        }
    }

    /// Create a new [`MultisigTxState`] from a listing entry.
    pub fn from_pending(pending: &PendingMultisigTx) -> Self {
        let mut state = Self::new(pending.transaction_id);
        state.observe_pending(pending);
        state
    }

    /// Get the transaction id.
    pub fn transaction_id(&self) -> B256 {
        self.transaction_id
    }

    /// Get the sending account, if known.
    pub fn from(&self) -> Option<Address> {
        self.from
    }

    /// Get the required weight, if known.
    pub fn threshold(&self) -> Option<u32> {
        self.threshold
    }

    /// Get the highest signed weight observed.
    pub fn signed_weight(&self) -> u32 {
        self.signed_weight
    }

    /// Get the most advanced status observed.
    pub fn status(&self) -> MultisigTxStatus {
        self.status
    }

    /// Get the signers known to have signed.
    pub fn signers(&self) -> &BTreeSet<Address> {
        &self.signers
    }

    /// Get the signers that have not signed yet.
    pub fn reminders(&self) -> &[Address] {
        &self.reminders[..]
    }

    /// Whether the service has submitted the transaction.
    pub fn is_submitted(&self) -> bool {
        self.status.is_terminal()
    }

    /// Record that `signer` has signed.
    pub fn add_signer(&mut self, signer: Address) {
        self.signers.insert(signer);
    }

    /// Apply a response from the service.
    ///
    /// # Returns
    ///
    /// `false` if the response reported less weight or an earlier status than already observed.
    /// Such a response is stale; it does not move the state backwards and its reminders are
    /// ignored.
    pub fn observe(
        &mut self,
        signed_weight: u32,
        status: MultisigTxStatus,
        reminders: &[Address],
    ) -> bool {
        let stale = signed_weight < self.signed_weight || status < self.status;

        self.signed_weight = self.signed_weight.max(signed_weight);
        self.status = self.status.max(status);

        if !stale {
            self.reminders = reminders.to_vec();
        }

        !stale
    }

    /// Apply a listing entry, which also carries the sender, threshold and signers.
    pub fn observe_pending(&mut self, pending: &PendingMultisigTx) -> bool {
        self.from = Some(pending.from);
        self.threshold = Some(pending.threshold);
        self.signers.extend(pending.signatures.iter().map(|sig| sig.signer));

        self.observe(pending.signed_weight, pending.status, &pending.reminders)
    }
}

#[cfg(test)]
mod tests {
    use alloy_primitives::U256;
    use kas_primitives::{multisig::MultisigSignature, signature::SignatureData};

    use super::*;

    #[test]
    fn test_weight_never_decreases() {
        let mut state = MultisigTxState::new(B256::repeat_byte(1));
        let signer = Address::repeat_byte(0x0a);

        assert!(state.observe(2, MultisigTxStatus::Signed, &[signer]));
        assert!(
            !state.observe(1, MultisigTxStatus::Signed, &[]),
            "lower weight must be reported as stale"
        );

        assert_eq!(state.signed_weight(), 2);
        assert_eq!(state.reminders(), &[signer], "stale reminders are ignored");
    }

    #[test]
    fn test_status_never_moves_back() {
        let mut state = MultisigTxState::new(B256::repeat_byte(1));

        assert!(state.observe(3, MultisigTxStatus::Submitted, &[]));
        assert!(!state.observe(3, MultisigTxStatus::Signed, &[]));

        assert!(state.is_submitted());
    }

    #[test]
    fn test_from_pending() {
        let signer = Address::repeat_byte(0x0a);
        let pending = PendingMultisigTx {
            transaction_id: B256::repeat_byte(7),
            from: Address::repeat_byte(0x01),
            threshold: 3,
            signed_weight: 1,
            status: MultisigTxStatus::Pending,
            signatures: vec![MultisigSignature {
                signer,
                weight: 1,
                signature: SignatureData::new(0x7f6, U256::from(1), U256::from(2)),
            }],
            reminders: vec![Address::repeat_byte(0x0b)],
        };

        let state = MultisigTxState::from_pending(&pending);

        assert_eq!(state.transaction_id(), pending.transaction_id);
        assert_eq!(state.from(), Some(pending.from));
        assert_eq!(state.threshold(), Some(3));
        assert_eq!(state.signed_weight(), 1);
        assert!(state.signers().contains(&signer));
        assert!(!state.is_submitted());
    }
}
