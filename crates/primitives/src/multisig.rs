//! Types describing transactions that wait for signatures from several weighted signers.

use alloy_primitives::{Address, B256};
use serde::{Deserialize, Serialize};

use crate::signature::SignatureData;

/// The lifecycle of a multisig transaction as tracked by the custodial service.
///
/// Ordered so that a status can only be observed to move forward.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MultisigTxStatus {
    /// Created; only the creator's signature has been collected.
    Pending,

    /// More signatures have been collected but the threshold has not been reached.
    Signed,

    /// The threshold was reached and the service broadcast the transaction.
    Submitted,
}

impl MultisigTxStatus {
    /// Whether the transaction has left the signature collection phase.
    pub fn is_terminal(&self) -> bool {
        matches!(self, MultisigTxStatus::Submitted)
    }
}

/// A signature contributed by one signer of a multisig account.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultisigSignature {
    /// The signer's address.
    pub signer: Address,

    /// The weight of the signer's key.
    pub weight: u32,

    /// The signature itself.
    pub signature: SignatureData,
}

/// A multisig transaction that is waiting for signatures.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingMultisigTx {
    /// Id assigned by the custodial service.
    pub transaction_id: B256,

    /// The multisig account that sends the transaction.
    pub from: Address,

    /// Weight required before the service submits the transaction.
    pub threshold: u32,

    /// Weight collected so far.
    pub signed_weight: u32,

    /// Current status.
    pub status: MultisigTxStatus,

    /// Signatures collected so far.
    #[serde(default)]
    pub signatures: Vec<MultisigSignature>,

    /// Signers that have not signed yet.
    #[serde(default)]
    pub reminders: Vec<Address>,
}

/// The outcome of asking the custodial service to sign a multisig transaction on behalf of one of
/// its signers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultisigSignatureResult {
    /// The transaction that was signed.
    pub transaction_id: B256,

    /// The signer that signed.
    pub signer: Address,

    /// The produced signature.
    pub signature: SignatureData,

    /// Weight of the signer's key.
    pub weight: u32,

    /// Weight collected so far, including this signature.
    pub signed_weight: u32,

    /// Status after the signature was recorded.
    pub status: MultisigTxStatus,

    /// Signers that have not signed yet.
    #[serde(default)]
    pub reminders: Vec<Address>,
}

/// The outcome of appending externally obtained signatures to a multisig transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultisigUpdate {
    /// Weight collected so far.
    pub signed_weight: u32,

    /// Status after the signatures were recorded.
    pub status: MultisigTxStatus,

    /// Signers that have not signed yet.
    #[serde(default)]
    pub reminders: Vec<Address>,
}
