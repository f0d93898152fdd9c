//! The operations the signing orchestration consumes from its collaborators.

use alloy_primitives::{Address, Bytes, B256};
use async_trait::async_trait;
use kas_primitives::{
    account_key::AccountKey,
    multisig::{MultisigSignatureResult, MultisigUpdate, PendingMultisigTx},
    signature::SignatureData,
    tx::Transaction,
};
#[cfg(any(test, feature = "test_utils"))]
use mockall::automock;

use crate::{
    error::KasResult,
    types::{
        Account, AccountStatus, GlobalFeePayerSignatures, RawTxSignatures, UserFeePayerSignatures,
    },
};

/// The custodial wallet service. It holds the private keys; callers only ever see signatures.
#[cfg_attr(any(test, feature = "test_utils"), automock)]
#[async_trait]
pub trait WalletApi: Send + Sync + 'static {
    /// Create a new account.
    async fn create_account(&self) -> KasResult<Account>;

    /// Fetch an account.
    async fn get_account(&self, address: Address) -> KasResult<Account>;

    /// Delete an account.
    async fn delete_account(&self, address: Address) -> KasResult<AccountStatus>;

    /// Sign a transaction without fee delegation as its sender.
    async fn sign_raw_transaction(&self, rlp: Bytes) -> KasResult<RawTxSignatures>;

    /// Sign a fee delegated transaction as its sender, with the service's own fee payer paying.
    async fn sign_fd_raw_transaction_by_global_fee_payer(
        &self,
        rlp: Bytes,
    ) -> KasResult<GlobalFeePayerSignatures>;

    /// Sign a fee delegated transaction as the fee payer, using one of the user's accounts.
    async fn sign_fd_raw_transaction_by_user(
        &self,
        rlp: Bytes,
        fee_payer: Option<Address>,
    ) -> KasResult<UserFeePayerSignatures>;

    /// Have the service produce `signer`'s contribution to a pending multisig transaction.
    async fn request_multisig_signature(
        &self,
        signer: Address,
        transaction_id: B256,
    ) -> KasResult<MultisigSignatureResult>;

    /// Add externally obtained signatures to a pending multisig transaction.
    async fn append_multisig_signatures(
        &self,
        transaction_id: B256,
        signatures: Vec<SignatureData>,
    ) -> KasResult<MultisigUpdate>;

    /// List the multisig transactions of `account` that are waiting for signatures.
    async fn list_pending_multisig_transactions(
        &self,
        account: Address,
    ) -> KasResult<Vec<PendingMultisigTx>>;
}

/// A chain node.
#[cfg_attr(any(test, feature = "test_utils"), automock)]
#[async_trait]
pub trait NodeApi: Send + Sync + 'static {
    /// Fetch the on-chain key of an account. `None` if the account does not exist on chain yet.
    async fn get_account_key(&self, address: Address) -> KasResult<Option<AccountKey>>;

    /// Fill the nonce, gas price and chain id of the transaction, leaving set fields untouched.
    async fn fill_transaction(&self, tx: &mut Transaction) -> KasResult<()>;
}
