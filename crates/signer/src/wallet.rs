//! Defines the [`KasWallet`], which signs transactions with accounts held by the custodial service.

use std::sync::Arc;

use alloy_primitives::Address;
use kas_client::{
    traits::{NodeApi, WalletApi},
    types::{Account, AccountStatus},
};
use kas_primitives::{account_key::KeyRole, tx::Transaction};
use tracing::*;

use crate::{
    classifier::{classify, effective_key_type, sender_role, Eligibility},
    errors::{PreconditionError, SignerResult},
    gateway::{RemoteSigningResult, SigningGateway, SigningRole},
    merge::merge_signatures,
};

/// A wallet whose keys live in the custodial service.
///
/// Holds explicit handles to the custodial service and the node. The wallet keeps no state of its
/// own, so it can be shared freely; a given [`Transaction`] must not be signed concurrently.
#[derive(Debug)]
pub struct KasWallet<W, N> {
    wallet: Arc<W>,
    node: Arc<N>,
    gateway: SigningGateway<W, N>,
}

impl<W, N> Clone for KasWallet<W, N> {
    fn clone(&self) -> Self {
        Self {
            wallet: self.wallet.clone(),
            node: self.node.clone(),
            gateway: self.gateway.clone(),
        }
    }
}

impl<W: WalletApi, N: NodeApi> KasWallet<W, N> {
    /// Create a new [`KasWallet`].
    pub fn new(wallet: Arc<W>, node: Arc<N>) -> Self {
        let gateway = SigningGateway::new(wallet.clone(), node.clone());
        Self {
            wallet,
            node,
            gateway,
        }
    }

    /// Create `num` new accounts and return their addresses.
    pub async fn generate(&self, num: usize) -> SignerResult<Vec<Address>> {
        let mut addresses = Vec::with_capacity(num);
        for _ in 0..num {
            let account = self.wallet.create_account().await?;
            addresses.push(account.address);
        }

        info!(count = %num, "Generated accounts");
        Ok(addresses)
    }

    /// Fetch an account.
    pub async fn get_account(&self, address: Address) -> SignerResult<Account> {
        Ok(self.wallet.get_account(address).await?)
    }

    /// Whether the service holds the account.
    ///
    /// Only a "data doesn't exist" error counts as absent; any other error is returned.
    pub async fn is_existed(&self, address: Address) -> SignerResult<bool> {
        match self.wallet.get_account(address).await {
            Ok(_) => Ok(true),
            Err(err) if err.is_not_found() => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    /// Delete an account.
    pub async fn remove(&self, address: Address) -> SignerResult<AccountStatus> {
        let status = self.wallet.delete_account(address).await?;
        info!(%address, status = %status.status, "Removed account");
        Ok(status)
    }

    /// Sign the transaction as its sender.
    ///
    /// An unset sender defaults to `address`. The sender signatures returned by the service
    /// replace the existing ones; signatures that were already present are kept after them. On
    /// error the transaction is left as it was.
    pub async fn sign_as_sender(&self, address: Address, tx: &mut Transaction) -> SignerResult<()> {
        if let Some(from) = tx.from().filter(|from| !from.is_zero()) {
            if from != address {
                warn!(%from, %address, "Refusing to sign for a different sender");
                return Err(PreconditionError::AddressMismatch {
                    role: "sender",
                    declared: from,
                    signer: address,
                }
                .into());
            }
        }

        if tx.tx_type().is_legacy() && tx.signatures().iter().any(|sig| !sig.is_empty()) {
            warn!(%address, "Legacy transaction is already signed");
            return Err(PreconditionError::LegacyMultipleSignatures.into());
        }

        self.ensure_single_shot(address, sender_role(tx.tx_type())).await?;

        let previous = tx.replace_from(Some(address));
        let result = match self.gateway.request_signature(tx, SigningRole::Sender).await {
            Ok(result) => result,
            Err(err) => {
                tx.replace_from(previous);
                return Err(err);
            }
        };

        let (signatures, snapshot) = result.into_signatures();
        let signatures = merge_signatures(&snapshot, &signatures);
        debug!(%address, count = %signatures.len(), "Signed as sender");
        tx.set_signatures(signatures);

        Ok(())
    }

    /// Sign the transaction as its fee payer.
    ///
    /// Without a fee payer (or with the zero address) the service's own fee payer signs, see
    /// [`Self::sign_as_global_fee_payer`]. Otherwise an unset fee payer defaults to `fee_payer`.
    /// The returned fee payer signatures are merged into the existing ones. On error the
    /// transaction is left as it was.
    pub async fn sign_as_fee_payer(
        &self,
        fee_payer: Option<Address>,
        tx: &mut Transaction,
    ) -> SignerResult<()> {
        let Some(address) = fee_payer.filter(|addr| !addr.is_zero()) else {
            return self.sign_as_global_fee_payer(tx).await;
        };

        ensure_fee_delegated(tx)?;

        if let Some(declared) = tx.fee_payer().filter(|declared| !declared.is_zero()) {
            if declared != address {
                warn!(%declared, %address, "Refusing to sign for a different fee payer");
                return Err(PreconditionError::AddressMismatch {
                    role: "fee payer",
                    declared,
                    signer: address,
                }
                .into());
            }
        }

        self.ensure_single_shot(address, KeyRole::FeePayer).await?;

        let previous = tx.replace_fee_payer(Some(address));
        let outcome = match self
            .gateway
            .request_signature(tx, SigningRole::FeePayer(Some(address)))
            .await
        {
            Ok(result) => self.apply_fee_payer_result(tx, result),
            Err(err) => Err(err),
        };

        if outcome.is_err() {
            tx.replace_fee_payer(previous);
        }
        outcome
    }

    /// Sign the transaction with the custodial service's own fee payer.
    ///
    /// If the transaction already declares a fee payer, the service must have signed as that same
    /// account; otherwise the call fails and the transaction is left unchanged.
    pub async fn sign_as_global_fee_payer(&self, tx: &mut Transaction) -> SignerResult<()> {
        ensure_fee_delegated(tx)?;

        let result = self
            .gateway
            .request_signature(tx, SigningRole::FeePayer(None))
            .await?;
        self.apply_fee_payer_result(tx, result)
    }

    /// Fail if the key of `address` needs several signatures for `role`.
    async fn ensure_single_shot(&self, address: Address, role: KeyRole) -> SignerResult<()> {
        let key = self.node.get_account_key(address).await?;

        if let Some(key) = key {
            if classify(Some(&key), role) == Eligibility::RequiresMultisig {
                let key_type = effective_key_type(&key, role);
                warn!(%address, ?role, ?key_type, "Key requires multiple signatures");
                return Err(PreconditionError::UnsupportedKey { address, key_type }.into());
            }
        }

        trace!(%address, ?role, "Key eligible for single-shot signing");
        Ok(())
    }

    fn apply_fee_payer_result(
        &self,
        tx: &mut Transaction,
        result: RemoteSigningResult,
    ) -> SignerResult<()> {
        let fee_payer = result.fee_payer();
        let (signatures, snapshot) = result.into_signatures();

        if let Some(signed) = fee_payer {
            match tx.fee_payer() {
                Some(declared) if !declared.is_zero() && declared != signed => {
                    warn!(%declared, %signed, "Service signed for a different fee payer");
                    tx.set_fee_payer_signatures(snapshot);
                    return Err(PreconditionError::FeePayerMismatch { declared, signed }.into());
                }
                Some(declared) if !declared.is_zero() => {}
                _ => tx.set_fee_payer(signed),
            }
        }

        let signatures = merge_signatures(&snapshot, &signatures);
        debug!(fee_payer = ?tx.fee_payer(), count = %signatures.len(), "Signed as fee payer");
        tx.set_fee_payer_signatures(signatures);

        Ok(())
    }
}

fn ensure_fee_delegated(tx: &Transaction) -> SignerResult<()> {
    if tx.tx_type().is_fee_delegated() {
        Ok(())
    } else {
        Err(PreconditionError::NotFeeDelegated(tx.tx_type()).into())
    }
}
