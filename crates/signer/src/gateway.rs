//! Sends a transaction to the custodial service for signing and unwraps the signatures.
//!
//! The gateway only ever sees encoded transactions and signatures. Which endpoint is called
//! depends on whether the transaction is fee delegated and on the role being signed:
//!
//! | fee delegated | role                   | endpoint                     |
//! |---------------|------------------------|------------------------------|
//! | no            | sender                 | plain signing                |
//! | yes           | sender                 | signed by the global payer   |
//! | yes           | fee payer (given)      | signed by the user's payer   |
//! | yes           | fee payer (not given)  | signed by the global payer   |

use std::sync::Arc;

use alloy_primitives::Address;
use kas_client::traits::{NodeApi, WalletApi};
use kas_primitives::{signature::SignatureData, tx::Transaction};
use tracing::*;

use crate::errors::{PreconditionError, SignerResult};

/// The role a signature is requested for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SigningRole {
    /// Sign as the transaction's sender.
    Sender,

    /// Sign as fee payer. `None` lets the service's own fee payer sign.
    FeePayer(Option<Address>),
}

/// The signatures the service produced, tagged with the list they belong to.
///
/// Both variants carry the signatures that were on the transaction before the request so the
/// caller can merge them back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteSigningResult {
    /// Sender signatures; authoritative for the sender list.
    Sender {
        /// The signatures returned by the service.
        signatures: Vec<SignatureData>,
        /// The sender signatures the transaction held before the request.
        snapshot: Vec<SignatureData>,
    },

    /// Fee payer signatures, to be merged into the fee payer list.
    FeePayer {
        /// The fee payer the service signed as, if it reported one.
        fee_payer: Option<Address>,
        /// The signatures returned by the service.
        signatures: Vec<SignatureData>,
        /// The fee payer signatures the transaction held before the request.
        snapshot: Vec<SignatureData>,
    },
}

impl RemoteSigningResult {
    /// The fee payer the service signed as, for fee payer results.
    pub fn fee_payer(&self) -> Option<Address> {
        match self {
            RemoteSigningResult::Sender { .. } => None,
            RemoteSigningResult::FeePayer { fee_payer, .. } => *fee_payer,
        }
    }

    /// Split into the returned signatures and the snapshot.
    pub fn into_signatures(self) -> (Vec<SignatureData>, Vec<SignatureData>) {
        match self {
            RemoteSigningResult::Sender {
                signatures,
                snapshot,
            }
            | RemoteSigningResult::FeePayer {
                signatures,
                snapshot,
                ..
            } => (signatures, snapshot),
        }
    }
}

/// Requests signatures from the custodial service.
#[derive(Debug)]
pub struct SigningGateway<W, N> {
    wallet: Arc<W>,
    node: Arc<N>,
}

impl<W, N> Clone for SigningGateway<W, N> {
    fn clone(&self) -> Self {
        Self {
            wallet: self.wallet.clone(),
            node: self.node.clone(),
        }
    }
}

impl<W: WalletApi, N: NodeApi> SigningGateway<W, N> {
    /// Create a new [`SigningGateway`].
    pub fn new(wallet: Arc<W>, node: Arc<N>) -> Self {
        Self { wallet, node }
    }

    /// Request a signature for `role` on the transaction.
    ///
    /// The signature list of the role is cleared before encoding so the request does not carry
    /// stale signatures. It is handed back in the result, or restored if the request fails, so on
    /// error the transaction is left as it was. Missing nonce, gas price or chain id are filled in
    /// by the node.
    pub async fn request_signature(
        &self,
        tx: &mut Transaction,
        role: SigningRole,
    ) -> SignerResult<RemoteSigningResult> {
        if matches!(role, SigningRole::FeePayer(_)) && !tx.tx_type().is_fee_delegated() {
            return Err(PreconditionError::NotFeeDelegated(tx.tx_type()).into());
        }

        let snapshot = match role {
            SigningRole::Sender => tx.take_signatures(),
            SigningRole::FeePayer(_) => tx.take_fee_payer_signatures(),
        };

        match self.dispatch(tx, role).await {
            Ok((signatures, fee_payer)) => Ok(match role {
                SigningRole::Sender => RemoteSigningResult::Sender {
                    signatures,
                    snapshot,
                },
                SigningRole::FeePayer(_) => RemoteSigningResult::FeePayer {
                    fee_payer,
                    signatures,
                    snapshot,
                },
            }),
            Err(err) => {
                warn!(%err, ?role, "Signing request failed, restoring signatures");
                match role {
                    SigningRole::Sender => tx.set_signatures(snapshot),
                    SigningRole::FeePayer(_) => tx.set_fee_payer_signatures(snapshot),
                }
                Err(err)
            }
        }
    }

    /// Fill, encode and send the transaction. Returns the signatures and, for fee payer
    /// requests, the fee payer that signed.
    async fn dispatch(
        &self,
        tx: &mut Transaction,
        role: SigningRole,
    ) -> SignerResult<(Vec<SignatureData>, Option<Address>)> {
        if !tx.is_filled() {
            self.node.fill_transaction(tx).await?;
        }

        let rlp = tx.rlp_encoding()?;
        let fee_delegated = tx.tx_type().is_fee_delegated();
        debug!(tx_type = ?tx.tx_type(), ?role, "Dispatching signing request");

        let result = match (fee_delegated, role) {
            (false, SigningRole::Sender) => {
                let res = self.wallet.sign_raw_transaction(rlp).await?;
                (res.signatures, None)
            }

            (true, SigningRole::Sender) => {
                let res = self
                    .wallet
                    .sign_fd_raw_transaction_by_global_fee_payer(rlp)
                    .await?;

                // Older responses only carry the signed transaction.
                let signatures = if res.signatures.is_empty() {
                    Transaction::decode(&res.rlp)?.take_signatures()
                } else {
                    res.signatures
                };

                (signatures, None)
            }

            (true, SigningRole::FeePayer(Some(fee_payer))) => {
                let res = self
                    .wallet
                    .sign_fd_raw_transaction_by_user(rlp, Some(fee_payer))
                    .await?;

                (res.fee_payer_signatures, Some(fee_payer))
            }

            (true, SigningRole::FeePayer(None)) => {
                let res = self
                    .wallet
                    .sign_fd_raw_transaction_by_global_fee_payer(rlp)
                    .await?;

                let mut signed = Transaction::decode(&res.rlp)?;
                trace!(fee_payer = ?signed.fee_payer(), "Decoded globally paid transaction");

                (signed.take_fee_payer_signatures(), signed.fee_payer())
            }

            (false, SigningRole::FeePayer(_)) => {
                return Err(PreconditionError::NotFeeDelegated(tx.tx_type()).into());
            }
        };

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use alloy_primitives::{Bytes, U256};
    use kas_client::{
        error::{ClientError, KasError},
        traits::{MockNodeApi, MockWalletApi},
        types::{GlobalFeePayerSignatures, RawTxSignatures},
    };
    use kas_primitives::tx::TxType;
    use kas_test_utils::tx::{filled_tx, unfilled_tx};

    use super::*;
    use crate::errors::SignerError;

    fn sig(n: u64) -> SignatureData {
        SignatureData::new(0x7f5, U256::from(n), U256::from(n))
    }

    fn gateway(
        wallet: MockWalletApi,
        node: MockNodeApi,
    ) -> SigningGateway<MockWalletApi, MockNodeApi> {
        SigningGateway::new(Arc::new(wallet), Arc::new(node))
    }

    #[tokio::test]
    async fn test_plain_request_clears_stale_signatures() {
        let from = Address::repeat_byte(0x11);
        let mut tx = filled_tx(TxType::ValueTransfer, from).with_signatures(vec![sig(1)]);

        let mut wallet = MockWalletApi::new();
        wallet
            .expect_sign_raw_transaction()
            .times(1)
            .returning(|rlp| {
                let sent = Transaction::decode(&rlp).expect("request should be a transaction");
                assert!(
                    sent.signatures().is_empty(),
                    "stale signatures must not be sent"
                );
                Ok(RawTxSignatures {
                    signatures: vec![sig(2)],
                    rlp: None,
                    transaction_hash: None,
                })
            });

        let result = gateway(wallet, MockNodeApi::new())
            .request_signature(&mut tx, SigningRole::Sender)
            .await
            .expect("signing should succeed");

        assert_eq!(
            result,
            RemoteSigningResult::Sender {
                signatures: vec![sig(2)],
                snapshot: vec![sig(1)],
            }
        );
        assert!(tx.signatures().is_empty());
    }

    #[tokio::test]
    async fn test_fills_missing_defaults() {
        let from = Address::repeat_byte(0x11);
        let mut tx = unfilled_tx(TxType::ValueTransfer, from);

        let mut node = MockNodeApi::new();
        node.expect_fill_transaction().times(1).returning(|tx| {
            let body = tx.body_mut();
            body.nonce = Some(7);
            body.gas_price = Some(25_000_000_000);
            body.chain_id = Some(1001);
            Ok(())
        });

        let mut wallet = MockWalletApi::new();
        wallet
            .expect_sign_raw_transaction()
            .times(1)
            .returning(|_| {
                Ok(RawTxSignatures {
                    signatures: vec![sig(2)],
                    rlp: None,
                    transaction_hash: None,
                })
            });

        gateway(wallet, node)
            .request_signature(&mut tx, SigningRole::Sender)
            .await
            .expect("signing should succeed");

        assert_eq!(tx.body().nonce, Some(7));
        assert!(tx.is_filled());
    }

    #[tokio::test]
    async fn test_fee_payer_role_requires_fee_delegation() {
        let mut tx = filled_tx(TxType::ValueTransfer, Address::repeat_byte(0x11));

        let err = gateway(MockWalletApi::new(), MockNodeApi::new())
            .request_signature(&mut tx, SigningRole::FeePayer(None))
            .await
            .unwrap_err();

        assert_eq!(
            err,
            SignerError::Precondition(PreconditionError::NotFeeDelegated(TxType::ValueTransfer))
        );
    }

    #[tokio::test]
    async fn test_failure_restores_snapshot() {
        let from = Address::repeat_byte(0x11);
        let mut tx = filled_tx(TxType::FeeDelegatedValueTransfer, from);
        tx.set_fee_payer_signatures(vec![sig(5)]);

        let mut wallet = MockWalletApi::new();
        wallet
            .expect_sign_fd_raw_transaction_by_global_fee_payer()
            .times(1)
            .returning(|_| Err(KasError::Transport(ClientError::Timeout)));

        let err = gateway(wallet, MockNodeApi::new())
            .request_signature(&mut tx, SigningRole::FeePayer(None))
            .await
            .unwrap_err();

        assert_eq!(err, SignerError::Transport(ClientError::Timeout));
        assert_eq!(
            tx.fee_payer_signatures(),
            &[sig(5)],
            "fee payer signatures must be restored on failure"
        );
    }

    #[tokio::test]
    async fn test_global_fee_payer_decodes_response() {
        let from = Address::repeat_byte(0x11);
        let payer = Address::repeat_byte(0x22);
        let tx = filled_tx(TxType::FeeDelegatedValueTransfer, from);

        let mut signed = tx.clone().with_fee_payer(payer);
        signed.set_fee_payer_signatures(vec![sig(9)]);
        let signed_rlp: Bytes = signed.rlp_encoding().expect("fixture should encode");

        let mut wallet = MockWalletApi::new();
        wallet
            .expect_sign_fd_raw_transaction_by_global_fee_payer()
            .times(1)
            .returning(move |_| {
                Ok(GlobalFeePayerSignatures {
                    signatures: vec![],
                    rlp: signed_rlp.clone(),
                })
            });

        let mut tx = tx;
        let result = gateway(wallet, MockNodeApi::new())
            .request_signature(&mut tx, SigningRole::FeePayer(None))
            .await
            .expect("signing should succeed");

        assert_eq!(
            result,
            RemoteSigningResult::FeePayer {
                fee_payer: Some(payer),
                signatures: vec![sig(9)],
                snapshot: vec![],
            }
        );
    }
}
