//! Defines the errors that the signing orchestration can surface.
//!
//! Callers must be able to tell apart a rejected request (nothing was sent), an error the service
//! reported on purpose and a failed transport, so each has its own variant.

use alloy_primitives::Address;
use kas_client::error::{ClientError, KasError, ServiceError};
use kas_primitives::{account_key::KeyType, errors::TxError, tx::TxType};
use thiserror::Error;

/// A request that was rejected locally, before any signing request left the process.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PreconditionError {
    /// The transaction already names a different account for the role being signed.
    #[error("{role} address mismatch: transaction declares {declared}, signing with {signer}")]
    AddressMismatch {
        /// `sender` or `fee payer`.
        role: &'static str,
        /// The address on the transaction.
        declared: Address,
        /// The address that was asked to sign.
        signer: Address,
    },

    /// The account's key needs several signatures, which a single signing request cannot
    /// produce.
    #[error("{key_type:?} key of {address} requires multiple signatures and is not supported for single-shot signing")]
    UnsupportedKey {
        /// The account being signed for.
        address: Address,
        /// The effective key type for the role.
        key_type: KeyType,
    },

    /// A legacy transaction already carries its one signature.
    #[error("Legacy transactions cannot contain multiple signatures.")]
    LegacyMultipleSignatures,

    /// The service signed for a different fee payer than the one the transaction declares.
    #[error("fee payer mismatch: transaction declares {declared}, service signed as {signed}")]
    FeePayerMismatch {
        /// The fee payer on the transaction.
        declared: Address,
        /// The fee payer in the service's response.
        signed: Address,
    },

    /// A fee payer signature was requested for a transaction without fee delegation.
    #[error("{0:?} transactions have no fee payer")]
    NotFeeDelegated(TxType),
}

/// Errors returned by the signing operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SignerError {
    /// The request was rejected locally and nothing was sent.
    #[error("invalid signing request: {0}")]
    Precondition(#[from] PreconditionError),

    /// The custodial service or the node reported an error.
    #[error(transparent)]
    Service(ServiceError),

    /// A remote call did not complete.
    #[error(transparent)]
    Transport(ClientError),

    /// The transaction could not be encoded, or the service's response could not be decoded.
    #[error("transaction encoding: {0}")]
    Encoding(#[from] TxError),
}

impl From<KasError> for SignerError {
    fn from(value: KasError) -> Self {
        match value {
            KasError::Service(err) => SignerError::Service(err),
            KasError::Transport(err) => SignerError::Transport(err),
        }
    }
}

impl SignerError {
    /// Whether the request was rejected before anything was sent.
    pub fn is_precondition(&self) -> bool {
        matches!(self, SignerError::Precondition(_))
    }
}

/// Result type alias for the signing operations with [`SignerError`] as the error variant.
pub type SignerResult<T> = Result<T, SignerError>;
