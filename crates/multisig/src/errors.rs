//! Defines errors associated with multisig coordination.

use kas_client::error::KasError;
use thiserror::Error;

/// Errors that may occur while coordinating a multisig transaction.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MultisigError {
    /// The custodial service rejected the request or could not be reached.
    #[error("custodial service: {0}")]
    Api(#[from] KasError),

    /// A placeholder signature was submitted; nothing was sent.
    #[error("cannot append an empty signature")]
    EmptySignature,
}

/// Result type alias for multisig coordination with [`MultisigError`] as the error variant.
pub type MultisigResult<T> = Result<T, MultisigError>;
