//! Errors produced while building, encoding or decoding primitive types.

use thiserror::Error;

/// Errors while constructing or decoding an [`AccountKey`](crate::account_key::AccountKey).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    /// The multisig threshold must be at least 1.
    #[error("multisig threshold must be positive")]
    ZeroThreshold,

    /// Every key in a weighted multisig must carry a positive weight.
    #[error("weighted key at position {0} has zero weight")]
    ZeroWeight(usize),

    /// The threshold can never be met by the provided keys.
    #[error("threshold {threshold} exceeds total key weight {total}")]
    UnreachableThreshold {
        /// Configured threshold.
        threshold: u32,
        /// Sum of all key weights.
        total: u64,
    },

    /// A role-based key may not contain another role-based key.
    #[error("role-based keys cannot be nested")]
    NestedRoleBased,

    /// A role-based key has exactly three roles.
    #[error("role-based key must have 3 roles, got {0}")]
    RoleCount(usize),

    /// The `keyType` discriminator is not known.
    #[error("unknown key type {0}")]
    UnknownKeyType(u8),

    /// The key payload does not match its declared type.
    #[error("malformed key payload: {0}")]
    Malformed(String),
}

impl From<serde_json::Error> for KeyError {
    fn from(value: serde_json::Error) -> Self {
        Self::Malformed(value.to_string())
    }
}

/// Errors while encoding or decoding a [`Transaction`](crate::tx::Transaction).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TxError {
    /// A field required for the encoding has not been set (or filled) yet.
    #[error("transaction field `{0}` is not set")]
    MissingField(&'static str),

    /// The leading type byte does not correspond to a known transaction type.
    #[error("unknown transaction type {0:#04x}")]
    UnknownType(u8),

    /// Nothing to decode.
    #[error("empty transaction encoding")]
    Empty,

    /// The encoding has bytes left over after the transaction.
    #[error("{0} trailing bytes after transaction")]
    TrailingBytes(usize),

    /// Malformed RLP.
    #[error("rlp: {0}")]
    Rlp(#[from] alloy_rlp::Error),
}

/// Result alias for key operations.
pub type KeyResult<T> = Result<T, KeyError>;

/// Result alias for transaction encoding operations.
pub type TxResult<T> = Result<T, TxError>;
