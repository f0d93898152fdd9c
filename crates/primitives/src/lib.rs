//! Primitive data types shared by the KAS wallet crates: signatures, on-chain account keys, the
//! transaction model and the multisig bookkeeping types reported by the custodial service.

pub mod account_key;
pub mod errors;
pub mod multisig;
pub mod signature;
pub mod tx;

/// Re-exports of the most commonly used types.
pub mod prelude {
    pub use alloy_primitives::{Address, Bytes, B256, U256, U64};

    pub use crate::{
        account_key::{
            AccountKey, KeyRole, KeyType, PublicKey, RoleBasedKey, RoleKey, WeightedMultiSig,
            WeightedPublicKey,
        },
        errors::{KeyError, TxError},
        multisig::{
            MultisigSignature, MultisigSignatureResult, MultisigTxStatus, MultisigUpdate,
            PendingMultisigTx,
        },
        signature::SignatureData,
        tx::{Transaction, TxBody, TxType},
    };
}
