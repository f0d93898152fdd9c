//! Decides whether a single signing request can authorize a transaction for a given account.

use kas_primitives::{
    account_key::{AccountKey, KeyRole, KeyType},
    tx::TxType,
};

/// Whether a role of an account can be signed for in one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eligibility {
    /// One signature authorizes the role.
    SingleShot,

    /// The role is held by a weighted multisig key and has to go through multisig coordination.
    RequiresMultisig,
}

/// The key type that authorizes `role` for an account with the given key.
///
/// Role-based keys resolve to the key of the requested role; every other key authorizes all roles.
pub fn effective_key_type(key: &AccountKey, role: KeyRole) -> KeyType {
    match key {
        AccountKey::RoleBased(roles) => roles.get(role).key_type(),
        other => other.key_type(),
    }
}

/// Classify the key of an account for the given role.
///
/// An account without a key on chain has not been used yet and falls back to the chain default,
/// which is always eligible.
pub fn classify(key: Option<&AccountKey>, role: KeyRole) -> Eligibility {
    let Some(key) = key else {
        return Eligibility::SingleShot;
    };

    match effective_key_type(key, role) {
        KeyType::WeightedMultiSig => Eligibility::RequiresMultisig,
        KeyType::Legacy | KeyType::Public | KeyType::Fail | KeyType::RoleBased => {
            Eligibility::SingleShot
        }
    }
}

/// The role a sender signs with: account updates use the account update key, everything else the
/// transaction key.
pub fn sender_role(tx_type: TxType) -> KeyRole {
    if tx_type.is_account_update() {
        KeyRole::AccountUpdate
    } else {
        KeyRole::Transaction
    }
}
