//! On-chain account key descriptors.
//!
//! An account on the chain is authorized by one of five key kinds. The role-based kind assigns a
//! separate key to each transaction purpose; its roles are [`RoleKey`]s, which have no role-based
//! variant, so nesting is unrepresentable.

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::errors::{KeyError, KeyResult};

const KEY_TYPE_LEGACY: u8 = 1;
const KEY_TYPE_PUBLIC: u8 = 2;
const KEY_TYPE_FAIL: u8 = 3;
const KEY_TYPE_WEIGHTED_MULTISIG: u8 = 4;
const KEY_TYPE_ROLE_BASED: u8 = 5;

/// Number of roles in a [`RoleBasedKey`].
pub const ROLE_COUNT: usize = 3;

/// Uncompressed secp256k1 public key coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PublicKey {
    /// The x coordinate.
    pub x: U256,
    /// The y coordinate.
    pub y: U256,
}

/// A public key together with its voting weight inside a [`WeightedMultiSig`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightedPublicKey {
    /// Weight this key contributes once it has signed.
    pub weight: u32,
    /// The key itself.
    pub key: PublicKey,
}

/// A threshold key: a transaction is valid once the weights of the keys that signed it reach the
/// threshold.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct WeightedMultiSig {
    threshold: u32,
    keys: Vec<WeightedPublicKey>,
}

impl WeightedMultiSig {
    /// Create a new [`WeightedMultiSig`].
    ///
    /// # Errors
    ///
    /// If the threshold is zero, any weight is zero, or the weights cannot add up to the
    /// threshold.
    pub fn new(threshold: u32, keys: Vec<WeightedPublicKey>) -> KeyResult<Self> {
        if threshold == 0 {
            return Err(KeyError::ZeroThreshold);
        }

        if let Some(pos) = keys.iter().position(|k| k.weight == 0) {
            return Err(KeyError::ZeroWeight(pos));
        }

        let total = keys.iter().map(|k| k.weight as u64).sum::<u64>();
        if threshold as u64 > total {
            return Err(KeyError::UnreachableThreshold { threshold, total });
        }

        Ok(Self { threshold, keys })
    }

    /// Weight required for a transaction to become valid.
    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// The weighted keys.
    pub fn keys(&self) -> &[WeightedPublicKey] {
        &self.keys
    }

    /// Sum of all key weights.
    pub fn total_weight(&self) -> u64 {
        self.keys.iter().map(|k| k.weight as u64).sum()
    }
}

impl<'de> Deserialize<'de> for WeightedMultiSig {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Raw {
            threshold: u32,
            keys: Vec<WeightedPublicKey>,
        }

        let raw = Raw::deserialize(deserializer)?;
        WeightedMultiSig::new(raw.threshold, raw.keys).map_err(serde::de::Error::custom)
    }
}

/// The purposes a role-based key distinguishes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KeyRole {
    /// Regular transactions.
    Transaction,
    /// Transactions that update the account key itself.
    AccountUpdate,
    /// Paying fees on behalf of other accounts.
    FeePayer,
}

/// Discriminator of an account key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KeyType {
    /// Address-derived key.
    Legacy,
    /// Single public key.
    Public,
    /// Always fails validation.
    Fail,
    /// Weighted threshold key.
    WeightedMultiSig,
    /// Per-role keys.
    RoleBased,
}

/// A key that can fill a role inside a [`RoleBasedKey`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RoleKey {
    /// Address-derived key.
    Legacy,
    /// Single public key.
    Public(PublicKey),
    /// Always fails validation.
    Fail,
    /// Weighted threshold key.
    WeightedMultiSig(WeightedMultiSig),
}

impl RoleKey {
    /// The discriminator of this key.
    pub fn key_type(&self) -> KeyType {
        match self {
            RoleKey::Legacy => KeyType::Legacy,
            RoleKey::Public(_) => KeyType::Public,
            RoleKey::Fail => KeyType::Fail,
            RoleKey::WeightedMultiSig(_) => KeyType::WeightedMultiSig,
        }
    }
}

/// Separate keys per [`KeyRole`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoleBasedKey {
    /// Key for regular transactions.
    pub transaction: RoleKey,
    /// Key for account updates.
    pub account_update: RoleKey,
    /// Key for fee payment.
    pub fee_payer: RoleKey,
}

impl RoleBasedKey {
    /// Get the key that authorizes the given role.
    pub fn get(&self, role: KeyRole) -> &RoleKey {
        match role {
            KeyRole::Transaction => &self.transaction,
            KeyRole::AccountUpdate => &self.account_update,
            KeyRole::FeePayer => &self.fee_payer,
        }
    }
}

/// The key descriptor of an on-chain account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawAccountKey", into = "RawAccountKey")]
pub enum AccountKey {
    /// Address-derived key.
    Legacy,
    /// Single public key.
    Public(PublicKey),
    /// Always fails validation.
    Fail,
    /// Weighted threshold key.
    WeightedMultiSig(WeightedMultiSig),
    /// Per-role keys.
    RoleBased(RoleBasedKey),
}

impl AccountKey {
    /// The discriminator of this key.
    pub fn key_type(&self) -> KeyType {
        match self {
            AccountKey::Legacy => KeyType::Legacy,
            AccountKey::Public(_) => KeyType::Public,
            AccountKey::Fail => KeyType::Fail,
            AccountKey::WeightedMultiSig(_) => KeyType::WeightedMultiSig,
            AccountKey::RoleBased(_) => KeyType::RoleBased,
        }
    }
}

impl From<RoleKey> for AccountKey {
    fn from(value: RoleKey) -> Self {
        match value {
            RoleKey::Legacy => AccountKey::Legacy,
            RoleKey::Public(key) => AccountKey::Public(key),
            RoleKey::Fail => AccountKey::Fail,
            RoleKey::WeightedMultiSig(key) => AccountKey::WeightedMultiSig(key),
        }
    }
}

/// The `{ keyType, key }` shape returned by `klay_getAccountKey`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAccountKey {
    key_type: u8,
    #[serde(default)]
    key: Value,
}

impl TryFrom<RawAccountKey> for RoleKey {
    type Error = KeyError;

    fn try_from(raw: RawAccountKey) -> Result<Self, Self::Error> {
        match raw.key_type {
            KEY_TYPE_LEGACY => Ok(RoleKey::Legacy),
            KEY_TYPE_PUBLIC => Ok(RoleKey::Public(serde_json::from_value(raw.key)?)),
            KEY_TYPE_FAIL => Ok(RoleKey::Fail),
            KEY_TYPE_WEIGHTED_MULTISIG => {
                Ok(RoleKey::WeightedMultiSig(serde_json::from_value(raw.key)?))
            }
            KEY_TYPE_ROLE_BASED => Err(KeyError::NestedRoleBased),
            other => Err(KeyError::UnknownKeyType(other)),
        }
    }
}

impl TryFrom<RawAccountKey> for AccountKey {
    type Error = KeyError;

    fn try_from(raw: RawAccountKey) -> Result<Self, Self::Error> {
        if raw.key_type != KEY_TYPE_ROLE_BASED {
            return RoleKey::try_from(raw).map(Into::into);
        }

        let roles: Vec<RawAccountKey> = serde_json::from_value(raw.key)?;
        if roles.len() != ROLE_COUNT {
            return Err(KeyError::RoleCount(roles.len()));
        }

        let roles = roles
            .into_iter()
            .map(RoleKey::try_from)
            .collect::<KeyResult<Vec<_>>>()?;
        let [transaction, account_update, fee_payer]: [RoleKey; ROLE_COUNT] = roles
            .try_into()
            .map_err(|roles: Vec<RoleKey>| KeyError::RoleCount(roles.len()))?;

        Ok(AccountKey::RoleBased(RoleBasedKey {
            transaction,
            account_update,
            fee_payer,
        }))
    }
}

impl From<RoleKey> for RawAccountKey {
    fn from(value: RoleKey) -> Self {
        match value {
            RoleKey::Legacy => RawAccountKey {
                key_type: KEY_TYPE_LEGACY,
                key: json!({}),
            },
            RoleKey::Public(key) => RawAccountKey {
                key_type: KEY_TYPE_PUBLIC,
                key: json!(key),
            },
            RoleKey::Fail => RawAccountKey {
                key_type: KEY_TYPE_FAIL,
                key: json!({}),
            },
            RoleKey::WeightedMultiSig(key) => RawAccountKey {
                key_type: KEY_TYPE_WEIGHTED_MULTISIG,
                key: json!(key),
            },
        }
    }
}

impl From<AccountKey> for RawAccountKey {
    fn from(value: AccountKey) -> Self {
        match value {
            AccountKey::Legacy => RoleKey::Legacy.into(),
            AccountKey::Public(key) => RoleKey::Public(key).into(),
            AccountKey::Fail => RoleKey::Fail.into(),
            AccountKey::WeightedMultiSig(key) => RoleKey::WeightedMultiSig(key).into(),
            AccountKey::RoleBased(roles) => {
                let roles: Vec<RawAccountKey> =
                    [roles.transaction, roles.account_update, roles.fee_payer]
                        .into_iter()
                        .map(Into::into)
                        .collect();

                RawAccountKey {
                    key_type: KEY_TYPE_ROLE_BASED,
                    key: json!(roles),
                }
            }
        }
    }
}
