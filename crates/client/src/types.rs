//! Request and response bodies of the custodial wallet service.

use alloy_primitives::{Address, Bytes, B256};
use kas_primitives::{multisig::PendingMultisigTx, signature::SignatureData};
use serde::{Deserialize, Serialize};

/// An account held by the custodial service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    /// The account address.
    pub address: Address,

    /// Chain the account was created for.
    pub chain_id: u64,

    /// Creation time (unix seconds).
    pub created_at: i64,

    /// Id of the key in the key management service.
    pub key_id: String,

    /// Resource name of the account.
    pub krn: String,

    /// The account's public key.
    pub public_key: Bytes,

    /// Last update time (unix seconds).
    pub updated_at: i64,
}

/// Response to an account deletion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountStatus {
    /// Status reported by the service, e.g. `deleted`.
    pub status: String,
}

/// A signing request for an encoded transaction.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RlpRequest {
    pub(crate) rlp: Bytes,
    pub(crate) submit: bool,
}

/// A fee payer signing request where the fee payer is one of the user's own accounts.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FeePayerRlpRequest {
    pub(crate) rlp: Bytes,
    pub(crate) submit: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) fee_payer: Option<Address>,
}

/// Signatures appended to a multisig transaction.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct AppendSignaturesRequest {
    pub(crate) signatures: Vec<SignatureData>,
}

/// Sender signatures for a transaction without fee delegation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTxSignatures {
    /// The sender signatures, authoritative for the transaction.
    pub signatures: Vec<SignatureData>,

    /// The signed transaction, if the service returned it.
    #[serde(default)]
    pub rlp: Option<Bytes>,

    /// Hash of the signed transaction, if the service returned it.
    #[serde(default)]
    pub transaction_hash: Option<B256>,
}

/// Signatures for a fee delegated transaction whose fee is paid by the service's own fee payer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalFeePayerSignatures {
    /// The sender signatures.
    #[serde(default)]
    pub signatures: Vec<SignatureData>,

    /// The signed transaction, including the fee payer and its signatures.
    pub rlp: Bytes,
}

/// Fee payer signatures produced by one of the user's accounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserFeePayerSignatures {
    /// The fee payer signatures.
    pub fee_payer_signatures: Vec<SignatureData>,

    /// The signed transaction.
    pub rlp: Bytes,
}

/// A page of pending multisig transactions.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PendingTxPage {
    #[serde(default)]
    pub(crate) items: Vec<PendingMultisigTx>,
    #[serde(default)]
    pub(crate) cursor: String,
}

#[cfg(test)]
mod tests {
    use alloy_primitives::U256;

    use super::*;

    #[test]
    fn test_fee_payer_request_omits_unset_payer() {
        let request = FeePayerRlpRequest {
            rlp: Bytes::from_static(&[0x09, 0xc0]),
            submit: false,
            fee_payer: None,
        };

        let json = serde_json::to_value(&request).expect("should serialize");
        assert_eq!(json["rlp"], "0x09c0");
        assert_eq!(json["submit"], false);
        assert!(json.get("feePayer").is_none(), "unset fee payer must be omitted");
    }

    #[test]
    fn test_parse_user_fee_payer_signatures() {
        let body = r#"{
            "feePayerSignatures":[{"V":"0x7f6","R":"0x1","S":"0x2"}],
            "rlp":"0x09c0"
        }"#;

        let parsed: UserFeePayerSignatures = serde_json::from_str(body).expect("should parse");
        assert_eq!(
            parsed.fee_payer_signatures,
            vec![SignatureData::new(0x7f6, U256::from(1), U256::from(2))]
        );
    }
}
