//! The transaction model: types, fields, signature lists and the canonical RLP encoding.

use std::mem;

use alloy_primitives::{Address, Bytes, U256, U64};
use alloy_rlp::{Decodable, Encodable, Header, EMPTY_LIST_CODE, EMPTY_STRING_CODE};
use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::{
    errors::{TxError, TxResult},
    signature::SignatureData,
};

/// Mask selecting the fee delegation flavour from a type byte.
const FEE_DELEGATION_MASK: u8 = 0x07;
const FEE_DELEGATED: u8 = 0x01;
const FEE_DELEGATED_WITH_RATIO: u8 = 0x02;

/// Transaction types, carrying the type byte that prefixes their canonical encoding.
///
/// Each basic type has a fee delegated variant (`+1`) and a partially fee delegated variant
/// (`+2`) where the fee payer only covers a percentage of the fee.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
#[allow(missing_docs)]
pub enum TxType {
    Legacy = 0x00,
    ValueTransfer = 0x08,
    FeeDelegatedValueTransfer = 0x09,
    FeeDelegatedValueTransferWithRatio = 0x0a,
    ValueTransferMemo = 0x10,
    FeeDelegatedValueTransferMemo = 0x11,
    FeeDelegatedValueTransferMemoWithRatio = 0x12,
    AccountUpdate = 0x20,
    FeeDelegatedAccountUpdate = 0x21,
    FeeDelegatedAccountUpdateWithRatio = 0x22,
    SmartContractDeploy = 0x28,
    FeeDelegatedSmartContractDeploy = 0x29,
    FeeDelegatedSmartContractDeployWithRatio = 0x2a,
    SmartContractExecution = 0x30,
    FeeDelegatedSmartContractExecution = 0x31,
    FeeDelegatedSmartContractExecutionWithRatio = 0x32,
    Cancel = 0x38,
    FeeDelegatedCancel = 0x39,
    FeeDelegatedCancelWithRatio = 0x3a,
}

impl TxType {
    /// The type byte.
    pub fn type_byte(self) -> u8 {
        self.into()
    }

    /// Whether this is an untyped legacy transaction, which carries exactly one signature.
    pub fn is_legacy(self) -> bool {
        self == TxType::Legacy
    }

    /// Whether a fee payer co-signs the transaction.
    pub fn is_fee_delegated(self) -> bool {
        !self.is_legacy()
            && matches!(
                self.type_byte() & FEE_DELEGATION_MASK,
                FEE_DELEGATED | FEE_DELEGATED_WITH_RATIO
            )
    }

    /// Whether the fee payer only covers part of the fee.
    pub fn has_fee_ratio(self) -> bool {
        !self.is_legacy() && self.type_byte() & FEE_DELEGATION_MASK == FEE_DELEGATED_WITH_RATIO
    }

    /// Whether the transaction replaces the sender's account key.
    pub fn is_account_update(self) -> bool {
        matches!(
            self,
            TxType::AccountUpdate
                | TxType::FeeDelegatedAccountUpdate
                | TxType::FeeDelegatedAccountUpdateWithRatio
        )
    }
}

/// The fields of a transaction that are covered by signatures.
///
/// `nonce`, `gas_price` and `chain_id` may be left unset and filled in by a node before
/// encoding.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TxBody {
    /// Sender nonce.
    pub nonce: Option<u64>,
    /// Gas price in peb.
    pub gas_price: Option<u128>,
    /// Gas limit.
    pub gas: u64,
    /// Chain id, only part of the signing payload.
    pub chain_id: Option<u64>,
    /// Recipient, absent for deployments.
    pub to: Option<Address>,
    /// Transferred value.
    pub value: U256,
    /// Call data, memo, deployment code or the encoded new account key.
    pub input: Bytes,
    /// Percentage of the fee covered by the fee payer, for `*WithRatio` types.
    pub fee_ratio: Option<u8>,
}

/// A transaction together with its sender and fee payer signature lists.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    tx_type: TxType,
    body: TxBody,
    from: Option<Address>,
    signatures: Vec<SignatureData>,
    fee_payer: Option<Address>,
    fee_payer_signatures: Vec<SignatureData>,
}

impl Transaction {
    /// Create a new unsigned [`Transaction`] of the given type.
    pub fn new(tx_type: TxType, body: TxBody) -> Self {
        Self {
            tx_type,
            body,
            from: None,
            signatures: Vec::new(),
            fee_payer: None,
            fee_payer_signatures: Vec::new(),
        }
    }

    /// Set the sender.
    pub fn with_from(mut self, from: Address) -> Self {
        self.from = Some(from);
        self
    }

    /// Set the fee payer.
    pub fn with_fee_payer(mut self, fee_payer: Address) -> Self {
        self.fee_payer = Some(fee_payer);
        self
    }

    /// Set the sender signatures.
    pub fn with_signatures(mut self, signatures: Vec<SignatureData>) -> Self {
        self.signatures = signatures;
        self
    }

    /// Get the transaction type.
    pub fn tx_type(&self) -> TxType {
        self.tx_type
    }

    /// Get the signed fields.
    pub fn body(&self) -> &TxBody {
        &self.body
    }

    /// Get the signed fields for modification (e.g. filling defaults).
    pub fn body_mut(&mut self) -> &mut TxBody {
        &mut self.body
    }

    /// Get the declared sender.
    pub fn from(&self) -> Option<Address> {
        self.from
    }

    /// Set the sender.
    pub fn set_from(&mut self, from: Address) {
        self.from = Some(from);
    }

    /// Replace the sender, returning the previous one.
    pub fn replace_from(&mut self, from: Option<Address>) -> Option<Address> {
        std::mem::replace(&mut self.from, from)
    }

    /// Get the declared fee payer.
    pub fn fee_payer(&self) -> Option<Address> {
        self.fee_payer
    }

    /// Set the fee payer.
    pub fn set_fee_payer(&mut self, fee_payer: Address) {
        self.fee_payer = Some(fee_payer);
    }

    /// Replace the fee payer, returning the previous one.
    pub fn replace_fee_payer(&mut self, fee_payer: Option<Address>) -> Option<Address> {
        std::mem::replace(&mut self.fee_payer, fee_payer)
    }

    /// Get the sender signatures.
    pub fn signatures(&self) -> &[SignatureData] {
        &self.signatures
    }

    /// Replace the sender signatures.
    pub fn set_signatures(&mut self, signatures: Vec<SignatureData>) {
        self.signatures = signatures;
    }

    /// Remove and return the sender signatures.
    pub fn take_signatures(&mut self) -> Vec<SignatureData> {
        mem::take(&mut self.signatures)
    }

    /// Get the fee payer signatures.
    pub fn fee_payer_signatures(&self) -> &[SignatureData] {
        &self.fee_payer_signatures
    }

    /// Replace the fee payer signatures.
    pub fn set_fee_payer_signatures(&mut self, signatures: Vec<SignatureData>) {
        self.fee_payer_signatures = signatures;
    }

    /// Remove and return the fee payer signatures.
    pub fn take_fee_payer_signatures(&mut self) -> Vec<SignatureData> {
        mem::take(&mut self.fee_payer_signatures)
    }

    /// Whether every field a node would default has been set.
    pub fn is_filled(&self) -> bool {
        self.body.nonce.is_some() && self.body.gas_price.is_some() && self.body.chain_id.is_some()
    }

    /// Produce the canonical encoding, which is both the wire format and what the custodial
    /// service expects as its signing request payload.
    ///
    /// # Errors
    ///
    /// If the nonce, gas price or (for typed transactions) the sender is missing.
    pub fn rlp_encoding(&self) -> TxResult<Bytes> {
        let mut payload = Vec::new();
        self.encode_fields(&mut payload)?;

        let mut out = Vec::new();
        if self.tx_type.is_legacy() {
            let sig = self.signatures.first().copied().unwrap_or_default();
            sig.v.encode(&mut payload);
            sig.r.encode(&mut payload);
            sig.s.encode(&mut payload);
        } else {
            alloy_rlp::encode_list::<SignatureData, _>(&self.signatures, &mut payload);

            if self.tx_type.is_fee_delegated() {
                encode_optional_address(self.fee_payer, &mut payload);
                alloy_rlp::encode_list::<SignatureData, _>(&self.fee_payer_signatures, &mut payload);
            }

            out.push(self.tx_type.type_byte());
        }

        encode_list(&payload, &mut out);
        Ok(out.into())
    }

    /// Produce the payload a sender hashes and signs: the signed fields followed by the chain id.
    ///
    /// # Errors
    ///
    /// If the chain id or any field required by [`Self::rlp_encoding`] is missing.
    pub fn signing_payload(&self) -> TxResult<Bytes> {
        let chain_id = self.body.chain_id.ok_or(TxError::MissingField("chainId"))?;

        let mut payload = Vec::new();
        if self.tx_type.is_legacy() {
            self.encode_fields(&mut payload)?;
        } else {
            let mut inner = vec![];
            self.tx_type.type_byte().encode(&mut inner);
            self.encode_fields(&mut inner)?;
            encode_list(&inner, &mut payload);
        }

        chain_id.encode(&mut payload);
        0u8.encode(&mut payload);
        0u8.encode(&mut payload);

        let mut out = Vec::new();
        encode_list(&payload, &mut out);
        Ok(out.into())
    }

    /// Decode a transaction from its canonical encoding.
    ///
    /// The chain id is not part of the canonical encoding and is left unset.
    pub fn decode(encoded: &[u8]) -> TxResult<Self> {
        let first = *encoded.first().ok_or(TxError::Empty)?;

        let (tx_type, mut buf) = if first >= EMPTY_LIST_CODE {
            (TxType::Legacy, encoded)
        } else {
            let tx_type = TxType::try_from(first).map_err(|_| TxError::UnknownType(first))?;
            if tx_type.is_legacy() {
                return Err(TxError::UnknownType(first));
            }

            (tx_type, &encoded[1..])
        };

        let header = Header::decode(&mut buf)?;
        if !header.list {
            return Err(alloy_rlp::Error::UnexpectedString.into());
        }
        if buf.len() < header.payload_length {
            return Err(alloy_rlp::Error::InputTooShort.into());
        }

        let (mut payload, rest) = buf.split_at(header.payload_length);
        if !rest.is_empty() {
            return Err(TxError::TrailingBytes(rest.len()));
        }

        let buf = &mut payload;
        let mut body = TxBody {
            nonce: Some(u64::decode(buf)?),
            gas_price: Some(u128::decode(buf)?),
            gas: u64::decode(buf)?,
            to: decode_optional_address(buf)?,
            value: U256::decode(buf)?,
            ..Default::default()
        };

        let tx = if tx_type.is_legacy() {
            body.input = Bytes::decode(buf)?;
            let sig = SignatureData {
                v: U64::decode(buf)?,
                r: U256::decode(buf)?,
                s: U256::decode(buf)?,
            };

            let mut tx = Transaction::new(tx_type, body);
            if !sig.is_empty() {
                tx.signatures.push(sig);
            }
            tx
        } else {
            let from = Address::decode(buf)?;
            body.input = Bytes::decode(buf)?;
            if tx_type.has_fee_ratio() {
                body.fee_ratio = Some(u8::decode(buf)?);
            }

            let mut tx = Transaction::new(tx_type, body).with_from(from);
            tx.signatures = Vec::<SignatureData>::decode(buf)?;

            if tx_type.is_fee_delegated() {
                tx.fee_payer = decode_optional_address(buf)?;
                tx.fee_payer_signatures = Vec::<SignatureData>::decode(buf)?;
            }
            tx
        };

        if !buf.is_empty() {
            return Err(alloy_rlp::Error::ListLengthMismatch {
                expected: header.payload_length,
                got: header.payload_length - buf.len(),
            }
            .into());
        }

        Ok(tx)
    }

    /// Encode the signed fields (without signatures) as a sequence of RLP items.
    fn encode_fields(&self, out: &mut Vec<u8>) -> TxResult<()> {
        let nonce = self.body.nonce.ok_or(TxError::MissingField("nonce"))?;
        let gas_price = self.body.gas_price.ok_or(TxError::MissingField("gasPrice"))?;

        nonce.encode(out);
        gas_price.encode(out);
        self.body.gas.encode(out);
        encode_optional_address(self.body.to, out);
        self.body.value.encode(out);

        if !self.tx_type.is_legacy() {
            let from = self.from.ok_or(TxError::MissingField("from"))?;
            from.encode(out);
        }

        self.body.input.encode(out);

        if self.tx_type.has_fee_ratio() {
            let ratio = self.body.fee_ratio.ok_or(TxError::MissingField("feeRatio"))?;
            ratio.encode(out);
        }

        Ok(())
    }
}

fn encode_list(payload: &[u8], out: &mut Vec<u8>) {
    Header {
        list: true,
        payload_length: payload.len(),
    }
    .encode(out);
    out.extend_from_slice(payload);
}

fn encode_optional_address(address: Option<Address>, out: &mut Vec<u8>) {
    match address {
        Some(address) => address.encode(out),
        None => out.push(EMPTY_STRING_CODE),
    }
}

fn decode_optional_address(buf: &mut &[u8]) -> alloy_rlp::Result<Option<Address>> {
    if buf.first() == Some(&EMPTY_STRING_CODE) {
        *buf = &buf[1..];
        return Ok(None);
    }

    Address::decode(buf).map(Some)
}

#[cfg(test)]
mod tests {
    use alloy_primitives::address;

    use super::*;

    const SENDER: Address = address!("5c525570f2b8e7e25f3a6b5e17f2cc63b872ece7");
    const RECIPIENT: Address = address!("76c6b1f34562ed7a843786e1d7f57d0d7948a6f1");
    const FEE_PAYER: Address = address!("1b71a63903e35371e2fc41c6012effb99b9a2c0f");

    fn filled_body() -> TxBody {
        TxBody {
            nonce: Some(3),
            gas_price: Some(25_000_000_000),
            gas: 50_000,
            chain_id: Some(1001),
            to: Some(RECIPIENT),
            value: U256::from(1_000_000u64),
            ..Default::default()
        }
    }

    fn sig(n: u64) -> SignatureData {
        SignatureData::new(0x07f5, U256::from(n), U256::from(n + 100))
    }

    #[test]
    fn test_replace_addresses() {
        let mut tx = Transaction::new(TxType::FeeDelegatedValueTransfer, filled_body());

        assert_eq!(tx.replace_from(Some(SENDER)), None);
        assert_eq!(tx.replace_fee_payer(Some(FEE_PAYER)), None);
        assert_eq!(tx.from(), Some(SENDER));

        assert_eq!(tx.replace_fee_payer(None), Some(FEE_PAYER));
        assert_eq!(tx.fee_payer(), None, "fee payer should be unset again");
    }

    #[test]
    fn test_type_predicates() {
        assert!(TxType::Legacy.is_legacy());
        assert!(!TxType::Legacy.is_fee_delegated());
        assert!(!TxType::ValueTransfer.is_fee_delegated());
        assert!(TxType::FeeDelegatedValueTransfer.is_fee_delegated());
        assert!(TxType::FeeDelegatedCancelWithRatio.is_fee_delegated());
        assert!(TxType::FeeDelegatedCancelWithRatio.has_fee_ratio());
        assert!(!TxType::FeeDelegatedCancel.has_fee_ratio());
        assert!(TxType::FeeDelegatedAccountUpdate.is_account_update());
        assert!(!TxType::SmartContractExecution.is_account_update());
    }

    #[test]
    fn test_legacy_encoding_keeps_single_signature() {
        let tx = Transaction::new(TxType::Legacy, filled_body()).with_signatures(vec![sig(1)]);

        let encoded = tx.rlp_encoding().expect("filled legacy tx should encode");
        assert!(encoded[0] >= EMPTY_LIST_CODE, "legacy encoding is a bare list");

        let decoded = Transaction::decode(&encoded).expect("should decode");
        assert_eq!(decoded.tx_type(), TxType::Legacy);
        assert_eq!(decoded.signatures(), &[sig(1)]);
        assert_eq!(decoded.body().to, Some(RECIPIENT));

        let unsigned = Transaction::new(TxType::Legacy, filled_body());
        let decoded = Transaction::decode(&unsigned.rlp_encoding().unwrap()).unwrap();
        assert!(
            decoded.signatures().is_empty(),
            "the empty placeholder signature must not be decoded as a signature"
        );
    }

    #[test]
    fn test_fee_delegated_encoding() {
        let mut body = filled_body();
        body.fee_ratio = Some(30);

        let mut tx = Transaction::new(TxType::FeeDelegatedValueTransferWithRatio, body)
            .with_from(SENDER)
            .with_fee_payer(FEE_PAYER)
            .with_signatures(vec![sig(1), sig(2)]);
        tx.set_fee_payer_signatures(vec![sig(3)]);

        let encoded = tx.rlp_encoding().expect("should encode");
        assert_eq!(encoded[0], 0x0a, "typed encoding starts with the type byte");

        let decoded = Transaction::decode(&encoded).expect("should decode");
        assert_eq!(decoded.from(), Some(SENDER));
        assert_eq!(decoded.fee_payer(), Some(FEE_PAYER));
        assert_eq!(decoded.signatures(), &[sig(1), sig(2)]);
        assert_eq!(decoded.fee_payer_signatures(), &[sig(3)]);
        assert_eq!(decoded.body().fee_ratio, Some(30));

        let unset_payer = Transaction::new(TxType::FeeDelegatedValueTransfer, filled_body())
            .with_from(SENDER);
        let decoded = Transaction::decode(&unset_payer.rlp_encoding().unwrap()).unwrap();
        assert_eq!(decoded.fee_payer(), None);
    }

    #[test]
    fn test_encoding_requires_filled_fields() {
        let mut body = filled_body();
        body.nonce = None;
        let tx = Transaction::new(TxType::ValueTransfer, body).with_from(SENDER);
        assert_eq!(tx.rlp_encoding(), Err(TxError::MissingField("nonce")));

        let tx = Transaction::new(TxType::ValueTransfer, filled_body());
        assert_eq!(tx.rlp_encoding(), Err(TxError::MissingField("from")));

        let mut body = filled_body();
        body.chain_id = None;
        let tx = Transaction::new(TxType::ValueTransfer, body).with_from(SENDER);
        assert!(!tx.is_filled());
        assert_eq!(tx.signing_payload(), Err(TxError::MissingField("chainId")));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert_eq!(Transaction::decode(&[]), Err(TxError::Empty));
        assert_eq!(
            Transaction::decode(&[0x07, 0xc0]),
            Err(TxError::UnknownType(0x07))
        );

        let tx = Transaction::new(TxType::ValueTransfer, filled_body()).with_from(SENDER);
        let mut encoded = tx.rlp_encoding().unwrap().to_vec();
        encoded.push(0x00);
        assert_eq!(Transaction::decode(&encoded), Err(TxError::TrailingBytes(1)));
    }

    #[test]
    fn test_signing_payload_ignores_signatures() {
        let tx = Transaction::new(TxType::FeeDelegatedValueTransfer, filled_body())
            .with_from(SENDER);
        let unsigned_payload = tx.signing_payload().expect("should produce payload");

        let signed = tx.clone().with_signatures(vec![sig(7)]).with_fee_payer(FEE_PAYER);
        assert_eq!(
            signed.signing_payload().unwrap(),
            unsigned_payload,
            "signatures and fee payer are not part of the sender signing payload"
        );

        let mut other_chain = tx;
        other_chain.body_mut().chain_id = Some(8217);
        assert_ne!(other_chain.signing_payload().unwrap(), unsigned_payload);
    }
}
