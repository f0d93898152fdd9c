//! An in-memory custodial service and node.
//!
//! [`FakeKas`] implements both [`WalletApi`] and [`NodeApi`]. Signatures are derived
//! deterministically from the signer and the signing payload, so the same request always yields
//! the same signature. Every call is counted so tests can assert which endpoints were hit.

use std::collections::{BTreeMap, HashMap};

use alloy_primitives::{keccak256, Address, Bytes, B256, U256};
use async_trait::async_trait;
use kas_client::{
    error::{KasError, KasResult, ServiceError, DATA_NOT_FOUND},
    traits::{NodeApi, WalletApi},
    types::{
        Account, AccountStatus, GlobalFeePayerSignatures, RawTxSignatures, UserFeePayerSignatures,
    },
};
use kas_primitives::{
    account_key::AccountKey,
    multisig::{
        MultisigSignature, MultisigSignatureResult, MultisigTxStatus, MultisigUpdate,
        PendingMultisigTx,
    },
    signature::SignatureData,
    tx::Transaction,
};
use parking_lot::Mutex;

use crate::tx::{TEST_CHAIN_ID, TEST_GAS_PRICE};

/// Error code the fake returns for requests it rejects.
pub const INVALID_REQUEST: i64 = 1061608;

/// A multisig transaction as the fake service tracks it.
#[derive(Debug, Clone)]
struct FakeMultisigTx {
    from: Address,
    threshold: u32,
    signers: Vec<(Address, u32)>,
    signatures: Vec<MultisigSignature>,
}

impl FakeMultisigTx {
    fn signed_weight(&self) -> u32 {
        self.signatures.iter().map(|s| s.weight).sum()
    }

    fn status(&self) -> MultisigTxStatus {
        if self.signed_weight() >= self.threshold {
            MultisigTxStatus::Submitted
        } else if self.signatures.len() > 1 {
            MultisigTxStatus::Signed
        } else {
            MultisigTxStatus::Pending
        }
    }

    fn reminders(&self) -> Vec<Address> {
        self.signers
            .iter()
            .map(|(signer, _)| *signer)
            .filter(|signer| !self.signatures.iter().any(|s| s.signer == *signer))
            .collect()
    }

    /// Record a signature unless the signer already signed. The weight is only counted once.
    fn add(&mut self, signer: Address, signature: SignatureData) -> Option<u32> {
        let weight = self
            .signers
            .iter()
            .find(|(addr, _)| *addr == signer)
            .map(|(_, weight)| *weight)?;

        if !self.signatures.iter().any(|s| s.signer == signer) {
            self.signatures.push(MultisigSignature {
                signer,
                weight,
                signature,
            });
        }

        Some(weight)
    }
}

#[derive(Debug, Default)]
struct FakeState {
    accounts: HashMap<Address, Account>,
    keys: HashMap<Address, AccountKey>,
    multisig: BTreeMap<B256, FakeMultisigTx>,
    calls: HashMap<&'static str, usize>,
    next_id: u64,
}

/// In-memory custodial service and node.
#[derive(Debug)]
pub struct FakeKas {
    chain_id: u64,
    global_fee_payer: Address,
    state: Mutex<FakeState>,
}

impl Default for FakeKas {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeKas {
    /// Create an empty fake on the test chain.
    pub fn new() -> Self {
        Self {
            chain_id: TEST_CHAIN_ID,
            global_fee_payer: Address::repeat_byte(0xfe),
            state: Mutex::new(FakeState::default()),
        }
    }

    /// The fee payer the service uses when the user does not provide one.
    pub fn global_fee_payer(&self) -> Address {
        self.global_fee_payer
    }

    /// Register an account as held by the service.
    pub fn add_account(&self, address: Address) {
        let account = self.account_record(address, 0);
        self.state.lock().accounts.insert(address, account);
    }

    /// Set the on-chain key the node reports for `address`.
    pub fn set_account_key(&self, address: Address, key: AccountKey) {
        self.state.lock().keys.insert(address, key);
    }

    /// Number of times the given method was called.
    pub fn calls(&self, method: &str) -> usize {
        self.state.lock().calls.get(method).copied().unwrap_or(0)
    }

    /// Total number of signing requests made.
    pub fn signing_calls(&self) -> usize {
        [
            "sign_raw_transaction",
            "sign_fd_raw_transaction_by_global_fee_payer",
            "sign_fd_raw_transaction_by_user",
        ]
        .iter()
        .map(|method| self.calls(method))
        .sum()
    }

    /// Create a pending multisig transaction from `from`, signed by the first of `signers`.
    pub fn propose_multisig(
        &self,
        from: Address,
        threshold: u32,
        signers: Vec<(Address, u32)>,
    ) -> B256 {
        let mut state = self.state.lock();
        state.next_id += 1;
        let transaction_id = keccak256(format!("multisig-{}", state.next_id));

        let mut tx = FakeMultisigTx {
            from,
            threshold,
            signers,
            signatures: Vec::new(),
        };

        if let Some((proposer, _)) = tx.signers.first().copied() {
            tx.add(proposer, self.multisig_signature(proposer, transaction_id));
        }

        state.multisig.insert(transaction_id, tx);
        transaction_id
    }

    /// The signature `signer` produces for a multisig transaction, as if obtained outside the
    /// service.
    pub fn multisig_signature(&self, signer: Address, transaction_id: B256) -> SignatureData {
        self.signature(signer, transaction_id.as_slice())
    }

    fn signature(&self, signer: Address, payload: &[u8]) -> SignatureData {
        let r = keccak256([signer.as_slice(), payload].concat());
        let s = keccak256(r);
        SignatureData::new(
            self.chain_id * 2 + 35,
            U256::from_be_bytes(r.0),
            U256::from_be_bytes(s.0),
        )
    }

    fn account_record(&self, address: Address, id: u64) -> Account {
        Account {
            address,
            chain_id: self.chain_id,
            created_at: 0,
            key_id: format!("fake-key-{id}"),
            krn: format!("krn:{}:wallet:fake:account-pool:default", self.chain_id),
            public_key: Bytes::copy_from_slice(keccak256(address).as_slice()),
            updated_at: 0,
        }
    }

    fn record(&self, method: &'static str) {
        *self.state.lock().calls.entry(method).or_default() += 1;
    }

    /// Decode a signing request and check that the sender is held by the service.
    fn decode_request(&self, rlp: &[u8]) -> KasResult<Transaction> {
        let mut tx = Transaction::decode(rlp)
            .map_err(|e| invalid_request(format!("invalid rlp: {e}")))?;
        tx.body_mut().chain_id = Some(self.chain_id);

        let from = tx
            .from()
            .ok_or_else(|| invalid_request("missing sender".to_string()))?;
        self.ensure_account(from)?;

        Ok(tx)
    }

    fn ensure_account(&self, address: Address) -> KasResult<()> {
        if self.state.lock().accounts.contains_key(&address) {
            Ok(())
        } else {
            Err(not_found())
        }
    }

    fn sign_tx(&self, signer: Address, tx: &Transaction) -> KasResult<SignatureData> {
        let payload = tx
            .signing_payload()
            .map_err(|e| invalid_request(e.to_string()))?;
        Ok(self.signature(signer, &payload))
    }

    fn push_unique(signatures: &mut Vec<SignatureData>, signature: SignatureData) {
        if !signatures.contains(&signature) {
            signatures.push(signature);
        }
    }
}

fn not_found() -> KasError {
    ServiceError {
        code: DATA_NOT_FOUND,
        message: "data don't exist".to_string(),
    }
    .into()
}

fn invalid_request(message: String) -> KasError {
    ServiceError {
        code: INVALID_REQUEST,
        message,
    }
    .into()
}

fn encode(tx: &Transaction) -> KasResult<Bytes> {
    tx.rlp_encoding().map_err(|e| invalid_request(e.to_string()))
}

#[async_trait]
impl WalletApi for FakeKas {
    async fn create_account(&self) -> KasResult<Account> {
        self.record("create_account");

        let mut state = self.state.lock();
        state.next_id += 1;
        let id = state.next_id;
        let address = Address::from_word(keccak256(format!("account-{id}")));

        let account = self.account_record(address, id);
        state.accounts.insert(address, account.clone());
        Ok(account)
    }

    async fn get_account(&self, address: Address) -> KasResult<Account> {
        self.record("get_account");
        self.state
            .lock()
            .accounts
            .get(&address)
            .cloned()
            .ok_or_else(not_found)
    }

    async fn delete_account(&self, address: Address) -> KasResult<AccountStatus> {
        self.record("delete_account");
        self.state
            .lock()
            .accounts
            .remove(&address)
            .map(|_| AccountStatus {
                status: "deleted".to_string(),
            })
            .ok_or_else(not_found)
    }

    async fn sign_raw_transaction(&self, rlp: Bytes) -> KasResult<RawTxSignatures> {
        self.record("sign_raw_transaction");

        let mut tx = self.decode_request(&rlp)?;
        if tx.tx_type().is_fee_delegated() {
            return Err(invalid_request(
                "fee delegated transactions need a fee payer".to_string(),
            ));
        }

        let from = tx.from().ok_or_else(not_found)?;
        let signature = self.sign_tx(from, &tx)?;
        tx.set_signatures(vec![signature]);

        let rlp = encode(&tx)?;
        Ok(RawTxSignatures {
            signatures: vec![signature],
            transaction_hash: Some(keccak256(&rlp)),
            rlp: Some(rlp),
        })
    }

    async fn sign_fd_raw_transaction_by_global_fee_payer(
        &self,
        rlp: Bytes,
    ) -> KasResult<GlobalFeePayerSignatures> {
        self.record("sign_fd_raw_transaction_by_global_fee_payer");

        let mut tx = self.decode_request(&rlp)?;
        if !tx.tx_type().is_fee_delegated() {
            return Err(invalid_request("transaction is not fee delegated".to_string()));
        }

        let from = tx.from().ok_or_else(not_found)?;
        let sender_sig = self.sign_tx(from, &tx)?;
        let mut signatures = tx.take_signatures();
        Self::push_unique(&mut signatures, sender_sig);
        tx.set_signatures(signatures);

        // The global fee payer signs regardless of the fee payer the request names.
        tx.set_fee_payer(self.global_fee_payer);
        let payer_sig = self.sign_tx(self.global_fee_payer, &tx)?;
        let mut fee_payer_signatures = tx.take_fee_payer_signatures();
        Self::push_unique(&mut fee_payer_signatures, payer_sig);
        tx.set_fee_payer_signatures(fee_payer_signatures);

        Ok(GlobalFeePayerSignatures {
            signatures: tx.signatures().to_vec(),
            rlp: encode(&tx)?,
        })
    }

    async fn sign_fd_raw_transaction_by_user(
        &self,
        rlp: Bytes,
        fee_payer: Option<Address>,
    ) -> KasResult<UserFeePayerSignatures> {
        self.record("sign_fd_raw_transaction_by_user");

        let mut tx = Transaction::decode(&rlp)
            .map_err(|e| invalid_request(format!("invalid rlp: {e}")))?;
        tx.body_mut().chain_id = Some(self.chain_id);
        if !tx.tx_type().is_fee_delegated() {
            return Err(invalid_request("transaction is not fee delegated".to_string()));
        }

        let fee_payer = fee_payer
            .or(tx.fee_payer())
            .ok_or_else(|| invalid_request("missing fee payer".to_string()))?;
        self.ensure_account(fee_payer)?;

        tx.set_fee_payer(fee_payer);
        let signature = self.sign_tx(fee_payer, &tx)?;
        let mut fee_payer_signatures = tx.take_fee_payer_signatures();
        Self::push_unique(&mut fee_payer_signatures, signature);
        tx.set_fee_payer_signatures(fee_payer_signatures);

        Ok(UserFeePayerSignatures {
            fee_payer_signatures: vec![signature],
            rlp: encode(&tx)?,
        })
    }

    async fn request_multisig_signature(
        &self,
        signer: Address,
        transaction_id: B256,
    ) -> KasResult<MultisigSignatureResult> {
        self.record("request_multisig_signature");

        let signature = self.multisig_signature(signer, transaction_id);
        let mut state = self.state.lock();
        let tx = state
            .multisig
            .get_mut(&transaction_id)
            .ok_or_else(not_found)?;

        let weight = tx
            .add(signer, signature)
            .ok_or_else(|| invalid_request(format!("{signer} is not a signer")))?;

        Ok(MultisigSignatureResult {
            transaction_id,
            signer,
            signature,
            weight,
            signed_weight: tx.signed_weight(),
            status: tx.status(),
            reminders: tx.reminders(),
        })
    }

    async fn append_multisig_signatures(
        &self,
        transaction_id: B256,
        signatures: Vec<SignatureData>,
    ) -> KasResult<MultisigUpdate> {
        self.record("append_multisig_signatures");

        let mut state = self.state.lock();
        let tx = state
            .multisig
            .get_mut(&transaction_id)
            .ok_or_else(not_found)?;

        for signature in signatures {
            // Stands in for recovering the signer from the signature.
            let signer = tx
                .signers
                .iter()
                .map(|(signer, _)| *signer)
                .find(|signer| self.multisig_signature(*signer, transaction_id) == signature)
                .ok_or_else(|| invalid_request("signature from unknown signer".to_string()))?;

            tx.add(signer, signature);
        }

        Ok(MultisigUpdate {
            signed_weight: tx.signed_weight(),
            status: tx.status(),
            reminders: tx.reminders(),
        })
    }

    async fn list_pending_multisig_transactions(
        &self,
        account: Address,
    ) -> KasResult<Vec<PendingMultisigTx>> {
        self.record("list_pending_multisig_transactions");

        let state = self.state.lock();
        Ok(state
            .multisig
            .iter()
            .filter(|(_, tx)| tx.from == account && !tx.status().is_terminal())
            .map(|(id, tx)| PendingMultisigTx {
                transaction_id: *id,
                from: tx.from,
                threshold: tx.threshold,
                signed_weight: tx.signed_weight(),
                status: tx.status(),
                signatures: tx.signatures.clone(),
                reminders: tx.reminders(),
            })
            .collect())
    }
}

#[async_trait]
impl NodeApi for FakeKas {
    async fn get_account_key(&self, address: Address) -> KasResult<Option<AccountKey>> {
        self.record("get_account_key");
        Ok(self.state.lock().keys.get(&address).cloned())
    }

    async fn fill_transaction(&self, tx: &mut Transaction) -> KasResult<()> {
        self.record("fill_transaction");

        if tx.body().nonce.is_none() {
            // Every account in the fake is fresh.
            tx.from()
                .ok_or_else(|| invalid_request("missing sender".to_string()))?;
            tx.body_mut().nonce = Some(0);
        }

        let body = tx.body_mut();
        body.gas_price.get_or_insert(TEST_GAS_PRICE);
        body.chain_id.get_or_insert(self.chain_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use kas_primitives::tx::TxType;

    use super::*;
    use crate::tx::filled_tx;

    #[tokio::test]
    async fn test_signatures_are_deterministic() {
        let fake = FakeKas::new();
        let account = fake.create_account().await.expect("should create account");

        let rlp = filled_tx(TxType::ValueTransfer, account.address)
            .rlp_encoding()
            .expect("fixture should encode");

        let first = fake
            .sign_raw_transaction(rlp.clone())
            .await
            .expect("should sign");
        let second = fake.sign_raw_transaction(rlp).await.expect("should sign");

        assert_eq!(first.signatures, second.signatures);
        assert_eq!(fake.calls("sign_raw_transaction"), 2);
    }

    #[tokio::test]
    async fn test_unknown_sender_is_not_found() {
        let fake = FakeKas::new();
        let rlp = filled_tx(TxType::ValueTransfer, Address::repeat_byte(0x11))
            .rlp_encoding()
            .expect("fixture should encode");

        let err = fake.sign_raw_transaction(rlp).await.unwrap_err();
        assert!(err.is_not_found(), "expected not found, got {err:?}");
    }

    #[tokio::test]
    async fn test_multisig_counts_each_signer_once() {
        let fake = FakeKas::new();
        let (a, b, c) = (
            Address::repeat_byte(0x0a),
            Address::repeat_byte(0x0b),
            Address::repeat_byte(0x0c),
        );
        let id = fake.propose_multisig(
            Address::repeat_byte(0x01),
            3,
            vec![(a, 1), (b, 1), (c, 1)],
        );

        let sig_b = fake.multisig_signature(b, id);
        let first = fake
            .append_multisig_signatures(id, vec![sig_b])
            .await
            .expect("should append");
        let second = fake
            .append_multisig_signatures(id, vec![sig_b, sig_b])
            .await
            .expect("should append");

        assert_eq!(first.signed_weight, 2);
        assert_eq!(first, second);
        assert_eq!(first.status, MultisigTxStatus::Signed);
        assert_eq!(first.reminders, vec![c]);
    }
}
