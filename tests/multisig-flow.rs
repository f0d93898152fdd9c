//! Tests coordinating a weighted multisig transaction between several signers.
//!
//! The fake service plays the custodial service: it records each signer's weight once and submits
//! the transaction when the threshold is reached.

use std::sync::Arc;

use alloy_primitives::Address;
use kas_multisig::errors::MultisigError;
use kas_primitives::multisig::MultisigTxStatus;
use tracing::{debug, info};

mod common;

#[tokio::test]
async fn weighted_multisig_flow() {
    let env = common::setup();

    let account = Address::repeat_byte(0x01);
    let signers: Vec<Address> = (0x0a..0x0e).map(Address::repeat_byte).collect();
    let tx_id = env.fake.propose_multisig(
        account,
        4,
        signers.iter().map(|signer| (*signer, 1)).collect(),
    );

    let pending = env
        .tracker
        .list_pending(account)
        .await
        .expect("listing should succeed");
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].status, MultisigTxStatus::Pending);
    assert_eq!(pending[0].signed_weight, 1, "proposer has signed");

    // A signature relayed from another process, appended twice.
    let relayed = env.fake.multisig_signature(signers[1], tx_id);
    let first = env
        .tracker
        .append_signature(tx_id, relayed)
        .await
        .expect("append should succeed");
    let second = env
        .tracker
        .append_signature(tx_id, relayed)
        .await
        .expect("append should succeed");
    assert_eq!(first.signed_weight, 2);
    assert_eq!(
        second.signed_weight, first.signed_weight,
        "duplicate append must not add weight"
    );
    assert_eq!(second.status, MultisigTxStatus::Signed);

    // The remaining signers sign concurrently.
    let tracker = Arc::new(env.tracker);
    let mut handles = Vec::new();
    for signer in signers[2..].iter().copied() {
        let tracker = tracker.clone();
        handles.push(tokio::spawn(async move {
            tracker.request_signature(signer, tx_id).await
        }));
    }

    for handle in handles {
        let result = handle
            .await
            .expect("task should not panic")
            .expect("request should succeed");
        debug!(signer = %result.signer, signed_weight = %result.signed_weight, "signed");
        assert_eq!(result.weight, 1);
    }

    let state = tracker.state(&tx_id).expect("state should be tracked");
    assert_eq!(state.signed_weight(), 4);
    assert!(state.is_submitted());

    let pending = tracker
        .list_pending(account)
        .await
        .expect("listing should succeed");
    assert!(pending.is_empty(), "submitted transactions are no longer pending");

    info!("multisig flow complete");
}

#[tokio::test]
async fn unknown_signer_is_rejected() {
    let env = common::setup();

    let signers = vec![(Address::repeat_byte(0x0a), 1), (Address::repeat_byte(0x0b), 1)];
    let tx_id = env.fake.propose_multisig(Address::repeat_byte(0x01), 2, signers);

    let err = env
        .tracker
        .request_signature(Address::repeat_byte(0x0f), tx_id)
        .await
        .unwrap_err();
    assert!(
        matches!(err, MultisigError::Api(ref e) if !e.is_not_found()),
        "expected a service rejection, got {err:?}"
    );

    let foreign = env.fake.multisig_signature(Address::repeat_byte(0x0f), tx_id);
    assert!(env.tracker.append_signature(tx_id, foreign).await.is_err());

    let state = env.tracker.state(&tx_id);
    assert!(state.is_none(), "rejected requests are not observed");
}
