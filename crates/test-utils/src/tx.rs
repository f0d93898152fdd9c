//! Transaction fixtures.

use alloy_primitives::{Address, Bytes, U256};
use kas_primitives::tx::{Transaction, TxBody, TxType};

/// Chain id used by the fixtures.
pub const TEST_CHAIN_ID: u64 = 1001;

/// Gas price used by the fixtures, 25 ston.
pub const TEST_GAS_PRICE: u128 = 25_000_000_000;

/// A transaction of the given type from `from` with nonce, gas price and chain id left for the
/// node to fill.
pub fn unfilled_tx(tx_type: TxType, from: Address) -> Transaction {
    let deploys = matches!(
        tx_type,
        TxType::SmartContractDeploy
            | TxType::FeeDelegatedSmartContractDeploy
            | TxType::FeeDelegatedSmartContractDeployWithRatio
    );

    let body = TxBody {
        gas: 100_000,
        to: (!deploys).then(|| Address::repeat_byte(0xee)),
        value: U256::from(1_000_000_000_000_000_000u128),
        input: Bytes::from_static(b"kas"),
        fee_ratio: tx_type.has_fee_ratio().then_some(30),
        ..Default::default()
    };

    Transaction::new(tx_type, body).with_from(from)
}

/// A transaction of the given type from `from` with every field set.
pub fn filled_tx(tx_type: TxType, from: Address) -> Transaction {
    let mut tx = unfilled_tx(tx_type, from);
    let body = tx.body_mut();
    body.nonce = Some(0);
    body.gas_price = Some(TEST_GAS_PRICE);
    body.chain_id = Some(TEST_CHAIN_ID);
    tx
}
