//! Coordinates transactions sent from weighted multisig accounts.
//!
//! The custodial service collects the signatures and submits the transaction once their weights
//! reach the threshold. The [`tracker::MultisigTracker`] relays signing requests and signatures to
//! it and keeps an observed view of each transaction's progress.

pub mod errors;
pub mod state;
pub mod tracker;

/// Re-exports of the types needed to coordinate multisig transactions.
pub mod prelude {
    pub use crate::{
        errors::{MultisigError, MultisigResult},
        state::MultisigTxState,
        tracker::MultisigTracker,
    };
}
