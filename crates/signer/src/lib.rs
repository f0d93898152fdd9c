//! Transaction signing with accounts held by the custodial service.
//!
//! The [`wallet::KasWallet`] decides how a transaction has to be signed given the signing
//! account's on-chain key, asks the custodial service for the signatures through the
//! [`gateway::SigningGateway`] and merges them into the transaction. Private keys never leave the
//! service.

pub mod classifier;
pub mod errors;
pub mod gateway;
pub mod merge;
pub mod wallet;

/// Re-exports of the types needed to sign transactions.
pub mod prelude {
    pub use crate::{
        errors::{PreconditionError, SignerError, SignerResult},
        gateway::{RemoteSigningResult, SigningGateway, SigningRole},
        merge::merge_signatures,
        wallet::KasWallet,
    };
}
