//! Clients for the collaborators the KAS wallet depends on: the custodial wallet service (REST)
//! and a chain node (JSON-RPC).
//!
//! Both sit behind traits, [`traits::WalletApi`] and [`traits::NodeApi`], so that callers take
//! explicit client handles instead of process-wide singletons and tests can substitute them.

pub mod config;
pub mod error;
pub mod node_client;
pub mod traits;
pub mod types;
pub mod wallet_client;

pub use node_client::NodeClient;
pub use wallet_client::KasClient;
