//! JSON-RPC client for the chain node.

use std::sync::Arc;

use alloy_primitives::{Address, U128, U64};
use async_trait::async_trait;
use jsonrpsee::{
    core::{client::ClientT, params::ArrayParams, ClientError as RpcClientError},
    http_client::{HttpClient, HttpClientBuilder},
    rpc_params,
};
use kas_primitives::{account_key::AccountKey, tx::Transaction};
use serde::de::DeserializeOwned;
use tracing::*;

use crate::{
    config::ClientConfig,
    error::{ClientError, ClientResult, KasError, KasResult, ServiceError},
    traits::NodeApi,
};

/// JSON-RPC client for a chain node, used for account keys and transaction defaults.
#[derive(Debug, Clone)]
pub struct NodeClient {
    client: Arc<HttpClient>,
}

impl NodeClient {
    /// Creates a new [`NodeClient`] talking to the node at `http_url`.
    pub fn new(http_url: &str) -> ClientResult<Self> {
        let client = HttpClientBuilder::default()
            .build(http_url)
            .map_err(|e| ClientError::Other(format!("Could not create node client: {e}")))?;

        Ok(Self {
            client: Arc::new(client),
        })
    }

    /// Creates a new [`NodeClient`] from the node section of the config.
    pub fn from_config(config: &ClientConfig) -> ClientResult<Self> {
        Self::new(&config.node_url)
    }

    /// Get the underlying JSON-RPC client.
    pub fn inner(&self) -> &HttpClient {
        &self.client
    }

    async fn call<R: DeserializeOwned>(&self, method: &str, params: ArrayParams) -> KasResult<R> {
        trace!(%method, "Calling node");
        self.client
            .request(method, params)
            .await
            .map_err(rpc_error)
    }
}

/// Errors the node reports on purpose are service errors, everything else is transport.
fn rpc_error(err: RpcClientError) -> KasError {
    match err {
        RpcClientError::Call(obj) => ServiceError {
            code: obj.code() as i64,
            message: obj.message().to_string(),
        }
        .into(),
        other => ClientError::Rpc(other.to_string()).into(),
    }
}

#[async_trait]
impl NodeApi for NodeClient {
    async fn get_account_key(&self, address: Address) -> KasResult<Option<AccountKey>> {
        self.call("klay_getAccountKey", rpc_params![address, "latest"])
            .await
    }

    async fn fill_transaction(&self, tx: &mut Transaction) -> KasResult<()> {
        if tx.body().nonce.is_none() {
            let from = tx.from().ok_or_else(|| {
                ClientError::Param("cannot fill the nonce of a transaction without sender".into())
            })?;

            let nonce: U64 = self
                .call("klay_getTransactionCount", rpc_params![from, "pending"])
                .await?;
            tx.body_mut().nonce = Some(nonce.to::<u64>());
        }

        if tx.body().gas_price.is_none() {
            let gas_price: U128 = self.call("klay_gasPrice", rpc_params![]).await?;
            tx.body_mut().gas_price = Some(gas_price.to::<u128>());
        }

        if tx.body().chain_id.is_none() {
            let chain_id: U64 = self.call("klay_chainID", rpc_params![]).await?;
            tx.body_mut().chain_id = Some(chain_id.to::<u64>());
        }

        debug!(body = ?tx.body(), "Filled transaction defaults");
        Ok(())
    }
}
