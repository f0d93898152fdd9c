//! REST client for the custodial wallet service.

use alloy_primitives::{Address, Bytes, B256};
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine};
use kas_primitives::{
    multisig::{MultisigSignatureResult, MultisigUpdate, PendingMultisigTx},
    signature::SignatureData,
};
use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client, RequestBuilder, StatusCode,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::json;
use tracing::*;

use crate::{
    config::ClientConfig,
    error::{ClientError, ClientResult, KasError, KasResult, ServiceError},
    traits::WalletApi,
    types::{
        Account, AccountStatus, AppendSignaturesRequest, FeePayerRlpRequest,
        GlobalFeePayerSignatures, PendingTxPage, RawTxSignatures, RlpRequest,
        UserFeePayerSignatures,
    },
};

/// Header carrying the chain the request is meant for.
const CHAIN_ID_HEADER: &str = "x-chain-id";

/// Page size used when listing pending multisig transactions.
const PENDING_PAGE_SIZE: u32 = 100;

/// An `async` client for the custodial wallet service.
///
/// The client performs no retries; transport errors are surfaced as they happen.
#[derive(Debug, Clone)]
pub struct KasClient {
    /// Base URL of the wallet service.
    url: String,
    /// The underlying `async` HTTP client, preloaded with auth and chain headers.
    client: Client,
}

impl KasClient {
    /// Creates a new [`KasClient`] for the given chain with the given credentials.
    pub fn new(
        url: String,
        chain_id: u64,
        access_key_id: &str,
        secret_access_key: &str,
    ) -> ClientResult<Self> {
        if access_key_id.is_empty() || secret_access_key.is_empty() {
            return Err(ClientError::MissingCredentials);
        }

        let credentials =
            general_purpose::STANDARD.encode(format!("{access_key_id}:{secret_access_key}"));
        let authorization = format!("Basic {credentials}")
            .parse()
            .map_err(|_| ClientError::Other("Error parsing header".to_string()))?;

        let content_type = "application/json"
            .parse()
            .map_err(|_| ClientError::Other("Error parsing header".to_string()))?;

        let chain_id = HeaderValue::from(chain_id);
        let headers = HeaderMap::from_iter([
            (AUTHORIZATION, authorization),
            (CONTENT_TYPE, content_type),
            (HeaderName::from_static(CHAIN_ID_HEADER), chain_id),
        ]);

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| ClientError::Other(format!("Could not create client: {e}")))?;

        trace!(url = %url, "Created wallet client");

        Ok(Self { url, client })
    }

    /// Creates a new [`KasClient`] from the wallet section of the config.
    pub fn from_config(config: &ClientConfig) -> ClientResult<Self> {
        Self::new(
            config.wallet_url.clone(),
            config.chain_id,
            &config.credentials.access_key_id,
            config.credentials.secret_access_key(),
        )
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> KasResult<T> {
        self.send(self.client.get(self.endpoint(path))).await
    }

    async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> KasResult<T> {
        self.send(self.client.post(self.endpoint(path)).json(body))
            .await
    }

    async fn delete<T: DeserializeOwned>(&self, path: &str) -> KasResult<T> {
        self.send(self.client.delete(self.endpoint(path))).await
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> KasResult<T> {
        let response = request.send().await.map_err(|err| {
            warn!(%err, "Error calling wallet service");
            ClientError::from(err)
        })?;

        let status = response.status();
        trace!(%status, "Response received");

        if status.is_success() {
            return response
                .json::<T>()
                .await
                .map_err(|e| ClientError::Parse(e.to_string()).into());
        }

        let body = response.text().await.map_err(ClientError::from)?;
        Err(error_from_body(status, body))
    }
}

/// Turn a non-2xx response into an error, preferring the structured error the service sends.
fn error_from_body(status: StatusCode, body: String) -> KasError {
    match serde_json::from_str::<ServiceError>(&body) {
        Ok(err) => {
            debug!(code = err.code, message = %err.message, "Wallet service returned error");
            err.into()
        }
        Err(_) => ClientError::Status(status.to_string(), body).into(),
    }
}

#[async_trait]
impl WalletApi for KasClient {
    async fn create_account(&self) -> KasResult<Account> {
        self.post("v2/account", &json!({})).await
    }

    async fn get_account(&self, address: Address) -> KasResult<Account> {
        self.get(&format!("v2/account/{address}")).await
    }

    async fn delete_account(&self, address: Address) -> KasResult<AccountStatus> {
        self.delete(&format!("v2/account/{address}")).await
    }

    async fn sign_raw_transaction(&self, rlp: Bytes) -> KasResult<RawTxSignatures> {
        trace!(%rlp, "Requesting sender signature");
        self.post("v2/tx/rlp", &RlpRequest { rlp, submit: false })
            .await
    }

    async fn sign_fd_raw_transaction_by_global_fee_payer(
        &self,
        rlp: Bytes,
    ) -> KasResult<GlobalFeePayerSignatures> {
        trace!(%rlp, "Requesting signatures paid by the global fee payer");
        self.post("v2/tx/fd/rlp", &RlpRequest { rlp, submit: false })
            .await
    }

    async fn sign_fd_raw_transaction_by_user(
        &self,
        rlp: Bytes,
        fee_payer: Option<Address>,
    ) -> KasResult<UserFeePayerSignatures> {
        trace!(%rlp, ?fee_payer, "Requesting fee payer signature");
        let request = FeePayerRlpRequest {
            rlp,
            submit: false,
            fee_payer,
        };

        self.post("v2/tx/fd-user/rlp", &request).await
    }

    async fn request_multisig_signature(
        &self,
        signer: Address,
        transaction_id: B256,
    ) -> KasResult<MultisigSignatureResult> {
        self.post(
            &format!("v2/multisig/signer/{signer}/tx/{transaction_id}/sign"),
            &json!({}),
        )
        .await
    }

    async fn append_multisig_signatures(
        &self,
        transaction_id: B256,
        signatures: Vec<SignatureData>,
    ) -> KasResult<MultisigUpdate> {
        self.post(
            &format!("v2/multisig/tx/{transaction_id}/sign"),
            &AppendSignaturesRequest { signatures },
        )
        .await
    }

    async fn list_pending_multisig_transactions(
        &self,
        account: Address,
    ) -> KasResult<Vec<PendingMultisigTx>> {
        let mut pending = Vec::new();
        let mut cursor = String::new();

        loop {
            let mut path = format!("v2/multisig/account/{account}/tx?size={PENDING_PAGE_SIZE}");
            if !cursor.is_empty() {
                path.push_str(&format!("&cursor={cursor}"));
            }

            let page: PendingTxPage = self.get(&path).await?;
            pending.extend(page.items);

            match next_cursor(&cursor, page.cursor) {
                Some(next) => cursor = next,
                None => break,
            }
        }

        Ok(pending)
    }
}

/// The cursor of the page after the current one, if any.
///
/// An empty cursor, or one equal to the current cursor, ends the listing.
fn next_cursor(current: &str, returned: String) -> Option<String> {
    if returned.is_empty() {
        return None;
    }

    if returned == current {
        warn!(cursor = %returned, "Service repeated the page cursor, stopping");
        return None;
    }

    Some(returned)
}
