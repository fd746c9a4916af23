//! Remote wallet that delegates account access and signing to a signer-proxy.
//!
//! The proxy plays the role of a browser wallet: it decides which accounts
//! the dApp may use (`eth_requestAccounts`, `eth_accounts`) and asks its
//! operator to approve every `eth_signTransaction`. A declined request comes
//! back as JSON-RPC error 4001.

use crate::WalletError;
use alloy_primitives::{Address, Bytes};
use alloy_rpc_types::eth::TransactionRequest;
use eyre::{bail, Result};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// A signer that delegates to a signer-proxy service over HTTP.
///
/// # Example
///
/// ```ignore
/// let signer = RemoteSigner::new("http://localhost:9060");
/// let accounts = signer.request_accounts().await?;
/// let signed_tx = signer.sign_transaction(tx_request).await?;
/// provider.send_raw_transaction(&signed_tx).await?;
/// ```
#[derive(Debug, Clone)]
pub struct RemoteSigner {
    client: reqwest::Client,
    proxy_url: String,
}

impl RemoteSigner {
    /// Creates a new remote signer for the proxy at `proxy_url`.
    pub fn new(proxy_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), proxy_url)
    }

    /// Creates a new remote signer with a custom HTTP client.
    pub fn with_client(client: reqwest::Client, proxy_url: impl Into<String>) -> Self {
        Self {
            client,
            proxy_url: proxy_url.into(),
        }
    }

    /// Returns the proxy URL.
    pub fn proxy_url(&self) -> &str {
        &self.proxy_url
    }

    /// Ask the proxy for account access. May prompt its operator.
    pub async fn request_accounts(&self) -> Result<Vec<Address>> {
        self.call("eth_requestAccounts", Value::Array(vec![])).await
    }

    /// Accounts currently exposed by the proxy, without prompting.
    pub async fn accounts(&self) -> Result<Vec<Address>> {
        self.call("eth_accounts", Value::Array(vec![])).await
    }

    /// Signs a transaction via the remote signer-proxy.
    ///
    /// Returns the signed transaction as raw bytes, ready to be broadcast
    /// via `provider.send_raw_transaction()`.
    pub async fn sign_transaction(&self, tx: TransactionRequest) -> Result<Bytes> {
        let response: SignedTransactionResponse = self.call("eth_signTransaction", [tx]).await?;
        let bytes: Bytes = response.raw.parse()?;
        Ok(bytes)
    }

    async fn call<P, R>(&self, method: &'static str, params: P) -> Result<R>
    where
        P: Serialize,
        R: DeserializeOwned,
    {
        debug!(method, proxy = %self.proxy_url, "Sending request to signer-proxy");

        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            method,
            params,
            id: 1,
        };

        let response = self
            .client
            .post(&self.proxy_url)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown".to_string());
            bail!("signer-proxy returned {status}: {body}");
        }

        let rpc_response: JsonRpcResponse<R> = response.json().await?;

        match (rpc_response.result, rpc_response.error) {
            (_, Some(error)) => Err(error.into_wallet_error().into()),
            (Some(result), None) => Ok(result),
            (None, None) => bail!("signer-proxy returned neither result nor error for {method}"),
        }
    }
}

#[derive(Debug, Serialize)]
struct JsonRpcRequest<T> {
    jsonrpc: &'static str,
    method: &'static str,
    params: T,
    id: u32,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse<T> {
    result: Option<T>,
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<Value>,
}

impl JsonRpcError {
    fn into_wallet_error(self) -> WalletError {
        let data_message = self
            .data
            .as_ref()
            .and_then(|data| data.get("message"))
            .and_then(Value::as_str)
            .map(str::to_string);

        WalletError::Rpc {
            code: self.code,
            message: self.message,
            data_message,
        }
    }
}

/// Response from eth_signTransaction containing the signed transaction.
#[derive(Debug, Deserialize)]
struct SignedTransactionResponse {
    /// The signed transaction as hex-encoded RLP.
    raw: String,
}
