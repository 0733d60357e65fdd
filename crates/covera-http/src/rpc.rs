//! JSON-RPC wallet provider
//!
//! Speaks the EIP-1193 method set over HTTP JSON-RPC to a wallet bridge or a
//! signing node. The provider owns the keys; this handler only forwards
//! requests and interprets answers.
//!
//! Error code `4001` is the user declining in the wallet, `4100` an account
//! that is not authorized, and `4902` a chain the wallet does not know yet.

use async_trait::async_trait;
use covera_core::effects::{ChainSpec, Confirmation, TransactionRequest, WalletEffects};
use covera_core::errors::WalletError;
use covera_core::identifiers::{Address, TxRef};
use covera_core::types::Wei;
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// User declined the request
pub const USER_REJECTED: i64 = 4001;
/// Account not authorized for this origin
pub const UNAUTHORIZED: i64 = 4100;
/// Chain unknown to the wallet
pub const UNRECOGNIZED_CHAIN: i64 = 4902;

/// Connection settings for [`JsonRpcWallet`]
#[derive(Debug, Clone)]
pub struct RpcWalletConfig {
    /// JSON-RPC endpoint
    pub url: String,
    /// Per-request timeout
    pub request_timeout: Duration,
    /// Delay between receipt polls while waiting for confirmation
    pub receipt_poll_interval: Duration,
}

impl RpcWalletConfig {
    /// Settings with a 15 s request timeout and 2 s receipt polling
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            request_timeout: Duration::from_secs(15),
            receipt_poll_interval: Duration::from_secs(2),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Receipt {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    block_number: Option<String>,
}

impl Receipt {
    fn confirmation(&self) -> Confirmation {
        match self.status.as_deref() {
            Some("0x1") => Confirmation::Confirmed {
                block_number: self
                    .block_number
                    .as_deref()
                    .and_then(|n| u64::from_str_radix(n.trim_start_matches("0x"), 16).ok())
                    .unwrap_or_default(),
            },
            _ => Confirmation::Reverted,
        }
    }
}

/// Map a JSON-RPC error object onto the wallet error taxonomy
pub fn rpc_error(code: i64, message: impl Into<String>) -> WalletError {
    match code {
        USER_REJECTED => WalletError::UserRejected,
        UNAUTHORIZED => WalletError::Unauthorized,
        _ => WalletError::Rpc {
            code,
            message: message.into(),
        },
    }
}

fn transport_error(err: reqwest::Error) -> WalletError {
    if err.is_connect() {
        WalletError::Unavailable
    } else {
        WalletError::Transport {
            message: err.to_string(),
        }
    }
}

fn malformed(what: &str, detail: impl std::fmt::Display) -> WalletError {
    WalletError::Transport {
        message: format!("malformed {what}: {detail}"),
    }
}

/// Wallet provider reached over HTTP JSON-RPC
#[derive(Debug)]
pub struct JsonRpcWallet {
    url: Url,
    client: reqwest::Client,
    receipt_poll_interval: Duration,
    next_id: AtomicU64,
}

impl JsonRpcWallet {
    /// Build a provider client; fails on an unusable URL
    pub fn new(config: RpcWalletConfig) -> Result<Self, WalletError> {
        let url = Url::parse(&config.url).map_err(|e| malformed("RPC URL", e))?;
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(transport_error)?;
        Ok(Self {
            url,
            client,
            receipt_poll_interval: config.receipt_poll_interval,
            next_id: AtomicU64::new(1),
        })
    }

    /// Issue one JSON-RPC call and decode its result
    pub async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<T, WalletError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        tracing::debug!(method, id, "JSON-RPC call");

        let response = self
            .client
            .post(self.url.clone())
            .json(&request)
            .send()
            .await
            .map_err(transport_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(WalletError::Transport {
                message: format!("provider answered HTTP {status}"),
            });
        }
        let body: RpcResponse = response
            .json()
            .await
            .map_err(|e| malformed("JSON-RPC response", e))?;

        if let Some(error) = body.error {
            tracing::debug!(method, code = error.code, message = %error.message, "JSON-RPC error");
            return Err(rpc_error(error.code, error.message));
        }
        serde_json::from_value(body.result.unwrap_or(Value::Null))
            .map_err(|e| malformed(method, e))
    }

    async fn switch_chain(&self, chain: &ChainSpec) -> Result<(), WalletError> {
        let _: Value = self
            .call(
                "wallet_switchEthereumChain",
                json!([{ "chainId": chain.chain_id_hex() }]),
            )
            .await?;
        Ok(())
    }

    async fn add_chain(&self, chain: &ChainSpec) -> Result<(), WalletError> {
        let params = json!([{
            "chainId": chain.chain_id_hex(),
            "chainName": chain.chain_name,
            "nativeCurrency": {
                "name": chain.native_symbol,
                "symbol": chain.native_symbol,
                "decimals": chain.native_decimals,
            },
            "rpcUrls": [chain.rpc_url],
            "blockExplorerUrls": [chain.explorer_url],
        }]);
        let _: Value = self.call("wallet_addEthereumChain", params).await?;
        Ok(())
    }
}

fn addresses(raw: Vec<String>) -> Vec<Address> {
    raw.into_iter().map(Address::new).collect()
}

#[async_trait]
impl WalletEffects for JsonRpcWallet {
    async fn request_accounts(&self) -> Result<Vec<Address>, WalletError> {
        let raw: Vec<String> = self.call("eth_requestAccounts", json!([])).await?;
        Ok(addresses(raw))
    }

    async fn accounts(&self) -> Result<Vec<Address>, WalletError> {
        let raw: Vec<String> = self.call("eth_accounts", json!([])).await?;
        Ok(addresses(raw))
    }

    async fn ensure_network(&self, chain: &ChainSpec) -> Result<(), WalletError> {
        let current: String = self.call("eth_chainId", json!([])).await?;
        if current.eq_ignore_ascii_case(&chain.chain_id_hex()) {
            return Ok(());
        }
        match self.switch_chain(chain).await {
            Err(WalletError::Rpc {
                code: UNRECOGNIZED_CHAIN,
                ..
            }) => {
                tracing::info!(chain_id = chain.chain_id, "Adding chain to wallet");
                self.add_chain(chain).await?;
                self.switch_chain(chain).await
            }
            other => other,
        }
    }

    async fn get_balance(&self, address: &Address) -> Result<Wei, WalletError> {
        let raw: String = self
            .call("eth_getBalance", json!([address.as_str(), "latest"]))
            .await?;
        Wei::from_hex(&raw).map_err(|e| malformed("balance", e))
    }

    async fn send_transaction(&self, request: &TransactionRequest) -> Result<TxRef, WalletError> {
        let mut tx = json!({
            "from": request.from.as_str(),
            "to": request.to.as_str(),
            "value": request.value.to_hex(),
            "gas": format!("{:#x}", request.gas_limit),
        });
        if let Some(data) = &request.data {
            tx["data"] = Value::String(data.clone());
        }
        let hash: String = self.call("eth_sendTransaction", json!([tx])).await?;
        tracing::info!(tx = %hash, to = %request.to, "Transaction broadcast");
        Ok(TxRef::new(hash))
    }

    async fn wait_for_confirmation(&self, tx: &TxRef) -> Result<Confirmation, WalletError> {
        loop {
            let receipt: Option<Receipt> = self
                .call("eth_getTransactionReceipt", json!([tx.as_str()]))
                .await?;
            if let Some(receipt) = receipt {
                let confirmation = receipt.confirmation();
                tracing::debug!(tx = %tx, ?confirmation, "Receipt observed");
                return Ok(confirmation);
            }
            tokio::time::sleep(self.receipt_poll_interval).await;
        }
    }

    async fn sign_message(&self, address: &Address, message: &[u8]) -> Result<String, WalletError> {
        let payload = format!("0x{}", hex::encode(message));
        self.call("personal_sign", json!([payload, address.as_str()]))
            .await
    }
}
