use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use alloy::primitives::Address;
use async_trait::async_trait;
use serde_json::Value;

use jayster_core::{PortError, SignerHandle, WalletPort};

use crate::AdapterConfig;

/// EIP-1193 user rejection.
const USER_REJECTED_CODE: i64 = 4001;
/// EIP-1193 unauthorized method or account.
const UNAUTHORIZED_CODE: i64 = 4100;
/// Geth/Hardhat execution-reverted code.
const EXECUTION_REVERTED_CODE: i64 = 3;

/// Wallet provider reached over a JSON-RPC bridge that forwards the
/// `request({ method, params })` surface of an injected provider.
#[derive(Debug, Clone)]
pub struct Eip1193Adapter {
    mode: ProviderMode,
    state: Arc<Mutex<ProviderState>>,
    next_id: Arc<AtomicU64>,
}

#[derive(Debug, Clone)]
enum ProviderMode {
    Absent(String),
    Proxy(ProxyRuntime),
}

#[derive(Debug, Clone)]
struct ProxyRuntime {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Clone, Default)]
struct ProviderState {
    accounts: Vec<Address>,
}

impl Eip1193Adapter {
    pub fn with_config(config: &AdapterConfig) -> Self {
        let mode = match config.eip1193_proxy_url {
            Some(ref base_url) => match reqwest::Client::builder()
                .timeout(config.request_timeout())
                .build()
            {
                Ok(client) => ProviderMode::Proxy(ProxyRuntime {
                    base_url: base_url.clone(),
                    client,
                }),
                Err(e) => {
                    tracing::warn!(error = %e, "failed to initialize EIP-1193 proxy client");
                    ProviderMode::Absent(format!("EIP-1193 proxy client unavailable: {e}"))
                }
            },
            None => ProviderMode::Absent("EIP-1193 proxy URL not configured".to_owned()),
        };

        Self {
            mode,
            state: Arc::new(Mutex::new(ProviderState::default())),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    pub fn absent() -> Self {
        Self::with_config(&AdapterConfig::default())
    }

    /// Forwards one provider request and returns its `result`.
    pub async fn request(&self, method: &str, params: Value) -> Result<Value, PortError> {
        let proxy = match &self.mode {
            ProviderMode::Proxy(proxy) => proxy,
            ProviderMode::Absent(reason) => return Err(PortError::Unavailable(reason.clone())),
        };

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let payload = serde_json::json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        tracing::debug!(%method, id, "eip1193 request");

        let response = proxy
            .client
            .post(&proxy.base_url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| PortError::Transport(format!("{method}: proxy request failed: {e}")))?;
        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|e| PortError::Transport(format!("{method}: proxy json decode failed: {e}")))?;

        if let Some(err) = body.get("error") {
            return Err(rpc_error(method, err));
        }
        if !status.is_success() {
            return Err(PortError::Transport(format!(
                "{method}: proxy status {status}: {body}"
            )));
        }
        body.get("result")
            .cloned()
            .ok_or_else(|| PortError::Transport(format!("{method}: proxy missing result")))
    }

    async fn fetch_accounts(&self, method: &str) -> Result<Vec<Address>, PortError> {
        let result = self.request(method, serde_json::json!([])).await?;
        let accounts = parse_accounts(method, &result)?;
        let mut g = self
            .state
            .lock()
            .map_err(|e| PortError::Transport(format!("provider lock poisoned: {e}")))?;
        g.accounts = accounts.clone();
        Ok(accounts)
    }
}

#[async_trait]
impl WalletPort for Eip1193Adapter {
    fn detect(&self) -> bool {
        matches!(self.mode, ProviderMode::Proxy(_))
    }

    async fn list_authorized_accounts(&self) -> Result<Vec<Address>, PortError> {
        self.fetch_accounts("eth_accounts").await
    }

    async fn request_authorization(&self) -> Result<Vec<Address>, PortError> {
        self.fetch_accounts("eth_requestAccounts").await
    }

    fn signer(&self, account: Address) -> Result<SignerHandle, PortError> {
        let g = self
            .state
            .lock()
            .map_err(|e| PortError::Transport(format!("provider lock poisoned: {e}")))?;
        if !g.accounts.contains(&account) {
            return Err(PortError::Policy(format!(
                "account {account} is not authorized by the provider"
            )));
        }
        Ok(SignerHandle { account })
    }
}

fn parse_accounts(method: &str, result: &Value) -> Result<Vec<Address>, PortError> {
    let arr = result
        .as_array()
        .ok_or_else(|| PortError::Transport(format!("{method}: array expected")))?;
    let mut accounts = Vec::with_capacity(arr.len());
    for item in arr {
        let raw = item
            .as_str()
            .ok_or_else(|| PortError::Transport(format!("{method}: string expected")))?;
        let parsed: Address = raw
            .parse()
            .map_err(|e| PortError::Validation(format!("invalid account address {raw}: {e}")))?;
        accounts.push(parsed);
    }
    Ok(accounts)
}

fn rpc_error(method: &str, err: &Value) -> PortError {
    let code = err.get("code").and_then(Value::as_i64);
    let message = err
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_owned)
        .unwrap_or_else(|| err.to_string());

    match code {
        Some(USER_REJECTED_CODE) => PortError::Rejected(message),
        Some(UNAUTHORIZED_CODE) => PortError::Policy(message),
        Some(EXECUTION_REVERTED_CODE) => PortError::Reverted(message),
        _ if message.to_ascii_lowercase().contains("revert") => PortError::Reverted(message),
        _ => PortError::Transport(format!("{method} returned error: {message}")),
    }
}
