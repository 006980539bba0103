use std::time::Duration;

use jayster_core::SessionConfig;

/// Address the Assessment contract lands at on a fresh local Hardhat node.
pub const DEFAULT_CONTRACT_ADDRESS: &str = "0x5FbDB2315678afecb367f032d93F642f64180aa3";

/// Interface of the deployed Assessment ATM contract.
pub const ASSESSMENT_ABI: &str = r#"[
  {
    "type": "function",
    "name": "getBalance",
    "stateMutability": "view",
    "inputs": [],
    "outputs": [{"name": "", "type": "uint256", "internalType": "uint256"}]
  },
  {
    "type": "function",
    "name": "deposit",
    "stateMutability": "payable",
    "inputs": [{"name": "_amount", "type": "uint256", "internalType": "uint256"}],
    "outputs": []
  },
  {
    "type": "function",
    "name": "withdraw",
    "stateMutability": "nonpayable",
    "inputs": [{"name": "_withdrawAmount", "type": "uint256", "internalType": "uint256"}],
    "outputs": []
  }
]"#;

#[derive(Debug, Clone)]
pub struct AdapterConfig {
    /// EIP-1193 JSON-RPC bridge standing in for the injected provider. No
    /// wallet is detected when this is unset.
    pub eip1193_proxy_url: Option<String>,
    pub request_timeout_ms: u64,
    pub receipt_poll_interval_ms: u64,
    pub confirmation_timeout_ms: u64,
    pub contract_address: String,
    /// Bare ABI array or a Hardhat artifact with an `abi` field.
    pub contract_abi_json: String,
    pub balance_decimals: u8,
    pub rate_api_base_url: String,
    pub rate_asset_id: String,
    pub display_currencies: Vec<String>,
    pub news_api_base_url: String,
    pub news_api_key: Option<String>,
    pub news_query: String,
    pub news_limit: usize,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            eip1193_proxy_url: None,
            request_timeout_ms: 15_000,
            receipt_poll_interval_ms: 1_000,
            confirmation_timeout_ms: 120_000,
            contract_address: DEFAULT_CONTRACT_ADDRESS.to_owned(),
            contract_abi_json: ASSESSMENT_ABI.to_owned(),
            balance_decimals: 0,
            rate_api_base_url: "https://api.coingecko.com/api/v3".to_owned(),
            rate_asset_id: "ethereum".to_owned(),
            display_currencies: vec!["usd".to_owned(), "php".to_owned()],
            news_api_base_url: "https://newsapi.org".to_owned(),
            news_api_key: None,
            news_query: "ethereum".to_owned(),
            news_limit: 10,
        }
    }
}

impl AdapterConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from `JAYSTER_*` keys; unset or unparsable values
    /// keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Self::default();
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_owned())
                .filter(|v| !v.is_empty())
        };

        cfg.eip1193_proxy_url = get("JAYSTER_EIP1193_PROXY_URL");
        if let Some(v) = get("JAYSTER_CONTRACT_ADDRESS") {
            cfg.contract_address = v;
        }
        if let Some(path) = get("JAYSTER_CONTRACT_ABI_PATH") {
            match std::fs::read_to_string(&path) {
                Ok(json) => cfg.contract_abi_json = json,
                Err(e) => {
                    tracing::warn!(%path, error = %e, "cannot read contract ABI, using built-in")
                }
            }
        }
        parse_into(&get, "JAYSTER_REQUEST_TIMEOUT_MS", &mut cfg.request_timeout_ms);
        parse_into(
            &get,
            "JAYSTER_RECEIPT_POLL_INTERVAL_MS",
            &mut cfg.receipt_poll_interval_ms,
        );
        parse_into(
            &get,
            "JAYSTER_CONFIRMATION_TIMEOUT_MS",
            &mut cfg.confirmation_timeout_ms,
        );
        parse_into(&get, "JAYSTER_BALANCE_DECIMALS", &mut cfg.balance_decimals);
        if let Some(v) = get("JAYSTER_RATE_API_URL") {
            cfg.rate_api_base_url = v;
        }
        if let Some(v) = get("JAYSTER_RATE_ASSET_ID") {
            cfg.rate_asset_id = v;
        }
        if let Some(v) = get("JAYSTER_CURRENCIES") {
            let currencies: Vec<String> = v
                .split(',')
                .map(|c| c.trim().to_ascii_lowercase())
                .filter(|c| !c.is_empty())
                .collect();
            if !currencies.is_empty() {
                cfg.display_currencies = currencies;
            }
        }
        if let Some(v) = get("JAYSTER_NEWS_API_URL") {
            cfg.news_api_base_url = v;
        }
        cfg.news_api_key = get("JAYSTER_NEWS_API_KEY");
        if let Some(v) = get("JAYSTER_NEWS_QUERY") {
            cfg.news_query = v;
        }
        parse_into(&get, "JAYSTER_NEWS_LIMIT", &mut cfg.news_limit);
        cfg
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            confirmation_timeout: Duration::from_millis(self.confirmation_timeout_ms),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn receipt_poll_interval(&self) -> Duration {
        Duration::from_millis(self.receipt_poll_interval_ms.max(1))
    }
}

fn parse_into<T: std::str::FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    key: &str,
    slot: &mut T,
) {
    if let Some(raw) = get(key) {
        match raw.parse() {
            Ok(v) => *slot = v,
            Err(_) => tracing::warn!(%key, %raw, "ignoring unparsable config value"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn lookup_overrides_defaults_and_ignores_garbage() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("JAYSTER_EIP1193_PROXY_URL", "http://127.0.0.1:8545"),
            ("JAYSTER_CONFIRMATION_TIMEOUT_MS", "2500"),
            ("JAYSTER_BALANCE_DECIMALS", "eighteen"),
            ("JAYSTER_CURRENCIES", "USD, eur ,"),
            ("JAYSTER_NEWS_API_KEY", "  "),
        ]);
        let cfg = AdapterConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(
            cfg.eip1193_proxy_url.as_deref(),
            Some("http://127.0.0.1:8545")
        );
        assert_eq!(
            cfg.session_config().confirmation_timeout,
            Duration::from_millis(2500)
        );
        assert_eq!(cfg.balance_decimals, 0);
        assert_eq!(cfg.display_currencies, vec!["usd", "eur"]);
        assert_eq!(cfg.news_api_key, None);
        assert_eq!(cfg.contract_address, DEFAULT_CONTRACT_ADDRESS);
    }
}
