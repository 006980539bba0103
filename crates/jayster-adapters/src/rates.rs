use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;

use jayster_core::{PortError, RatePort};

use crate::AdapterConfig;

/// Spot prices from the CoinGecko `simple/price` endpoint.
#[derive(Debug, Clone)]
pub struct CoinGeckoRateAdapter {
    base_url: String,
    asset_id: String,
    client: Option<reqwest::Client>,
}

impl CoinGeckoRateAdapter {
    pub fn with_config(config: &AdapterConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| tracing::warn!(error = %e, "failed to initialize rate client"))
            .ok();
        Self {
            base_url: config.rate_api_base_url.trim_end_matches('/').to_owned(),
            asset_id: config.rate_asset_id.clone(),
            client,
        }
    }
}

#[async_trait]
impl RatePort for CoinGeckoRateAdapter {
    async fn rates(&self, currencies: &[String]) -> Result<BTreeMap<String, f64>, PortError> {
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| PortError::Unavailable("rate client not initialized".to_owned()))?;
        let url = reqwest::Url::parse_with_params(
            &format!("{}/simple/price", self.base_url),
            &[
                ("ids", self.asset_id.as_str()),
                ("vs_currencies", currencies.join(",").as_str()),
            ],
        )
        .map_err(|e| PortError::Validation(format!("invalid rate api url: {e}")))?;

        let response = client
            .get(url)
            .send()
            .await
            .map_err(|e| PortError::Transport(format!("rate request failed: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PortError::Transport(format!(
                "rate api status {status}: {body}"
            )));
        }
        let mut prices: HashMap<String, BTreeMap<String, f64>> = response
            .json()
            .await
            .map_err(|e| PortError::Transport(format!("rate json decode failed: {e}")))?;
        let quotes = prices.remove(&self.asset_id).ok_or_else(|| {
            PortError::Unavailable(format!("no quotes for {}", self.asset_id))
        })?;
        tracing::debug!(asset = %self.asset_id, quotes = quotes.len(), "rates fetched");
        Ok(quotes)
    }
}
