use async_trait::async_trait;
use serde::Deserialize;

use jayster_core::{Article, NewsPort, PortError};

use crate::AdapterConfig;

/// Article search against the NewsAPI `v2/everything` endpoint.
#[derive(Debug, Clone)]
pub struct NewsApiAdapter {
    base_url: String,
    api_key: Option<String>,
    client: Option<reqwest::Client>,
}

#[derive(Debug, Deserialize)]
struct EverythingResponse {
    status: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    articles: Vec<RawArticle>,
}

#[derive(Debug, Deserialize)]
struct RawArticle {
    title: Option<String>,
    url: Option<String>,
}

impl NewsApiAdapter {
    pub fn with_config(config: &AdapterConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| tracing::warn!(error = %e, "failed to initialize news client"))
            .ok();
        Self {
            base_url: config.news_api_base_url.trim_end_matches('/').to_owned(),
            api_key: config.news_api_key.clone(),
            client,
        }
    }
}

#[async_trait]
impl NewsPort for NewsApiAdapter {
    async fn articles(&self, term: &str) -> Result<Vec<Article>, PortError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| PortError::Policy("news api key not configured".to_owned()))?;
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| PortError::Unavailable("news client not initialized".to_owned()))?;
        let url = reqwest::Url::parse_with_params(
            &format!("{}/v2/everything", self.base_url),
            &[("q", term), ("apiKey", api_key)],
        )
        .map_err(|e| PortError::Validation(format!("invalid news api url: {e}")))?;

        let response = client
            .get(url)
            .send()
            .await
            .map_err(|e| PortError::Transport(format!("news request failed: {e}")))?;
        let status = response.status();
        let body: EverythingResponse = response
            .json()
            .await
            .map_err(|e| PortError::Transport(format!("news json decode failed: {e}")))?;
        if !status.is_success() || body.status != "ok" {
            return Err(PortError::Unavailable(format!(
                "news api status {status}: {}",
                body.message.unwrap_or(body.status)
            )));
        }

        Ok(body
            .articles
            .into_iter()
            .filter_map(|a| {
                Some(Article {
                    title: a.title?,
                    url: a.url?,
                })
            })
            .collect())
    }
}
