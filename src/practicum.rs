use reqwest::Client;
use serde_json::Value;

use crate::config::Config;
use crate::error::{BotError, Result};

/// Anything that can answer "which homeworks changed since `from_date`".
#[async_trait::async_trait]
pub trait HomeworkSource: Send + Sync {
    /// Returns the decoded but unvalidated payload.
    async fn fetch(&self, from_date: i64) -> Result<Value>;
}

/// Client for the Practicum homework-status endpoint.
pub struct PracticumClient {
    client: Client,
    endpoint: String,
    token: String,
}

impl PracticumClient {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| BotError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            token: config.practicum_token.clone(),
        })
    }
}

#[async_trait::async_trait]
impl HomeworkSource for PracticumClient {
    async fn fetch(&self, from_date: i64) -> Result<Value> {
        let response = self
            .client
            .get(&self.endpoint)
            .header("Authorization", format!("OAuth {}", self.token))
            .query(&[("from_date", from_date)])
            .send()
            .await
            .map_err(|e| BotError::Fetch(format!("request to {} failed: {e}", self.endpoint)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BotError::Fetch(format!(
                "API returned {status}: {}",
                snippet(&body)
            )));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| BotError::Fetch(format!("failed to decode API response: {e}")))
    }
}

fn snippet(body: &str) -> &str {
    match body.char_indices().nth(200) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}
