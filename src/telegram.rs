use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{BotError, Result};

/// Outbound side of the bot: deliver one text message to the configured chat.
#[async_trait::async_trait]
pub trait Messenger: Send + Sync {
    async fn send(&self, text: &str) -> Result<()>;
}

pub struct TelegramBot {
    client: Client,
    api_url: String,
    token: String,
    chat_id: String,
}

#[derive(Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
}

#[derive(Deserialize)]
struct BotApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

impl TelegramBot {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| BotError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            api_url: config.telegram_api_url.clone(),
            token: config.telegram_token.clone(),
            chat_id: config.telegram_chat_id.clone(),
        })
    }
}

#[async_trait::async_trait]
impl Messenger for TelegramBot {
    async fn send(&self, text: &str) -> Result<()> {
        // The token is part of the path, so it must stay out of error messages.
        let url = format!("{}/bot{}/sendMessage", self.api_url, self.token);
        let response = self
            .client
            .post(&url)
            .json(&SendMessageRequest {
                chat_id: &self.chat_id,
                text,
            })
            .send()
            .await
            .map_err(|e| BotError::Delivery(format!("sendMessage failed: {}", e.without_url())))?;

        let status = response.status();
        let body: Option<BotApiResponse> = response.json().await.ok();
        match body {
            Some(BotApiResponse { ok: true, .. }) if status.is_success() => Ok(()),
            Some(BotApiResponse { description, .. }) => Err(BotError::Delivery(format!(
                "Telegram rejected message ({status}): {}",
                description.unwrap_or_else(|| "no description".into())
            ))),
            None => Err(BotError::Delivery(format!(
                "Telegram returned {status} with an unreadable body"
            ))),
        }
    }
}
