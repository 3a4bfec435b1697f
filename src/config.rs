use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::error::BotError;

/// Tunables read from the optional config.toml. Credentials never live here.
#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_telegram_api_url")]
    pub telegram_api_url: String,
    #[serde(default = "default_retry_period_secs")]
    pub retry_period_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            telegram_api_url: default_telegram_api_url(),
            retry_period_secs: default_retry_period_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_endpoint() -> String {
    "https://practicum.yandex.ru/api/user_api/homework_statuses/".to_string()
}

fn default_telegram_api_url() -> String {
    "https://api.telegram.org".to_string()
}

fn default_retry_period_secs() -> u64 {
    600
}

fn default_request_timeout_secs() -> u64 {
    30
}

/// Raw credential values as they arrive from the CLI / environment.
#[derive(Default)]
pub struct Credentials {
    pub practicum_token: Option<String>,
    pub telegram_token: Option<String>,
    pub telegram_chat_id: Option<String>,
}

/// Everything the loop needs, validated once at startup.
pub struct Config {
    pub practicum_token: String,
    pub telegram_token: String,
    pub telegram_chat_id: String,
    pub endpoint: String,
    pub telegram_api_url: String,
    pub retry_period: Duration,
    pub request_timeout: Duration,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("telegram_chat_id", &self.telegram_chat_id)
            .field("endpoint", &self.endpoint)
            .field("telegram_api_url", &self.telegram_api_url)
            .field("retry_period", &self.retry_period)
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}

impl Config {
    /// Combine file settings with credentials. All three credentials are
    /// required; the error lists every one that is missing or blank.
    pub fn build(settings: Settings, creds: Credentials) -> crate::error::Result<Self> {
        let mut missing = Vec::new();
        let practicum_token = require(creds.practicum_token, "PRACTICUM_TOKEN", &mut missing);
        let telegram_token = require(creds.telegram_token, "TELEGRAM_TOKEN", &mut missing);
        let telegram_chat_id = require(creds.telegram_chat_id, "TELEGRAM_CHAT_ID", &mut missing);

        if !missing.is_empty() {
            return Err(BotError::Config(format!(
                "missing required environment variables: {}",
                missing.join(", ")
            )));
        }
        if settings.retry_period_secs == 0 {
            return Err(BotError::Config(
                "retry_period_secs must be greater than zero".into(),
            ));
        }

        Ok(Self {
            practicum_token,
            telegram_token,
            telegram_chat_id,
            endpoint: settings.endpoint,
            telegram_api_url: settings.telegram_api_url.trim_end_matches('/').to_string(),
            retry_period: Duration::from_secs(settings.retry_period_secs),
            request_timeout: Duration::from_secs(settings.request_timeout_secs),
        })
    }
}

fn require(value: Option<String>, name: &'static str, missing: &mut Vec<&'static str>) -> String {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => v,
        _ => {
            missing.push(name);
            String::new()
        }
    }
}

/// Read settings from `path`. A missing file yields the defaults.
pub fn load(path: &str) -> Result<Settings> {
    let path = expand_tilde(path);
    if !path.exists() {
        tracing::debug!("No config file at {}, using defaults", path.display());
        return Ok(Settings::default());
    }
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config: {}", path.display()))?;
    let settings: Settings = toml::from_str(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    Ok(settings)
}

/// Write a commented template to `path` unless something is already there.
/// Returns whether a file was written.
pub async fn init_config(path: &str) -> Result<bool> {
    let path = expand_tilde(path);
    if path.exists() {
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(
        &path,
        r#"# Credentials are read from the environment (or a .env file):
#   PRACTICUM_TOKEN, TELEGRAM_TOKEN, TELEGRAM_CHAT_ID

endpoint = "https://practicum.yandex.ru/api/user_api/homework_statuses/"
telegram_api_url = "https://api.telegram.org"

# Seconds between polling cycles
retry_period_secs = 600
# Per-request HTTP timeout in seconds
request_timeout_secs = 30
"#,
    )
    .await
    .with_context(|| format!("Failed to write config: {}", path.display()))?;
    Ok(true)
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    PathBuf::from(path)
}
