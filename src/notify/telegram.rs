//! Telegram Bot API notifier.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{Notifier, NotifyError};
use crate::config::TelegramConfig;

/// Telegram Bot API base URL
pub const TELEGRAM_API_URL: &str = "https://api.telegram.org";

/// Telegram caps message text at 4096 characters
pub const MAX_MESSAGE_CHARS: usize = 4096;

#[derive(Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_mode: Option<&'a str>,
}

#[derive(Deserialize)]
struct SendMessageResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// Sends messages to one chat through a bot
pub struct TelegramNotifier {
    bot_token: String,
    chat_id: String,
    parse_mode: Option<String>,
    http_client: Client,
}

impl TelegramNotifier {
    /// Create a notifier from config
    pub fn new(config: &TelegramConfig, timeout: Duration) -> Result<Self, NotifyError> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NotifyError::Delivery(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            bot_token: config.bot_token.expose().to_string(),
            chat_id: config.chat_id.clone(),
            parse_mode: config.parse_mode.clone(),
            http_client,
        })
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, text: &str) -> Result<(), NotifyError> {
        let url = format!("{TELEGRAM_API_URL}/bot{}/sendMessage", self.bot_token);
        let text = truncate_message(text);
        let request = SendMessageRequest {
            chat_id: &self.chat_id,
            text: &text,
            parse_mode: self.parse_mode.as_deref(),
        };

        // reqwest errors embed the URL, which carries the bot token
        let response = self
            .http_client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| NotifyError::Delivery(e.without_url().to_string()))?;

        let status = response.status();
        let body: SendMessageResponse = response
            .json()
            .await
            .map_err(|e| NotifyError::Delivery(e.without_url().to_string()))?;

        if !status.is_success() || !body.ok {
            return Err(NotifyError::Rejected(
                body.description.unwrap_or_else(|| format!("HTTP {status}")),
            ));
        }

        info!("Telegram message sent");
        Ok(())
    }
}

/// Cut text to Telegram's limit on a character boundary
fn truncate_message(text: &str) -> String {
    if text.chars().count() <= MAX_MESSAGE_CHARS {
        return text.to_string();
    }
    let mut out: String = text.chars().take(MAX_MESSAGE_CHARS - 1).collect();
    out.push('…');
    out
}
