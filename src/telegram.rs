use reqwest::Client;
use serde::Serialize;
use tracing::debug;

use crate::config::TelegramConfig;
use crate::error::{ReportError, Result};

pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'a str,
    disable_web_page_preview: bool,
}

/// Delivers digests through the Telegram Bot API `sendMessage` method.
pub struct TelegramNotifier {
    http: Client,
    url: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(http: Client, config: &TelegramConfig, api_base: &str) -> Self {
        Self {
            http,
            url: format!(
                "{}/bot{}/sendMessage",
                api_base.trim_end_matches('/'),
                config.bot_token
            ),
            chat_id: config.chat_id.clone(),
        }
    }

    /// Post `text` as HTML. Any non-2xx answer is a hard failure.
    pub async fn send(&self, text: &str) -> Result<()> {
        let body = SendMessage {
            chat_id: &self.chat_id,
            text,
            parse_mode: "HTML",
            disable_web_page_preview: true,
        };

        // reqwest errors embed the URL, and the URL embeds the bot token.
        let resp = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ReportError::Delivery {
                status: None,
                message: e.without_url().to_string(),
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ReportError::Delivery {
                status: Some(status.as_u16()),
                message: body,
            });
        }

        debug!(chat_id = %self.chat_id, chars = text.chars().count(), "Telegram message sent");
        Ok(())
    }
}
