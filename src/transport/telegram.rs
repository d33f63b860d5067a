//! Telegram implementation of the transport.
//!
//! Uses teloxide with the Throttle adaptor so outbound calls respect the
//! platform's rate limits (30 msg/s globally, 1 msg/s per chat). Inbound
//! updates do not pass through teloxide; they arrive over the webhook
//! server and are decoded by this repo's own decoder.

use async_trait::async_trait;
use teloxide::adaptors::Throttle;
use teloxide::adaptors::throttle::Limits;
use teloxide::payloads::{CopyMessageSetters, SendMessageSetters, SetWebhookSetters};
use teloxide::prelude::*;
use teloxide::types::{ChatId, InlineKeyboardButton, InlineKeyboardMarkup, MessageId};
use tracing::info;
use url::Url;

use super::{MenuButton, Transport, TransportError};

/// Bot type with Throttle adaptor for automatic rate limiting.
pub type ThrottledBot = Throttle<Bot>;

/// Outbound Telegram client.
pub struct TelegramTransport {
    bot: ThrottledBot,
    /// Kept for building Bot-API file download URLs.
    token: String,
    http: reqwest::Client,
}

impl TelegramTransport {
    pub fn new(token: &str) -> Self {
        let bot = Bot::new(token).throttle(Limits::default());
        Self {
            bot,
            token: token.to_string(),
            http: reqwest::Client::new(),
        }
    }

    /// Register the webhook with Telegram so updates are delivered to
    /// this process. Called once at startup when a public URL is set.
    pub async fn register_webhook(
        &self,
        url: &Url,
        secret: Option<&str>,
    ) -> Result<(), TransportError> {
        info!(%url, "registering webhook");
        let mut req = self.bot.set_webhook(url.clone());
        if let Some(secret) = secret {
            req = req.secret_token(secret.to_string());
        }
        req.await?;
        Ok(())
    }
}

#[async_trait]
impl Transport for TelegramTransport {
    async fn copy_message(
        &self,
        to_chat: i64,
        from_chat: i64,
        message_id: i32,
        caption: Option<&str>,
    ) -> Result<(), TransportError> {
        let mut req =
            self.bot
                .copy_message(ChatId(to_chat), ChatId(from_chat), MessageId(message_id));
        if let Some(caption) = caption {
            req = req.caption(caption.to_string());
        }
        req.await?;
        Ok(())
    }

    async fn send_text(&self, chat_id: i64, text: &str) -> Result<(), TransportError> {
        self.bot.send_message(ChatId(chat_id), text).await?;
        Ok(())
    }

    async fn send_menu(
        &self,
        chat_id: i64,
        text: &str,
        buttons: &[Vec<MenuButton>],
    ) -> Result<(), TransportError> {
        let rows: Vec<Vec<InlineKeyboardButton>> = buttons
            .iter()
            .map(|row| {
                row.iter()
                    .map(|b| InlineKeyboardButton::callback(b.label.clone(), b.data.clone()))
                    .collect()
            })
            .collect();

        self.bot
            .send_message(ChatId(chat_id), text)
            .reply_markup(InlineKeyboardMarkup::new(rows))
            .await?;
        Ok(())
    }

    async fn ack_button(&self, callback_id: &str) -> Result<(), TransportError> {
        self.bot
            .answer_callback_query(callback_id.to_string())
            .await?;
        Ok(())
    }

    async fn fetch_document(&self, file_id: &str) -> Result<Vec<u8>, TransportError> {
        let file = self.bot.get_file(file_id.to_string()).await?;

        // Plain HTTP fetch of the Bot API file URL; simpler than the
        // Download trait and reuses the shared reqwest client.
        let url = format!(
            "https://api.telegram.org/file/bot{}/{}",
            self.token, file.path
        );
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| TransportError::Download(e.to_string()))?;

        if !response.status().is_success() {
            return Err(TransportError::Download(format!(
                "HTTP {}",
                response.status()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| TransportError::Download(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}
