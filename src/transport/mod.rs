//! Outbound messaging transport.
//!
//! The platform transport is an external collaborator: the pipeline only
//! depends on this trait, so the sequencer and handlers are tested with
//! a recording double and never touch the network.

mod telegram;

use async_trait::async_trait;
use thiserror::Error;

pub use telegram::TelegramTransport;

/// Errors from the outbound side of the platform.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("telegram api: {0}")]
    Api(#[from] teloxide::RequestError),

    #[error("download failed: {0}")]
    Download(String),
}

/// One inline button: label shown to the user, payload echoed back in
/// the button-press update.
#[derive(Debug, Clone)]
pub struct MenuButton {
    pub label: String,
    pub data: String,
}

impl MenuButton {
    pub fn new(label: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            data: data.into(),
        }
    }
}

/// Outbound operations the pipeline needs from the platform.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Copy a message into another chat. `caption` replaces the original
    /// caption when given; `None` preserves it.
    async fn copy_message(
        &self,
        to_chat: i64,
        from_chat: i64,
        message_id: i32,
        caption: Option<&str>,
    ) -> Result<(), TransportError>;

    /// Send a plain text message.
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<(), TransportError>;

    /// Send a text message with an inline keyboard.
    async fn send_menu(
        &self,
        chat_id: i64,
        text: &str,
        buttons: &[Vec<MenuButton>],
    ) -> Result<(), TransportError>;

    /// Acknowledge a button press so the client stops its spinner.
    async fn ack_button(&self, callback_id: &str) -> Result<(), TransportError>;

    /// Download a document's bytes by its platform file id.
    async fn fetch_document(&self, file_id: &str) -> Result<Vec<u8>, TransportError>;
}
