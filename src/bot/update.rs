//! Canonical event decoder.
//!
//! Parses the raw webhook JSON into one typed [`Update`] via a fixed
//! serde schema, independent of any client library's internal update
//! representation. Partially-populated payloads decode to the most
//! specific variant their fields support; the only hard failure is a
//! payload with no sender id at all.

use serde::Deserialize;
use thiserror::Error;

/// Errors from decoding one inbound payload.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("invalid update json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("update carries no sender id")]
    MissingSender,

    #[error("update carries no recognizable payload")]
    EmptyUpdate,
}

// ---- Raw wire schema (the subset of fields this system reads) ----

#[derive(Debug, Deserialize)]
pub struct RawUpdate {
    pub message: Option<RawMessage>,
    pub callback_query: Option<RawCallbackQuery>,
}

#[derive(Debug, Deserialize)]
pub struct RawMessage {
    pub message_id: i32,
    pub from: Option<RawUser>,
    pub chat: Option<RawChat>,
    pub text: Option<String>,
    pub document: Option<RawDocument>,
    pub photo: Option<Vec<RawPhotoSize>>,
    pub video: Option<RawFile>,
    pub animation: Option<RawFile>,
    pub media_group_id: Option<String>,
    pub forward_from_chat: Option<RawChat>,
}

#[derive(Debug, Deserialize)]
pub struct RawUser {
    pub id: i64,
    pub first_name: Option<String>,
    pub username: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawChat {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub title: Option<String>,
    pub username: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawDocument {
    pub file_id: String,
    pub file_name: Option<String>,
    pub mime_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawFile {
    pub file_id: String,
}

#[derive(Debug, Deserialize)]
pub struct RawPhotoSize {
    pub file_id: String,
}

#[derive(Debug, Deserialize)]
pub struct RawCallbackQuery {
    pub id: String,
    pub from: Option<RawUser>,
    pub data: Option<String>,
    pub message: Option<RawMessage>,
}

// ---- Decoded update ----

/// Who sent the update.
#[derive(Debug, Clone)]
pub struct Sender {
    pub id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
}

impl From<RawUser> for Sender {
    fn from(user: RawUser) -> Self {
        Self {
            id: user.id,
            username: user.username,
            first_name: user.first_name,
        }
    }
}

/// A `/command`, split off the leading text.
#[derive(Debug, Clone)]
pub struct Command {
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct TextMessage {
    pub sender: Sender,
    pub chat_id: i64,
    pub text: String,
    pub command: Option<Command>,
}

#[derive(Debug, Clone)]
pub struct DocumentMessage {
    pub sender: Sender,
    pub chat_id: i64,
    pub message_id: i32,
    pub file_id: String,
    pub file_name: Option<String>,
    pub mime_type: Option<String>,
    /// Shared id of a multi-item submission, when part of one.
    pub group_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Photo,
    Video,
    Animation,
}

#[derive(Debug, Clone)]
pub struct MediaMessage {
    pub sender: Sender,
    pub chat_id: i64,
    pub message_id: i32,
    pub kind: MediaKind,
    pub file_id: String,
    /// Shared id of a multi-item submission, when part of one.
    pub group_id: Option<String>,
}

/// Origin chat of a forwarded message.
#[derive(Debug, Clone)]
pub struct ChatRef {
    pub id: i64,
    pub title: Option<String>,
    pub username: Option<String>,
    pub is_channel: bool,
}

#[derive(Debug, Clone)]
pub struct ForwardedMessage {
    pub sender: Sender,
    pub chat_id: i64,
    pub origin: ChatRef,
}

#[derive(Debug, Clone)]
pub struct ButtonPress {
    pub sender: Sender,
    pub callback_id: String,
    pub data: String,
    pub chat_id: Option<i64>,
    pub message_id: Option<i32>,
}

/// One decoded inbound event.
#[derive(Debug, Clone)]
pub enum Update {
    Text(TextMessage),
    Document(DocumentMessage),
    Media(MediaMessage),
    Forwarded(ForwardedMessage),
    Button(ButtonPress),
}

impl Update {
    pub fn sender(&self) -> &Sender {
        match self {
            Update::Text(m) => &m.sender,
            Update::Document(m) => &m.sender,
            Update::Media(m) => &m.sender,
            Update::Forwarded(m) => &m.sender,
            Update::Button(m) => &m.sender,
        }
    }

    pub fn user_id(&self) -> i64 {
        self.sender().id
    }

    /// Chat to reply into. Button presses without an attached message
    /// fall back to the sender's private chat.
    pub fn chat_id(&self) -> i64 {
        match self {
            Update::Text(m) => m.chat_id,
            Update::Document(m) => m.chat_id,
            Update::Media(m) => m.chat_id,
            Update::Forwarded(m) => m.chat_id,
            Update::Button(m) => m.chat_id.unwrap_or(m.sender.id),
        }
    }

    pub fn command(&self) -> Option<&Command> {
        match self {
            Update::Text(m) => m.command.as_ref(),
            _ => None,
        }
    }

    pub fn is_command(&self, name: &str) -> bool {
        self.command().is_some_and(|c| c.name == name)
    }
}

/// Decode a raw JSON body.
pub fn decode_slice(bytes: &[u8]) -> Result<Update, DecodeError> {
    decode(serde_json::from_slice(bytes)?)
}

/// Decode an already-parsed raw update.
pub fn decode(raw: RawUpdate) -> Result<Update, DecodeError> {
    if let Some(query) = raw.callback_query {
        return decode_callback(query);
    }
    if let Some(message) = raw.message {
        return decode_message(message);
    }
    Err(DecodeError::EmptyUpdate)
}

fn decode_callback(query: RawCallbackQuery) -> Result<Update, DecodeError> {
    let sender: Sender = query.from.ok_or(DecodeError::MissingSender)?.into();
    let (chat_id, message_id) = match &query.message {
        Some(m) => (m.chat.as_ref().map(|c| c.id), Some(m.message_id)),
        None => (None, None),
    };
    Ok(Update::Button(ButtonPress {
        sender,
        callback_id: query.id,
        data: query.data.unwrap_or_default(),
        chat_id,
        message_id,
    }))
}

fn decode_message(message: RawMessage) -> Result<Update, DecodeError> {
    let sender: Sender = message.from.ok_or(DecodeError::MissingSender)?.into();
    // A private message may omit the chat object; the platform guarantees
    // it equals the sender there.
    let chat_id = message.chat.as_ref().map(|c| c.id).unwrap_or(sender.id);
    let message_id = message.message_id;

    // Most specific variant first: forward origin trumps content, then
    // document, then media, then text.
    if let Some(origin) = message.forward_from_chat {
        return Ok(Update::Forwarded(ForwardedMessage {
            sender,
            chat_id,
            origin: ChatRef {
                id: origin.id,
                title: origin.title,
                username: origin.username,
                is_channel: origin.kind.as_deref() == Some("channel"),
            },
        }));
    }

    if let Some(document) = message.document {
        return Ok(Update::Document(DocumentMessage {
            sender,
            chat_id,
            message_id,
            file_id: document.file_id,
            file_name: document.file_name,
            mime_type: document.mime_type,
            group_id: message.media_group_id,
        }));
    }

    let media = if let Some(video) = message.video {
        Some((MediaKind::Video, video.file_id))
    } else if let Some(animation) = message.animation {
        Some((MediaKind::Animation, animation.file_id))
    } else if let Some(sizes) = message.photo {
        // Sizes are ordered small to large; forward the largest.
        sizes.into_iter().last().map(|p| (MediaKind::Photo, p.file_id))
    } else {
        None
    };

    if let Some((kind, file_id)) = media {
        return Ok(Update::Media(MediaMessage {
            sender,
            chat_id,
            message_id,
            kind,
            file_id,
            group_id: message.media_group_id,
        }));
    }

    let text = message.text.unwrap_or_default();
    let command = parse_command(&text);
    Ok(Update::Text(TextMessage {
        sender,
        chat_id,
        text,
        command,
    }))
}

/// Extract the name out of `/name@bot ...`; `None` when the text does
/// not start with the command marker.
fn parse_command(text: &str) -> Option<Command> {
    let rest = text.strip_prefix('/')?;
    let head = rest.split_whitespace().next().unwrap_or_default();
    if head.is_empty() {
        return None;
    }
    let name = head.split('@').next().unwrap_or(head).to_string();
    Some(Command { name })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_json(value: serde_json::Value) -> Result<Update, DecodeError> {
        decode_slice(&serde_json::to_vec(&value).unwrap())
    }

    #[test]
    fn decodes_command_text() {
        let update = decode_json(serde_json::json!({
            "update_id": 1,
            "message": {
                "message_id": 10,
                "from": {"id": 5, "first_name": "Ada", "username": "ada"},
                "chat": {"id": 5, "type": "private"},
                "text": "/start@serialcast_bot now please"
            }
        }))
        .unwrap();

        assert!(update.is_command("start"));
        assert!(!update.is_command("status"));
        assert_eq!(update.user_id(), 5);
        assert_eq!(update.chat_id(), 5);
    }

    #[test]
    fn decodes_plain_text() {
        let update = decode_json(serde_json::json!({
            "message": {
                "message_id": 10,
                "from": {"id": 5},
                "chat": {"id": 5},
                "text": "hello"
            }
        }))
        .unwrap();

        match update {
            Update::Text(m) => {
                assert_eq!(m.text, "hello");
                assert!(m.command.is_none());
            }
            other => panic!("expected text, got {:?}", other),
        }
    }

    #[test]
    fn decodes_video_with_group_id() {
        let update = decode_json(serde_json::json!({
            "message": {
                "message_id": 11,
                "from": {"id": 5},
                "chat": {"id": 5},
                "video": {"file_id": "vid-1", "duration": 30},
                "media_group_id": "g-77"
            }
        }))
        .unwrap();

        match update {
            Update::Media(m) => {
                assert_eq!(m.kind, MediaKind::Video);
                assert_eq!(m.file_id, "vid-1");
                assert_eq!(m.group_id.as_deref(), Some("g-77"));
            }
            other => panic!("expected media, got {:?}", other),
        }
    }

    #[test]
    fn photo_picks_largest_size() {
        let update = decode_json(serde_json::json!({
            "message": {
                "message_id": 11,
                "from": {"id": 5},
                "chat": {"id": 5},
                "photo": [{"file_id": "small"}, {"file_id": "big"}]
            }
        }))
        .unwrap();

        match update {
            Update::Media(m) => {
                assert_eq!(m.kind, MediaKind::Photo);
                assert_eq!(m.file_id, "big");
            }
            other => panic!("expected media, got {:?}", other),
        }
    }

    #[test]
    fn forward_origin_trumps_content() {
        let update = decode_json(serde_json::json!({
            "message": {
                "message_id": 12,
                "from": {"id": 5},
                "chat": {"id": 5},
                "video": {"file_id": "vid-1"},
                "forward_from_chat": {
                    "id": -1001,
                    "type": "channel",
                    "title": "My Channel",
                    "username": "mychan"
                }
            }
        }))
        .unwrap();

        match update {
            Update::Forwarded(m) => {
                assert_eq!(m.origin.id, -1001);
                assert!(m.origin.is_channel);
                assert_eq!(m.origin.title.as_deref(), Some("My Channel"));
            }
            other => panic!("expected forwarded, got {:?}", other),
        }
    }

    #[test]
    fn decodes_document() {
        let update = decode_json(serde_json::json!({
            "message": {
                "message_id": 13,
                "from": {"id": 5},
                "chat": {"id": 5},
                "document": {
                    "file_id": "doc-1",
                    "file_name": "episode.mkv",
                    "mime_type": "video/x-matroska"
                }
            }
        }))
        .unwrap();

        match update {
            Update::Document(m) => {
                assert_eq!(m.mime_type.as_deref(), Some("video/x-matroska"));
                assert_eq!(m.file_name.as_deref(), Some("episode.mkv"));
            }
            other => panic!("expected document, got {:?}", other),
        }
    }

    #[test]
    fn decodes_button_press() {
        let update = decode_json(serde_json::json!({
            "callback_query": {
                "id": "cb-1",
                "from": {"id": 5, "first_name": "Ada"},
                "data": "quality:720p",
                "message": {
                    "message_id": 44,
                    "chat": {"id": 5, "type": "private"}
                }
            }
        }))
        .unwrap();

        match update {
            Update::Button(b) => {
                assert_eq!(b.data, "quality:720p");
                assert_eq!(b.chat_id, Some(5));
                assert_eq!(b.message_id, Some(44));
            }
            other => panic!("expected button, got {:?}", other),
        }
    }

    #[test]
    fn bare_message_falls_back_to_empty_text() {
        let update = decode_json(serde_json::json!({
            "message": {
                "message_id": 14,
                "from": {"id": 5},
                "chat": {"id": 5}
            }
        }))
        .unwrap();

        match update {
            Update::Text(m) => assert!(m.text.is_empty()),
            other => panic!("expected text, got {:?}", other),
        }
    }

    #[test]
    fn missing_sender_is_an_error() {
        let err = decode_json(serde_json::json!({
            "message": {"message_id": 15, "chat": {"id": 5}, "text": "hi"}
        }))
        .unwrap_err();
        assert!(matches!(err, DecodeError::MissingSender));
    }

    #[test]
    fn empty_update_is_an_error() {
        let err = decode_json(serde_json::json!({"update_id": 9})).unwrap_err();
        assert!(matches!(err, DecodeError::EmptyUpdate));
    }

    #[test]
    fn malformed_json_is_an_error() {
        let err = decode_slice(b"{not json").unwrap_err();
        assert!(matches!(err, DecodeError::Json(_)));
    }

    #[test]
    fn command_parsing_edge_cases() {
        assert!(parse_command("hello").is_none());
        assert!(parse_command("/").is_none());
        assert_eq!(parse_command("/status").unwrap().name, "status");
        assert_eq!(parse_command("/status extra words").unwrap().name, "status");
    }
}
