//! Upload history record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::session::Quality;

/// One entry of the append-only upload history.
///
/// Written only after the transport confirmed the send, so the history
/// never contains uploads that did not reach the channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadRecord {
    pub user_id: i64,
    pub season: u32,
    pub episode: u32,
    pub total_episode: u32,
    pub quality: Quality,
    /// Platform file reference of the forwarded media.
    pub file_id: String,
    pub caption: String,
    pub target_channel_id: i64,
    pub ts: DateTime<Utc>,
}
