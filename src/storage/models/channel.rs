//! Channel info cache entry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Cached facts about a target channel, keyed by channel id.
///
/// Last-write-wins and never authoritative: captions fall back to the
/// raw channel id when no entry exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelInfo {
    pub channel_id: i64,
    /// Public @handle without the @, when the channel has one.
    pub handle: Option<String>,
    pub title: Option<String>,
    /// User whose forwarded message last refreshed this entry.
    pub last_seen_by: i64,
    pub updated_at: DateTime<Utc>,
}

impl ChannelInfo {
    /// Build an entry from a forwarded-message origin.
    pub fn observed(
        channel_id: i64,
        handle: Option<String>,
        title: Option<String>,
        seen_by: i64,
    ) -> Self {
        Self {
            channel_id,
            handle,
            title,
            last_seen_by: seen_by,
            updated_at: Utc::now(),
        }
    }
}
