//! Session store contract.
//!
//! The core never assumes cross-call atomicity: a read-modify-write of a
//! session spans `get_session` and `save_session` and is guarded only by
//! the per-user lock in this process. Duplicate saves are harmless since
//! every save writes the full session snapshot.

use async_trait::async_trait;
use thiserror::Error;

use super::models::{ChannelInfo, UploadRecord, UserSession};

/// Errors surfaced by a store implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] mongodb::error::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Read-only aggregate for the stats endpoint.
#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct StoreStats {
    pub users: u64,
    pub uploads: u64,
}

/// Persistence contract consumed by the core pipeline.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Fetch a user's session, creating the default record as a side
    /// effect when absent.
    async fn get_session(&self, user_id: i64) -> Result<UserSession, StoreError>;

    /// Persist a full session snapshot (upsert).
    async fn save_session(&self, session: &UserSession) -> Result<(), StoreError>;

    /// Append one record to the upload history.
    async fn append_upload(&self, record: &UploadRecord) -> Result<(), StoreError>;

    /// Look up cached channel facts, if any.
    async fn lookup_channel(&self, channel_id: i64) -> Result<Option<ChannelInfo>, StoreError>;

    /// Insert or refresh a channel entry (last-write-wins).
    async fn upsert_channel(&self, info: &ChannelInfo) -> Result<(), StoreError>;

    /// Totals for the stats endpoint.
    async fn stats(&self) -> Result<StoreStats, StoreError>;
}
