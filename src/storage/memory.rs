//! In-memory session store.
//!
//! Test double for the store contract; also usable as a throwaway
//! ephemeral backend. Never persists anything.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::models::{ChannelInfo, UploadRecord, UserSession};
use super::store::{SessionStore, StoreError, StoreStats};

#[derive(Default)]
struct MemoryData {
    users: HashMap<i64, UserSession>,
    uploads: Vec<UploadRecord>,
    channels: HashMap<i64, ChannelInfo>,
}

/// Store backed by process memory only.
// Only constructed by tests; the running bot always has a durable store.
#[allow(dead_code)]
#[derive(Default)]
pub struct MemoryStore {
    data: Mutex<MemoryData>,
}

#[allow(dead_code)]
impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of a session without the create-on-read side effect.
    pub fn peek_session(&self, user_id: i64) -> Option<UserSession> {
        self.data.lock().users.get(&user_id).cloned()
    }

    /// Snapshot of the upload history.
    pub fn uploads(&self) -> Vec<UploadRecord> {
        self.data.lock().uploads.clone()
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn get_session(&self, user_id: i64) -> Result<UserSession, StoreError> {
        let mut data = self.data.lock();
        let session = data
            .users
            .entry(user_id)
            .or_insert_with(|| UserSession::new(user_id));
        Ok(session.clone())
    }

    async fn save_session(&self, session: &UserSession) -> Result<(), StoreError> {
        self.data
            .lock()
            .users
            .insert(session.user_id, session.clone());
        Ok(())
    }

    async fn append_upload(&self, record: &UploadRecord) -> Result<(), StoreError> {
        self.data.lock().uploads.push(record.clone());
        Ok(())
    }

    async fn lookup_channel(&self, channel_id: i64) -> Result<Option<ChannelInfo>, StoreError> {
        Ok(self.data.lock().channels.get(&channel_id).cloned())
    }

    async fn upsert_channel(&self, info: &ChannelInfo) -> Result<(), StoreError> {
        self.data.lock().channels.insert(info.channel_id, info.clone());
        Ok(())
    }

    async fn stats(&self) -> Result<StoreStats, StoreError> {
        let data = self.data.lock();
        Ok(StoreStats {
            users: data.users.len() as u64,
            uploads: data.uploads.len() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn get_creates_default_session() {
        let store = MemoryStore::new();
        assert!(store.peek_session(5).is_none());

        let session = store.get_session(5).await.unwrap();
        assert_eq!(session.user_id, 5);
        assert!(store.peek_session(5).is_some());
    }

    #[tokio::test]
    async fn channel_upsert_is_last_write_wins() {
        let store = MemoryStore::new();
        let first = ChannelInfo::observed(-100, None, Some("Old".into()), 1);
        let second = ChannelInfo::observed(-100, None, Some("New".into()), 2);
        store.upsert_channel(&first).await.unwrap();
        store.upsert_channel(&second).await.unwrap();

        let found = store.lookup_channel(-100).await.unwrap().unwrap();
        assert_eq!(found.title.as_deref(), Some("New"));
        assert_eq!(found.last_seen_by, 2);
    }
}
