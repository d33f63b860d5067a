//! JSON-file session store.
//!
//! Degraded-mode backend selected at startup when no database is
//! configured or reachable. Holds the whole dataset in memory behind a
//! mutex and rewrites the file after every mutation; acceptable for the
//! bounded user populations this mode exists for.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::models::{ChannelInfo, UploadRecord, UserSession};
use super::store::{SessionStore, StoreError, StoreStats};

#[derive(Debug, Default, Serialize, Deserialize)]
struct FileData {
    #[serde(default)]
    users: HashMap<i64, UserSession>,
    #[serde(default)]
    uploads: Vec<UploadRecord>,
    #[serde(default)]
    channels: HashMap<i64, ChannelInfo>,
}

/// Store persisted as a single JSON document on disk.
pub struct FileStore {
    path: PathBuf,
    data: Mutex<FileData>,
}

impl FileStore {
    /// Load the store from `path`, starting fresh when the file is
    /// missing or unreadable.
    ///
    /// Session invariants are re-established on load; the file may have
    /// been hand-edited between runs.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut data = match std::fs::read(&path) {
            Ok(bytes) => match serde_json::from_slice::<FileData>(&bytes) {
                Ok(data) => {
                    info!(path = %path.display(), users = data.users.len(), "loaded file store");
                    data
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "file store unreadable, starting fresh");
                    FileData::default()
                }
            },
            Err(_) => {
                info!(path = %path.display(), "no existing file store, starting fresh");
                FileData::default()
            }
        };

        for session in data.users.values_mut() {
            session.restore_invariants();
        }

        Self {
            path,
            data: Mutex::new(data),
        }
    }

    /// Serialize under the lock, write outside it. Concurrent writers
    /// are last-write-wins, which matches the snapshot semantics of the
    /// store contract.
    async fn persist(&self) -> Result<(), StoreError> {
        let json = serde_json::to_vec_pretty(&*self.data.lock())?;
        tokio::fs::write(&self.path, json).await?;
        Ok(())
    }
}

#[async_trait]
impl SessionStore for FileStore {
    async fn get_session(&self, user_id: i64) -> Result<UserSession, StoreError> {
        let (session, created) = {
            let mut data = self.data.lock();
            match data.users.get(&user_id) {
                Some(session) => (session.clone(), false),
                None => {
                    let session = UserSession::new(user_id);
                    data.users.insert(user_id, session.clone());
                    (session, true)
                }
            }
        };
        if created {
            self.persist().await?;
        }
        Ok(session)
    }

    async fn save_session(&self, session: &UserSession) -> Result<(), StoreError> {
        self.data
            .lock()
            .users
            .insert(session.user_id, session.clone());
        self.persist().await
    }

    async fn append_upload(&self, record: &UploadRecord) -> Result<(), StoreError> {
        self.data.lock().uploads.push(record.clone());
        self.persist().await
    }

    async fn lookup_channel(&self, channel_id: i64) -> Result<Option<ChannelInfo>, StoreError> {
        Ok(self.data.lock().channels.get(&channel_id).cloned())
    }

    async fn upsert_channel(&self, info: &ChannelInfo) -> Result<(), StoreError> {
        self.data
            .lock()
            .channels
            .insert(info.channel_id, info.clone());
        self.persist().await
    }

    async fn stats(&self) -> Result<StoreStats, StoreError> {
        let data = self.data.lock();
        Ok(StoreStats {
            users: data.users.len() as u64,
            uploads: data.uploads.len() as u64,
        })
    }
}
