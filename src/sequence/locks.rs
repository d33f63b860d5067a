//! Per-user mutual exclusion.
//!
//! One async mutex per user id, created lazily on first use and retained
//! for the process lifetime (no eviction; acceptable for bounded user
//! populations). The lock guards only the sequencer's critical section,
//! never the caller's rate/batch admission checks.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;

/// Registry of per-user locks.
#[derive(Clone, Default)]
pub struct UserLocks {
    locks: Arc<DashMap<i64, Arc<Mutex<()>>>>,
}

impl UserLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch (or lazily create) the lock for `user_id`.
    pub fn for_user(&self, user_id: i64) -> Arc<Mutex<()>> {
        self.locks
            .entry(user_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .value()
            .clone()
    }
}
