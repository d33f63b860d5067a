//! Pending-input tracking.
//!
//! At most one active mode per user: the thing the bot asked for last.
//! Setting a new mode supersedes the old one; consumption and /cancel
//! clear it. Process-lifetime only.

use std::sync::Arc;

use dashmap::DashMap;

/// What the bot is waiting for from a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingInput {
    Caption,
    Season,
    Episode,
    ChannelForward,
    ChannelId,
    ImportFile,
    WelcomeMedia,
}

/// Per-user pending-input modes; absence is the "none" mode.
#[derive(Clone, Default)]
pub struct PendingInputs {
    modes: Arc<DashMap<i64, PendingInput>>,
}

impl PendingInputs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the active mode, superseding any previous one.
    pub fn set(&self, user_id: i64, mode: PendingInput) {
        self.modes.insert(user_id, mode);
    }

    pub fn get(&self, user_id: i64) -> Option<PendingInput> {
        self.modes.get(&user_id).map(|m| *m)
    }

    /// Consume the active mode.
    pub fn take(&self, user_id: i64) -> Option<PendingInput> {
        self.modes.remove(&user_id).map(|(_, mode)| mode)
    }

    /// Clear without consuming; returns whether a mode was active.
    pub fn clear(&self, user_id: i64) -> bool {
        self.modes.remove(&user_id).is_some()
    }
}
