//! Per-user upload cooldown.
//!
//! Marks live for the process lifetime and are never persisted. The
//! limiter itself never writes on admission; callers mark a user only
//! after the guarded action actually succeeded, which keeps the limiter
//! consistent with "an upload happened".

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;

/// Cooldown applied when no override is configured.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(10);

/// Cooldown gate over upload actions.
#[derive(Clone)]
pub struct RateLimiter {
    cooldown: Duration,
    marks: Arc<DashMap<i64, Instant>>,
}

impl RateLimiter {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            marks: Arc::new(DashMap::new()),
        }
    }

    /// Whether an upload by `user_id` may proceed at `now`.
    ///
    /// Exempt users are always allowed and never tracked.
    pub fn allow(&self, user_id: i64, exempt: bool, now: Instant) -> bool {
        if exempt {
            return true;
        }
        match self.marks.get(&user_id) {
            None => true,
            Some(mark) => now.duration_since(*mark) >= self.cooldown,
        }
    }

    /// Remaining wait until `allow` turns true again, if any.
    pub fn retry_after(&self, user_id: i64, now: Instant) -> Option<Duration> {
        let mark = self.marks.get(&user_id)?;
        let elapsed = now.duration_since(*mark);
        (elapsed < self.cooldown).then(|| self.cooldown - elapsed)
    }

    /// Record a successful upload. Call only after the action succeeded
    /// and only for non-exempt users.
    pub fn mark(&self, user_id: i64, now: Instant) {
        self.marks.insert(user_id, now);
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_COOLDOWN)
    }
}
