//! Media-group batch coalescing.
//!
//! Items of one multi-item submission share a group id. Only the first
//! observed item triggers the pipeline; the caller then waits a fixed
//! settle delay so sibling items arrive and get suppressed here before
//! taking any lock or producing any side effect. Best-effort: a sibling
//! arriving after the marker expired is processed as a spurious
//! duplicate.

use std::time::Duration;

use moka::sync::Cache;

/// Fixed wait after the first item of a group, letting siblings land.
pub const SETTLE_DELAY: Duration = Duration::from_secs(2);

/// Marker lifetime; bounds memory and defines "near-simultaneous".
const MARKER_TTL: Duration = Duration::from_secs(120);

/// Presence-only marker set per group id.
#[derive(Clone)]
pub struct BatchCoalescer {
    seen: Cache<String, ()>,
}

impl BatchCoalescer {
    pub fn new() -> Self {
        Self::with_ttl(MARKER_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            seen: Cache::builder().max_capacity(10_000).time_to_live(ttl).build(),
        }
    }

    /// Mark `group_id` as seen. Returns `true` exactly once per marker
    /// lifetime: for the caller that should proceed (after the settle
    /// delay). Every other caller must drop its item immediately.
    pub fn first_of_group(&self, group_id: &str) -> bool {
        self.seen.entry(group_id.to_string()).or_insert(()).is_fresh()
    }
}

impl Default for BatchCoalescer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_caller_proceeds_rest_drop() {
        let coalescer = BatchCoalescer::new();
        assert!(coalescer.first_of_group("album-1"));
        assert!(!coalescer.first_of_group("album-1"));
        assert!(!coalescer.first_of_group("album-1"));
    }

    #[test]
    fn groups_are_independent() {
        let coalescer = BatchCoalescer::new();
        assert!(coalescer.first_of_group("album-1"));
        assert!(coalescer.first_of_group("album-2"));
    }

    #[test]
    fn marker_expires_after_ttl() {
        let coalescer = BatchCoalescer::with_ttl(Duration::from_millis(50));
        assert!(coalescer.first_of_group("album-1"));
        assert!(!coalescer.first_of_group("album-1"));

        std::thread::sleep(Duration::from_millis(80));
        // Late arrival after expiry counts as a fresh submission.
        assert!(coalescer.first_of_group("album-1"));
    }
}
