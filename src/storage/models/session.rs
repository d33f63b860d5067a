//! Per-user upload session model.
//!
//! One record per user id. Counters are mutated only by the sequencer
//! (under the per-user lock) or by explicit settings edits.

use serde::{Deserialize, Serialize};

/// Caption template applied to new sessions.
pub const DEFAULT_CAPTION: &str = "• SEASON {season} || EPISODE {episode} ({quality})";

/// A resolution tag cycled across uploads.
///
/// The declaration order of `ALL` is the canonical order; every stored
/// selection is a subset of it in that order, without duplicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Quality {
    #[serde(rename = "480p")]
    Q480,
    #[serde(rename = "720p")]
    Q720,
    #[serde(rename = "1080p")]
    Q1080,
    #[serde(rename = "4K")]
    Q4k,
    #[serde(rename = "2160p")]
    Q2160,
}

impl Quality {
    /// The full canonical set, in canonical order.
    pub const ALL: [Quality; 5] = [
        Quality::Q480,
        Quality::Q720,
        Quality::Q1080,
        Quality::Q4k,
        Quality::Q2160,
    ];

    /// Human-readable label, also the serialized form.
    pub fn label(&self) -> &'static str {
        match self {
            Quality::Q480 => "480p",
            Quality::Q720 => "720p",
            Quality::Q1080 => "1080p",
            Quality::Q4k => "4K",
            Quality::Q2160 => "2160p",
        }
    }

    /// Parse a label back into a quality. Case-sensitive on purpose:
    /// labels are bot-generated (callback data), not free-form input.
    pub fn from_label(label: &str) -> Option<Quality> {
        Quality::ALL.iter().copied().find(|q| q.label() == label)
    }

    /// Reduce an arbitrary selection to canonical order without duplicates.
    pub fn normalize(selection: &[Quality]) -> Vec<Quality> {
        Quality::ALL
            .iter()
            .copied()
            .filter(|q| selection.contains(q))
            .collect()
    }
}

impl std::fmt::Display for Quality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Per-user session: counters, quality rotation, caption template, target.
///
/// Invariant: `video_count < max(1, selected_qualities.len())`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSession {
    pub user_id: i64,
    pub season: u32,
    pub episode: u32,
    pub total_episode: u32,
    pub video_count: u32,
    pub selected_qualities: Vec<Quality>,
    pub base_caption: String,
    pub target_channel_id: Option<i64>,

    /// First name as last seen on an inbound update.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    /// Username without @ as last seen on an inbound update.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handle: Option<String>,
}

impl UserSession {
    /// Defaults applied on first contact.
    pub fn new(user_id: i64) -> Self {
        Self {
            user_id,
            season: 1,
            episode: 1,
            total_episode: 1,
            video_count: 0,
            selected_qualities: vec![Quality::Q480, Quality::Q720, Quality::Q1080],
            base_caption: DEFAULT_CAPTION.to_string(),
            target_channel_id: None,
            display_name: None,
            handle: None,
        }
    }

    /// Length of the current quality cycle.
    pub fn cycle_len(&self) -> usize {
        self.selected_qualities.len()
    }

    /// Quality the next successful upload will be tagged with.
    ///
    /// `None` when the selection is empty; the sequencer refuses to
    /// advance in that case.
    pub fn current_quality(&self) -> Option<Quality> {
        if self.selected_qualities.is_empty() {
            return None;
        }
        let idx = self.video_count as usize % self.selected_qualities.len();
        Some(self.selected_qualities[idx])
    }

    /// Advance the counters after a confirmed upload.
    ///
    /// Returns `true` when the quality cycle rolled over (episode and
    /// total episode were bumped and `video_count` reset to 0).
    pub fn advance(&mut self) -> bool {
        self.video_count += 1;
        if self.video_count as usize == self.selected_qualities.len() {
            self.episode += 1;
            self.total_episode += 1;
            self.video_count = 0;
            return true;
        }
        false
    }

    /// Replace the quality selection.
    ///
    /// The selection is normalized to canonical order and `video_count`
    /// is reset so the invariant holds for the new cycle length.
    pub fn set_qualities(&mut self, selection: Vec<Quality>) {
        self.selected_qualities = Quality::normalize(&selection);
        self.video_count = 0;
    }

    /// Toggle one quality in or out of the selection.
    pub fn toggle_quality(&mut self, quality: Quality) {
        let mut selection = self.selected_qualities.clone();
        if let Some(pos) = selection.iter().position(|q| *q == quality) {
            selection.remove(pos);
        } else {
            selection.push(quality);
        }
        self.set_qualities(selection);
    }

    /// Re-establish invariants after loading from an external source.
    ///
    /// The fallback file can be hand-edited; loads must never yield a
    /// session the sequencer cannot operate on.
    pub fn restore_invariants(&mut self) {
        self.season = self.season.max(1);
        self.episode = self.episode.max(1);
        self.total_episode = self.total_episode.max(1);
        self.selected_qualities = Quality::normalize(&self.selected_qualities);
        self.video_count %= self.selected_qualities.len().max(1) as u32;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_satisfy_invariants() {
        let s = UserSession::new(7);
        assert_eq!(s.season, 1);
        assert_eq!(s.episode, 1);
        assert_eq!(s.total_episode, 1);
        assert_eq!(s.video_count, 0);
        assert_eq!(
            s.selected_qualities,
            vec![Quality::Q480, Quality::Q720, Quality::Q1080]
        );
        assert!(s.target_channel_id.is_none());
    }

    #[test]
    fn advance_cycles_through_qualities() {
        let mut s = UserSession::new(1);
        assert_eq!(s.current_quality(), Some(Quality::Q480));
        assert!(!s.advance());
        assert_eq!(s.current_quality(), Some(Quality::Q720));
        assert!(!s.advance());
        assert_eq!(s.current_quality(), Some(Quality::Q1080));
        // Third advance completes the cycle.
        assert!(s.advance());
        assert_eq!(s.video_count, 0);
        assert_eq!(s.episode, 2);
        assert_eq!(s.total_episode, 2);
        assert_eq!(s.season, 1);
    }

    #[test]
    fn current_quality_empty_selection() {
        let mut s = UserSession::new(1);
        s.selected_qualities.clear();
        assert_eq!(s.current_quality(), None);
    }

    #[test]
    fn normalize_orders_and_dedupes() {
        let normalized = Quality::normalize(&[
            Quality::Q2160,
            Quality::Q480,
            Quality::Q2160,
            Quality::Q720,
        ]);
        assert_eq!(
            normalized,
            vec![Quality::Q480, Quality::Q720, Quality::Q2160]
        );
    }

    #[test]
    fn toggle_resets_progress() {
        let mut s = UserSession::new(1);
        s.video_count = 2;
        s.toggle_quality(Quality::Q4k);
        assert_eq!(
            s.selected_qualities,
            vec![Quality::Q480, Quality::Q720, Quality::Q1080, Quality::Q4k]
        );
        assert_eq!(s.video_count, 0);

        s.toggle_quality(Quality::Q480);
        assert_eq!(
            s.selected_qualities,
            vec![Quality::Q720, Quality::Q1080, Quality::Q4k]
        );
    }

    #[test]
    fn restore_invariants_clamps_counters() {
        let mut s = UserSession::new(1);
        s.season = 0;
        s.episode = 0;
        s.total_episode = 0;
        s.video_count = 9;
        s.restore_invariants();
        assert_eq!(s.season, 1);
        assert_eq!(s.episode, 1);
        assert_eq!(s.total_episode, 1);
        assert!(s.video_count < s.cycle_len() as u32);
    }

    #[test]
    fn restore_invariants_with_empty_selection() {
        let mut s = UserSession::new(1);
        s.selected_qualities.clear();
        s.video_count = 3;
        s.restore_invariants();
        assert_eq!(s.video_count, 0);
    }

    #[test]
    fn quality_labels_round_trip() {
        for q in Quality::ALL {
            assert_eq!(Quality::from_label(q.label()), Some(q));
        }
        assert_eq!(Quality::from_label("8K"), None);
    }
}
