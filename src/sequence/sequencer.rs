//! Per-user upload sequencer.
//!
//! The one place counters are advanced. Ordering inside the critical
//! section is load → preconditions → render → send → record → mark →
//! advance → persist: the send happens before any commit so a failed
//! forward leaves the session and the rate-limit mark untouched, and a
//! retry replays the same episode/quality.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, warn};

use crate::storage::{Quality, SessionStore, StoreError, UploadRecord};
use crate::transport::{Transport, TransportError};

use super::caption::{self, CaptionContext};
use super::locks::UserLocks;
use super::ratelimit::RateLimiter;

/// Who is uploading, as seen on the inbound update.
#[derive(Debug, Clone)]
pub struct Uploader {
    pub id: i64,
    /// Username without @.
    pub handle: Option<String>,
    pub display_name: Option<String>,
}

/// The media to forward.
#[derive(Debug, Clone)]
pub struct MediaRef {
    /// Chat the media currently lives in.
    pub chat_id: i64,
    pub message_id: i32,
    pub file_id: String,
}

/// Result of one committed transition, with post-advance counters.
#[derive(Debug, Clone)]
pub struct UploadOutcome {
    pub quality: Quality,
    pub season: u32,
    pub episode: u32,
    pub total_episode: u32,
    pub video_count: u32,
    pub cycle_len: usize,
    /// True when this upload completed the quality cycle (episode and
    /// total episode were bumped).
    pub rolled_over: bool,
}

/// Errors of one attempted transition.
#[derive(Debug, Error)]
pub enum SequenceError {
    #[error("no target channel configured")]
    ChannelNotSet,

    #[error("no qualities selected")]
    NoQualities,

    #[error("forward failed: {0}")]
    Forward(#[source] TransportError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Drives the per-user state machine.
pub struct Sequencer {
    store: Arc<dyn SessionStore>,
    transport: Arc<dyn Transport>,
    limiter: RateLimiter,
    locks: UserLocks,
}

impl Sequencer {
    pub fn new(
        store: Arc<dyn SessionStore>,
        transport: Arc<dyn Transport>,
        limiter: RateLimiter,
    ) -> Self {
        Self {
            store,
            transport,
            limiter,
            locks: UserLocks::new(),
        }
    }

    /// Run one transition for `uploader`: forward `media` to the target
    /// channel with a rendered caption and advance the counters.
    ///
    /// Callers perform rate/batch admission *before* this call; the
    /// per-user lock is held only across the critical section here.
    pub async fn process(
        &self,
        uploader: &Uploader,
        media: &MediaRef,
        exempt: bool,
    ) -> Result<UploadOutcome, SequenceError> {
        let lock = self.locks.for_user(uploader.id);
        let _guard = lock.lock().await;

        let mut session = self.store.get_session(uploader.id).await?;
        let target = session
            .target_channel_id
            .ok_or(SequenceError::ChannelNotSet)?;
        let quality = session
            .current_quality()
            .ok_or(SequenceError::NoQualities)?;

        // Refresh display fields from the live sender; persisted only if
        // this transition commits.
        if uploader.display_name.is_some() {
            session.display_name = uploader.display_name.clone();
        }
        if uploader.handle.is_some() {
            session.handle = uploader.handle.clone();
        }

        // Channel facts are an optional enrichment; a store hiccup here
        // must not block the upload.
        let channel = match self.store.lookup_channel(target).await {
            Ok(info) => info,
            Err(e) => {
                warn!(user_id = uploader.id, error = %e, "channel lookup failed");
                None
            }
        };

        let rendered = caption::render(
            &session.base_caption,
            &CaptionContext {
                season: session.season,
                episode: session.episode,
                total_episode: session.total_episode,
                quality: quality.label(),
                user_id: session.user_id,
                username: session.handle.as_deref(),
                first_name: session.display_name.as_deref(),
                channel_id: Some(target),
                channel_title: channel.as_ref().and_then(|c| c.title.as_deref()),
            },
        );

        self.transport
            .copy_message(target, media.chat_id, media.message_id, Some(&rendered))
            .await
            .map_err(SequenceError::Forward)?;

        // The channel has the message from here on; the transition must
        // advance even if bookkeeping below degrades.
        let record = UploadRecord {
            user_id: uploader.id,
            season: session.season,
            episode: session.episode,
            total_episode: session.total_episode,
            quality,
            file_id: media.file_id.clone(),
            caption: rendered,
            target_channel_id: target,
            ts: Utc::now(),
        };
        if let Err(e) = self.store.append_upload(&record).await {
            warn!(user_id = uploader.id, error = %e, "failed to append upload record");
        }

        if !exempt {
            self.limiter.mark(uploader.id, Instant::now());
        }

        let rolled_over = session.advance();
        self.store.save_session(&session).await?;

        debug!(
            user_id = uploader.id,
            quality = %quality,
            episode = session.episode,
            rolled_over,
            "upload committed"
        );

        Ok(UploadOutcome {
            quality,
            season: session.season,
            episode: session.episode,
            total_episode: session.total_episode,
            video_count: session.video_count,
            cycle_len: session.cycle_len(),
            rolled_over,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::{Duration, Instant};

    use async_trait::async_trait;
    use parking_lot::Mutex;

    use crate::storage::MemoryStore;
    use crate::transport::{MenuButton, TransportError};

    use super::*;

    /// Transport double recording copies, with injectable failure.
    #[derive(Default)]
    struct RecordingTransport {
        copies: Mutex<Vec<(i64, Option<String>)>>,
        fail_copy: AtomicBool,
    }

    #[async_trait]
    impl Transport for RecordingTransport {
        async fn copy_message(
            &self,
            to_chat: i64,
            _from_chat: i64,
            _message_id: i32,
            caption: Option<&str>,
        ) -> Result<(), TransportError> {
            if self.fail_copy.load(Ordering::SeqCst) {
                return Err(TransportError::Download("injected failure".into()));
            }
            self.copies
                .lock()
                .push((to_chat, caption.map(str::to_string)));
            Ok(())
        }

        async fn send_text(&self, _chat_id: i64, _text: &str) -> Result<(), TransportError> {
            Ok(())
        }

        async fn send_menu(
            &self,
            _chat_id: i64,
            _text: &str,
            _buttons: &[Vec<MenuButton>],
        ) -> Result<(), TransportError> {
            Ok(())
        }

        async fn ack_button(&self, _callback_id: &str) -> Result<(), TransportError> {
            Ok(())
        }

        async fn fetch_document(&self, _file_id: &str) -> Result<Vec<u8>, TransportError> {
            Err(TransportError::Download("no documents in tests".into()))
        }
    }

    struct Fixture {
        store: Arc<MemoryStore>,
        transport: Arc<RecordingTransport>,
        limiter: RateLimiter,
        sequencer: Sequencer,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let transport = Arc::new(RecordingTransport::default());
        let limiter = RateLimiter::new(Duration::from_secs(10));
        let sequencer = Sequencer::new(store.clone(), transport.clone(), limiter.clone());
        Fixture {
            store,
            transport,
            limiter,
            sequencer,
        }
    }

    fn uploader(id: i64) -> Uploader {
        Uploader {
            id,
            handle: Some("tester".into()),
            display_name: Some("Test".into()),
        }
    }

    fn media() -> MediaRef {
        MediaRef {
            chat_id: 500,
            message_id: 1,
            file_id: "file-abc".into(),
        }
    }

    async fn with_channel(store: &MemoryStore, user_id: i64, channel: i64) {
        let mut session = store.get_session(user_id).await.unwrap();
        session.target_channel_id = Some(channel);
        store.save_session(&session).await.unwrap();
    }

    #[tokio::test]
    async fn rejects_without_target_channel() {
        let f = fixture();
        let err = f
            .sequencer
            .process(&uploader(1), &media(), false)
            .await
            .unwrap_err();
        assert!(matches!(err, SequenceError::ChannelNotSet));
        assert!(f.transport.copies.lock().is_empty());
        // Nothing advanced, nothing recorded.
        assert_eq!(f.store.peek_session(1).unwrap().video_count, 0);
        assert!(f.store.uploads().is_empty());
    }

    #[tokio::test]
    async fn rejects_with_empty_quality_selection() {
        let f = fixture();
        let mut session = f.store.get_session(1).await.unwrap();
        session.target_channel_id = Some(-100);
        session.selected_qualities.clear();
        f.store.save_session(&session).await.unwrap();

        let err = f
            .sequencer
            .process(&uploader(1), &media(), false)
            .await
            .unwrap_err();
        assert!(matches!(err, SequenceError::NoQualities));
        assert!(f.transport.copies.lock().is_empty());
    }

    #[tokio::test]
    async fn three_uploads_complete_one_episode() {
        let f = fixture();
        with_channel(&f.store, 1, -100).await;

        let mut qualities = Vec::new();
        for _ in 0..3 {
            let outcome = f
                .sequencer
                .process(&uploader(1), &media(), false)
                .await
                .unwrap();
            qualities.push(outcome.quality);
        }

        assert_eq!(
            qualities,
            vec![Quality::Q480, Quality::Q720, Quality::Q1080]
        );

        let session = f.store.peek_session(1).unwrap();
        assert_eq!(session.season, 1);
        assert_eq!(session.episode, 2);
        assert_eq!(session.total_episode, 2);
        assert_eq!(session.video_count, 0);
        assert_eq!(f.store.uploads().len(), 3);
    }

    #[tokio::test]
    async fn quality_depends_only_on_video_count() {
        let f = fixture();
        with_channel(&f.store, 1, -100).await;

        // k-th transition (0-indexed) gets selected[k mod L], across
        // episode boundaries.
        for k in 0..7u32 {
            let outcome = f
                .sequencer
                .process(&uploader(1), &media(), true)
                .await
                .unwrap();
            let expected = [Quality::Q480, Quality::Q720, Quality::Q1080][(k % 3) as usize];
            assert_eq!(outcome.quality, expected, "transition {}", k);
        }

        // N=7, L=3: video_count = 7 mod 3, episode grew by floor(7/3).
        let session = f.store.peek_session(1).unwrap();
        assert_eq!(session.video_count, 1);
        assert_eq!(session.episode, 1 + 2);
        assert_eq!(session.total_episode, 1 + 2);
    }

    #[tokio::test]
    async fn failed_send_changes_nothing() {
        let f = fixture();
        with_channel(&f.store, 1, -100).await;
        let before = f.store.peek_session(1).unwrap();

        f.transport.fail_copy.store(true, Ordering::SeqCst);
        let err = f
            .sequencer
            .process(&uploader(1), &media(), false)
            .await
            .unwrap_err();
        assert!(matches!(err, SequenceError::Forward(_)));

        let after = f.store.peek_session(1).unwrap();
        assert_eq!(before, after);
        assert!(f.store.uploads().is_empty());
        // No rate-limit mark either: the next attempt is admitted.
        assert!(f.limiter.allow(1, false, Instant::now()));
    }

    #[tokio::test]
    async fn success_marks_non_exempt_users_only() {
        let f = fixture();
        with_channel(&f.store, 1, -100).await;
        with_channel(&f.store, 2, -100).await;

        f.sequencer
            .process(&uploader(1), &media(), false)
            .await
            .unwrap();
        assert!(!f.limiter.allow(1, false, Instant::now()));

        f.sequencer
            .process(&uploader(2), &media(), true)
            .await
            .unwrap();
        assert!(f.limiter.allow(2, false, Instant::now()));
    }

    #[tokio::test]
    async fn caption_uses_pre_advance_counters() {
        let f = fixture();
        with_channel(&f.store, 1, -100).await;

        let mut session = f.store.get_session(1).await.unwrap();
        session.base_caption = "E{episode} {quality}".into();
        f.store.save_session(&session).await.unwrap();

        f.sequencer
            .process(&uploader(1), &media(), false)
            .await
            .unwrap();

        let copies = f.transport.copies.lock();
        assert_eq!(copies.len(), 1);
        assert_eq!(copies[0].0, -100);
        assert_eq!(copies[0].1.as_deref(), Some("E01 480p"));
    }

    #[tokio::test]
    async fn rollover_is_reported_on_the_last_cycle_item() {
        let f = fixture();
        with_channel(&f.store, 1, -100).await;

        let first = f
            .sequencer
            .process(&uploader(1), &media(), true)
            .await
            .unwrap();
        assert!(!first.rolled_over);
        assert_eq!(first.video_count, 1);
        assert_eq!(first.episode, 1);

        f.sequencer.process(&uploader(1), &media(), true).await.unwrap();
        let third = f
            .sequencer
            .process(&uploader(1), &media(), true)
            .await
            .unwrap();
        assert!(third.rolled_over);
        assert_eq!(third.video_count, 0);
        assert_eq!(third.episode, 2);
        assert_eq!(third.cycle_len, 3);
    }

    #[tokio::test]
    async fn concurrent_uploads_for_one_user_serialize() {
        let f = fixture();
        with_channel(&f.store, 1, -100).await;
        let sequencer = Arc::new(f.sequencer);

        let mut handles = Vec::new();
        for _ in 0..6 {
            let sequencer = sequencer.clone();
            handles.push(tokio::spawn(async move {
                sequencer.process(&uploader(1), &media(), true).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        // Two full cycles: no lost increments despite the racing tasks.
        let session = f.store.peek_session(1).unwrap();
        assert_eq!(session.episode, 3);
        assert_eq!(session.video_count, 0);
        assert_eq!(f.store.uploads().len(), 6);
    }
}
