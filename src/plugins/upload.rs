//! Upload triggers.
//!
//! Admission order: batch dedup first (so an album never produces one
//! cooldown message per sibling item), then the rate gate, then the
//! sequencer. Everything up to the sequencer call runs outside the
//! per-user lock.

use std::time::Instant;

use tracing::{debug, warn};

use crate::bot::dispatcher::AppState;
use crate::bot::update::{Sender, Update};
use crate::sequence::batch;
use crate::sequence::{MediaRef, SequenceError, UploadOutcome, Uploader};

/// Handle an inbound video.
pub async fn handle_media_upload(state: AppState, update: Update) -> anyhow::Result<()> {
    let Update::Media(media) = &update else {
        return Ok(());
    };
    process_upload(
        state,
        media.sender.clone(),
        media.chat_id,
        media.message_id,
        media.file_id.clone(),
        media.group_id.clone(),
    )
    .await
}

/// Handle a video sent as a document (uncompressed upload).
pub async fn handle_document_upload(state: AppState, update: Update) -> anyhow::Result<()> {
    let Update::Document(document) = &update else {
        return Ok(());
    };
    process_upload(
        state,
        document.sender.clone(),
        document.chat_id,
        document.message_id,
        document.file_id.clone(),
        document.group_id.clone(),
    )
    .await
}

async fn process_upload(
    state: AppState,
    sender: Sender,
    chat_id: i64,
    message_id: i32,
    file_id: String,
    group_id: Option<String>,
) -> anyhow::Result<()> {
    if let Some(group_id) = &group_id {
        if !state.batches.first_of_group(group_id) {
            debug!(user_id = sender.id, %group_id, "duplicate batch item dropped");
            return Ok(());
        }
        // Let sibling items of the same submission arrive and be
        // suppressed above before doing anything visible.
        tokio::time::sleep(batch::SETTLE_DELAY).await;
    }

    let exempt = state.is_exempt(sender.id);
    let now = Instant::now();
    if !state.limiter.allow(sender.id, exempt, now) {
        let wait = state
            .limiter
            .retry_after(sender.id, now)
            .map(|d| d.as_secs().max(1))
            .unwrap_or(1);
        state
            .transport
            .send_text(chat_id, &format!("⏳ Slow down - wait {}s between uploads.", wait))
            .await?;
        return Ok(());
    }

    let uploader = Uploader {
        id: sender.id,
        handle: sender.username.clone(),
        display_name: sender.first_name.clone(),
    };
    let media = MediaRef {
        chat_id,
        message_id,
        file_id,
    };

    let reply = match state.sequencer.process(&uploader, &media, exempt).await {
        Ok(outcome) => confirmation(&outcome),
        Err(SequenceError::ChannelNotSet) => {
            "No target channel configured. Open /settings and set one first.".to_string()
        }
        Err(SequenceError::NoQualities) => {
            "No qualities selected. Pick at least one in /settings.".to_string()
        }
        Err(SequenceError::Forward(e)) => {
            warn!(user_id = sender.id, error = %e, "forward failed");
            format!(
                "❌ Forward failed: {}. Check that I am an admin of the target \
                 channel, then resend the same video.",
                e
            )
        }
        Err(SequenceError::Store(e)) => {
            warn!(user_id = sender.id, error = %e, "storage error during upload");
            "Storage trouble on my side - nothing was counted. Try again in a moment.".to_string()
        }
    };

    state.transport.send_text(chat_id, &reply).await?;
    Ok(())
}

/// Confirmation text, including the rollover boundary: when an upload
/// completes the cycle, report the episode that just finished, not the
/// one the counters already moved to.
fn confirmation(outcome: &UploadOutcome) -> String {
    if outcome.rolled_over {
        format!(
            "✅ {} uploaded. Episode {} complete ({}/{}). Next up: episode {}.",
            outcome.quality,
            outcome.episode - 1,
            outcome.cycle_len,
            outcome.cycle_len,
            outcome.episode,
        )
    } else {
        format!(
            "✅ {} uploaded. Progress {}/{} for episode {}.",
            outcome.quality, outcome.video_count, outcome.cycle_len, outcome.episode,
        )
    }
}
