//! /start, /help, /status and /cancel commands.

use tracing::warn;

use crate::bot::dispatcher::AppState;
use crate::bot::update::Update;
use crate::utils::format_username;

use super::settings;

/// Handle /start: ensure the session exists, greet, show the menu.
pub async fn handle_start(state: AppState, update: Update) -> anyhow::Result<()> {
    let sender = update.sender().clone();
    let chat_id = update.chat_id();

    let mut session = state.store.get_session(sender.id).await?;
    if sender.first_name.is_some() {
        session.display_name = sender.first_name.clone();
    }
    if sender.username.is_some() {
        session.handle = sender.username.clone();
    }
    state.store.save_session(&session).await?;

    // Admin-configured welcome media, when set. Not worth failing the
    // whole greeting over.
    if let Some(media) = state.welcome.get()
        && let Err(e) = state
            .transport
            .copy_message(chat_id, media.chat_id, media.message_id, None)
            .await
    {
        warn!(error = %e, "failed to send welcome media");
    }

    let name = format_username(
        sender.username.as_deref(),
        sender.first_name.as_deref().unwrap_or("there"),
    );
    let text = format!(
        "👋 Welcome {}!\n\nSend a video and I will forward it to your channel \
         with an auto-advancing season/episode caption.\n\nUse the menu below \
         or /help to get started.",
        name
    );
    settings::send_menu(&state, chat_id, sender.id, &text).await
}

/// Handle /help.
pub async fn handle_help(state: AppState, update: Update) -> anyhow::Result<()> {
    let text = "Commands:\n\
        /start - register and show the menu\n\
        /status - current season/episode/quality progress\n\
        /settings - configure caption, counters, qualities, channel\n\
        /export - export your settings as JSON\n\
        /cancel - abort the current prompt\n\n\
        Send a video (or a video document) to upload it.";
    state.transport.send_text(update.chat_id(), text).await?;
    Ok(())
}

/// Handle /status.
pub async fn handle_status(state: AppState, update: Update) -> anyhow::Result<()> {
    let session = state.store.get_session(update.user_id()).await?;

    let qualities = if session.selected_qualities.is_empty() {
        "none selected".to_string()
    } else {
        session
            .selected_qualities
            .iter()
            .map(|q| q.label())
            .collect::<Vec<_>>()
            .join(", ")
    };
    let channel = session
        .target_channel_id
        .map(|id| id.to_string())
        .unwrap_or_else(|| "not set".to_string());

    let text = format!(
        "📺 Season {}\n🎬 Episode {} (total {})\n🎞 Progress: {}/{}\n🏷 Qualities: {}\n📡 Channel: {}",
        session.season,
        session.episode,
        session.total_episode,
        session.video_count,
        session.cycle_len().max(1),
        qualities,
        channel,
    );
    state.transport.send_text(update.chat_id(), &text).await?;
    Ok(())
}

/// Handle /cancel: clear any pending prompt.
pub async fn handle_cancel(state: AppState, update: Update) -> anyhow::Result<()> {
    let text = if state.pending.clear(update.user_id()) {
        "Cancelled."
    } else {
        "Nothing to cancel."
    };
    state.transport.send_text(update.chat_id(), text).await?;
    Ok(())
}
