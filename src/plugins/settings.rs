//! Settings menu and pending-input consumers.
//!
//! Every edit goes through a two-step flow: a button press arms a
//! pending-input mode, and the next matching message consumes it. A
//! failed parse keeps the mode armed so the user can just resend.

use tracing::{debug, warn};

use crate::bot::dispatcher::{AppState, WelcomeMedia};
use crate::bot::pending::PendingInput;
use crate::bot::update::Update;
use crate::sequence::caption::{self, CaptionContext};
use crate::storage::{ChannelInfo, Quality, UserSession};
use crate::transport::MenuButton;

use super::import;

/// Send the settings menu with `text` above it.
pub async fn send_menu(
    state: &AppState,
    chat_id: i64,
    user_id: i64,
    text: &str,
) -> anyhow::Result<()> {
    let session = state.store.get_session(user_id).await?;
    let buttons = menu_buttons(&session, state.is_admin(user_id));
    state.transport.send_menu(chat_id, text, &buttons).await?;
    Ok(())
}

fn menu_buttons(session: &UserSession, is_admin: bool) -> Vec<Vec<MenuButton>> {
    let quality_row = Quality::ALL
        .iter()
        .map(|q| {
            let selected = session.selected_qualities.contains(q);
            let label = if selected {
                format!("✅ {}", q.label())
            } else {
                q.label().to_string()
            };
            MenuButton::new(label, format!("quality:{}", q.label()))
        })
        .collect();

    let mut rows = vec![
        vec![
            MenuButton::new("✏️ Caption", "set_caption"),
            MenuButton::new("👁 Preview", "preview"),
        ],
        vec![
            MenuButton::new("🔢 Season", "set_season"),
            MenuButton::new("🔢 Episode", "set_episode"),
        ],
        quality_row,
        vec![
            MenuButton::new("📡 Channel (forward)", "channel_forward"),
            MenuButton::new("📡 Channel (ID)", "channel_id"),
        ],
        vec![
            MenuButton::new("📥 Import", "import"),
            MenuButton::new("📤 Export", "export"),
        ],
    ];
    if is_admin {
        rows.push(vec![MenuButton::new("🖼 Welcome media", "welcome_media")]);
    }
    rows.push(vec![MenuButton::new("✖️ Close", "cancel")]);
    rows
}

/// Handle /settings.
pub async fn handle_menu(state: AppState, update: Update) -> anyhow::Result<()> {
    send_menu(&state, update.chat_id(), update.user_id(), "⚙️ Settings").await
}

/// Handle every button press; payloads are the menu's callback data.
pub async fn handle_button(state: AppState, update: Update) -> anyhow::Result<()> {
    let Update::Button(press) = &update else {
        return Ok(());
    };
    let user_id = press.sender.id;
    let chat_id = update.chat_id();

    // Stop the client spinner regardless of what the payload turns out
    // to be; a failed ack is not worth aborting the action over.
    if let Err(e) = state.transport.ack_button(&press.callback_id).await {
        debug!(error = %e, "failed to ack button press");
    }

    match press.data.as_str() {
        "set_caption" => {
            state.pending.set(user_id, PendingInput::Caption);
            state
                .transport
                .send_text(
                    chat_id,
                    "Send the new caption template.\n\nPlaceholders: {season}, {episode}, \
                     {total_episode}, {quality}, {username}, {first}, {id}, {channel_id}, \
                     {channel_title}",
                )
                .await?;
        }
        "preview" => {
            send_preview(&state, chat_id, user_id).await?;
        }
        "set_season" => {
            state.pending.set(user_id, PendingInput::Season);
            state
                .transport
                .send_text(chat_id, "Send the new season number.")
                .await?;
        }
        "set_episode" => {
            state.pending.set(user_id, PendingInput::Episode);
            state
                .transport
                .send_text(chat_id, "Send the new episode number.")
                .await?;
        }
        "channel_forward" => {
            state.pending.set(user_id, PendingInput::ChannelForward);
            state
                .transport
                .send_text(chat_id, "Forward any post from your target channel.")
                .await?;
        }
        "channel_id" => {
            state.pending.set(user_id, PendingInput::ChannelId);
            state
                .transport
                .send_text(chat_id, "Send the channel id (like -1001234567890).")
                .await?;
        }
        "import" => {
            state.pending.set(user_id, PendingInput::ImportFile);
            state
                .transport
                .send_text(chat_id, "Send your settings file (a JSON document).")
                .await?;
        }
        "export" => {
            import::send_export(&state, user_id, chat_id).await?;
        }
        "welcome_media" => {
            if !state.is_admin(user_id) {
                state
                    .transport
                    .send_text(chat_id, "Admins only.")
                    .await?;
                return Ok(());
            }
            state.pending.set(user_id, PendingInput::WelcomeMedia);
            state
                .transport
                .send_text(chat_id, "Send the photo, video or animation to greet new users with.")
                .await?;
        }
        "cancel" => {
            state.pending.clear(user_id);
            state.transport.send_text(chat_id, "Closed.").await?;
        }
        other if other.starts_with("quality:") => {
            toggle_quality(&state, chat_id, user_id, &other["quality:".len()..]).await?;
        }
        other => {
            debug!(data = other, message_id = ?press.message_id, "unknown button payload");
        }
    }
    Ok(())
}

async fn toggle_quality(
    state: &AppState,
    chat_id: i64,
    user_id: i64,
    label: &str,
) -> anyhow::Result<()> {
    let Some(quality) = Quality::from_label(label) else {
        debug!(label, "unknown quality label in button payload");
        return Ok(());
    };

    let mut session = state.store.get_session(user_id).await?;
    session.toggle_quality(quality);
    state.store.save_session(&session).await?;

    let text = if session.selected_qualities.is_empty() {
        "No qualities selected - uploads are paused until you pick at least one.".to_string()
    } else {
        format!(
            "Selected qualities: {} (episode progress reset).",
            session
                .selected_qualities
                .iter()
                .map(|q| q.label())
                .collect::<Vec<_>>()
                .join(", ")
        )
    };
    state.transport.send_text(chat_id, &text).await?;
    Ok(())
}

/// Render the caption exactly as the next upload would see it.
async fn send_preview(state: &AppState, chat_id: i64, user_id: i64) -> anyhow::Result<()> {
    let session = state.store.get_session(user_id).await?;
    let Some(quality) = session.current_quality() else {
        state
            .transport
            .send_text(chat_id, "No qualities selected - nothing to preview.")
            .await?;
        return Ok(());
    };

    let channel = match session.target_channel_id {
        Some(id) => state.store.lookup_channel(id).await.unwrap_or_default(),
        None => None,
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
            channel_id: session.target_channel_id,
            channel_title: channel.as_ref().and_then(|c| c.title.as_deref()),
        },
    );
    state
        .transport
        .send_text(chat_id, &format!("Preview:\n\n{}", rendered))
        .await?;
    Ok(())
}

/// Consume a text reply for an armed Caption/Season/Episode/ChannelId
/// prompt. The predicate guarantees one of those modes is active.
pub async fn handle_pending_text(state: AppState, update: Update) -> anyhow::Result<()> {
    let Update::Text(message) = &update else {
        return Ok(());
    };
    let user_id = message.sender.id;
    let chat_id = message.chat_id;
    let Some(mode) = state.pending.get(user_id) else {
        return Ok(());
    };

    let mut session = state.store.get_session(user_id).await?;
    let reply = match mode {
        PendingInput::Caption => {
            session.base_caption = message.text.clone();
            "Caption template updated.".to_string()
        }
        PendingInput::Season => match parse_counter(&message.text) {
            Some(n) => {
                session.season = n;
                format!("Season set to {}.", n)
            }
            None => {
                // Mode stays armed; the user can just send a number.
                state
                    .transport
                    .send_text(chat_id, "That is not a valid number (must be 1 or more).")
                    .await?;
                return Ok(());
            }
        },
        PendingInput::Episode => match parse_counter(&message.text) {
            Some(n) => {
                session.episode = n;
                format!("Episode set to {}.", n)
            }
            None => {
                state
                    .transport
                    .send_text(chat_id, "That is not a valid number (must be 1 or more).")
                    .await?;
                return Ok(());
            }
        },
        PendingInput::ChannelId => match message.text.trim().parse::<i64>() {
            Ok(id) => {
                session.target_channel_id = Some(id);
                format!("Target channel set to {}.", id)
            }
            Err(_) => {
                state
                    .transport
                    .send_text(chat_id, "That does not look like a channel id.")
                    .await?;
                return Ok(());
            }
        },
        // Other modes are consumed by their own handlers.
        _ => return Ok(()),
    };

    state.store.save_session(&session).await?;
    state.pending.clear(user_id);
    state.transport.send_text(chat_id, &reply).await?;
    Ok(())
}

fn parse_counter(text: &str) -> Option<u32> {
    text.trim().parse::<u32>().ok().filter(|n| *n >= 1)
}

/// Consume a forwarded channel post for an armed ChannelForward prompt.
pub async fn handle_channel_forward(state: AppState, update: Update) -> anyhow::Result<()> {
    let Update::Forwarded(forward) = &update else {
        return Ok(());
    };
    let user_id = forward.sender.id;
    let chat_id = forward.chat_id;

    if !forward.origin.is_channel {
        // Keep the mode armed until a channel post arrives.
        state
            .transport
            .send_text(chat_id, "That is not a channel post - forward one from your channel.")
            .await?;
        return Ok(());
    }

    let mut session = state.store.get_session(user_id).await?;
    session.target_channel_id = Some(forward.origin.id);
    state.store.save_session(&session).await?;
    state.pending.clear(user_id);

    let info = ChannelInfo::observed(
        forward.origin.id,
        forward.origin.username.clone(),
        forward.origin.title.clone(),
        user_id,
    );
    if let Err(e) = state.store.upsert_channel(&info).await {
        warn!(error = %e, "failed to cache channel info");
    }

    let shown = forward
        .origin
        .title
        .clone()
        .unwrap_or_else(|| forward.origin.id.to_string());
    state
        .transport
        .send_text(
            chat_id,
            &format!("Target channel set to {}. Make sure I am an admin there.", shown),
        )
        .await?;
    Ok(())
}

/// Consume media for an armed WelcomeMedia prompt (admins only; the
/// button handler already gated it).
pub async fn handle_welcome_media(state: AppState, update: Update) -> anyhow::Result<()> {
    let Update::Media(media) = &update else {
        return Ok(());
    };
    let user_id = media.sender.id;

    if state.pending.take(user_id) != Some(PendingInput::WelcomeMedia) {
        return Ok(());
    }
    state.welcome.set(WelcomeMedia {
        chat_id: media.chat_id,
        message_id: media.message_id,
    });
    state
        .transport
        .send_text(media.chat_id, "Welcome media updated (until the next restart).")
        .await?;
    Ok(())
}

/// Passively refresh the channel cache from any forwarded channel post.
pub async fn observe_channel(state: AppState, update: Update) -> anyhow::Result<()> {
    let Update::Forwarded(forward) = &update else {
        return Ok(());
    };
    if !forward.origin.is_channel {
        return Ok(());
    }

    let info = ChannelInfo::observed(
        forward.origin.id,
        forward.origin.username.clone(),
        forward.origin.title.clone(),
        forward.sender.id,
    );
    if let Err(e) = state.store.upsert_channel(&info).await {
        debug!(error = %e, "channel observation not cached");
    }
    Ok(())
}
