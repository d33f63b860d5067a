//! Settings export and import.
//!
//! Import replaces the whole session from a user-supplied JSON document.
//! Every check must pass before anything is written; failures are
//! surfaced verbatim and leave the existing session untouched.

use thiserror::Error;
use tracing::{debug, warn};

use crate::bot::dispatcher::AppState;
use crate::bot::update::Update;
use crate::storage::{Quality, UserSession};

/// Why an import was rejected.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("invalid settings file: {0}")]
    Shape(#[from] serde_json::Error),

    #[error("these settings belong to user {found}, not to you")]
    Ownership { found: i64 },

    #[error("invalid settings: {0}")]
    Invalid(&'static str),
}

/// Parse and validate an imported settings document for `owner_id`.
///
/// The returned session has its quality selection normalized to
/// canonical order; everything else is taken as-is.
pub fn validate_import(bytes: &[u8], owner_id: i64) -> Result<UserSession, ImportError> {
    let mut session: UserSession = serde_json::from_slice(bytes)?;

    if session.user_id != owner_id {
        return Err(ImportError::Ownership {
            found: session.user_id,
        });
    }
    if session.season < 1 {
        return Err(ImportError::Invalid("season must be at least 1"));
    }
    if session.episode < 1 {
        return Err(ImportError::Invalid("episode must be at least 1"));
    }
    if session.total_episode < 1 {
        return Err(ImportError::Invalid("total episode must be at least 1"));
    }

    let normalized = Quality::normalize(&session.selected_qualities);
    if normalized.len() != session.selected_qualities.len() {
        return Err(ImportError::Invalid("duplicate qualities"));
    }
    session.selected_qualities = normalized;

    if session.video_count as usize >= session.selected_qualities.len().max(1) {
        return Err(ImportError::Invalid(
            "video count does not fit the quality cycle",
        ));
    }

    Ok(session)
}

/// Handle /export (also reachable from the menu).
pub async fn handle_export(state: AppState, update: Update) -> anyhow::Result<()> {
    send_export(&state, update.user_id(), update.chat_id()).await
}

pub(crate) async fn send_export(
    state: &AppState,
    user_id: i64,
    chat_id: i64,
) -> anyhow::Result<()> {
    let session = state.store.get_session(user_id).await?;
    let json = serde_json::to_string_pretty(&session)?;
    state
        .transport
        .send_text(
            chat_id,
            &format!(
                "Your settings - save this as a .json file and send it back to import:\n\n{}",
                json
            ),
        )
        .await?;
    Ok(())
}

/// Consume a JSON document for an armed ImportFile prompt.
pub async fn handle_import_document(state: AppState, update: Update) -> anyhow::Result<()> {
    let Update::Document(document) = &update else {
        return Ok(());
    };
    let user_id = document.sender.id;
    let chat_id = document.chat_id;
    debug!(user_id, file = ?document.file_name, "importing settings file");

    let bytes = match state.transport.fetch_document(&document.file_id).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(user_id, error = %e, "failed to download import file");
            // Mode stays armed; the user can resend the file.
            state
                .transport
                .send_text(chat_id, &format!("Could not download the file: {}. Send it again.", e))
                .await?;
            return Ok(());
        }
    };

    match validate_import(&bytes, user_id) {
        Ok(session) => {
            state.store.save_session(&session).await?;
            state.pending.clear(user_id);
            state
                .transport
                .send_text(chat_id, "Settings imported.")
                .await?;
        }
        Err(e) => {
            state
                .transport
                .send_text(
                    chat_id,
                    &format!("Import rejected: {}. Fix the file and send it again.", e),
                )
                .await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_json(user_id: i64) -> Vec<u8> {
        serde_json::to_vec(&UserSession::new(user_id)).unwrap()
    }

    #[test]
    fn accepts_own_valid_settings() {
        let session = validate_import(&valid_json(5), 5).unwrap();
        assert_eq!(session.user_id, 5);
    }

    #[test]
    fn rejects_foreign_settings() {
        let err = validate_import(&valid_json(6), 5).unwrap_err();
        assert!(matches!(err, ImportError::Ownership { found: 6 }));
    }

    #[test]
    fn rejects_malformed_json() {
        let err = validate_import(b"{\"season\": 1}", 5).unwrap_err();
        assert!(matches!(err, ImportError::Shape(_)));
    }

    #[test]
    fn rejects_zero_counters() {
        let mut session = UserSession::new(5);
        session.season = 0;
        let bytes = serde_json::to_vec(&session).unwrap();
        assert!(matches!(
            validate_import(&bytes, 5).unwrap_err(),
            ImportError::Invalid(_)
        ));
    }

    #[test]
    fn rejects_duplicate_qualities() {
        let mut session = UserSession::new(5);
        session.selected_qualities = vec![Quality::Q720, Quality::Q720];
        let bytes = serde_json::to_vec(&session).unwrap();
        assert!(matches!(
            validate_import(&bytes, 5).unwrap_err(),
            ImportError::Invalid("duplicate qualities")
        ));
    }

    #[test]
    fn rejects_video_count_outside_cycle() {
        let mut session = UserSession::new(5);
        session.video_count = 3; // cycle length is 3
        let bytes = serde_json::to_vec(&session).unwrap();
        assert!(matches!(
            validate_import(&bytes, 5).unwrap_err(),
            ImportError::Invalid(_)
        ));
    }

    #[test]
    fn normalizes_quality_order() {
        let mut session = UserSession::new(5);
        session.selected_qualities = vec![Quality::Q1080, Quality::Q480];
        let bytes = serde_json::to_vec(&session).unwrap();
        let imported = validate_import(&bytes, 5).unwrap();
        assert_eq!(
            imported.selected_qualities,
            vec![Quality::Q480, Quality::Q1080]
        );
    }

    #[test]
    fn rejects_unknown_quality_labels() {
        let json = br#"{
            "user_id": 5, "season": 1, "episode": 1, "total_episode": 1,
            "video_count": 0, "selected_qualities": ["144p"],
            "base_caption": "c", "target_channel_id": null
        }"#;
        assert!(matches!(
            validate_import(json, 5).unwrap_err(),
            ImportError::Shape(_)
        ));
    }
}
