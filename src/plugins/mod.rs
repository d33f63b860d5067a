//! Handler plugins.
//!
//! Add a new handler by:
//! 1. Creating a new file in this directory
//! 2. Adding `pub mod your_plugin;` below
//! 3. Registering it in `register_all()`
//!
//! Registration order matters: dispatch is first-match within ascending
//! priority groups, so predicates narrow from specific (commands,
//! armed prompts) to general (upload triggers, passive observers).

pub mod import;
pub mod settings;
pub mod start;
pub mod upload;

use crate::bot::dispatcher::{Router, group};
use crate::bot::pending::PendingInput;
use crate::bot::update::{MediaKind, Update};

/// Register every handler on the router.
pub fn register_all(router: &mut Router) {
    // Group 0: commands and button presses.
    router.register(
        group::COMMANDS,
        "start",
        |_, u| u.is_command("start"),
        start::handle_start,
    );
    router.register(
        group::COMMANDS,
        "help",
        |_, u| u.is_command("help"),
        start::handle_help,
    );
    router.register(
        group::COMMANDS,
        "status",
        |_, u| u.is_command("status"),
        start::handle_status,
    );
    router.register(
        group::COMMANDS,
        "settings",
        |_, u| u.is_command("settings"),
        settings::handle_menu,
    );
    router.register(
        group::COMMANDS,
        "export",
        |_, u| u.is_command("export"),
        import::handle_export,
    );
    router.register(
        group::COMMANDS,
        "cancel",
        |_, u| u.is_command("cancel"),
        start::handle_cancel,
    );
    router.register(
        group::COMMANDS,
        "buttons",
        |_, u| matches!(u, Update::Button(_)),
        settings::handle_button,
    );

    // Group 1: pending-input consumers, armed by the buttons above.
    router.register(
        group::PENDING,
        "pending-text",
        |s, u| {
            matches!(u, Update::Text(_))
                && matches!(
                    s.pending.get(u.user_id()),
                    Some(
                        PendingInput::Caption
                            | PendingInput::Season
                            | PendingInput::Episode
                            | PendingInput::ChannelId
                    )
                )
        },
        settings::handle_pending_text,
    );
    router.register(
        group::PENDING,
        "pending-channel-forward",
        |s, u| {
            matches!(u, Update::Forwarded(_))
                && s.pending.get(u.user_id()) == Some(PendingInput::ChannelForward)
        },
        settings::handle_channel_forward,
    );
    router.register(
        group::PENDING,
        "pending-import",
        |s, u| {
            matches!(u, Update::Document(_))
                && s.pending.get(u.user_id()) == Some(PendingInput::ImportFile)
        },
        import::handle_import_document,
    );
    router.register(
        group::PENDING,
        "pending-welcome-media",
        |s, u| {
            matches!(u, Update::Media(_))
                && s.pending.get(u.user_id()) == Some(PendingInput::WelcomeMedia)
        },
        settings::handle_welcome_media,
    );

    // Group 2: upload triggers.
    router.register(
        group::UPLOADS,
        "upload-video",
        |_, u| matches!(u, Update::Media(m) if m.kind == MediaKind::Video),
        upload::handle_media_upload,
    );
    router.register(
        group::UPLOADS,
        "upload-video-document",
        |_, u| {
            matches!(u, Update::Document(d)
                if d.mime_type.as_deref().is_some_and(|m| m.starts_with("video/")))
        },
        upload::handle_document_upload,
    );

    // Group 3: passive channel-info enrichment from any forwarded
    // channel post that nothing above claimed.
    router.register(
        group::PASSIVE,
        "channel-observer",
        |_, u| matches!(u, Update::Forwarded(f) if f.origin.is_channel),
        settings::observe_channel,
    );
}
