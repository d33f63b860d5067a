//! Update dispatch.
//!
//! Holds the shared application state and the router: an ordered set of
//! priority groups, each an ordered list of (predicate, action) pairs
//! registered at startup. Dispatch walks groups in ascending priority
//! and handlers in registration order; the first true predicate runs its
//! action, and a completed action ends the pass. An action error is
//! logged and the pass continues, so one broken handler cannot swallow
//! updates meant for a later one.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::config::Config;
use crate::sequence::{BatchCoalescer, RateLimiter, Sequencer};
use crate::storage::SessionStore;
use crate::transport::Transport;

use super::pending::PendingInputs;
use super::update::Update;

/// Handler priority groups, dispatched in ascending order.
///
/// First-match semantics makes ordering part of the contract: each
/// group narrows what the later ones can see.
pub mod group {
    /// Commands and button presses.
    pub const COMMANDS: u8 = 0;
    /// Pending-input consumers, narrowed by the per-user mode.
    pub const PENDING: u8 = 1;
    /// Upload triggers.
    pub const UPLOADS: u8 = 2;
    /// Passive enrichment; must never shadow the groups above.
    pub const PASSIVE: u8 = 3;
}

/// Admin-configured media shown on /start.
///
/// Process-lifetime only: the store contract has no slot for it, and
/// welcome configuration is an administrative concern.
#[derive(Debug, Clone, Copy)]
pub struct WelcomeMedia {
    pub chat_id: i64,
    pub message_id: i32,
}

#[derive(Clone, Default)]
pub struct WelcomeState {
    media: Arc<RwLock<Option<WelcomeMedia>>>,
}

impl WelcomeState {
    pub fn set(&self, media: WelcomeMedia) {
        *self.media.write() = Some(media);
    }

    pub fn get(&self) -> Option<WelcomeMedia> {
        *self.media.read()
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,

    /// Session persistence (mongo, file fallback, or memory in tests).
    pub store: Arc<dyn SessionStore>,

    /// Outbound platform client.
    pub transport: Arc<dyn Transport>,

    /// The per-user state machine.
    pub sequencer: Arc<Sequencer>,

    /// Upload cooldown gate; shares its marks with the sequencer.
    pub limiter: RateLimiter,

    /// Media-group dedup markers.
    pub batches: BatchCoalescer,

    /// Per-user pending-input modes.
    pub pending: PendingInputs,

    /// Admin-set welcome media.
    pub welcome: WelcomeState,
}

impl AppState {
    /// Create a new application state.
    pub fn new(
        config: Arc<Config>,
        store: Arc<dyn SessionStore>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let limiter = RateLimiter::new(Duration::from_secs(config.cooldown_secs));
        let sequencer = Arc::new(Sequencer::new(
            store.clone(),
            transport.clone(),
            limiter.clone(),
        ));

        Self {
            config,
            store,
            transport,
            sequencer,
            limiter,
            batches: BatchCoalescer::new(),
            pending: PendingInputs::new(),
            welcome: WelcomeState::default(),
        }
    }

    pub fn is_admin(&self, user_id: i64) -> bool {
        self.config.is_admin(user_id)
    }

    pub fn is_exempt(&self, user_id: i64) -> bool {
        self.config.is_exempt(user_id)
    }
}

type Predicate = Box<dyn Fn(&AppState, &Update) -> bool + Send + Sync>;
type Action = Box<dyn Fn(AppState, Update) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

struct Handler {
    name: &'static str,
    predicate: Predicate,
    action: Action,
}

/// Ordered (predicate, action) handler list, grouped by priority.
#[derive(Default)]
pub struct Router {
    groups: BTreeMap<u8, Vec<Handler>>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler in `group`. Registration order within a group
    /// is dispatch order.
    pub fn register<P, A, F>(&mut self, group: u8, name: &'static str, predicate: P, action: A)
    where
        P: Fn(&AppState, &Update) -> bool + Send + Sync + 'static,
        A: Fn(AppState, Update) -> F + Send + Sync + 'static,
        F: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.groups.entry(group).or_default().push(Handler {
            name,
            predicate: Box::new(predicate),
            action: Box::new(
                move |state, update| -> BoxFuture<'static, anyhow::Result<()>> {
                    Box::pin(action(state, update))
                },
            ),
        });
    }

    /// Route one update to the first matching handler.
    ///
    /// A matched action that returns an error does not end the pass;
    /// unmatched updates are dropped silently (debug-logged).
    pub async fn dispatch(&self, state: AppState, update: Update) {
        for handlers in self.groups.values() {
            for handler in handlers {
                if !(handler.predicate)(&state, &update) {
                    continue;
                }
                match (handler.action)(state.clone(), update.clone()).await {
                    Ok(()) => {
                        debug!(handler = handler.name, user_id = update.user_id(), "handled");
                        return;
                    }
                    Err(e) => {
                        warn!(
                            handler = handler.name,
                            user_id = update.user_id(),
                            error = %e,
                            "handler failed, continuing dispatch"
                        );
                    }
                }
            }
        }
        debug!(user_id = update.user_id(), "no handler matched, dropping update");
    }
}
