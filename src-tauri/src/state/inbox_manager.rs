//! Inbox manager state
//!
//! Owns everything scoped to one signed-in session: the channel adapters,
//! the selection machine, the unread aggregator, the offline queue, and the
//! refresh engine. The selection machine is the only writer of selection
//! state; adapters and the engine read it at most.

use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::adapters::sqlite::notifications::NotificationStore;
use crate::adapters::sqlite::{pool::create_pool, DbPool};
use crate::backend::PlatformClient;
use crate::channels::ChannelSet;
use crate::config;
use crate::credentials::SessionStore;
use crate::inbox::{SelectionState, UnreadAggregator};
use crate::sync::action_queue::ActionQueue;
use crate::sync::engine::SyncEngine;
use crate::types::error::{Result, SparkError};
use crate::types::{ConversationRef, Session, UserContext};

/// Everything owned by one signed-in session.
pub struct ActiveSession {
    pub ctx: UserContext,
    pub pool: DbPool,
    pub channels: Arc<ChannelSet>,
    pub selection: Arc<Mutex<SelectionState>>,
    pub aggregator: UnreadAggregator,
    pub queue: Arc<ActionQueue>,
    pub engine: Arc<SyncEngine>,
    in_flight_sends: Mutex<HashSet<ConversationRef>>,
}

impl ActiveSession {
    /// Claim the send slot for a conversation. At most one send may be in
    /// flight per conversation; a second concurrent attempt is rejected.
    pub fn begin_send(&self, conversation: &ConversationRef) -> Result<SendGuard<'_>> {
        let mut in_flight = self
            .in_flight_sends
            .lock()
            .map_err(|_| SparkError::Other("send tracking poisoned".to_string()))?;
        if !in_flight.insert(conversation.clone()) {
            return Err(SparkError::SendInFlight);
        }
        Ok(SendGuard {
            session: self,
            conversation: conversation.clone(),
        })
    }
}

/// Releases the per-conversation send slot on drop, so every exit path of a
/// send (success, backend rejection, queueing) frees it.
pub struct SendGuard<'a> {
    session: &'a ActiveSession,
    conversation: ConversationRef,
}

impl Drop for SendGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut in_flight) = self.session.in_flight_sends.lock() {
            in_flight.remove(&self.conversation);
        }
    }
}

/// Tauri-managed state: the API client plus the active session, if any.
pub struct InboxManager {
    client: Arc<PlatformClient>,
    active: RwLock<Option<Arc<ActiveSession>>>,
    app_handle: RwLock<Option<tauri::AppHandle>>,
}

impl InboxManager {
    pub fn new(client: Arc<PlatformClient>) -> Self {
        Self {
            client,
            active: RwLock::new(None),
            app_handle: RwLock::new(None),
        }
    }

    /// Set the Tauri app handle for event emission
    pub async fn set_app_handle(&self, handle: tauri::AppHandle) {
        let mut app_handle = self.app_handle.write().await;
        *app_handle = Some(handle);
    }

    /// The active session, or `NoSession`.
    pub async fn active(&self) -> Result<Arc<ActiveSession>> {
        self.active
            .read()
            .await
            .clone()
            .ok_or(SparkError::NoSession)
    }

    /// The active session, if any. Callers that treat "signed out" as
    /// "no data available" use this instead of [`Self::active`].
    pub async fn try_active(&self) -> Option<Arc<ActiveSession>> {
        self.active.read().await.clone()
    }

    /// Sign in against the platform API and bring up the session.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<UserContext> {
        let session = self.client.sign_in(email, password).await?;

        match SessionStore::new() {
            Ok(store) => {
                if let Err(e) = store.store(&session) {
                    warn!("Could not persist session: {}", e);
                }
            }
            Err(e) => warn!("Session store unavailable: {}", e),
        }

        self.activate(session).await
    }

    /// Restore the previous session from the encrypted store, if present.
    pub async fn restore_session(&self) -> Result<Option<UserContext>> {
        let store = SessionStore::new()?;
        let Some(session) = store.load() else {
            return Ok(None);
        };

        self.client.restore(&session);
        let ctx = self.activate(session).await?;
        Ok(Some(ctx))
    }

    /// Tear down the session: stop the engine, drop the token, forget the
    /// stored session. The cache database stays on disk.
    pub async fn sign_out(&self) -> Result<()> {
        let mut active = self.active.write().await;
        if let Some(session) = active.take() {
            session.engine.shutdown();
            info!("Signed out user {}", session.ctx.user_id);
        }
        self.client.clear_token();

        if let Ok(store) = SessionStore::new() {
            let _ = store.clear();
        }
        Ok(())
    }

    async fn activate(&self, session: Session) -> Result<UserContext> {
        let ctx = session.user.clone();
        let cfg = config::get_config();

        let pool = create_pool(&cache_db_path(&ctx.user_id)?)?;
        let channels = Arc::new(ChannelSet::new(self.client.clone(), pool.clone()));
        let selection = Arc::new(Mutex::new(SelectionState::new()));
        let queue = Arc::new(ActionQueue::new(
            pool.clone(),
            cfg.sync.max_action_retries,
        ));

        let notifications = if cfg.notifications.enabled {
            Some(Arc::new(NotificationStore::new(pool.clone())))
        } else {
            None
        };
        let aggregator = UnreadAggregator::new(notifications);

        let app_handle = self.app_handle.read().await.clone();
        let engine = Arc::new(SyncEngine::new(
            channels.clone(),
            ctx.clone(),
            pool.clone(),
            queue.clone(),
            selection.clone(),
            Duration::from_secs(cfg.sync.poll_interval_secs),
            app_handle,
        ));
        tauri::async_runtime::spawn(engine.clone().run());

        let active = Arc::new(ActiveSession {
            ctx: ctx.clone(),
            pool,
            channels,
            selection,
            aggregator,
            queue,
            engine,
            in_flight_sends: Mutex::new(HashSet::new()),
        });

        let mut slot = self.active.write().await;
        if let Some(previous) = slot.take() {
            previous.engine.shutdown();
        }
        *slot = Some(active);

        info!("Session active for user {}", ctx.user_id);
        Ok(ctx)
    }
}

/// Per-user cache database path. The filename is a hash of the user id so
/// arbitrary identifiers stay filesystem-safe.
fn cache_db_path(user_id: &str) -> Result<PathBuf> {
    let dir = config::cache_dir()?;
    std::fs::create_dir_all(&dir)?;
    let hash = Sha256::digest(user_id.as_bytes());
    let name = format!("{:x}", hash)[..16].to_string();
    Ok(dir.join(format!("{}.db", name)))
}
