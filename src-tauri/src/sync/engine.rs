//! Inbox refresh engine
//!
//! Keeps the local cache in step with the platform API. Two inputs drive a
//! refresh: a periodic poll, and [`RefreshTrigger`] events (app regaining
//! focus, connectivity coming back, an explicit user refresh, or a single
//! channel invalidated after a write). Triggers travel over a `flume`
//! channel so any part of the app can request a refresh without knowing how
//! a given channel fetches.

use flume::{Receiver, Sender};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tauri::Emitter;
use tracing::{debug, info, warn};

use crate::adapters::sqlite::{conversations, DbPool};
use crate::channels::ChannelSet;
use crate::inbox::SelectionState;
use crate::sync::action_queue::ActionQueue;
use crate::types::{AdapterKind, ConversationRef, UserContext};

/// Why a refresh is being requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RefreshTrigger {
    /// The app window regained focus.
    AppFocused,
    /// Connectivity came back; also replays the offline action queue.
    BackOnline,
    /// Explicit user-initiated refresh.
    Manual,
    /// One channel's cache was invalidated (e.g. after a send or delete).
    Channel(AdapterKind),
}

/// Event payload for `inbox://channel-updated`.
#[derive(Debug, Clone, Serialize)]
struct ChannelUpdatedPayload {
    channel: AdapterKind,
    unread_count: u32,
}

/// Event payload for `inbox://selection-reset`.
#[derive(Debug, Clone, Serialize)]
struct SelectionResetPayload {
    conversation: ConversationRef,
    reason: &'static str,
}

pub struct SyncEngine {
    channels: Arc<ChannelSet>,
    ctx: UserContext,
    pool: DbPool,
    queue: Arc<ActionQueue>,
    selection: Arc<Mutex<SelectionState>>,
    is_online: Arc<AtomicBool>,
    shutdown: Arc<AtomicBool>,
    trigger_tx: Sender<RefreshTrigger>,
    trigger_rx: Receiver<RefreshTrigger>,
    poll_interval: Duration,
    app_handle: Option<tauri::AppHandle>,
}

impl SyncEngine {
    pub fn new(
        channels: Arc<ChannelSet>,
        ctx: UserContext,
        pool: DbPool,
        queue: Arc<ActionQueue>,
        selection: Arc<Mutex<SelectionState>>,
        poll_interval: Duration,
        app_handle: Option<tauri::AppHandle>,
    ) -> Self {
        let (trigger_tx, trigger_rx) = flume::unbounded();
        Self {
            channels,
            ctx,
            pool,
            queue,
            selection,
            is_online: Arc::new(AtomicBool::new(true)),
            shutdown: Arc::new(AtomicBool::new(false)),
            trigger_tx,
            trigger_rx,
            poll_interval,
            app_handle,
        }
    }

    /// Sender half for refresh triggers; clone freely.
    pub fn trigger_handle(&self) -> Sender<RefreshTrigger> {
        self.trigger_tx.clone()
    }

    pub fn is_online(&self) -> bool {
        self.is_online.load(Ordering::SeqCst)
    }

    pub fn set_online(&self, online: bool) {
        let was_online = self.is_online.swap(online, Ordering::SeqCst);
        if online && !was_online {
            let _ = self.trigger_tx.send(RefreshTrigger::BackOnline);
        }
    }

    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
        // Wake the loop so it notices.
        let _ = self.trigger_tx.send(RefreshTrigger::Manual);
    }

    /// Run the refresh loop until shutdown. Spawned once per session.
    pub async fn run(self: Arc<Self>) {
        info!(
            "Refresh engine started for user {} (poll every {:?})",
            self.ctx.user_id, self.poll_interval
        );

        loop {
            if self.shutdown.load(Ordering::SeqCst) {
                break;
            }

            tokio::select! {
                trigger = self.trigger_rx.recv_async() => {
                    match trigger {
                        Ok(trigger) => {
                            if self.shutdown.load(Ordering::SeqCst) {
                                break;
                            }
                            self.handle_trigger(trigger).await;
                        }
                        Err(_) => break,
                    }
                }
                _ = tokio::time::sleep(self.poll_interval) => {
                    self.refresh_all().await;
                }
            }
        }

        info!("Refresh engine stopped for user {}", self.ctx.user_id);
    }

    async fn handle_trigger(&self, trigger: RefreshTrigger) {
        debug!("Refresh trigger: {:?}", trigger);
        match trigger {
            RefreshTrigger::Channel(kind) => self.refresh_channel(kind).await,
            RefreshTrigger::BackOnline => {
                self.is_online.store(true, Ordering::SeqCst);
                match self.queue.replay_pending(&self.channels, &self.ctx).await {
                    Ok(results) if !results.is_empty() => {
                        info!("Replayed {} queued actions", results.len());
                    }
                    Ok(_) => {}
                    Err(e) => warn!("Queue replay failed: {}", e),
                }
                self.refresh_all().await;
            }
            RefreshTrigger::AppFocused | RefreshTrigger::Manual => {
                self.refresh_all().await;
            }
        }
    }

    async fn refresh_all(&self) {
        if !self.is_online() {
            debug!("Offline, skipping refresh");
            return;
        }
        for kind in AdapterKind::ALL {
            self.refresh_channel(kind).await;
        }
    }

    async fn refresh_channel(&self, kind: AdapterKind) {
        let adapter = self.channels.get(kind);
        if !adapter.applicable(&self.ctx) {
            return;
        }

        if let Err(e) = adapter.refresh(&self.ctx).await {
            // A failed load shows as that channel's own error state; it
            // never takes the other channels down with it.
            warn!("Refresh of {} failed: {}", kind.label(), e);
            if e.is_connectivity() {
                self.is_online.store(false, Ordering::SeqCst);
            }
            return;
        }

        if let Some(closed) = reconcile_selection(&self.pool, &self.selection) {
            info!(
                "Open conversation {} disappeared during refresh, back to list",
                closed
            );
            self.emit(
                "inbox://selection-reset",
                SelectionResetPayload {
                    conversation: closed,
                    reason: "deleted",
                },
            );
        }

        match adapter.snapshot(&self.ctx) {
            Ok(snapshot) => self.emit(
                "inbox://channel-updated",
                ChannelUpdatedPayload {
                    channel: kind,
                    unread_count: snapshot.unread_count,
                },
            ),
            Err(e) => warn!("Snapshot of {} failed after refresh: {}", kind.label(), e),
        }
    }

    fn emit<P: Serialize + Clone>(&self, event: &str, payload: P) {
        if let Some(handle) = &self.app_handle {
            if let Err(e) = handle.emit(event, payload) {
                warn!("Failed to emit {}: {}", event, e);
            }
        }
    }
}

/// If the currently open conversation no longer exists in the cache (deleted
/// in another session and discovered via refresh), force the selection back
/// to the list. Returns the conversation that was force-closed.
pub fn reconcile_selection(
    pool: &DbPool,
    selection: &Arc<Mutex<SelectionState>>,
) -> Option<ConversationRef> {
    let open = {
        let guard = selection.lock().ok()?;
        guard.selected().cloned()
    };
    let open = open?;

    match conversations::get(pool, &open) {
        Ok(Some(_)) => None,
        Ok(None) => {
            let mut guard = selection.lock().ok()?;
            if guard.conversation_deleted(&open) {
                Some(open)
            } else {
                None
            }
        }
        Err(e) => {
            warn!("Selection reconcile failed: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::pool::create_test_pool;
    use crate::types::{ChannelKind, ConversationSummary};
    use chrono::Utc;

    fn seed_job(pool: &DbPool, id: &str) {
        conversations::replace_channel(
            pool,
            AdapterKind::Job,
            &[ConversationSummary {
                conversation: ConversationRef::new(ChannelKind::Job, id),
                title: id.to_string(),
                last_message_preview: None,
                last_activity: Utc::now(),
                unread_count: 0,
            }],
        )
        .unwrap();
    }

    #[test]
    fn remote_delete_of_open_conversation_resets_selection() {
        let pool = create_test_pool();
        seed_job(&pool, "j42");

        let selection = Arc::new(Mutex::new(SelectionState::new()));
        selection
            .lock()
            .unwrap()
            .select(ConversationRef::new(ChannelKind::Job, "j42"))
            .unwrap();

        // Still present: nothing to do.
        assert!(reconcile_selection(&pool, &selection).is_none());

        // A refresh replaces the list without j42 (deleted elsewhere).
        seed_job(&pool, "j43");
        let closed = reconcile_selection(&pool, &selection).unwrap();
        assert_eq!(closed, ConversationRef::new(ChannelKind::Job, "j42"));
        assert!(selection.lock().unwrap().selected().is_none());
    }

    #[test]
    fn reconcile_is_a_no_op_in_list_view() {
        let pool = create_test_pool();
        let selection = Arc::new(Mutex::new(SelectionState::new()));
        assert!(reconcile_selection(&pool, &selection).is_none());
    }
}
