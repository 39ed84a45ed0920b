//! Inbox operations
//!
//! Routing between the selection machine, the unread aggregator, and the
//! channel adapters. Opening a conversation follows the strict order:
//! select, load messages, apply-if-still-selected, then mark read — so a
//! conversation is never marked read before the user has actually seen it,
//! and a stale fetch from an abandoned selection is dropped.

use serde::Serialize;
use tracing::warn;

use crate::adapters::sqlite::conversations;
use crate::inbox::{LoadOutcome, Selection};
use crate::state::{ActiveSession, InboxManager};
use crate::sync::action_queue::ActionType;
use crate::sync::engine::RefreshTrigger;
use crate::types::error::{Result, SparkError};
use crate::types::{AdapterKind, ChatMessage, ConversationRef, InboxSnapshot};

/// Result of opening a conversation.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum OpenResult {
    /// The conversation is open and its messages are attached.
    Opened { messages: Vec<ChatMessage> },
    /// The user navigated away while messages were loading; nothing to show.
    Stale,
}

/// Aggregate inbox snapshot. Signed out means every channel reads as empty
/// with a zero badge, not an error.
pub async fn snapshot(manager: &InboxManager) -> Result<InboxSnapshot> {
    let Some(session) = manager.try_active().await else {
        return Ok(InboxSnapshot::empty());
    };

    let job = channel_snapshot(&session, AdapterKind::Job);
    let team = channel_snapshot(&session, AdapterKind::Team);
    let college = channel_snapshot(&session, AdapterKind::College);
    let peer = channel_snapshot(&session, AdapterKind::Peer);
    let admin = channel_snapshot(&session, AdapterKind::Admin);

    let total_unread = u64::from(job.unread_count)
        + u64::from(team.unread_count)
        + u64::from(college.unread_count)
        + u64::from(peer.unread_count)
        + u64::from(admin.unread_count);

    Ok(InboxSnapshot {
        job,
        team,
        college,
        peer,
        admin,
        total_unread,
    })
}

fn channel_snapshot(
    session: &ActiveSession,
    kind: AdapterKind,
) -> crate::types::ChannelSnapshot {
    session
        .channels
        .get(kind)
        .snapshot(&session.ctx)
        .unwrap_or_else(|e| {
            // A broken channel renders as empty rather than failing the
            // whole inbox.
            warn!("Snapshot of {} failed: {}", kind.label(), e);
            crate::types::ChannelSnapshot::empty()
        })
}

/// The live unread badge value.
pub async fn total_unread(manager: &InboxManager) -> Result<u64> {
    match manager.try_active().await {
        None => Ok(0),
        Some(session) => session
            .aggregator
            .total_unread(&session.channels, &session.ctx),
    }
}

/// Current view state (list vs. one open conversation).
pub async fn selection(manager: &InboxManager) -> Result<Selection> {
    match manager.try_active().await {
        None => Ok(Selection::List),
        Some(session) => {
            let guard = session
                .selection
                .lock()
                .map_err(|_| SparkError::Other("selection state poisoned".to_string()))?;
            Ok(guard.selection())
        }
    }
}

/// Open a conversation: transition the selection machine, load messages,
/// then mark read only if the load landed and the conversation is still the
/// open one.
pub async fn open_conversation(
    manager: &InboxManager,
    conversation: ConversationRef,
) -> Result<OpenResult> {
    let session = manager.active().await?;

    {
        let mut selection = session
            .selection
            .lock()
            .map_err(|_| SparkError::Other("selection state poisoned".to_string()))?;
        selection.select(conversation.clone())?;
    }

    let adapter = session.channels.for_conversation(&conversation);
    let loaded = adapter.messages(&session.ctx, &conversation).await;

    let messages = match loaded {
        Ok(messages) => messages,
        Err(e) => {
            // Fall back to the list view instead of a stuck blank pane; the
            // error itself surfaces as a non-fatal notice.
            if let Ok(mut selection) = session.selection.lock() {
                selection.load_failed(&conversation);
            }
            return Err(e);
        }
    };

    let last_message_id = messages.last().map(|m| m.id.clone());
    let outcome = {
        let mut selection = session
            .selection
            .lock()
            .map_err(|_| SparkError::Other("selection state poisoned".to_string()))?;
        selection.messages_loaded(&conversation, last_message_id.as_deref())
    };

    match outcome {
        LoadOutcome::Stale => Ok(OpenResult::Stale),
        LoadOutcome::Apply { mark_read } => {
            if mark_read {
                mark_read_with_fallback(&session, &conversation, last_message_id.as_deref()).await;
            }
            Ok(OpenResult::Opened { messages })
        }
    }
}

/// Mark a conversation read, queueing the remote half when offline. The
/// local cache updates either way so the badge reflects what the user has
/// now seen; a non-connectivity rejection is only logged — it must not make
/// opening a conversation fail.
async fn mark_read_with_fallback(
    session: &ActiveSession,
    conversation: &ConversationRef,
    up_to_message_id: Option<&str>,
) {
    let adapter = session.channels.for_conversation(conversation);
    match adapter
        .mark_conversation_read(&session.ctx, conversation, up_to_message_id)
        .await
    {
        Ok(_) => {}
        Err(e) if e.is_connectivity() => {
            if let Err(queue_err) = session.queue.queue(ActionType::MarkRead {
                conversation: conversation.clone(),
                up_to_message_id: up_to_message_id.map(|s| s.to_string()),
            }) {
                warn!("Could not queue mark-read: {}", queue_err);
            }
            if let Err(local_err) = adapter.mark_read_local(conversation) {
                warn!("Local mark-read failed: {}", local_err);
            }
            session.engine.set_online(false);
        }
        Err(e) => warn!("Mark-read of {} rejected: {}", conversation, e),
    }
}

/// Close the open conversation (back navigation or sheet close). Clears
/// draft buffers; cached data stays. A close with no session is a no-op.
pub async fn close_conversation(manager: &InboxManager) -> Result<()> {
    if let Some(session) = manager.try_active().await {
        let mut selection = session
            .selection
            .lock()
            .map_err(|_| SparkError::Other("selection state poisoned".to_string()))?;
        selection.close();
    }
    Ok(())
}

/// Clear everything: every channel's mark-all-read plus local notifications.
/// Falls back to queued per-channel actions when offline so the badge still
/// clears immediately.
pub async fn mark_all_read(manager: &InboxManager) -> Result<u32> {
    let session = manager.active().await?;

    match session
        .aggregator
        .clear_all(&session.channels, &session.ctx)
        .await
    {
        Ok(cleared) => Ok(cleared),
        Err(e) if e.is_connectivity() => {
            let mut cleared = 0;
            for kind in AdapterKind::ALL {
                let adapter = session.channels.get(kind);
                if !adapter.applicable(&session.ctx) {
                    continue;
                }
                if conversations::channel_unread(&session.pool, kind)? == 0 {
                    continue;
                }
                session
                    .queue
                    .queue(ActionType::MarkAllRead { channel: kind })?;
                cleared += conversations::mark_channel_read(&session.pool, kind)?;
            }
            if let Some(store) = session.aggregator.notifications() {
                store.mark_all_read()?;
            }
            session.engine.set_online(false);
            Ok(cleared)
        }
        Err(e) => Err(e),
    }
}

/// Delete a conversation where the channel permits it. Local state only
/// changes once the backend confirms; offline deletes are queued and the
/// item stays in the list until replay succeeds.
pub async fn delete_conversation(
    manager: &InboxManager,
    conversation: ConversationRef,
) -> Result<bool> {
    let session = manager.active().await?;
    let adapter = session.channels.for_conversation(&conversation);

    match adapter
        .delete_conversation(&session.ctx, &conversation)
        .await
    {
        Ok(()) => {
            let forced = {
                let mut selection = session
                    .selection
                    .lock()
                    .map_err(|_| SparkError::Other("selection state poisoned".to_string()))?;
                selection.conversation_deleted(&conversation)
            };
            let _ = session
                .engine
                .trigger_handle()
                .send(RefreshTrigger::Channel(conversation.channel.adapter()));
            Ok(forced)
        }
        Err(e) if e.is_connectivity() => {
            session.queue.queue(ActionType::Delete {
                conversation: conversation.clone(),
            })?;
            session.engine.set_online(false);
            Err(SparkError::Offline)
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::PlatformClient;
    use crate::types::ChannelKind;
    use std::sync::Arc;

    fn manager() -> InboxManager {
        InboxManager::new(Arc::new(PlatformClient::new().unwrap()))
    }

    #[tokio::test]
    async fn signed_out_reads_as_no_data() {
        let manager = manager();

        let snapshot = snapshot(&manager).await.unwrap();
        assert_eq!(snapshot.total_unread, 0);
        assert!(snapshot.job.items.is_empty());
        assert!(snapshot.college.items.is_empty());

        assert_eq!(total_unread(&manager).await.unwrap(), 0);
        assert_eq!(selection(&manager).await.unwrap(), Selection::List);

        // Closing with no session is a harmless no-op.
        close_conversation(&manager).await.unwrap();
    }

    #[tokio::test]
    async fn opening_requires_a_session() {
        let manager = manager();
        let err = open_conversation(&manager, ConversationRef::new(ChannelKind::Job, "j1"))
            .await
            .unwrap_err();
        assert!(matches!(err, SparkError::NoSession));
    }
}
