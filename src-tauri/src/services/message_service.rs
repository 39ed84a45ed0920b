//! Send flow
//!
//! One in-flight send per conversation; the draft buffer is only cleared
//! once the backend confirms, so a failed or offline send leaves the text
//! exactly where the user left it.

use crate::state::InboxManager;
use crate::sync::action_queue::ActionType;
use crate::sync::engine::RefreshTrigger;
use crate::types::error::{Result, SparkError};
use crate::types::{ChannelKind, ChatMessage, ConversationRef};

/// Send a message to a conversation.
///
/// On success the message is already in the local cache (the adapter only
/// writes what the backend confirmed), the channel's draft is cleared, and
/// a channel refresh is triggered. When the backend is unreachable, the
/// send is queued for replay and `Offline` is returned; nothing is appended
/// locally until the replay succeeds.
pub async fn send_message(
    manager: &InboxManager,
    conversation: ConversationRef,
    body: String,
) -> Result<ChatMessage> {
    let body = body.trim().to_string();
    if body.is_empty() {
        return Err(SparkError::InvalidInput(
            "Message body cannot be empty".to_string(),
        ));
    }

    let session = manager.active().await?;
    let _guard = session.begin_send(&conversation)?;

    let adapter = session.channels.for_conversation(&conversation);
    match adapter.send(&session.ctx, &conversation, &body).await {
        Ok(message) => {
            if let Ok(mut selection) = session.selection.lock() {
                selection.clear_draft(conversation.channel);
            }
            let _ = session
                .engine
                .trigger_handle()
                .send(RefreshTrigger::Channel(conversation.channel.adapter()));
            Ok(message)
        }
        Err(e) if e.is_connectivity() => {
            session.queue.queue(ActionType::Send {
                conversation: conversation.clone(),
                body,
            })?;
            session.engine.set_online(false);
            // Draft deliberately untouched: the user can see and retry it.
            Err(SparkError::Offline)
        }
        Err(e) => Err(e),
    }
}

/// Store a per-channel draft (transient UI state, cleared on sheet close).
pub async fn set_draft(manager: &InboxManager, channel: ChannelKind, text: String) -> Result<()> {
    let session = manager.active().await?;
    let mut selection = session
        .selection
        .lock()
        .map_err(|_| SparkError::Other("selection state poisoned".to_string()))?;
    selection.set_draft(channel, text);
    Ok(())
}

pub async fn get_draft(manager: &InboxManager, channel: ChannelKind) -> Result<Option<String>> {
    let Some(session) = manager.try_active().await else {
        return Ok(None);
    };
    let selection = session
        .selection
        .lock()
        .map_err(|_| SparkError::Other("selection state poisoned".to_string()))?;
    Ok(selection.draft(channel).map(|s| s.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::PlatformClient;
    use crate::state::InboxManager;
    use std::sync::Arc;

    fn manager() -> InboxManager {
        InboxManager::new(Arc::new(PlatformClient::new().unwrap()))
    }

    #[tokio::test]
    async fn empty_body_is_rejected_before_anything_else() {
        let manager = manager();
        let conversation = ConversationRef::new(ChannelKind::Peer, "p1");

        let err = send_message(&manager, conversation, "   ".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, SparkError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn sending_requires_a_session() {
        let manager = manager();
        let conversation = ConversationRef::new(ChannelKind::Peer, "p1");

        let err = send_message(&manager, conversation, "hello".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, SparkError::NoSession));
    }

    #[tokio::test]
    async fn drafts_read_as_absent_when_signed_out() {
        let manager = manager();
        assert!(get_draft(&manager, ChannelKind::Job).await.unwrap().is_none());
    }
}
