use tauri::State;

use crate::services::{inbox_service, message_service};
use crate::state::InboxManager;
use crate::types::error::SparkError;
use crate::types::{ChannelKind, ChatMessage, ConversationRef, Notification};

#[tauri::command]
pub async fn send_message(
    manager: State<'_, InboxManager>,
    conversation: ConversationRef,
    body: String,
) -> Result<ChatMessage, SparkError> {
    message_service::send_message(&manager, conversation, body).await
}

/// Returns whether the deletion closed the currently open conversation.
#[tauri::command]
pub async fn delete_conversation(
    manager: State<'_, InboxManager>,
    conversation: ConversationRef,
) -> Result<bool, SparkError> {
    inbox_service::delete_conversation(&manager, conversation).await
}

#[tauri::command]
pub async fn set_draft(
    manager: State<'_, InboxManager>,
    channel: ChannelKind,
    text: String,
) -> Result<(), SparkError> {
    message_service::set_draft(&manager, channel, text).await
}

#[tauri::command]
pub async fn get_draft(
    manager: State<'_, InboxManager>,
    channel: ChannelKind,
) -> Result<Option<String>, SparkError> {
    message_service::get_draft(&manager, channel).await
}

#[tauri::command]
pub async fn list_notifications(
    manager: State<'_, InboxManager>,
    limit: u32,
) -> Result<Vec<Notification>, SparkError> {
    let session = manager.active().await?;
    match session.aggregator.notifications() {
        Some(store) => store.list(limit),
        // Absent provider degrades to an empty list, never an error.
        None => Ok(Vec::new()),
    }
}
