use tauri::State;

use crate::inbox::Selection;
use crate::services::inbox_service::{self, OpenResult};
use crate::state::InboxManager;
use crate::types::error::SparkError;
use crate::types::{ConversationRef, InboxSnapshot};

#[tauri::command]
pub async fn inbox_snapshot(
    manager: State<'_, InboxManager>,
) -> Result<InboxSnapshot, SparkError> {
    inbox_service::snapshot(&manager).await
}

#[tauri::command]
pub async fn total_unread(manager: State<'_, InboxManager>) -> Result<u64, SparkError> {
    inbox_service::total_unread(&manager).await
}

#[tauri::command]
pub async fn inbox_selection(manager: State<'_, InboxManager>) -> Result<Selection, SparkError> {
    inbox_service::selection(&manager).await
}

#[tauri::command]
pub async fn open_conversation(
    manager: State<'_, InboxManager>,
    conversation: ConversationRef,
) -> Result<OpenResult, SparkError> {
    inbox_service::open_conversation(&manager, conversation).await
}

#[tauri::command]
pub async fn close_conversation(manager: State<'_, InboxManager>) -> Result<(), SparkError> {
    inbox_service::close_conversation(&manager).await
}

/// Clear every channel plus local notifications; returns how many
/// conversations had anything unread.
#[tauri::command]
pub async fn mark_all_read(manager: State<'_, InboxManager>) -> Result<u32, SparkError> {
    inbox_service::mark_all_read(&manager).await
}
