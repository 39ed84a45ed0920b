//! Refresh and connectivity commands
//!
//! The frontend forwards external signals (window focus, browser
//! online/offline events, pull-to-refresh) here; they become
//! [`RefreshTrigger`] events the engine subscribes to.

use tauri::State;

use crate::state::InboxManager;
use crate::sync::engine::RefreshTrigger;
use crate::types::error::SparkError;

async fn trigger(manager: &InboxManager, trigger: RefreshTrigger) -> Result<(), SparkError> {
    let session = manager.active().await?;
    session
        .engine
        .trigger_handle()
        .send(trigger)
        .map_err(|_| SparkError::Other("Refresh engine is not running".to_string()))
}

#[tauri::command]
pub async fn refresh_inbox(manager: State<'_, InboxManager>) -> Result<(), SparkError> {
    trigger(&manager, RefreshTrigger::Manual).await
}

#[tauri::command]
pub async fn app_focused(manager: State<'_, InboxManager>) -> Result<(), SparkError> {
    // Signed out, a focus change has nothing to refresh.
    if manager.try_active().await.is_none() {
        return Ok(());
    }
    trigger(&manager, RefreshTrigger::AppFocused).await
}

#[tauri::command]
pub async fn set_online(
    manager: State<'_, InboxManager>,
    online: bool,
) -> Result<(), SparkError> {
    let session = manager.active().await?;
    session.engine.set_online(online);
    Ok(())
}

#[tauri::command]
pub async fn is_online(manager: State<'_, InboxManager>) -> Result<bool, SparkError> {
    Ok(match manager.try_active().await {
        Some(session) => session.engine.is_online(),
        None => true,
    })
}

#[tauri::command]
pub async fn has_pending_actions(manager: State<'_, InboxManager>) -> Result<bool, SparkError> {
    let session = manager.active().await?;
    session.queue.has_pending()
}
