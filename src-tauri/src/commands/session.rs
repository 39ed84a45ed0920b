use tauri::State;

use crate::state::InboxManager;
use crate::types::error::SparkError;
use crate::types::UserContext;

#[tauri::command]
pub async fn sign_in(
    manager: State<'_, InboxManager>,
    email: String,
    password: String,
) -> Result<UserContext, SparkError> {
    manager.sign_in(&email, &password).await
}

/// Restore the persisted session from the encrypted store, if present.
#[tauri::command]
pub async fn restore_session(
    manager: State<'_, InboxManager>,
) -> Result<Option<UserContext>, SparkError> {
    manager.restore_session().await
}

#[tauri::command]
pub async fn sign_out(manager: State<'_, InboxManager>) -> Result<(), SparkError> {
    manager.sign_out().await
}

#[tauri::command]
pub async fn current_user(
    manager: State<'_, InboxManager>,
) -> Result<Option<UserContext>, SparkError> {
    Ok(manager.try_active().await.map(|s| s.ctx.clone()))
}
