//! SparkMate - Messaging centre for UK electricians
//!
//! This module provides the main Tauri application setup and configuration.
//!
//! ## Module Organization
//!
//! - `commands/`: Tauri command handlers (thin wrappers)
//! - `services/`: Business logic (Tauri-agnostic)
//! - `state/`: Application state management
//! - `types/`: Data structures and types
//! - `channels/`: The five channel adapters behind the unified inbox
//! - `inbox/`: Selection state machine and unread aggregation
//! - `backend/`: Platform API client
//! - `adapters/`: Local SQLite cache
//! - `sync/`: Background refresh and offline action queue
//! - `config/`: Configuration management
//! - `credentials/`: Encrypted session storage

mod adapters;
mod backend;
mod channels;
mod commands;
mod config;
mod credentials;
mod inbox;
mod services;
mod state;
mod sync;
mod types;

use std::sync::Arc;

use state::InboxManager;
use tauri::Manager;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    // Initialize tracing for logging
    // In debug builds, default to debug level for our crate
    // Can be overridden with RUST_LOG environment variable
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cfg!(debug_assertions) {
            EnvFilter::new("sparkmate_lib=debug,info")
        } else {
            EnvFilter::new("info")
        }
    });

    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting SparkMate ...");

    // Load config before anything reads it (API base URL, poll intervals)
    if let Err(e) = config::init_config() {
        tracing::warn!("Could not load config on startup: {}", e);
    }

    let client = Arc::new(
        backend::PlatformClient::new().expect("Failed to initialise platform API client"),
    );

    tauri::Builder::default()
        .manage(InboxManager::new(client))
        .setup(|app| {
            // Set app handle on the inbox manager for event emission
            let manager = app.state::<InboxManager>();
            let handle = app.handle().clone();
            tauri::async_runtime::block_on(async {
                manager.set_app_handle(handle).await;
            });

            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            // Session commands
            commands::sign_in,
            commands::restore_session,
            commands::sign_out,
            commands::current_user,
            // Inbox commands
            commands::inbox_snapshot,
            commands::total_unread,
            commands::inbox_selection,
            commands::open_conversation,
            commands::close_conversation,
            commands::mark_all_read,
            // Message commands
            commands::send_message,
            commands::delete_conversation,
            commands::set_draft,
            commands::get_draft,
            commands::list_notifications,
            // Sync commands
            commands::refresh_inbox,
            commands::app_focused,
            commands::set_online,
            commands::is_online,
            commands::has_pending_actions,
            // Config commands
            commands::get_app_config,
            commands::save_app_config,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
