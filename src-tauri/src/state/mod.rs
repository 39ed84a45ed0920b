//! Application state management
//!
//! Managed state for the Tauri application. Tauri-aware only where the
//! refresh engine needs an app handle for event emission.

mod inbox_manager;

pub use inbox_manager::{ActiveSession, InboxManager, SendGuard};
