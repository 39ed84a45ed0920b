//! Tauri command modules
//!
//! Command handlers organized by domain. Commands are thin wrappers that
//! delegate to services for business logic.
//!
//! ## Module Organization
//!
//! - `session`: sign-in, sign-out, session restore
//! - `inbox`: snapshot, badge, selection transitions
//! - `messages`: send, delete, drafts, notifications
//! - `sync`: refresh triggers and connectivity
//! - `config`: application configuration

pub mod config;
pub mod inbox;
pub mod messages;
pub mod session;
pub mod sync;

// Re-export all commands for convenience
pub use config::*;
pub use inbox::*;
pub use messages::*;
pub use session::*;
pub use sync::*;
