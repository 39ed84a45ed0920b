//! Business logic services
//!
//! Tauri-agnostic logic the command layer delegates to. Services route
//! inbox operations to the right channel adapter and apply the offline
//! queue fallback; they hold no channel-specific behaviour of their own.

pub mod inbox_service;
pub mod message_service;
