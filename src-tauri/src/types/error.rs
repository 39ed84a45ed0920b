//! Unified error types for the application
//!
//! This module defines error types that:
//! - Are serializable for frontend consumption
//! - Provide actionable error messages
//! - Map internal errors to user-friendly variants

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Application error type for commands and services
///
/// All errors are serializable so they can be sent to the frontend.
/// Every channel-level failure is converted to one of these and shown as a
/// non-fatal notification; nothing here should reach a crash boundary.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum SparkError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Not signed in")]
    NoSession,

    #[error("Network error: {0}")]
    Network(String),

    #[error("You appear to be offline. The action has been queued and will be retried.")]
    Offline,

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Credential error: {0}")]
    Credential(String),

    #[error("Conversation not found: {0}")]
    ConversationNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Operation not supported: {0}")]
    NotSupported(String),

    #[error("Channel not available: {0}")]
    ChannelUnavailable(String),

    #[error("A message is already being sent in this conversation")]
    SendInFlight,

    #[error("A conversation is already open; close it before opening another")]
    SelectionBusy,

    #[error("{0}")]
    Other(String),
}

// Implement From for common error types

impl From<std::io::Error> for SparkError {
    fn from(err: std::io::Error) -> Self {
        SparkError::Io(err.to_string())
    }
}

impl From<toml::de::Error> for SparkError {
    fn from(err: toml::de::Error) -> Self {
        SparkError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for SparkError {
    fn from(err: serde_json::Error) -> Self {
        SparkError::Parse(err.to_string())
    }
}

impl From<rusqlite::Error> for SparkError {
    fn from(err: rusqlite::Error) -> Self {
        SparkError::Database(err.to_string())
    }
}

impl From<r2d2::Error> for SparkError {
    fn from(err: r2d2::Error) -> Self {
        SparkError::Database(err.to_string())
    }
}

impl From<reqwest::Error> for SparkError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() {
            SparkError::Offline
        } else {
            SparkError::Network(err.to_string())
        }
    }
}

impl From<String> for SparkError {
    fn from(err: String) -> Self {
        SparkError::Other(err)
    }
}

impl From<&str> for SparkError {
    fn from(err: &str) -> Self {
        SparkError::Other(err.to_string())
    }
}

impl SparkError {
    /// Whether the backend was unreachable, as opposed to rejecting the
    /// request. Unreachable errors are eligible for the offline action queue.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, SparkError::Offline | SparkError::Network(_))
    }
}

/// Result type alias using SparkError
pub type Result<T> = std::result::Result<T, SparkError>;
