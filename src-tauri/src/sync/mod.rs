//! Background refresh and offline support
//!
//! - [`engine`]: periodic polling of applicable channels plus refresh
//!   triggers (app focus, reconnect, manual), with frontend events on change.
//! - [`action_queue`]: actions issued while offline are persisted and
//!   replayed on reconnect.

pub mod action_queue;
pub mod engine;
