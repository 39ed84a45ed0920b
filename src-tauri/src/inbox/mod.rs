//! The unified inbox
//!
//! Pure state shared by all five channels: which single conversation is open
//! ([`selection`]) and the aggregate unread badge ([`unread`]). Everything
//! here is synchronous and side-effect free; the service layer performs the
//! backend calls these states call for.

pub mod selection;
pub mod unread;

pub use selection::{LoadOutcome, Selection, SelectionState};
pub use unread::UnreadAggregator;
