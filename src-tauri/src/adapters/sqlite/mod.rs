//! Local SQLite cache
//!
//! The cache holds conversations, messages, notifications, and the offline
//! action queue for one signed-in user. It is a cache of server state, not
//! the source of truth; every table can be rebuilt from the platform API.

pub mod conversations;
pub mod messages;
pub mod notifications;
pub mod pool;
pub mod queue;
pub mod schema;

pub use pool::DbPool;
