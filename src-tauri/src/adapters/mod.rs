//! Local persistence adapters.
//!
//! Currently the only adapter is the SQLite cache of server state.

pub mod sqlite;
