use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use std::path::Path;

use super::schema;
use crate::types::error::SparkError;

pub type DbPool = Pool<SqliteConnectionManager>;

pub fn create_pool(db_path: &Path) -> Result<DbPool, SparkError> {
    let manager = SqliteConnectionManager::file(db_path);

    let pool = Pool::builder().max_size(8).build(manager)?;

    let conn = pool.get()?;
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA synchronous = NORMAL;
         PRAGMA cache_size = -8000;
         PRAGMA temp_store = MEMORY;
         PRAGMA foreign_keys = ON;",
    )?;

    schema::initialize_schema(&conn)?;

    Ok(pool)
}

#[cfg(test)]
pub fn create_test_pool() -> DbPool {
    let dir = tempfile::tempdir().expect("tempdir");
    // Leak the tempdir so the database file outlives the setup function.
    let path = Box::leak(Box::new(dir)).path().join("cache.db");
    create_pool(&path).expect("test pool")
}
