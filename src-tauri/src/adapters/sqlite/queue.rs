//! Queued-action records
//!
//! Row-level storage for the offline action queue. The replay policy lives
//! in [`crate::sync::action_queue`]; this module only persists records.

use chrono::{DateTime, Utc};
use rusqlite::params;

use super::DbPool;
use crate::types::error::Result;

/// A queued action as stored in the database.
#[derive(Debug, Clone)]
pub struct QueuedActionRecord {
    pub id: i64,
    pub action_type: String,
    pub channel: Option<String>,
    pub conversation_id: Option<String>,
    pub payload: String,
    pub created_at: DateTime<Utc>,
    pub retry_count: u32,
    pub last_error: Option<String>,
    pub status: String,
}

pub fn queue_action(
    pool: &DbPool,
    action_type: &str,
    channel: Option<&str>,
    conversation_id: Option<&str>,
    payload: &str,
) -> Result<i64> {
    let conn = pool.get()?;
    conn.execute(
        "INSERT INTO queued_actions
            (action_type, channel, conversation_id, payload, created_at, retry_count, status)
         VALUES (?1, ?2, ?3, ?4, ?5, 0, 'pending')",
        params![
            action_type,
            channel,
            conversation_id,
            payload,
            Utc::now().timestamp_millis(),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_pending_actions(pool: &DbPool) -> Result<Vec<QueuedActionRecord>> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare(
        "SELECT id, action_type, channel, conversation_id, payload,
                created_at, retry_count, last_error, status
         FROM queued_actions WHERE status = 'pending'
         ORDER BY created_at ASC",
    )?;

    let rows = stmt.query_map([], |row| {
        let created_ms: i64 = row.get(5)?;
        Ok(QueuedActionRecord {
            id: row.get(0)?,
            action_type: row.get(1)?,
            channel: row.get(2)?,
            conversation_id: row.get(3)?,
            payload: row.get(4)?,
            created_at: DateTime::<Utc>::from_timestamp_millis(created_ms)
                .unwrap_or(DateTime::<Utc>::UNIX_EPOCH),
            retry_count: row.get(6)?,
            last_error: row.get(7)?,
            status: row.get(8)?,
        })
    })?;

    let mut records = Vec::new();
    for row in rows {
        records.push(row?);
    }
    Ok(records)
}

/// Set status and error, incrementing the retry counter.
pub fn update_action_status(
    pool: &DbPool,
    id: i64,
    status: &str,
    error: Option<&str>,
) -> Result<()> {
    let conn = pool.get()?;
    conn.execute(
        "UPDATE queued_actions
         SET status = ?2, last_error = ?3, retry_count = retry_count + 1
         WHERE id = ?1",
        params![id, status, error],
    )?;
    Ok(())
}

/// Set status without touching the retry counter (processing/completed
/// transitions are not retries).
pub fn update_action_status_no_retry_increment(
    pool: &DbPool,
    id: i64,
    status: &str,
) -> Result<()> {
    let conn = pool.get()?;
    conn.execute(
        "UPDATE queued_actions SET status = ?2 WHERE id = ?1",
        params![id, status],
    )?;
    Ok(())
}

pub fn delete_completed_actions(pool: &DbPool) -> Result<u64> {
    let conn = pool.get()?;
    let deleted = conn.execute("DELETE FROM queued_actions WHERE status = 'completed'", [])?;
    Ok(deleted as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::pool::create_test_pool;

    #[test]
    fn queue_and_fetch_pending() {
        let pool = create_test_pool();
        let id = queue_action(&pool, "send", Some("job"), Some("j1"), "{}").unwrap();

        let pending = get_pending_actions(&pool).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, id);
        assert_eq!(pending[0].retry_count, 0);
    }

    #[test]
    fn status_transitions() {
        let pool = create_test_pool();
        let id = queue_action(&pool, "mark_read", Some("peer"), Some("p1"), "{}").unwrap();

        update_action_status_no_retry_increment(&pool, id, "processing").unwrap();
        assert!(get_pending_actions(&pool).unwrap().is_empty());

        update_action_status(&pool, id, "failed", Some("network down")).unwrap();
        update_action_status(&pool, id, "pending", None).unwrap();
        let pending = get_pending_actions(&pool).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].retry_count, 2);

        update_action_status_no_retry_increment(&pool, id, "completed").unwrap();
        assert_eq!(delete_completed_actions(&pool).unwrap(), 1);
    }
}
