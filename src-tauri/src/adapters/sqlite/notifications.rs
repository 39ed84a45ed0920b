//! Local in-app notification store
//!
//! Holds notices that are not tied to a single channel (payment received,
//! quote accepted, system announcements). The inbox treats this store as an
//! optional collaborator: when it is absent the badge simply omits it.

use chrono::{DateTime, Utc};
use rusqlite::params;
use uuid::Uuid;

use super::DbPool;
use crate::types::error::Result;
use crate::types::Notification;

pub struct NotificationStore {
    pool: DbPool,
}

impl NotificationStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn add(&self, kind: &str, body: &str) -> Result<Notification> {
        let notification = Notification {
            id: Uuid::new_v4().to_string(),
            kind: kind.to_string(),
            body: body.to_string(),
            created_at: Utc::now(),
            read_at: None,
        };

        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO notifications (id, kind, body, created_at, read_at)
             VALUES (?1, ?2, ?3, ?4, NULL)",
            params![
                notification.id,
                notification.kind,
                notification.body,
                notification.created_at.timestamp_millis(),
            ],
        )?;
        Ok(notification)
    }

    /// Newest first.
    pub fn list(&self, limit: u32) -> Result<Vec<Notification>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT id, kind, body, created_at, read_at
             FROM notifications ORDER BY created_at DESC LIMIT ?1",
        )?;

        let rows = stmt.query_map(params![limit], |row| {
            let created_ms: i64 = row.get(3)?;
            let read_ms: Option<i64> = row.get(4)?;
            Ok(Notification {
                id: row.get(0)?,
                kind: row.get(1)?,
                body: row.get(2)?,
                created_at: DateTime::<Utc>::from_timestamp_millis(created_ms)
                    .unwrap_or(DateTime::<Utc>::UNIX_EPOCH),
                read_at: read_ms.and_then(DateTime::<Utc>::from_timestamp_millis),
            })
        })?;

        let mut notifications = Vec::new();
        for row in rows {
            notifications.push(row?);
        }
        Ok(notifications)
    }

    pub fn unread_count(&self) -> Result<u32> {
        let conn = self.pool.get()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM notifications WHERE read_at IS NULL",
            [],
            |row| row.get(0),
        )?;
        Ok(count.max(0) as u32)
    }

    /// Idempotent: marking when nothing is unread is a no-op.
    pub fn mark_all_read(&self) -> Result<u32> {
        let conn = self.pool.get()?;
        let changed = conn.execute(
            "UPDATE notifications SET read_at = ?1 WHERE read_at IS NULL",
            params![Utc::now().timestamp_millis()],
        )?;
        Ok(changed as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::pool::create_test_pool;

    #[test]
    fn add_list_and_clear() {
        let store = NotificationStore::new(create_test_pool());
        store.add("quote", "Quote accepted for rewire at 12 Oak Lane").unwrap();
        store.add("payment", "Invoice #104 paid").unwrap();

        assert_eq!(store.unread_count().unwrap(), 2);
        assert_eq!(store.list(10).unwrap().len(), 2);

        assert_eq!(store.mark_all_read().unwrap(), 2);
        assert_eq!(store.unread_count().unwrap(), 0);
        // Second clear is a no-op, not an error.
        assert_eq!(store.mark_all_read().unwrap(), 0);
    }
}
