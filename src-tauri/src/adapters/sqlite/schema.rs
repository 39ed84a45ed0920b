use rusqlite::Connection;

use crate::types::error::SparkError;

pub fn initialize_schema(conn: &Connection) -> Result<(), SparkError> {
    conn.execute_batch(
        "
        -- Conversation list cache, one row per conversation across all
        -- channels. The channel tag is the six-way string form.
        CREATE TABLE IF NOT EXISTS conversations (
            id                   TEXT NOT NULL,
            channel              TEXT NOT NULL,   -- 'job' | 'team-channel' | 'team-dm' | 'college' | 'peer' | 'admin'
            title                TEXT NOT NULL,
            last_message_preview TEXT,
            last_activity        INTEGER NOT NULL,   -- unix epoch ms
            unread_count         INTEGER NOT NULL DEFAULT 0,
            updated_at           INTEGER NOT NULL,
            PRIMARY KEY (channel, id)
        );

        CREATE INDEX IF NOT EXISTS idx_conversations_activity
            ON conversations(channel, last_activity DESC);

        -- Message cache per conversation
        CREATE TABLE IF NOT EXISTS messages (
            id              TEXT PRIMARY KEY,
            conversation_id TEXT NOT NULL,
            channel         TEXT NOT NULL,
            sender_id       TEXT NOT NULL,
            sender_name     TEXT NOT NULL,
            body            TEXT NOT NULL,
            created_at      INTEGER NOT NULL,   -- unix epoch ms
            read_at         INTEGER,            -- NULL while unread
            is_own          INTEGER NOT NULL DEFAULT 0,
            fetched_at      INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_messages_conversation
            ON messages(channel, conversation_id, created_at ASC);

        -- Local in-app notifications (optional collaborator)
        CREATE TABLE IF NOT EXISTS notifications (
            id          TEXT PRIMARY KEY,
            kind        TEXT NOT NULL,
            body        TEXT NOT NULL,
            created_at  INTEGER NOT NULL,
            read_at     INTEGER
        );

        CREATE INDEX IF NOT EXISTS idx_notifications_unread
            ON notifications(read_at) WHERE read_at IS NULL;

        -- Offline action queue
        CREATE TABLE IF NOT EXISTS queued_actions (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            action_type     TEXT NOT NULL,
            channel         TEXT,
            conversation_id TEXT,
            payload         TEXT NOT NULL,      -- JSON
            created_at      INTEGER NOT NULL,
            retry_count     INTEGER NOT NULL DEFAULT 0,
            last_error      TEXT,
            status          TEXT NOT NULL DEFAULT 'pending'
        );

        CREATE INDEX IF NOT EXISTS idx_queued_actions_status
            ON queued_actions(status, created_at ASC);
        ",
    )?;

    Ok(())
}
