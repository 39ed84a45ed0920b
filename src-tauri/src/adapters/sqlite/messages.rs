use chrono::{DateTime, Utc};
use rusqlite::params;

use super::DbPool;
use crate::types::error::Result;
use crate::types::{ChannelKind, ChatMessage, ConversationRef};

fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<ChatMessage> {
    let channel_str: String = row.get(2)?;
    let channel = ChannelKind::from_str(&channel_str).unwrap_or(ChannelKind::Job);
    let created_ms: i64 = row.get(6)?;
    let read_ms: Option<i64> = row.get(7)?;
    Ok(ChatMessage {
        id: row.get(0)?,
        conversation: ConversationRef {
            channel,
            id: row.get(1)?,
        },
        sender_id: row.get(3)?,
        sender_name: row.get(4)?,
        body: row.get(5)?,
        created_at: DateTime::<Utc>::from_timestamp_millis(created_ms)
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH),
        read_at: read_ms.and_then(DateTime::<Utc>::from_timestamp_millis),
        is_own: row.get::<_, i64>(8)? != 0,
    })
}

/// Replace the cached messages of one conversation with a fresh server
/// result (the server is the source of truth for history).
pub fn replace_conversation_messages(
    pool: &DbPool,
    conversation: &ConversationRef,
    messages: &[ChatMessage],
) -> Result<()> {
    let conn = pool.get()?;
    let tx = conn.unchecked_transaction()?;
    let now = Utc::now().timestamp_millis();

    tx.execute(
        "DELETE FROM messages WHERE channel = ?1 AND conversation_id = ?2",
        params![conversation.channel.as_str(), conversation.id],
    )?;

    for message in messages {
        tx.execute(
            "INSERT OR REPLACE INTO messages
                (id, conversation_id, channel, sender_id, sender_name, body,
                 created_at, read_at, is_own, fetched_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                message.id,
                conversation.id,
                conversation.channel.as_str(),
                message.sender_id,
                message.sender_name,
                message.body,
                message.created_at.timestamp_millis(),
                message.read_at.map(|t| t.timestamp_millis()),
                message.is_own as i64,
                now,
            ],
        )?;
    }

    tx.commit()?;
    Ok(())
}

/// Append a single message (a confirmed send, or a realtime arrival).
pub fn insert_message(pool: &DbPool, message: &ChatMessage) -> Result<()> {
    let conn = pool.get()?;
    conn.execute(
        "INSERT OR IGNORE INTO messages
            (id, conversation_id, channel, sender_id, sender_name, body,
             created_at, read_at, is_own, fetched_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            message.id,
            message.conversation.id,
            message.conversation.channel.as_str(),
            message.sender_id,
            message.sender_name,
            message.body,
            message.created_at.timestamp_millis(),
            message.read_at.map(|t| t.timestamp_millis()),
            message.is_own as i64,
            Utc::now().timestamp_millis(),
        ],
    )?;
    Ok(())
}

/// Cached messages of one conversation, oldest first.
pub fn fetch_conversation_messages(
    pool: &DbPool,
    conversation: &ConversationRef,
) -> Result<Vec<ChatMessage>> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare(
        "SELECT id, conversation_id, channel, sender_id, sender_name, body,
                created_at, read_at, is_own
         FROM messages WHERE channel = ?1 AND conversation_id = ?2
         ORDER BY created_at ASC",
    )?;

    let rows = stmt.query_map(
        params![conversation.channel.as_str(), conversation.id],
        row_to_message,
    )?;
    let mut messages = Vec::new();
    for row in rows {
        messages.push(row?);
    }
    Ok(messages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::pool::create_test_pool;

    fn message(id: &str, conversation: &ConversationRef, is_own: bool) -> ChatMessage {
        ChatMessage {
            id: id.to_string(),
            conversation: conversation.clone(),
            sender_id: if is_own { "me" } else { "them" }.to_string(),
            sender_name: if is_own { "Me" } else { "Them" }.to_string(),
            body: format!("message {}", id),
            created_at: Utc::now(),
            read_at: None,
            is_own,
        }
    }

    #[test]
    fn replace_and_fetch_messages() {
        let pool = create_test_pool();
        let conversation = ConversationRef::new(ChannelKind::Job, "j1");

        replace_conversation_messages(
            &pool,
            &conversation,
            &[
                message("m1", &conversation, false),
                message("m2", &conversation, true),
            ],
        )
        .unwrap();

        let messages = fetch_conversation_messages(&pool, &conversation).unwrap();
        assert_eq!(messages.len(), 2);
        assert!(!messages[0].is_own);
        assert!(messages[1].is_own);
    }

    #[test]
    fn insert_is_idempotent_by_id() {
        let pool = create_test_pool();
        let conversation = ConversationRef::new(ChannelKind::Peer, "p1");
        let msg = message("m1", &conversation, false);

        insert_message(&pool, &msg).unwrap();
        insert_message(&pool, &msg).unwrap();

        assert_eq!(fetch_conversation_messages(&pool, &conversation).unwrap().len(), 1);
    }

    #[test]
    fn conversations_do_not_leak_into_each_other() {
        let pool = create_test_pool();
        let a = ConversationRef::new(ChannelKind::Job, "j1");
        let b = ConversationRef::new(ChannelKind::Job, "j2");

        insert_message(&pool, &message("m1", &a, false)).unwrap();
        insert_message(&pool, &message("m2", &b, false)).unwrap();

        assert_eq!(fetch_conversation_messages(&pool, &a).unwrap().len(), 1);
        assert_eq!(fetch_conversation_messages(&pool, &b).unwrap().len(), 1);
    }
}
