use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};

use super::DbPool;
use crate::types::error::{Result, SparkError};
use crate::types::{AdapterKind, ChannelKind, ChatMessage, ConversationRef, ConversationSummary};

/// SQL `IN (...)` clause for the channel tags owned by one adapter. Tags come
/// from a closed enum, so embedding them directly is safe.
fn tag_filter(kind: AdapterKind) -> String {
    let tags: Vec<String> = kind
        .tags()
        .iter()
        .map(|t| format!("'{}'", t.as_str()))
        .collect();
    format!("channel IN ({})", tags.join(", "))
}

fn row_to_summary(row: &rusqlite::Row<'_>) -> rusqlite::Result<ConversationSummary> {
    let channel_str: String = row.get(1)?;
    let channel = ChannelKind::from_str(&channel_str).unwrap_or(ChannelKind::Job);
    let last_activity_ms: i64 = row.get(4)?;
    Ok(ConversationSummary {
        conversation: ConversationRef {
            channel,
            id: row.get(0)?,
        },
        title: row.get(2)?,
        last_message_preview: row.get(3)?,
        last_activity: DateTime::<Utc>::from_timestamp_millis(last_activity_ms)
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH),
        unread_count: row.get(5)?,
    })
}

/// Replace an adapter's cached conversation list with a fresh server result.
///
/// Messages of conversations that disappeared from the server are dropped
/// too; messages of surviving conversations are left alone.
pub fn replace_channel(
    pool: &DbPool,
    kind: AdapterKind,
    items: &[ConversationSummary],
) -> Result<()> {
    let conn = pool.get()?;
    let tx = conn.unchecked_transaction()?;
    let filter = tag_filter(kind);
    let now = Utc::now().timestamp_millis();

    let ids_json = serde_json::to_string(
        &items
            .iter()
            .map(|i| i.conversation.id.as_str())
            .collect::<Vec<_>>(),
    )?;

    tx.execute(
        &format!(
            "DELETE FROM messages WHERE {} AND conversation_id NOT IN
             (SELECT value FROM json_each(?1))",
            filter
        ),
        params![ids_json],
    )?;
    tx.execute(&format!("DELETE FROM conversations WHERE {}", filter), [])?;

    for item in items {
        tx.execute(
            "INSERT INTO conversations
                (id, channel, title, last_message_preview, last_activity, unread_count, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                item.conversation.id,
                item.conversation.channel.as_str(),
                item.title,
                item.last_message_preview,
                item.last_activity.timestamp_millis(),
                item.unread_count,
                now,
            ],
        )?;
    }

    tx.commit()?;
    Ok(())
}

/// Cached conversation list for one adapter, newest activity first.
pub fn fetch_channel(pool: &DbPool, kind: AdapterKind) -> Result<Vec<ConversationSummary>> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare(&format!(
        "SELECT id, channel, title, last_message_preview, last_activity, unread_count
         FROM conversations WHERE {}
         ORDER BY last_activity DESC",
        tag_filter(kind)
    ))?;

    let rows = stmt.query_map([], row_to_summary)?;
    let mut items = Vec::new();
    for row in rows {
        items.push(row?);
    }
    Ok(items)
}

/// Look up one cached conversation.
pub fn get(pool: &DbPool, conversation: &ConversationRef) -> Result<Option<ConversationSummary>> {
    let conn = pool.get()?;
    conn.query_row(
        "SELECT id, channel, title, last_message_preview, last_activity, unread_count
         FROM conversations WHERE channel = ?1 AND id = ?2",
        params![conversation.channel.as_str(), conversation.id],
        row_to_summary,
    )
    .optional()
    .map_err(SparkError::from)
}

/// Sum of unread counts across one adapter's conversations.
pub fn channel_unread(pool: &DbPool, kind: AdapterKind) -> Result<u32> {
    let conn = pool.get()?;
    let total: i64 = conn.query_row(
        &format!(
            "SELECT COALESCE(SUM(unread_count), 0) FROM conversations WHERE {}",
            tag_filter(kind)
        ),
        [],
        |row| row.get(0),
    )?;
    Ok(total.max(0) as u32)
}

/// Zero the unread count of one conversation and stamp its unread incoming
/// messages as read. Returns whether anything actually changed, so callers
/// can treat a repeat call as the no-op it is.
pub fn mark_conversation_read(pool: &DbPool, conversation: &ConversationRef) -> Result<bool> {
    let conn = pool.get()?;
    let tx = conn.unchecked_transaction()?;
    let now = Utc::now().timestamp_millis();

    let changed = tx.execute(
        "UPDATE conversations SET unread_count = 0, updated_at = ?3
         WHERE channel = ?1 AND id = ?2 AND unread_count > 0",
        params![conversation.channel.as_str(), conversation.id, now],
    )?;

    tx.execute(
        "UPDATE messages SET read_at = ?3
         WHERE channel = ?1 AND conversation_id = ?2 AND read_at IS NULL AND is_own = 0",
        params![conversation.channel.as_str(), conversation.id, now],
    )?;

    tx.commit()?;
    Ok(changed > 0)
}

/// Zero the unread count of every conversation in one adapter. Idempotent;
/// returns the number of conversations that had anything unread.
pub fn mark_channel_read(pool: &DbPool, kind: AdapterKind) -> Result<u32> {
    let conn = pool.get()?;
    let tx = conn.unchecked_transaction()?;
    let now = Utc::now().timestamp_millis();
    let filter = tag_filter(kind);

    let changed = tx.execute(
        &format!(
            "UPDATE conversations SET unread_count = 0, updated_at = ?1
             WHERE {} AND unread_count > 0",
            filter
        ),
        params![now],
    )?;

    tx.execute(
        &format!(
            "UPDATE messages SET read_at = ?1
             WHERE {} AND read_at IS NULL AND is_own = 0",
            filter
        ),
        params![now],
    )?;

    tx.commit()?;
    Ok(changed as u32)
}

/// Drop one conversation and its cached messages.
pub fn delete_conversation(pool: &DbPool, conversation: &ConversationRef) -> Result<()> {
    let conn = pool.get()?;
    let tx = conn.unchecked_transaction()?;

    tx.execute(
        "DELETE FROM messages WHERE channel = ?1 AND conversation_id = ?2",
        params![conversation.channel.as_str(), conversation.id],
    )?;
    tx.execute(
        "DELETE FROM conversations WHERE channel = ?1 AND id = ?2",
        params![conversation.channel.as_str(), conversation.id],
    )?;

    tx.commit()?;
    Ok(())
}

/// Fold a newly arrived message into the conversation row: bump the preview
/// and activity timestamp, and count it as unread unless the user sent it.
pub fn bump_for_message(pool: &DbPool, message: &ChatMessage) -> Result<()> {
    let conn = pool.get()?;
    let preview: String = message.body.chars().take(120).collect();
    let unread_delta = if message.is_own { 0 } else { 1 };

    conn.execute(
        "UPDATE conversations SET
            last_message_preview = ?3,
            last_activity = ?4,
            unread_count = unread_count + ?5,
            updated_at = ?6
         WHERE channel = ?1 AND id = ?2",
        params![
            message.conversation.channel.as_str(),
            message.conversation.id,
            preview,
            message.created_at.timestamp_millis(),
            unread_delta,
            Utc::now().timestamp_millis(),
        ],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::pool::create_test_pool;

    fn summary(channel: ChannelKind, id: &str, unread: u32) -> ConversationSummary {
        ConversationSummary {
            conversation: ConversationRef::new(channel, id),
            title: format!("Conversation {}", id),
            last_message_preview: Some("hello".to_string()),
            last_activity: Utc::now(),
            unread_count: unread,
        }
    }

    #[test]
    fn replace_and_fetch_channel() {
        let pool = create_test_pool();
        replace_channel(
            &pool,
            AdapterKind::Job,
            &[
                summary(ChannelKind::Job, "j1", 2),
                summary(ChannelKind::Job, "j2", 0),
            ],
        )
        .unwrap();

        let items = fetch_channel(&pool, AdapterKind::Job).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(channel_unread(&pool, AdapterKind::Job).unwrap(), 2);

        // A later refresh fully replaces the previous list.
        replace_channel(&pool, AdapterKind::Job, &[summary(ChannelKind::Job, "j3", 1)]).unwrap();
        let items = fetch_channel(&pool, AdapterKind::Job).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].conversation.id, "j3");
    }

    #[test]
    fn team_adapter_owns_both_tags() {
        let pool = create_test_pool();
        replace_channel(
            &pool,
            AdapterKind::Team,
            &[
                summary(ChannelKind::TeamChannel, "general", 3),
                summary(ChannelKind::TeamDm, "dm-42", 1),
            ],
        )
        .unwrap();

        assert_eq!(fetch_channel(&pool, AdapterKind::Team).unwrap().len(), 2);
        assert_eq!(channel_unread(&pool, AdapterKind::Team).unwrap(), 4);
        // Other adapters see nothing.
        assert_eq!(channel_unread(&pool, AdapterKind::Job).unwrap(), 0);
    }

    #[test]
    fn mark_conversation_read_is_idempotent() {
        let pool = create_test_pool();
        replace_channel(&pool, AdapterKind::Peer, &[summary(ChannelKind::Peer, "p1", 5)]).unwrap();

        let conversation = ConversationRef::new(ChannelKind::Peer, "p1");
        assert!(mark_conversation_read(&pool, &conversation).unwrap());
        assert_eq!(channel_unread(&pool, AdapterKind::Peer).unwrap(), 0);
        // Second call changes nothing and is not an error.
        assert!(!mark_conversation_read(&pool, &conversation).unwrap());
    }

    #[test]
    fn mark_channel_read_clears_all_conversations() {
        let pool = create_test_pool();
        replace_channel(
            &pool,
            AdapterKind::Job,
            &[
                summary(ChannelKind::Job, "j1", 2),
                summary(ChannelKind::Job, "j2", 4),
            ],
        )
        .unwrap();

        assert_eq!(mark_channel_read(&pool, AdapterKind::Job).unwrap(), 2);
        assert_eq!(channel_unread(&pool, AdapterKind::Job).unwrap(), 0);
        assert_eq!(mark_channel_read(&pool, AdapterKind::Job).unwrap(), 0);
    }

    #[test]
    fn delete_conversation_removes_row() {
        let pool = create_test_pool();
        replace_channel(&pool, AdapterKind::Job, &[summary(ChannelKind::Job, "j1", 0)]).unwrap();

        let conversation = ConversationRef::new(ChannelKind::Job, "j1");
        delete_conversation(&pool, &conversation).unwrap();
        assert!(get(&pool, &conversation).unwrap().is_none());
    }

    #[test]
    fn bump_for_incoming_message_increments_unread() {
        let pool = create_test_pool();
        replace_channel(&pool, AdapterKind::Admin, &[summary(ChannelKind::Admin, "a1", 0)]).unwrap();

        let message = ChatMessage {
            id: "m1".to_string(),
            conversation: ConversationRef::new(ChannelKind::Admin, "a1"),
            sender_id: "staff-1".to_string(),
            sender_name: "Platform Support".to_string(),
            body: "Your certificate question has been answered".to_string(),
            created_at: Utc::now(),
            read_at: None,
            is_own: false,
        };
        bump_for_message(&pool, &message).unwrap();
        assert_eq!(channel_unread(&pool, AdapterKind::Admin).unwrap(), 1);

        let own = ChatMessage {
            is_own: true,
            id: "m2".to_string(),
            ..message
        };
        bump_for_message(&pool, &own).unwrap();
        assert_eq!(channel_unread(&pool, AdapterKind::Admin).unwrap(), 1);
    }
}
