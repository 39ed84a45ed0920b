//! Unread aggregation
//!
//! The badge value is derived on every read from the five adapters' current
//! counts; no sum of its own is cached anywhere, so it cannot drift from the
//! underlying channels. The local notification store is an optional
//! collaborator: absent means badges simply omit it, never an error.

use std::sync::Arc;

use crate::adapters::sqlite::notifications::NotificationStore;
use crate::channels::ChannelSet;
use crate::types::error::Result;
use crate::types::UserContext;

pub struct UnreadAggregator {
    notifications: Option<Arc<NotificationStore>>,
}

impl UnreadAggregator {
    pub fn new(notifications: Option<Arc<NotificationStore>>) -> Self {
        Self { notifications }
    }

    pub fn notifications(&self) -> Option<&NotificationStore> {
        self.notifications.as_deref()
    }

    /// The live badge value: the sum of each channel's current unread count.
    /// Non-applicable channels contribute zero.
    pub fn total_unread(&self, channels: &ChannelSet, ctx: &UserContext) -> Result<u64> {
        let mut total: u64 = 0;
        for adapter in channels.iter() {
            total += u64::from(adapter.snapshot(ctx)?.unread_count);
        }
        Ok(total)
    }

    /// Clear everything: each channel's own mark-all-read plus the local
    /// notification store. Idempotent end to end — a channel with nothing
    /// unread is a no-op, and so is a second whole-inbox call. Returns the
    /// number of conversations that had anything unread.
    pub async fn clear_all(&self, channels: &ChannelSet, ctx: &UserContext) -> Result<u32> {
        let mut cleared = 0;
        for adapter in channels.iter() {
            cleared += adapter.mark_all_read(ctx).await?;
        }
        if let Some(store) = &self.notifications {
            store.mark_all_read()?;
        }
        Ok(cleared)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::pool::create_test_pool;
    use crate::adapters::sqlite::{conversations, DbPool};
    use crate::backend::PlatformClient;
    use crate::types::{
        AdapterKind, ChannelKind, ConversationRef, ConversationSummary, UserRole,
    };
    use chrono::Utc;

    fn ctx() -> UserContext {
        UserContext {
            user_id: "u1".to_string(),
            display_name: "Priya".to_string(),
            role: UserRole::Electrician,
            team_id: Some("team-1".to_string()),
            in_college: false,
        }
    }

    fn channel_set() -> (ChannelSet, DbPool) {
        let pool = create_test_pool();
        let client = Arc::new(PlatformClient::new().unwrap());
        (ChannelSet::new(client, pool.clone()), pool)
    }

    fn seed(pool: &DbPool, kind: AdapterKind, tag: ChannelKind, id: &str, unread: u32) {
        conversations::replace_channel(
            pool,
            kind,
            &[ConversationSummary {
                conversation: ConversationRef::new(tag, id),
                title: id.to_string(),
                last_message_preview: None,
                last_activity: Utc::now(),
                unread_count: unread,
            }],
        )
        .unwrap();
    }

    #[test]
    fn total_is_live_sum_of_channel_counts() {
        let (channels, pool) = channel_set();
        let aggregator = UnreadAggregator::new(None);

        seed(&pool, AdapterKind::Job, ChannelKind::Job, "j1", 3);
        seed(&pool, AdapterKind::Team, ChannelKind::TeamChannel, "general", 2);
        seed(&pool, AdapterKind::Peer, ChannelKind::Peer, "p1", 1);
        // College has cached rows, but the user is outside the college
        // context, so its contribution must be zero, not an error.
        seed(&pool, AdapterKind::College, ChannelKind::College, "c1", 9);

        assert_eq!(aggregator.total_unread(&channels, &ctx()).unwrap(), 6);

        // The total tracks channel changes with no cached copy in between.
        conversations::mark_channel_read(&pool, AdapterKind::Job).unwrap();
        assert_eq!(aggregator.total_unread(&channels, &ctx()).unwrap(), 3);

        // Clearing the remaining channels drives the badge to zero, and each
        // channel's own count is zero too.
        conversations::mark_channel_read(&pool, AdapterKind::Team).unwrap();
        conversations::mark_channel_read(&pool, AdapterKind::Peer).unwrap();
        assert_eq!(aggregator.total_unread(&channels, &ctx()).unwrap(), 0);
        for kind in AdapterKind::ALL {
            let unread = channels.get(kind).snapshot(&ctx()).unwrap().unread_count;
            assert_eq!(unread, 0);
        }
    }

    #[test]
    fn total_is_zero_with_nothing_cached() {
        let (channels, _pool) = channel_set();
        let aggregator = UnreadAggregator::new(None);
        assert_eq!(aggregator.total_unread(&channels, &ctx()).unwrap(), 0);
    }

    #[tokio::test]
    async fn clear_all_with_nothing_unread_is_a_no_op() {
        let (channels, pool) = channel_set();
        let store = Arc::new(NotificationStore::new(pool.clone()));
        let aggregator = UnreadAggregator::new(Some(store.clone()));

        // No channel has anything unread, so no backend call is made and the
        // whole operation is a no-op that can be repeated freely.
        assert_eq!(aggregator.clear_all(&channels, &ctx()).await.unwrap(), 0);
        assert_eq!(aggregator.clear_all(&channels, &ctx()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn clear_all_clears_local_notifications() {
        let (channels, pool) = channel_set();
        let store = Arc::new(NotificationStore::new(pool.clone()));
        store.add("payment", "Invoice #88 paid").unwrap();

        let aggregator = UnreadAggregator::new(Some(store.clone()));
        aggregator.clear_all(&channels, &ctx()).await.unwrap();
        assert_eq!(store.unread_count().unwrap(), 0);
    }

    #[test]
    fn missing_notification_store_degrades_to_absent() {
        let aggregator = UnreadAggregator::new(None);
        assert!(aggregator.notifications().is_none());
    }
}
