//! Team chat: company channels plus direct messages. Only applicable when
//! the signed-in user belongs to a team.

use async_trait::async_trait;
use std::sync::Arc;

use super::{ChannelAdapter, ChannelCore};
use crate::adapters::sqlite::DbPool;
use crate::backend::PlatformClient;
use crate::types::error::{Result, SparkError};
use crate::types::{
    AdapterKind, ChannelKind, ChannelSnapshot, ChatMessage, ConversationRef, UserContext,
};

pub struct TeamChannel {
    core: ChannelCore,
}

impl TeamChannel {
    pub fn new(client: Arc<PlatformClient>, pool: DbPool) -> Self {
        Self {
            core: ChannelCore::new(AdapterKind::Team, client, pool),
        }
    }
}

#[async_trait]
impl ChannelAdapter for TeamChannel {
    fn kind(&self) -> AdapterKind {
        AdapterKind::Team
    }

    fn applicable(&self, ctx: &UserContext) -> bool {
        ctx.team_id.is_some()
    }

    fn snapshot(&self, ctx: &UserContext) -> Result<ChannelSnapshot> {
        if !self.applicable(ctx) {
            return Ok(ChannelSnapshot::empty());
        }
        self.core.snapshot()
    }

    async fn refresh(&self, ctx: &UserContext) -> Result<()> {
        if !self.applicable(ctx) {
            return Ok(());
        }
        self.core.refresh().await
    }

    async fn messages(
        &self,
        ctx: &UserContext,
        conversation: &ConversationRef,
    ) -> Result<Vec<ChatMessage>> {
        self.core.messages(ctx, conversation).await
    }

    async fn send(
        &self,
        ctx: &UserContext,
        conversation: &ConversationRef,
        body: &str,
    ) -> Result<ChatMessage> {
        self.core.send(ctx, conversation, body).await
    }

    async fn mark_conversation_read(
        &self,
        _ctx: &UserContext,
        conversation: &ConversationRef,
        up_to_message_id: Option<&str>,
    ) -> Result<bool> {
        self.core
            .mark_conversation_read(conversation, up_to_message_id)
            .await
    }

    fn mark_read_local(&self, conversation: &ConversationRef) -> Result<bool> {
        self.core.mark_read_local(conversation)
    }

    async fn mark_all_read(&self, ctx: &UserContext) -> Result<u32> {
        if !self.applicable(ctx) {
            return Ok(0);
        }
        self.core.mark_all_read().await
    }

    /// Direct messages can be deleted; shared team channels cannot.
    async fn delete_conversation(
        &self,
        _ctx: &UserContext,
        conversation: &ConversationRef,
    ) -> Result<()> {
        if conversation.channel == ChannelKind::TeamChannel {
            return Err(SparkError::NotSupported(
                "Team channels can only be removed by a team admin".to_string(),
            ));
        }
        self.core.delete_conversation(conversation).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::pool::create_test_pool;
    use crate::types::UserRole;

    fn solo_electrician() -> UserContext {
        UserContext {
            user_id: "u1".to_string(),
            display_name: "Jess".to_string(),
            role: UserRole::Electrician,
            team_id: None,
            in_college: false,
        }
    }

    fn adapter() -> TeamChannel {
        let client = Arc::new(PlatformClient::new().unwrap());
        TeamChannel::new(client, create_test_pool())
    }

    #[tokio::test]
    async fn not_applicable_without_team() {
        let team = adapter();
        let ctx = solo_electrician();

        assert!(!team.applicable(&ctx));
        // Empty snapshot, zero unread, and refresh is a no-op (no backend call).
        let snapshot = team.snapshot(&ctx).unwrap();
        assert!(snapshot.items.is_empty());
        assert_eq!(snapshot.unread_count, 0);
        team.refresh(&ctx).await.unwrap();
        assert_eq!(team.mark_all_read(&ctx).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn shared_channels_cannot_be_deleted() {
        let team = adapter();
        let ctx = solo_electrician();
        let channel = ConversationRef::new(ChannelKind::TeamChannel, "general");

        let err = team.delete_conversation(&ctx, &channel).await.unwrap_err();
        assert!(matches!(err, SparkError::NotSupported(_)));
    }
}
