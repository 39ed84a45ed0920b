//! College cohort chat
//!
//! A shared chat room per college cohort. Fetching is gated on the college
//! context: outside it the adapter issues no backend calls at all (the
//! endpoint would reject them), it does not merely hide the tab.

use async_trait::async_trait;
use std::sync::Arc;

use super::{ChannelAdapter, ChannelCore};
use crate::adapters::sqlite::DbPool;
use crate::backend::PlatformClient;
use crate::types::error::{Result, SparkError};
use crate::types::{AdapterKind, ChannelSnapshot, ChatMessage, ConversationRef, UserContext};

pub struct CollegeChannel {
    core: ChannelCore,
}

impl CollegeChannel {
    pub fn new(client: Arc<PlatformClient>, pool: DbPool) -> Self {
        Self {
            core: ChannelCore::new(AdapterKind::College, client, pool),
        }
    }

    fn require_college(ctx: &UserContext) -> Result<()> {
        if ctx.in_college {
            Ok(())
        } else {
            Err(SparkError::ChannelUnavailable(
                "College chat is only available while enrolled".to_string(),
            ))
        }
    }
}

#[async_trait]
impl ChannelAdapter for CollegeChannel {
    fn kind(&self) -> AdapterKind {
        AdapterKind::College
    }

    fn applicable(&self, ctx: &UserContext) -> bool {
        ctx.in_college
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
        Self::require_college(ctx)?;
        self.core.messages(ctx, conversation).await
    }

    async fn send(
        &self,
        ctx: &UserContext,
        conversation: &ConversationRef,
        body: &str,
    ) -> Result<ChatMessage> {
        Self::require_college(ctx)?;
        self.core.send(ctx, conversation, body).await
    }

    async fn mark_conversation_read(
        &self,
        ctx: &UserContext,
        conversation: &ConversationRef,
        up_to_message_id: Option<&str>,
    ) -> Result<bool> {
        Self::require_college(ctx)?;
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

    async fn delete_conversation(
        &self,
        _ctx: &UserContext,
        _conversation: &ConversationRef,
    ) -> Result<()> {
        Err(SparkError::NotSupported(
            "The cohort room cannot be deleted".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::pool::create_test_pool;
    use crate::types::{ChannelKind, UserRole};

    fn apprentice(in_college: bool) -> UserContext {
        UserContext {
            user_id: "u2".to_string(),
            display_name: "Sam".to_string(),
            role: UserRole::Apprentice,
            team_id: None,
            in_college,
        }
    }

    fn adapter() -> CollegeChannel {
        let client = Arc::new(PlatformClient::new().unwrap());
        CollegeChannel::new(client, create_test_pool())
    }

    #[tokio::test]
    async fn outside_college_no_fetch_and_empty_snapshot() {
        let college = adapter();
        let ctx = apprentice(false);

        assert!(!college.applicable(&ctx));
        // refresh must return without touching the backend
        college.refresh(&ctx).await.unwrap();
        let snapshot = college.snapshot(&ctx).unwrap();
        assert!(snapshot.items.is_empty());
        assert_eq!(snapshot.unread_count, 0);
    }

    #[tokio::test]
    async fn operations_require_college_context() {
        let college = adapter();
        let ctx = apprentice(false);
        let room = ConversationRef::new(ChannelKind::College, "cohort-2026");

        let err = college.send(&ctx, &room, "hello").await.unwrap_err();
        assert!(matches!(err, SparkError::ChannelUnavailable(_)));
    }

    #[tokio::test]
    async fn room_cannot_be_deleted() {
        let college = adapter();
        let ctx = apprentice(true);
        let room = ConversationRef::new(ChannelKind::College, "cohort-2026");

        let err = college.delete_conversation(&ctx, &room).await.unwrap_err();
        assert!(matches!(err, SparkError::NotSupported(_)));
    }
}
