//! Admin support: a single thread per user with platform staff. The thread
//! is created server-side on first contact and cannot be deleted.

use async_trait::async_trait;
use std::sync::Arc;

use super::{ChannelAdapter, ChannelCore};
use crate::adapters::sqlite::DbPool;
use crate::backend::PlatformClient;
use crate::types::error::{Result, SparkError};
use crate::types::{AdapterKind, ChannelSnapshot, ChatMessage, ConversationRef, UserContext};

pub struct AdminChannel {
    core: ChannelCore,
}

impl AdminChannel {
    pub fn new(client: Arc<PlatformClient>, pool: DbPool) -> Self {
        Self {
            core: ChannelCore::new(AdapterKind::Admin, client, pool),
        }
    }
}

#[async_trait]
impl ChannelAdapter for AdminChannel {
    fn kind(&self) -> AdapterKind {
        AdapterKind::Admin
    }

    fn snapshot(&self, _ctx: &UserContext) -> Result<ChannelSnapshot> {
        self.core.snapshot()
    }

    async fn refresh(&self, _ctx: &UserContext) -> Result<()> {
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

    async fn mark_all_read(&self, _ctx: &UserContext) -> Result<u32> {
        self.core.mark_all_read().await
    }

    async fn delete_conversation(
        &self,
        _ctx: &UserContext,
        _conversation: &ConversationRef,
    ) -> Result<()> {
        Err(SparkError::NotSupported(
            "The support thread cannot be deleted".to_string(),
        ))
    }
}
