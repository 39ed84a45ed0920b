//! Job conversations
//!
//! Conversations attached to a job posting, between the employer who posted
//! it and the electrician quoting or hired for it. The platform derives the
//! variant (employer side vs. electrician side) from the session token, so
//! the adapter is the same for both roles.

use async_trait::async_trait;
use std::sync::Arc;

use super::{ChannelAdapter, ChannelCore};
use crate::adapters::sqlite::DbPool;
use crate::backend::PlatformClient;
use crate::types::error::Result;
use crate::types::{AdapterKind, ChannelSnapshot, ChatMessage, ConversationRef, UserContext};

pub struct JobChannel {
    core: ChannelCore,
}

impl JobChannel {
    pub fn new(client: Arc<PlatformClient>, pool: DbPool) -> Self {
        Self {
            core: ChannelCore::new(AdapterKind::Job, client, pool),
        }
    }
}

#[async_trait]
impl ChannelAdapter for JobChannel {
    fn kind(&self) -> AdapterKind {
        AdapterKind::Job
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
        conversation: &ConversationRef,
    ) -> Result<()> {
        self.core.delete_conversation(conversation).await
    }
}
