//! Peer support: one-to-one conversations between tradespeople.

use async_trait::async_trait;
use std::sync::Arc;

use super::{ChannelAdapter, ChannelCore};
use crate::adapters::sqlite::DbPool;
use crate::backend::PlatformClient;
use crate::types::error::Result;
use crate::types::{AdapterKind, ChannelSnapshot, ChatMessage, ConversationRef, UserContext};

pub struct PeerChannel {
    core: ChannelCore,
}

impl PeerChannel {
    pub fn new(client: Arc<PlatformClient>, pool: DbPool) -> Self {
        Self {
            core: ChannelCore::new(AdapterKind::Peer, client, pool),
        }
    }
}

#[async_trait]
impl ChannelAdapter for PeerChannel {
    fn kind(&self) -> AdapterKind {
        AdapterKind::Peer
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
