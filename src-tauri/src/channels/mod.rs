//! Channel adapters
//!
//! Each of the five message domains (job, team, college, peer support, admin
//! support) is normalised behind the [`ChannelAdapter`] trait: a uniform
//! `{ items, is_loading, unread_count }` read contract plus the channel's own
//! send / mark-read / delete operations. The aggregator and the selection
//! machine never special-case a channel beyond picking the right adapter.

mod admin;
mod college;
mod job;
mod peer;
mod team;

pub use admin::AdminChannel;
pub use college::CollegeChannel;
pub use job::JobChannel;
pub use peer::PeerChannel;
pub use team::TeamChannel;

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::adapters::sqlite::{conversations, messages, DbPool};
use crate::backend::PlatformClient;
use crate::types::error::Result;
use crate::types::{
    AdapterKind, ChannelSnapshot, ChatMessage, ConversationRef, ConversationSummary, UserContext,
};

/// The uniform contract every channel adapter exposes to the inbox.
#[async_trait]
pub trait ChannelAdapter: Send + Sync {
    fn kind(&self) -> AdapterKind;

    /// Whether this channel applies to the given user context at all. A
    /// non-applicable channel contributes an empty snapshot and must not
    /// issue backend calls.
    fn applicable(&self, ctx: &UserContext) -> bool {
        let _ = ctx;
        true
    }

    /// Current cached view of the channel.
    fn snapshot(&self, ctx: &UserContext) -> Result<ChannelSnapshot>;

    /// Fetch the conversation list from the platform API into the cache.
    async fn refresh(&self, ctx: &UserContext) -> Result<()>;

    /// Fetch one conversation's messages into the cache and return them.
    async fn messages(
        &self,
        ctx: &UserContext,
        conversation: &ConversationRef,
    ) -> Result<Vec<ChatMessage>>;

    /// Send a message. The cache is only updated once the backend confirms.
    async fn send(
        &self,
        ctx: &UserContext,
        conversation: &ConversationRef,
        body: &str,
    ) -> Result<ChatMessage>;

    /// Mark one conversation read, backend first, then cache. Returns
    /// whether anything was unread (false makes a repeat call a no-op).
    async fn mark_conversation_read(
        &self,
        ctx: &UserContext,
        conversation: &ConversationRef,
        up_to_message_id: Option<&str>,
    ) -> Result<bool>;

    /// Cache-only mark-read, used when the backend is unreachable and the
    /// remote half has been queued for replay.
    fn mark_read_local(&self, conversation: &ConversationRef) -> Result<bool>;

    /// Mark the whole channel read. Idempotent: nothing unread is a no-op.
    async fn mark_all_read(&self, ctx: &UserContext) -> Result<u32>;

    /// Delete a conversation where the channel permits it.
    async fn delete_conversation(
        &self,
        ctx: &UserContext,
        conversation: &ConversationRef,
    ) -> Result<()>;
}

/// Shared plumbing for adapters backed by the platform API plus the local
/// cache. Channel structs wrap this and layer their own gating on top.
pub(crate) struct ChannelCore {
    kind: AdapterKind,
    client: Arc<PlatformClient>,
    pool: DbPool,
    loading: AtomicBool,
}

impl ChannelCore {
    pub(crate) fn new(kind: AdapterKind, client: Arc<PlatformClient>, pool: DbPool) -> Self {
        Self {
            kind,
            client,
            pool,
            loading: AtomicBool::new(false),
        }
    }

    pub(crate) fn snapshot(&self) -> Result<ChannelSnapshot> {
        Ok(ChannelSnapshot {
            items: conversations::fetch_channel(&self.pool, self.kind)?,
            is_loading: self.loading.load(Ordering::SeqCst),
            unread_count: conversations::channel_unread(&self.pool, self.kind)?,
        })
    }

    pub(crate) async fn refresh(&self) -> Result<()> {
        self.loading.store(true, Ordering::SeqCst);
        let fetched = self.client.list_conversations(self.kind).await;
        self.loading.store(false, Ordering::SeqCst);

        let items: Vec<ConversationSummary> = fetched?;
        conversations::replace_channel(&self.pool, self.kind, &items)
    }

    pub(crate) async fn messages(
        &self,
        ctx: &UserContext,
        conversation: &ConversationRef,
    ) -> Result<Vec<ChatMessage>> {
        let fetched = self
            .client
            .conversation_messages(conversation, &ctx.user_id)
            .await?;
        messages::replace_conversation_messages(&self.pool, conversation, &fetched)?;
        Ok(fetched)
    }

    pub(crate) async fn send(
        &self,
        ctx: &UserContext,
        conversation: &ConversationRef,
        body: &str,
    ) -> Result<ChatMessage> {
        let message = self
            .client
            .send_message(conversation, body, &ctx.user_id)
            .await?;
        messages::insert_message(&self.pool, &message)?;
        conversations::bump_for_message(&self.pool, &message)?;
        Ok(message)
    }

    pub(crate) async fn mark_conversation_read(
        &self,
        conversation: &ConversationRef,
        up_to_message_id: Option<&str>,
    ) -> Result<bool> {
        self.client.mark_read(conversation, up_to_message_id).await?;
        conversations::mark_conversation_read(&self.pool, conversation)
    }

    pub(crate) fn mark_read_local(&self, conversation: &ConversationRef) -> Result<bool> {
        conversations::mark_conversation_read(&self.pool, conversation)
    }

    pub(crate) async fn mark_all_read(&self) -> Result<u32> {
        if conversations::channel_unread(&self.pool, self.kind)? == 0 {
            return Ok(0);
        }
        self.client.mark_channel_read(self.kind).await?;
        conversations::mark_channel_read(&self.pool, self.kind)
    }

    pub(crate) async fn delete_conversation(&self, conversation: &ConversationRef) -> Result<()> {
        self.client.delete_conversation(conversation).await?;
        conversations::delete_conversation(&self.pool, conversation)
    }
}

/// The five adapters behind one inbox.
pub struct ChannelSet {
    pub job: JobChannel,
    pub team: TeamChannel,
    pub college: CollegeChannel,
    pub peer: PeerChannel,
    pub admin: AdminChannel,
}

impl ChannelSet {
    pub fn new(client: Arc<PlatformClient>, pool: DbPool) -> Self {
        Self {
            job: JobChannel::new(client.clone(), pool.clone()),
            team: TeamChannel::new(client.clone(), pool.clone()),
            college: CollegeChannel::new(client.clone(), pool.clone()),
            peer: PeerChannel::new(client.clone(), pool.clone()),
            admin: AdminChannel::new(client, pool),
        }
    }

    pub fn get(&self, kind: AdapterKind) -> &dyn ChannelAdapter {
        match kind {
            AdapterKind::Job => &self.job,
            AdapterKind::Team => &self.team,
            AdapterKind::College => &self.college,
            AdapterKind::Peer => &self.peer,
            AdapterKind::Admin => &self.admin,
        }
    }

    /// The adapter that owns a conversation's channel tag.
    pub fn for_conversation(&self, conversation: &ConversationRef) -> &dyn ChannelAdapter {
        self.get(conversation.channel.adapter())
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn ChannelAdapter> + '_ {
        AdapterKind::ALL.into_iter().map(|kind| self.get(kind))
    }
}
