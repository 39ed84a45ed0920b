//! Action queue for offline support
//!
//! Queues user actions locally when the backend is unreachable and replays
//! them on reconnect. Mark-read actions for the same conversation are merged
//! so a flaky connection does not pile up duplicates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::adapters::sqlite::{queue as queue_db, DbPool};
use crate::channels::ChannelSet;
use crate::types::error::{Result, SparkError};
use crate::types::{AdapterKind, ConversationRef, UserContext};

/// Types of actions that can be queued
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ActionType {
    /// Send a message to a conversation
    Send {
        conversation: ConversationRef,
        body: String,
    },

    /// Mark one conversation read, up to the given message
    MarkRead {
        conversation: ConversationRef,
        up_to_message_id: Option<String>,
    },

    /// Mark a whole channel read
    MarkAllRead { channel: AdapterKind },

    /// Delete a conversation
    Delete { conversation: ConversationRef },
}

impl ActionType {
    /// Action type string for database storage
    pub fn type_str(&self) -> &'static str {
        match self {
            Self::Send { .. } => "send",
            Self::MarkRead { .. } => "mark_read",
            Self::MarkAllRead { .. } => "mark_all_read",
            Self::Delete { .. } => "delete",
        }
    }

    /// The conversation this action operates on, if any
    pub fn conversation(&self) -> Option<&ConversationRef> {
        match self {
            Self::Send { conversation, .. } => Some(conversation),
            Self::MarkRead { conversation, .. } => Some(conversation),
            Self::MarkAllRead { .. } => None,
            Self::Delete { conversation } => Some(conversation),
        }
    }

    fn channel_str(&self) -> String {
        match self {
            Self::MarkAllRead { channel } => format!("{:?}", channel).to_lowercase(),
            _ => self
                .conversation()
                .map(|c| c.channel.as_str().to_string())
                .unwrap_or_default(),
        }
    }

    /// Whether this action supersedes an already queued one. A later
    /// mark-read of the same conversation replaces the earlier one; a second
    /// mark-all-read of the same channel is redundant.
    pub fn supersedes(&self, other: &ActionType) -> bool {
        match (self, other) {
            (
                Self::MarkRead { conversation: a, .. },
                Self::MarkRead { conversation: b, .. },
            ) => a == b,
            (Self::MarkAllRead { channel: a }, Self::MarkAllRead { channel: b }) => a == b,
            _ => false,
        }
    }
}

/// A queued action with metadata
#[derive(Debug, Clone)]
pub struct QueuedAction {
    pub id: Option<i64>,
    pub action: ActionType,
    pub created_at: DateTime<Utc>,
    pub retry_count: u32,
    pub last_error: Option<String>,
    pub status: ActionStatus,
}

/// Status of a queued action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl ActionStatus {
    pub fn from_str(s: &str) -> Self {
        match s {
            "pending" => Self::Pending,
            "processing" => Self::Processing,
            "completed" => Self::Completed,
            "failed" => Self::Failed,
            _ => Self::Pending,
        }
    }
}

/// Result of replaying an action
#[derive(Debug)]
pub enum ReplayResult {
    /// Action completed successfully
    Success,
    /// Action failed but will be retried
    Retry(String),
    /// Action failed permanently (max retries, or a non-retryable rejection)
    Discard(String),
}

/// Action queue manager
pub struct ActionQueue {
    pool: DbPool,
    max_retries: u32,
}

impl ActionQueue {
    pub fn new(pool: DbPool, max_retries: u32) -> Self {
        Self { pool, max_retries }
    }

    /// Queue a new action, superseding any stale equivalent already pending.
    pub fn queue(&self, action: ActionType) -> Result<i64> {
        for existing in self.get_pending()? {
            if let Some(id) = existing.id {
                if action.supersedes(&existing.action) {
                    queue_db::update_action_status_no_retry_increment(
                        &self.pool,
                        id,
                        "completed",
                    )?;
                }
            }
        }

        let payload = serde_json::to_string(&action)?;
        let id = queue_db::queue_action(
            &self.pool,
            action.type_str(),
            Some(&action.channel_str()),
            action.conversation().map(|c| c.id.as_str()),
            &payload,
        )?;
        info!("Queued offline {} action as #{}", action.type_str(), id);
        Ok(id)
    }

    pub fn get_pending(&self) -> Result<Vec<QueuedAction>> {
        let records = queue_db::get_pending_actions(&self.pool)?;

        let mut actions = Vec::with_capacity(records.len());
        for record in records {
            let action: ActionType = serde_json::from_str(&record.payload)
                .map_err(|e| SparkError::Database(format!("Corrupt queued action: {}", e)))?;
            actions.push(QueuedAction {
                id: Some(record.id),
                action,
                created_at: record.created_at,
                retry_count: record.retry_count,
                last_error: record.last_error,
                status: ActionStatus::from_str(&record.status),
            });
        }
        Ok(actions)
    }

    pub fn has_pending(&self) -> Result<bool> {
        Ok(!queue_db::get_pending_actions(&self.pool)?.is_empty())
    }

    fn mark_processing(&self, id: i64) -> Result<()> {
        queue_db::update_action_status_no_retry_increment(&self.pool, id, "processing")
    }

    fn mark_completed(&self, id: i64) -> Result<()> {
        queue_db::update_action_status_no_retry_increment(&self.pool, id, "completed")
    }

    fn mark_failed(&self, id: i64, error: &str) -> Result<()> {
        queue_db::update_action_status(&self.pool, id, "failed", Some(error))
    }

    fn retry(&self, id: i64) -> Result<()> {
        queue_db::update_action_status(&self.pool, id, "pending", None)
    }

    fn should_retry(&self, action: &QueuedAction, error: &SparkError) -> bool {
        error.is_connectivity() && action.retry_count < self.max_retries
    }

    pub fn cleanup_completed(&self) -> Result<u64> {
        queue_db::delete_completed_actions(&self.pool)
    }

    /// Replay all pending actions against the channel adapters.
    ///
    /// Actions are marked processing before execution to prevent
    /// double-execution, completed on success, and either reset to pending
    /// (retryable) or left failed (rejected / out of retries) on error.
    pub async fn replay_pending(
        &self,
        channels: &ChannelSet,
        ctx: &UserContext,
    ) -> Result<Vec<ReplayResult>> {
        let pending = self.get_pending()?;
        if pending.is_empty() {
            return Ok(vec![]);
        }

        info!("Replaying {} pending actions", pending.len());
        let mut results = Vec::with_capacity(pending.len());

        for queued in pending {
            let action_id = match queued.id {
                Some(id) => id,
                None => {
                    warn!("Queued action missing id, skipping");
                    continue;
                }
            };

            if let Err(e) = self.mark_processing(action_id) {
                error!("Failed to mark action #{} processing: {}", action_id, e);
                continue;
            }

            match self.execute_action(channels, ctx, &queued.action).await {
                Ok(()) => {
                    info!("Replayed action #{} ({})", action_id, queued.action.type_str());
                    if let Err(e) = self.mark_completed(action_id) {
                        error!("Failed to mark action #{} completed: {}", action_id, e);
                    }
                    results.push(ReplayResult::Success);
                }
                Err(e) => {
                    let message = e.to_string();
                    warn!("Action #{} failed: {}", action_id, message);

                    if self.should_retry(&queued, &e) {
                        if let Err(retry_err) = self.retry(action_id) {
                            error!(
                                "Failed to reset action #{} to pending: {}",
                                action_id, retry_err
                            );
                        }
                        results.push(ReplayResult::Retry(message));
                    } else {
                        if let Err(mark_err) = self.mark_failed(action_id, &message) {
                            error!("Failed to mark action #{} failed: {}", action_id, mark_err);
                        }
                        results.push(ReplayResult::Discard(message));
                    }
                }
            }
        }

        if let Ok(cleaned) = self.cleanup_completed() {
            if cleaned > 0 {
                info!("Cleaned up {} completed actions", cleaned);
            }
        }

        Ok(results)
    }

    async fn execute_action(
        &self,
        channels: &ChannelSet,
        ctx: &UserContext,
        action: &ActionType,
    ) -> Result<()> {
        match action {
            ActionType::Send { conversation, body } => {
                channels
                    .for_conversation(conversation)
                    .send(ctx, conversation, body)
                    .await?;
                Ok(())
            }
            ActionType::MarkRead {
                conversation,
                up_to_message_id,
            } => {
                channels
                    .for_conversation(conversation)
                    .mark_conversation_read(ctx, conversation, up_to_message_id.as_deref())
                    .await?;
                Ok(())
            }
            ActionType::MarkAllRead { channel } => {
                channels.get(*channel).mark_all_read(ctx).await?;
                Ok(())
            }
            ActionType::Delete { conversation } => {
                channels
                    .for_conversation(conversation)
                    .delete_conversation(ctx, conversation)
                    .await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::pool::create_test_pool;
    use crate::types::ChannelKind;

    fn job(id: &str) -> ConversationRef {
        ConversationRef::new(ChannelKind::Job, id)
    }

    #[test]
    fn action_serialization_round_trip() {
        let action = ActionType::Send {
            conversation: job("j1"),
            body: "Can you start Monday?".to_string(),
        };

        let json = serde_json::to_string(&action).unwrap();
        let back: ActionType = serde_json::from_str(&json).unwrap();
        assert_eq!(back, action);
    }

    #[test]
    fn later_mark_read_supersedes_earlier() {
        let pool = create_test_pool();
        let queue = ActionQueue::new(pool, 5);

        queue
            .queue(ActionType::MarkRead {
                conversation: job("j1"),
                up_to_message_id: Some("m3".to_string()),
            })
            .unwrap();
        queue
            .queue(ActionType::MarkRead {
                conversation: job("j1"),
                up_to_message_id: Some("m7".to_string()),
            })
            .unwrap();

        let pending = queue.get_pending().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(
            pending[0].action,
            ActionType::MarkRead {
                conversation: job("j1"),
                up_to_message_id: Some("m7".to_string()),
            }
        );
    }

    #[test]
    fn mark_read_for_other_conversations_coexist() {
        let pool = create_test_pool();
        let queue = ActionQueue::new(pool, 5);

        queue
            .queue(ActionType::MarkRead {
                conversation: job("j1"),
                up_to_message_id: None,
            })
            .unwrap();
        queue
            .queue(ActionType::MarkRead {
                conversation: job("j2"),
                up_to_message_id: None,
            })
            .unwrap();

        assert_eq!(queue.get_pending().unwrap().len(), 2);
    }

    #[test]
    fn sends_are_never_merged() {
        let pool = create_test_pool();
        let queue = ActionQueue::new(pool, 5);

        let send = ActionType::Send {
            conversation: job("j1"),
            body: "first".to_string(),
        };
        let send_again = ActionType::Send {
            conversation: job("j1"),
            body: "second".to_string(),
        };
        assert!(!send_again.supersedes(&send));

        queue.queue(send).unwrap();
        queue.queue(send_again).unwrap();
        assert_eq!(queue.get_pending().unwrap().len(), 2);
    }

    #[test]
    fn has_pending_reflects_queue_state() {
        let pool = create_test_pool();
        let queue = ActionQueue::new(pool, 5);
        assert!(!queue.has_pending().unwrap());

        queue
            .queue(ActionType::MarkAllRead {
                channel: AdapterKind::Job,
            })
            .unwrap();
        assert!(queue.has_pending().unwrap());
    }
}
