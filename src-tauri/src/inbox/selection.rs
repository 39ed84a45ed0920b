//! Selection state machine
//!
//! Tracks which single conversation is open across all channels. The state
//! is one tagged value, so "two conversations open at once" is
//! unrepresentable. Transitions:
//!
//! - `List --select--> Detail`: starts a message load; mark-as-read happens
//!   only after the load lands and the conversation is still the one open.
//! - `Detail --close--> List`: clears every per-channel draft buffer, never
//!   the cached conversations or messages.
//! - Selecting while a detail is open is rejected; callers close first.
//! - Deleting the open conversation forces the machine back to `List`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::types::error::{Result, SparkError};
use crate::types::{ChannelKind, ConversationRef};

/// The current inbox view mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "view", rename_all = "lowercase")]
pub enum Selection {
    /// The conversation list (initial state, and where every close lands).
    List,
    /// Exactly one open conversation.
    Detail { conversation: ConversationRef },
}

/// Result of a message load finishing, relative to the current selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The load belongs to the open conversation: render it, and issue
    /// mark-as-read if `mark_read` is set.
    Apply { mark_read: bool },
    /// The user navigated elsewhere while the fetch was in flight; drop the
    /// result and do not mark anything read.
    Stale,
}

#[derive(Debug, Default)]
pub struct SelectionState {
    current: Option<ConversationRef>,
    /// Conversation + last message id of the most recent mark-as-read, so a
    /// reload of an unchanged conversation does not re-issue it.
    last_marked: Option<(ConversationRef, Option<String>)>,
    drafts: HashMap<ChannelKind, String>,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selection(&self) -> Selection {
        match &self.current {
            Some(conversation) => Selection::Detail {
                conversation: conversation.clone(),
            },
            None => Selection::List,
        }
    }

    pub fn selected(&self) -> Option<&ConversationRef> {
        self.current.as_ref()
    }

    /// Open a conversation from the list view.
    ///
    /// Rejected while another detail is open: at most one conversation can
    /// be selected at a time.
    pub fn select(&mut self, conversation: ConversationRef) -> Result<()> {
        if self.current.is_some() {
            return Err(SparkError::SelectionBusy);
        }
        self.current = Some(conversation);
        Ok(())
    }

    /// A message load finished. Applies only if the loaded conversation is
    /// still the open one, and decides whether mark-as-read is due, keyed
    /// off the conversation id plus the last message id (not the message
    /// count, which can miss changes).
    pub fn messages_loaded(
        &mut self,
        conversation: &ConversationRef,
        last_message_id: Option<&str>,
    ) -> LoadOutcome {
        if self.current.as_ref() != Some(conversation) {
            return LoadOutcome::Stale;
        }

        let key = (
            conversation.clone(),
            last_message_id.map(|id| id.to_string()),
        );
        if self.last_marked.as_ref() == Some(&key) {
            return LoadOutcome::Apply { mark_read: false };
        }
        self.last_marked = Some(key);
        LoadOutcome::Apply { mark_read: true }
    }

    /// A message load failed. If it was for the open conversation, fall back
    /// to the list view (returning true) instead of leaving a stuck blank
    /// detail pane.
    pub fn load_failed(&mut self, conversation: &ConversationRef) -> bool {
        if self.current.as_ref() == Some(conversation) {
            self.close();
            true
        } else {
            false
        }
    }

    /// Back navigation or sheet close: return to the list and clear every
    /// per-channel draft. Cached conversations and messages are untouched.
    pub fn close(&mut self) {
        self.current = None;
        self.drafts.clear();
    }

    /// A conversation was deleted (locally or discovered via refresh). If it
    /// is the open one, force the transition back to the list; returns
    /// whether that happened.
    pub fn conversation_deleted(&mut self, conversation: &ConversationRef) -> bool {
        if self.current.as_ref() == Some(conversation) {
            self.close();
            true
        } else {
            false
        }
    }

    // ------------------------------------------------------------------
    // Draft buffers
    // ------------------------------------------------------------------

    pub fn set_draft(&mut self, channel: ChannelKind, text: String) {
        if text.is_empty() {
            self.drafts.remove(&channel);
        } else {
            self.drafts.insert(channel, text);
        }
    }

    pub fn draft(&self, channel: ChannelKind) -> Option<&str> {
        self.drafts.get(&channel).map(|s| s.as_str())
    }

    /// Clear one channel's draft (a send succeeded).
    pub fn clear_draft(&mut self, channel: ChannelKind) {
        self.drafts.remove(&channel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(id: &str) -> ConversationRef {
        ConversationRef::new(ChannelKind::Job, id)
    }

    fn peer(id: &str) -> ConversationRef {
        ConversationRef::new(ChannelKind::Peer, id)
    }

    #[test]
    fn starts_in_list_view() {
        let state = SelectionState::new();
        assert_eq!(state.selection(), Selection::List);
        assert!(state.selected().is_none());
    }

    #[test]
    fn select_opens_exactly_one_detail() {
        let mut state = SelectionState::new();
        state.select(job("42")).unwrap();
        assert_eq!(
            state.selection(),
            Selection::Detail {
                conversation: job("42")
            }
        );
    }

    #[test]
    fn second_select_without_close_is_rejected() {
        let mut state = SelectionState::new();
        state.select(job("42")).unwrap();

        let err = state.select(peer("p7")).unwrap_err();
        assert!(matches!(err, SparkError::SelectionBusy));
        // The original selection is untouched.
        assert_eq!(state.selected(), Some(&job("42")));
    }

    #[test]
    fn close_returns_to_list_and_clears_drafts() {
        let mut state = SelectionState::new();
        state.select(job("42")).unwrap();
        state.set_draft(ChannelKind::Job, "half-typed reply".to_string());
        state.set_draft(ChannelKind::Peer, "other draft".to_string());

        state.close();
        assert_eq!(state.selection(), Selection::List);
        assert!(state.draft(ChannelKind::Job).is_none());
        assert!(state.draft(ChannelKind::Peer).is_none());

        // And the machine can open something else afterwards.
        state.select(peer("p7")).unwrap();
        assert_eq!(state.selected(), Some(&peer("p7")));
    }

    #[test]
    fn load_for_open_conversation_applies_and_marks_read_once() {
        let mut state = SelectionState::new();
        state.select(job("42")).unwrap();

        let outcome = state.messages_loaded(&job("42"), Some("m9"));
        assert_eq!(outcome, LoadOutcome::Apply { mark_read: true });

        // Reloading the unchanged conversation does not re-mark.
        let outcome = state.messages_loaded(&job("42"), Some("m9"));
        assert_eq!(outcome, LoadOutcome::Apply { mark_read: false });

        // A new last message makes mark-as-read due again.
        let outcome = state.messages_loaded(&job("42"), Some("m10"));
        assert_eq!(outcome, LoadOutcome::Apply { mark_read: true });
    }

    #[test]
    fn stale_load_is_dropped() {
        let mut state = SelectionState::new();
        state.select(job("42")).unwrap();
        state.close();
        state.select(peer("p7")).unwrap();

        // The fetch for job 42 resolves after the user moved on.
        assert_eq!(state.messages_loaded(&job("42"), Some("m1")), LoadOutcome::Stale);
        // Nothing about the open peer conversation changed.
        assert_eq!(state.selected(), Some(&peer("p7")));
    }

    #[test]
    fn failed_load_falls_back_to_list() {
        let mut state = SelectionState::new();
        state.select(job("42")).unwrap();

        assert!(state.load_failed(&job("42")));
        assert_eq!(state.selection(), Selection::List);

        // A failure for something no longer open is ignored.
        state.select(peer("p7")).unwrap();
        assert!(!state.load_failed(&job("42")));
        assert_eq!(state.selected(), Some(&peer("p7")));
    }

    #[test]
    fn deleting_open_conversation_forces_list_view() {
        let mut state = SelectionState::new();
        state.select(job("42")).unwrap();

        assert!(state.conversation_deleted(&job("42")));
        assert_eq!(state.selection(), Selection::List);
    }

    #[test]
    fn deleting_other_conversation_keeps_detail_open() {
        let mut state = SelectionState::new();
        state.select(job("42")).unwrap();

        assert!(!state.conversation_deleted(&job("43")));
        assert_eq!(state.selected(), Some(&job("42")));
    }

    #[test]
    fn drafts_are_per_channel() {
        let mut state = SelectionState::new();
        state.set_draft(ChannelKind::Job, "quote follow-up".to_string());
        state.set_draft(ChannelKind::Admin, "support question".to_string());

        assert_eq!(state.draft(ChannelKind::Job), Some("quote follow-up"));
        assert_eq!(state.draft(ChannelKind::Admin), Some("support question"));
        assert!(state.draft(ChannelKind::Peer).is_none());

        state.clear_draft(ChannelKind::Job);
        assert!(state.draft(ChannelKind::Job).is_none());
        assert_eq!(state.draft(ChannelKind::Admin), Some("support question"));
    }

    #[test]
    fn empty_draft_removes_the_buffer() {
        let mut state = SelectionState::new();
        state.set_draft(ChannelKind::Job, "text".to_string());
        state.set_draft(ChannelKind::Job, String::new());
        assert!(state.draft(ChannelKind::Job).is_none());
    }
}
