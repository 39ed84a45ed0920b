pub mod error;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The six channel tags a conversation can carry.
///
/// Team channels and team DMs are distinct tags (they render and delete
/// differently) but are served by the same adapter; see [`AdapterKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChannelKind {
    Job,
    TeamChannel,
    TeamDm,
    College,
    Peer,
    Admin,
}

impl ChannelKind {
    /// The adapter responsible for this channel tag.
    pub fn adapter(self) -> AdapterKind {
        match self {
            Self::Job => AdapterKind::Job,
            Self::TeamChannel | Self::TeamDm => AdapterKind::Team,
            Self::College => AdapterKind::College,
            Self::Peer => AdapterKind::Peer,
            Self::Admin => AdapterKind::Admin,
        }
    }

    /// The canonical string tag (used in the cache and in frontend events).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Job => "job",
            Self::TeamChannel => "team-channel",
            Self::TeamDm => "team-dm",
            Self::College => "college",
            Self::Peer => "peer",
            Self::Admin => "admin",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "job" => Some(Self::Job),
            "team-channel" => Some(Self::TeamChannel),
            "team-dm" => Some(Self::TeamDm),
            "college" => Some(Self::College),
            "peer" => Some(Self::Peer),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }
}

/// The five channel adapters behind the unified inbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AdapterKind {
    Job,
    Team,
    College,
    Peer,
    Admin,
}

impl AdapterKind {
    pub const ALL: [AdapterKind; 5] = [
        Self::Job,
        Self::Team,
        Self::College,
        Self::Peer,
        Self::Admin,
    ];

    /// Display label for tab headers.
    pub fn label(self) -> &'static str {
        match self {
            Self::Job => "Jobs",
            Self::Team => "Team",
            Self::College => "College",
            Self::Peer => "Peer Support",
            Self::Admin => "Support",
        }
    }

    /// The channel tags owned by this adapter.
    pub fn tags(self) -> &'static [ChannelKind] {
        match self {
            Self::Job => &[ChannelKind::Job],
            Self::Team => &[ChannelKind::TeamChannel, ChannelKind::TeamDm],
            Self::College => &[ChannelKind::College],
            Self::Peer => &[ChannelKind::Peer],
            Self::Admin => &[ChannelKind::Admin],
        }
    }
}

/// Opaque reference to a conversation: channel tag plus server id.
///
/// The aggregator and the selection machine only ever hold these, never a
/// copy of message bodies.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationRef {
    pub channel: ChannelKind,
    pub id: String,
}

impl ConversationRef {
    pub fn new(channel: ChannelKind, id: impl Into<String>) -> Self {
        Self {
            channel,
            id: id.into(),
        }
    }
}

impl std::fmt::Display for ConversationRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.channel.as_str(), self.id)
    }
}

/// One row in a channel's conversation list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub conversation: ConversationRef,
    pub title: String,
    pub last_message_preview: Option<String>,
    pub last_activity: DateTime<Utc>,
    pub unread_count: u32,
}

/// A single chat message within one conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub conversation: ConversationRef,
    pub sender_id: String,
    pub sender_name: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
    /// Whether the signed-in user sent this message.
    pub is_own: bool,
}

/// Role of the signed-in user. Decides the job-channel variant and which
/// channels are applicable at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Employer,
    Electrician,
    Apprentice,
}

/// Identity and context of the signed-in user.
///
/// Absence of a session means "no data available" for every channel, never
/// an error state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserContext {
    pub user_id: String,
    pub display_name: String,
    pub role: UserRole,
    /// Set when the user belongs to a company team (team chat applicable).
    pub team_id: Option<String>,
    /// Set while the user is enrolled at a college. College chat must not
    /// issue backend calls outside this context.
    pub in_college: bool,
}

/// The uniform read contract every channel adapter exposes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelSnapshot {
    pub items: Vec<ConversationSummary>,
    pub is_loading: bool,
    pub unread_count: u32,
}

impl ChannelSnapshot {
    /// Snapshot of a channel that is not applicable to the current user
    /// context: empty, not loading, contributing zero to the badge.
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            is_loading: false,
            unread_count: 0,
        }
    }
}

/// Aggregate snapshot for the inbox list view: one entry per adapter plus
/// the derived badge value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboxSnapshot {
    pub job: ChannelSnapshot,
    pub team: ChannelSnapshot,
    pub college: ChannelSnapshot,
    pub peer: ChannelSnapshot,
    pub admin: ChannelSnapshot,
    pub total_unread: u64,
}

impl InboxSnapshot {
    /// Snapshot shown while signed out: all channels empty, badge zero.
    pub fn empty() -> Self {
        Self {
            job: ChannelSnapshot::empty(),
            team: ChannelSnapshot::empty(),
            college: ChannelSnapshot::empty(),
            peer: ChannelSnapshot::empty(),
            admin: ChannelSnapshot::empty(),
            total_unread: 0,
        }
    }

}

/// An authenticated session: the API token plus the user it belongs to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub user: UserContext,
}

/// A local in-app notification (separate from the per-channel unread counts).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub kind: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_tags_round_trip() {
        for adapter in AdapterKind::ALL {
            for tag in adapter.tags() {
                assert_eq!(ChannelKind::from_str(tag.as_str()), Some(*tag));
                assert_eq!(tag.adapter(), adapter);
            }
        }
    }

    #[test]
    fn team_tags_share_one_adapter() {
        assert_eq!(ChannelKind::TeamChannel.adapter(), AdapterKind::Team);
        assert_eq!(ChannelKind::TeamDm.adapter(), AdapterKind::Team);
    }
}
