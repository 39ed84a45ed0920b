//! Platform API client
//!
//! Thin JSON client for the hosted SparkMate backend, which is the source of
//! truth for conversations, messages, and identity. Each channel adapter
//! talks to the API through this client and caches the results locally.

use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::sync::RwLock;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::config;
use crate::types::error::{Result, SparkError};
use crate::types::{
    AdapterKind, ChannelKind, ChatMessage, ConversationRef, ConversationSummary, Session,
    UserContext, UserRole,
};

/// Wire form of a conversation row.
#[derive(Debug, Clone, Deserialize)]
struct ConversationDto {
    id: String,
    /// Six-way channel tag as sent by the server.
    channel: String,
    title: String,
    last_message_preview: Option<String>,
    last_activity: DateTime<Utc>,
    unread_count: u32,
}

/// Wire form of a message.
#[derive(Debug, Clone, Deserialize)]
struct MessageDto {
    id: String,
    sender_id: String,
    sender_name: String,
    body: String,
    created_at: DateTime<Utc>,
    read_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct SignInResponse {
    access_token: String,
    user: UserDto,
}

#[derive(Debug, Deserialize)]
struct UserDto {
    id: String,
    display_name: String,
    role: UserRole,
    team_id: Option<String>,
    in_college: bool,
}

#[derive(Debug, Serialize)]
struct SignInRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    body: &'a str,
}

#[derive(Debug, Serialize)]
struct MarkReadRequest<'a> {
    up_to_message_id: Option<&'a str>,
}

/// Client for the platform REST API.
pub struct PlatformClient {
    http: reqwest::Client,
    base_url: Url,
    token: RwLock<Option<String>>,
}

impl PlatformClient {
    pub fn new() -> Result<Self> {
        let cfg = config::get_config();
        let base_url = Url::parse(&cfg.api.base_url)
            .map_err(|e| SparkError::Config(format!("Invalid API base URL: {}", e)))?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.api.timeout_secs))
            .build()
            .map_err(|e| SparkError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url,
            token: RwLock::new(None),
        })
    }

    /// Adopt an existing session (restored from the encrypted store).
    pub fn restore(&self, session: &Session) {
        if let Ok(mut token) = self.token.write() {
            *token = Some(session.access_token.clone());
        }
    }

    pub fn clear_token(&self) {
        if let Ok(mut token) = self.token.write() {
            *token = None;
        }
    }

    fn bearer(&self) -> Result<String> {
        self.token
            .read()
            .ok()
            .and_then(|t| t.clone())
            .ok_or(SparkError::NoSession)
    }

    fn url(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| SparkError::Config(format!("Invalid API path {}: {}", path, e)))
    }

    fn adapter_segment(kind: AdapterKind) -> &'static str {
        match kind {
            AdapterKind::Job => "job",
            AdapterKind::Team => "team",
            AdapterKind::College => "college",
            AdapterKind::Peer => "peer",
            AdapterKind::Admin => "admin",
        }
    }

    /// Map an error-status response to the error taxonomy.
    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                SparkError::Auth(format!("{}: {}", status, body))
            }
            StatusCode::NOT_FOUND => SparkError::ConversationNotFound(body),
            _ => SparkError::Backend(format!("{}: {}", status, body)),
        })
    }

    // ========================================================================
    // Session
    // ========================================================================

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        let response = self
            .http
            .post(self.url("/v1/auth/sign-in")?)
            .json(&SignInRequest { email, password })
            .send()
            .await?;
        let response = Self::check(response).await?;
        let parsed: SignInResponse = response.json().await?;

        let session = Session {
            access_token: parsed.access_token,
            user: UserContext {
                user_id: parsed.user.id,
                display_name: parsed.user.display_name,
                role: parsed.user.role,
                team_id: parsed.user.team_id,
                in_college: parsed.user.in_college,
            },
        };
        self.restore(&session);
        debug!("Signed in as {}", session.user.user_id);
        Ok(session)
    }

    // ========================================================================
    // Conversations
    // ========================================================================

    /// Conversation list for one adapter. The server derives the job-channel
    /// variant (employer vs. electrician) from the token.
    pub async fn list_conversations(&self, kind: AdapterKind) -> Result<Vec<ConversationSummary>> {
        let path = format!("/v1/messaging/{}/conversations", Self::adapter_segment(kind));
        let response = self
            .http
            .get(self.url(&path)?)
            .bearer_auth(self.bearer()?)
            .send()
            .await?;
        let response = Self::check(response).await?;
        let dtos: Vec<ConversationDto> = response.json().await?;

        let mut items = Vec::with_capacity(dtos.len());
        for dto in dtos {
            let channel = ChannelKind::from_str(&dto.channel).ok_or_else(|| {
                SparkError::Parse(format!("Unknown channel tag: {}", dto.channel))
            })?;
            if channel.adapter() != kind {
                return Err(SparkError::Parse(format!(
                    "Server returned {} conversation in the {} list",
                    dto.channel,
                    Self::adapter_segment(kind)
                )));
            }
            items.push(ConversationSummary {
                conversation: ConversationRef {
                    channel,
                    id: dto.id,
                },
                title: dto.title,
                last_message_preview: dto.last_message_preview,
                last_activity: dto.last_activity,
                unread_count: dto.unread_count,
            });
        }
        Ok(items)
    }

    pub async fn conversation_messages(
        &self,
        conversation: &ConversationRef,
        user_id: &str,
    ) -> Result<Vec<ChatMessage>> {
        let path = format!(
            "/v1/messaging/{}/conversations/{}/messages",
            Self::adapter_segment(conversation.channel.adapter()),
            conversation.id
        );
        let response = self
            .http
            .get(self.url(&path)?)
            .bearer_auth(self.bearer()?)
            .send()
            .await?;
        let response = Self::check(response).await?;
        let dtos: Vec<MessageDto> = response.json().await?;

        Ok(dtos
            .into_iter()
            .map(|dto| Self::message_from_dto(dto, conversation, user_id))
            .collect())
    }

    pub async fn send_message(
        &self,
        conversation: &ConversationRef,
        body: &str,
        user_id: &str,
    ) -> Result<ChatMessage> {
        let path = format!(
            "/v1/messaging/{}/conversations/{}/messages",
            Self::adapter_segment(conversation.channel.adapter()),
            conversation.id
        );
        let response = self
            .http
            .post(self.url(&path)?)
            .bearer_auth(self.bearer()?)
            .json(&SendMessageRequest { body })
            .send()
            .await?;
        let response = Self::check(response).await?;
        let dto: MessageDto = response.json().await?;
        Ok(Self::message_from_dto(dto, conversation, user_id))
    }

    pub async fn mark_read(
        &self,
        conversation: &ConversationRef,
        up_to_message_id: Option<&str>,
    ) -> Result<()> {
        let path = format!(
            "/v1/messaging/{}/conversations/{}/read",
            Self::adapter_segment(conversation.channel.adapter()),
            conversation.id
        );
        let response = self
            .http
            .post(self.url(&path)?)
            .bearer_auth(self.bearer()?)
            .json(&MarkReadRequest { up_to_message_id })
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    pub async fn mark_channel_read(&self, kind: AdapterKind) -> Result<()> {
        let path = format!("/v1/messaging/{}/read-all", Self::adapter_segment(kind));
        let response = self
            .http
            .post(self.url(&path)?)
            .bearer_auth(self.bearer()?)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    pub async fn delete_conversation(&self, conversation: &ConversationRef) -> Result<()> {
        let path = format!(
            "/v1/messaging/{}/conversations/{}",
            Self::adapter_segment(conversation.channel.adapter()),
            conversation.id
        );
        let response = self
            .http
            .delete(self.url(&path)?)
            .bearer_auth(self.bearer()?)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    fn message_from_dto(
        dto: MessageDto,
        conversation: &ConversationRef,
        user_id: &str,
    ) -> ChatMessage {
        ChatMessage {
            is_own: dto.sender_id == user_id,
            id: dto.id,
            conversation: conversation.clone(),
            sender_id: dto.sender_id,
            sender_name: dto.sender_name,
            body: dto.body,
            created_at: dto.created_at,
            read_at: dto.read_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversation_dto_parses() {
        let raw = r#"{
            "id": "j-81",
            "channel": "job",
            "title": "Consumer unit upgrade — SE14",
            "last_message_preview": "Can you start Monday?",
            "last_activity": "2026-08-01T09:30:00Z",
            "unread_count": 2
        }"#;
        let dto: ConversationDto = serde_json::from_str(raw).unwrap();
        assert_eq!(dto.id, "j-81");
        assert_eq!(dto.unread_count, 2);
        assert_eq!(ChannelKind::from_str(&dto.channel), Some(ChannelKind::Job));
    }

    #[test]
    fn own_messages_detected_by_sender() {
        let dto = MessageDto {
            id: "m1".to_string(),
            sender_id: "user-9".to_string(),
            sender_name: "Dana".to_string(),
            body: "On my way".to_string(),
            created_at: Utc::now(),
            read_at: None,
        };
        let conversation = ConversationRef::new(ChannelKind::Peer, "p1");
        let message = PlatformClient::message_from_dto(dto.clone(), &conversation, "user-9");
        assert!(message.is_own);
        let message = PlatformClient::message_from_dto(dto, &conversation, "user-7");
        assert!(!message.is_own);
    }
}
