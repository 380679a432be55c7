use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::llm::ProviderKind;
use crate::models::{Chat, Gender, Message, User};

// -- JWT Claims --

/// Access-token claims. `sub` is the user id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub iat: usize,
    pub exp: usize,
}

// -- Users --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub age: Option<i32>,
    pub gender: Option<Gender>,
    pub birth_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    #[serde(alias = "username")]
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub user: User,
}

/// Partial profile update: only the supplied fields change.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub age: Option<i32>,
    pub gender: Option<Gender>,
    pub birth_date: Option<NaiveDate>,
}

// -- Transcripts --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TranscriptRequest {
    pub video_url: String,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub skip: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_limit() -> u32 {
    100
}

// -- Chats --

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateChatRequest {
    pub transcript_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub chat_id: Uuid,
    pub user_id: Uuid,
    pub transcript_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub messages: Vec<Message>,
}

impl ChatResponse {
    pub fn new(chat: Chat, messages: Vec<Message>) -> Self {
        Self {
            chat_id: chat.chat_id,
            user_id: chat.user_id,
            transcript_id: chat.transcript_id,
            created_at: chat.created_at,
            messages,
        }
    }
}

/// One row of the chat list: the chat plus a peek at its history.
#[derive(Debug, Serialize)]
pub struct ChatSummary {
    pub chat_id: Uuid,
    pub user_id: Uuid,
    pub transcript_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub message_count: i64,
    pub last_message: Option<Message>,
}

/// `sender` is kept as free text so that an unknown tag surfaces as a
/// validation error with a reason instead of a body rejection.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendMessageRequest {
    pub sender: String,
    pub message_text: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LlmRequest {
    pub user_message: String,
    #[serde(default)]
    pub provider: ProviderKind,
}

#[derive(Debug, Serialize)]
pub struct LlmResponse {
    pub chat_id: Uuid,
    pub llm_message: String,
}

// -- Errors --

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}
