//! Chat orchestration: ownership checks, history, and the round trip
//! through an LLM provider.

use tracing::{debug, info};
use uuid::Uuid;

use tubechat_db::{Database, timestamp_now};
use tubechat_llm::{ChatMessage, Generate, ProviderKind, Role};
use tubechat_types::api::ChatSummary;
use tubechat_types::models::{Chat, Message, Sender, Transcript, User};

use crate::error::{ApiError, ApiResult};

pub const BASE_SYSTEM_PROMPT: &str = "You are a helpful AI assistant that helps users understand and discuss content from YouTube videos. Be concise, informative, and friendly.";

/// The assistant prompt, with the transcript body appended when the chat
/// is anchored to one that has text.
pub fn system_prompt(transcript: Option<&Transcript>) -> String {
    match transcript.and_then(|t| t.transcript_text.as_deref()) {
        Some(text) if !text.trim().is_empty() => format!(
            "{}\n\nHere is the transcript of the video being discussed:\n\n{}\n\nUse this transcript to answer the user's questions accurately and provide relevant information from the video content.",
            BASE_SYSTEM_PROMPT, text
        ),
        _ => BASE_SYSTEM_PROMPT.to_string(),
    }
}

/// Provider input: optional system entry, the stored history in order
/// (`llm` turns become `assistant`, everything else `user`), then the new
/// user text.
pub fn format_for_provider(history: &[Message], new_text: &str, system: Option<&str>) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    if let Some(prompt) = system {
        messages.push(ChatMessage::system(prompt));
    }
    messages.extend(history.iter().map(|m| {
        let role = match m.sender {
            Sender::Llm => Role::Assistant,
            Sender::User | Sender::System => Role::User,
        };
        ChatMessage::new(role, m.message_text.clone())
    }));
    messages.push(ChatMessage::user(new_text));
    messages
}

pub struct ChatService<'a> {
    db: &'a Database,
}

impl<'a> ChatService<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    pub fn create_chat(&self, user_id: Uuid, transcript_id: Option<Uuid>) -> ApiResult<Chat> {
        if user_id.is_nil() {
            return Err(ApiError::validation("User ID is required"));
        }
        if self.db.repo::<User>().get(user_id)?.is_none() {
            return Err(ApiError::validation("User not found"));
        }
        if let Some(id) = transcript_id {
            if self.db.repo::<Transcript>().get(id)?.is_none() {
                return Err(ApiError::not_found("Transcript not found"));
            }
        }

        let chat = self.db.repo::<Chat>().create(Chat {
            chat_id: Uuid::new_v4(),
            user_id,
            transcript_id,
            created_at: timestamp_now(),
        })?;
        info!("Created chat {} for user {}", chat.chat_id, user_id);
        Ok(chat)
    }

    /// The caller's chats, newest first.
    pub fn list_chats(&self, user_id: Uuid) -> ApiResult<Vec<Chat>> {
        Ok(self.db.repo::<Chat>().by_owner(user_id)?)
    }

    /// The caller's chats about one transcript, newest first.
    pub fn chats_for_transcript(&self, user_id: Uuid, transcript_id: Uuid) -> ApiResult<Vec<Chat>> {
        let chats = self.db.repo::<Chat>().by_transcript(transcript_id)?;
        Ok(chats.into_iter().filter(|c| c.user_id == user_id).collect())
    }

    pub fn summarize(&self, chat: Chat) -> ApiResult<ChatSummary> {
        Ok(ChatSummary {
            message_count: self.db.repo::<Message>().count_for_chat(chat.chat_id)?,
            last_message: self.db.repo::<Message>().last_for_chat(chat.chat_id)?,
            chat_id: chat.chat_id,
            user_id: chat.user_id,
            transcript_id: chat.transcript_id,
            created_at: chat.created_at,
        })
    }

    /// Loads the chat if `user_id` owns it. Runs ahead of every other check
    /// of a chat-scoped operation.
    pub fn authorize(&self, user_id: Uuid, chat_id: Uuid) -> ApiResult<Chat> {
        let chat = self
            .db
            .repo::<Chat>()
            .get(chat_id)?
            .ok_or_else(|| ApiError::not_found("Chat not found"))?;
        if chat.user_id != user_id {
            return Err(ApiError::Forbidden("Not authorized to access this chat".into()));
        }
        Ok(chat)
    }

    pub fn get_chat(&self, user_id: Uuid, chat_id: Uuid) -> ApiResult<(Chat, Vec<Message>)> {
        let chat = self.authorize(user_id, chat_id)?;
        let history = self.db.repo::<Message>().for_chat(chat_id)?;
        Ok((chat, history))
    }

    /// Oldest first; equal timestamps keep insertion order.
    pub fn load_history(&self, user_id: Uuid, chat_id: Uuid) -> ApiResult<Vec<Message>> {
        self.authorize(user_id, chat_id)?;
        Ok(self.db.repo::<Message>().for_chat(chat_id)?)
    }

    pub fn add_message(&self, user_id: Uuid, chat_id: Uuid, sender: &str, text: &str) -> ApiResult<Message> {
        self.authorize(user_id, chat_id)?;
        let sender: Sender = sender.parse().map_err(ApiError::Validation)?;
        self.append(chat_id, sender, text)
    }

    pub fn delete_chat(&self, user_id: Uuid, chat_id: Uuid) -> ApiResult<()> {
        self.authorize(user_id, chat_id)?;
        self.db.repo::<Chat>().delete(chat_id)?;
        info!("Deleted chat {}", chat_id);
        Ok(())
    }

    pub fn count_messages(&self, user_id: Uuid, chat_id: Uuid) -> ApiResult<i64> {
        self.authorize(user_id, chat_id)?;
        Ok(self.db.repo::<Message>().count_for_chat(chat_id)?)
    }

    pub fn last_message(&self, user_id: Uuid, chat_id: Uuid) -> ApiResult<Option<Message>> {
        self.authorize(user_id, chat_id)?;
        Ok(self.db.repo::<Message>().last_for_chat(chat_id)?)
    }

    /// Stores `text` as a user turn, asks the provider for a reply with the
    /// full history as context, and stores the reply as an `llm` turn.
    /// A failed dispatch leaves the user turn in place.
    pub async fn converse(
        &self,
        user_id: Uuid,
        chat_id: Uuid,
        provider: ProviderKind,
        text: &str,
        llm: &dyn Generate,
    ) -> ApiResult<Message> {
        let messages = self.begin_turn(user_id, chat_id, text)?;
        debug!(
            "Dispatching chat {} to {} with {} messages",
            chat_id,
            provider,
            messages.len()
        );
        let reply = llm.generate(provider, &messages, None, None).await?;
        self.finish_turn(chat_id, provider, &reply)
    }

    /// Storage half of `converse` before dispatch: checks ownership, stores
    /// the user turn and returns the provider input (system prompt, prior
    /// history, new text).
    pub fn begin_turn(&self, user_id: Uuid, chat_id: Uuid, text: &str) -> ApiResult<Vec<ChatMessage>> {
        let chat = self.authorize(user_id, chat_id)?;
        let history = self.db.repo::<Message>().for_chat(chat_id)?;
        self.append(chat_id, Sender::User, text)?;

        let transcript = match chat.transcript_id {
            Some(id) => self.db.repo::<Transcript>().get(id)?,
            None => None,
        };
        let prompt = system_prompt(transcript.as_ref());
        Ok(format_for_provider(&history, text, Some(&prompt)))
    }

    /// Stores the provider's reply as an `llm` turn. A blank reply is a
    /// provider failure and is not stored.
    pub fn finish_turn(&self, chat_id: Uuid, provider: ProviderKind, reply: &str) -> ApiResult<Message> {
        if reply.trim().is_empty() {
            return Err(ApiError::Provider {
                provider,
                message: "Empty response".into(),
            });
        }
        self.append(chat_id, Sender::Llm, reply)
    }

    fn append(&self, chat_id: Uuid, sender: Sender, text: &str) -> ApiResult<Message> {
        if text.trim().is_empty() {
            return Err(ApiError::validation("Message text must not be empty"));
        }
        let message = self.db.repo::<Message>().create(Message {
            message_id: Uuid::new_v4(),
            chat_id,
            sender,
            message_text: text.to_string(),
            created_at: timestamp_now(),
        })?;
        Ok(message)
    }
}
