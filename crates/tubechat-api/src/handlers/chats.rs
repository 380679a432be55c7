use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::debug;
use uuid::Uuid;

use tubechat_types::api::{ChatResponse, CreateChatRequest, LlmRequest, LlmResponse, SendMessageRequest};

use super::blocking;
use crate::chat::ChatService;
use crate::error::ApiResult;
use crate::middleware::CurrentUser;
use crate::state::AppState;

pub async fn create_chat(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    body: Option<Json<CreateChatRequest>>,
) -> ApiResult<impl IntoResponse> {
    let req = body.map(|Json(req)| req).unwrap_or_default();
    let chat = blocking(&state, move |s| {
        ChatService::new(&s.db).create_chat(user.user_id, req.transcript_id)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(ChatResponse::new(chat, Vec::new()))))
}

pub async fn list_chats(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> ApiResult<impl IntoResponse> {
    let summaries = blocking(&state, move |s| {
        let chats = ChatService::new(&s.db);
        chats
            .list_chats(user.user_id)?
            .into_iter()
            .map(|chat| chats.summarize(chat))
            .collect::<ApiResult<Vec<_>>>()
    })
    .await?;
    Ok(Json(summaries))
}

pub async fn chats_for_transcript(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(transcript_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let chats = blocking(&state, move |s| {
        ChatService::new(&s.db).chats_for_transcript(user.user_id, transcript_id)
    })
    .await?;
    Ok(Json(chats))
}

pub async fn get_chat(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(chat_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let (chat, messages) = blocking(&state, move |s| {
        ChatService::new(&s.db).get_chat(user.user_id, chat_id)
    })
    .await?;
    Ok(Json(ChatResponse::new(chat, messages)))
}

pub async fn delete_chat(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(chat_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    blocking(&state, move |s| ChatService::new(&s.db).delete_chat(user.user_id, chat_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_messages(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(chat_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let history = blocking(&state, move |s| {
        ChatService::new(&s.db).load_history(user.user_id, chat_id)
    })
    .await?;
    Ok(Json(history))
}

pub async fn send_message(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(chat_id): Path<Uuid>,
    Json(req): Json<SendMessageRequest>,
) -> ApiResult<impl IntoResponse> {
    let message = blocking(&state, move |s| {
        ChatService::new(&s.db).add_message(user.user_id, chat_id, &req.sender, &req.message_text)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(message)))
}

/// Store the user's turn, ask the selected provider, store and return
/// its reply. Storage steps run off the runtime on either side of the
/// provider call.
pub async fn chat_with_llm(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(chat_id): Path<Uuid>,
    Json(req): Json<LlmRequest>,
) -> ApiResult<impl IntoResponse> {
    let LlmRequest {
        user_message,
        provider,
    } = req;

    let messages = blocking(&state, move |s| {
        ChatService::new(&s.db).begin_turn(user.user_id, chat_id, &user_message)
    })
    .await?;

    debug!(
        "Dispatching chat {} to {} with {} messages",
        chat_id,
        provider,
        messages.len()
    );
    let reply = state.llm.generate(provider, &messages, None, None).await?;

    let reply = blocking(&state, move |s| {
        ChatService::new(&s.db).finish_turn(chat_id, provider, &reply)
    })
    .await?;

    Ok(Json(LlmResponse {
        chat_id,
        llm_message: reply.message_text,
    }))
}
