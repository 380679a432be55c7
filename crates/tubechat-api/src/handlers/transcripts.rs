use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use tubechat_types::api::{ListQuery, TranscriptRequest};

use super::blocking;
use crate::error::ApiResult;
use crate::state::{AppState, AppStateInner};
use crate::transcript::TranscriptService;

fn service(state: &AppStateInner) -> TranscriptService<'_> {
    TranscriptService::new(&state.db, state.transcripts.as_ref(), &state.transcript_languages)
}

/// Returns the cached transcript for the URL, fetching it on first use.
/// Only the source fetch runs on the runtime; lookups and the insert are
/// blocking.
pub async fn get_or_fetch(
    State(state): State<AppState>,
    Json(req): Json<TranscriptRequest>,
) -> ApiResult<impl IntoResponse> {
    let video_url = req.video_url.trim().to_string();

    let url = video_url.clone();
    if let Some(cached) = blocking(&state, move |s| service(s).cached(&url)).await? {
        return Ok(Json(cached));
    }

    let fetched = service(&state).fetch(&video_url).await?;
    let transcript = blocking(&state, move |s| service(s).store(fetched)).await?;
    Ok(Json(transcript))
}

pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<impl IntoResponse> {
    let transcripts = blocking(&state, move |s| service(s).list(query.skip, query.limit)).await?;
    Ok(Json(transcripts))
}

pub async fn get(
    State(state): State<AppState>,
    Path(transcript_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let transcript = blocking(&state, move |s| service(s).get(transcript_id)).await?;
    Ok(Json(transcript))
}

pub async fn delete(
    State(state): State<AppState>,
    Path(transcript_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    blocking(&state, move |s| service(s).delete(transcript_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
