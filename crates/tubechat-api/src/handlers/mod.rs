pub mod chats;
pub mod transcripts;
pub mod users;

use axum::Json;
use serde_json::{Value, json};
use tracing::error;

use crate::error::ApiResult;
use crate::state::{AppState, AppStateInner};

pub async fn root() -> Json<Value> {
    Json(json!({
        "message": "YouTube Transcript Chat API",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

/// Run synchronous service code (SQLite, password hashing) off the async
/// runtime.
pub(crate) async fn blocking<F, T>(state: &AppState, f: F) -> ApiResult<T>
where
    F: FnOnce(&AppStateInner) -> ApiResult<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            anyhow::anyhow!("blocking task failed: {}", e)
        })?
}
