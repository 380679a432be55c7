use axum::{
    Router, middleware,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{self, chats, transcripts, users};
use crate::middleware::require_auth;
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/api/users/register", post(users::register))
        .route("/api/users/login", post(users::login));

    let protected_routes = Router::new()
        .route(
            "/api/users/me",
            get(users::me).put(users::update_me).delete(users::delete_me),
        )
        .route("/api/users/{user_id}", get(users::get_user))
        .route(
            "/api/transcripts",
            post(transcripts::get_or_fetch).get(transcripts::list),
        )
        .route(
            "/api/transcripts/{transcript_id}",
            get(transcripts::get).delete(transcripts::delete),
        )
        .route("/api/chats", post(chats::create_chat).get(chats::list_chats))
        .route(
            "/api/chats/{chat_id}",
            get(chats::get_chat).delete(chats::delete_chat),
        )
        .route(
            "/api/chats/{chat_id}/messages",
            post(chats::send_message).get(chats::get_messages),
        )
        .route(
            "/api/chats/transcript/{transcript_id}",
            get(chats::chats_for_transcript),
        )
        .route("/api/chats/{chat_id}/llm", post(chats::chat_with_llm))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
