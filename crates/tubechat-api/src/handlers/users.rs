use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use tubechat_types::api::{LoginRequest, LoginResponse, RegisterRequest, UpdateProfileRequest};

use super::blocking;
use crate::error::{ApiError, ApiResult};
use crate::middleware::CurrentUser;
use crate::state::AppState;
use crate::users::UserService;

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    let user = blocking(&state, move |s| UserService::new(&s.db).register(req)).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let user = blocking(&state, move |s| {
        UserService::new(&s.db).authenticate(&req.email, &req.password)
    })
    .await?
    .ok_or(ApiError::InvalidCredentials)?;

    let access_token = state.tokens.issue(user.user_id)?;
    Ok(Json(LoginResponse {
        access_token,
        token_type: "bearer",
        user,
    }))
}

pub async fn me(Extension(CurrentUser(user)): Extension<CurrentUser>) -> impl IntoResponse {
    Json(user)
}

pub async fn update_me(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(req): Json<UpdateProfileRequest>,
) -> ApiResult<impl IntoResponse> {
    let updated = blocking(&state, move |s| {
        UserService::new(&s.db).update_profile(user.user_id, req)
    })
    .await?;
    Ok(Json(updated))
}

pub async fn delete_me(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> ApiResult<StatusCode> {
    blocking(&state, move |s| UserService::new(&s.db).delete(user.user_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Profiles are private: only the account itself or an admin may read
/// one by id.
pub async fn get_user(
    State(state): State<AppState>,
    Extension(CurrentUser(caller)): Extension<CurrentUser>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    if caller.user_id != user_id && !caller.is_admin {
        return Err(ApiError::Forbidden("Not authorized to view this user".into()));
    }
    let user = blocking(&state, move |s| UserService::new(&s.db).get(user_id)).await?;
    Ok(Json(user))
}
