use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
    typed_header::TypedHeaderRejection,
};

use tubechat_types::models::User;

use crate::error::{ApiError, ApiResult};
use crate::handlers::blocking;
use crate::state::AppState;

/// The authenticated caller, inserted as a request extension.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// Validate the bearer token and load the user it names. A missing or
/// malformed header, a bad token and a deleted user all yield the same 401.
pub async fn require_auth(
    State(state): State<AppState>,
    bearer: Result<TypedHeader<Authorization<Bearer>>, TypedHeaderRejection>,
    mut req: Request,
    next: Next,
) -> ApiResult<Response> {
    let TypedHeader(Authorization(bearer)) = bearer.map_err(|_| ApiError::InvalidToken)?;
    let user_id = state.tokens.validate(bearer.token())?;

    let user = blocking(&state, move |s| Ok(s.db.repo::<User>().get(user_id)?))
        .await?
        .ok_or(ApiError::InvalidToken)?;

    req.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(req).await)
}
