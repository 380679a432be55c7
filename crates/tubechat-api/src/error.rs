use axum::{
    Json,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use tubechat_llm::{LlmError, ProviderKind};
use tubechat_types::api::ErrorBody;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Bad input the caller can fix.
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    /// The entity exists but belongs to someone else.
    #[error("{0}")]
    Forbidden(String),

    /// Bearer token missing, malformed, badly signed, expired, or naming
    /// a user that no longer exists.
    #[error("Could not validate credentials")]
    InvalidToken,

    #[error("Incorrect email or password")]
    InvalidCredentials,

    /// A required provider credential is missing. Operator-fixable.
    #[error("{0}")]
    Configuration(String),

    #[error("{provider} API error: {message}")]
    Provider {
        provider: ProviderKind,
        message: String,
    },

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        ApiError::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        ApiError::NotFound(msg.into())
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::InvalidToken | ApiError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ApiError::Configuration(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Provider { .. } => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<LlmError> for ApiError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::NotConfigured { .. } => ApiError::Configuration(err.to_string()),
            LlmError::Provider { provider, message } => ApiError::Provider { provider, message },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let detail = match &self {
            ApiError::Internal(e) => {
                error!("Internal error: {:#}", e);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(ErrorBody { detail });
        match self {
            ApiError::InvalidToken | ApiError::InvalidCredentials => {
                (status, [(header::WWW_AUTHENTICATE, "Bearer")], body).into_response()
            }
            _ => (status, body).into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn llm_errors_map_onto_taxonomy() {
        let err: ApiError = LlmError::NotConfigured {
            provider: ProviderKind::OpenAi,
        }
        .into();
        assert!(matches!(err, ApiError::Configuration(_)));
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);

        let err: ApiError = LlmError::Provider {
            provider: ProviderKind::Anthropic,
            message: "429 Too Many Requests".into(),
        }
        .into();
        assert_eq!(err.to_string(), "Anthropic API error: 429 Too Many Requests");
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn internal_errors_hide_details() {
        let response = ApiError::Internal(anyhow::anyhow!("disk on fire")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn auth_failures_carry_challenge_header() {
        let response = ApiError::InvalidToken.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()[header::WWW_AUTHENTICATE], "Bearer");
    }
}
