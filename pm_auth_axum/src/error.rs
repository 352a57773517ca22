use axum::{
    Json,
    response::{IntoResponse, Response},
};
use http::StatusCode;
use serde::Serialize;

use pm_auth::SessionError;

/// Machine-readable reason attached to authentication failures so the client
/// can choose between a silent refresh and a forced re-login.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    MissingToken,
    TokenExpired,
    InvalidToken,
    Unauthorized,
    Forbidden,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<ErrorCode>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<String>,
}

/// Error returned by every handler and middleware, rendered as
/// `{"error": ..., "code": ...}`.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody {
                error: message.into(),
                code: None,
                details: Vec::new(),
            },
        }
    }

    pub fn with_code(mut self, code: ErrorCode) -> Self {
        self.body.code = Some(code);
        self
    }

    pub fn with_details(mut self, details: Vec<String>) -> Self {
        self.body.details = details;
        self
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn missing_token(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message).with_code(ErrorCode::MissingToken)
    }

    pub fn token_expired(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message).with_code(ErrorCode::TokenExpired)
    }

    pub fn invalid_token(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message).with_code(ErrorCode::InvalidToken)
    }

    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "Authentication required")
            .with_code(ErrorCode::Unauthorized)
    }

    pub fn forbidden() -> Self {
        Self::new(StatusCode::FORBIDDEN, "Insufficient permissions").with_code(ErrorCode::Forbidden)
    }

    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn body(&self) -> &ErrorBody {
        &self.body
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// Map session failures to status codes. Infrastructure detail is logged
/// and replaced by a generic message.
impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::InvalidCredentials
            | SessionError::AccountDeactivated
            | SessionError::AccountLocked => Self::new(StatusCode::UNAUTHORIZED, err.to_string()),
            SessionError::TokenExpired => Self::token_expired(err.to_string()),
            SessionError::TokenInvalid | SessionError::InvalidRefreshToken => {
                Self::invalid_token(err.to_string())
            }
            SessionError::InvalidCurrentPassword | SessionError::InvalidOrExpiredResetToken => {
                Self::bad_request(err.to_string())
            }
            SessionError::WeakPassword(ref errors) => {
                Self::bad_request(err.to_string()).with_details(errors.clone())
            }
            SessionError::NotFound => Self::new(StatusCode::NOT_FOUND, err.to_string()),
            SessionError::Storage(_) | SessionError::Crypto(_) => {
                tracing::error!("Request failed: {}", err);
                Self::internal()
            }
        }
    }
}

/// Helper trait for converting errors to [`ApiError`]
pub(crate) trait IntoResponseError<T> {
    fn into_response_error(self) -> Result<T, ApiError>;
}

impl<T> IntoResponseError<T> for Result<T, SessionError> {
    fn into_response_error(self) -> Result<T, ApiError> {
        self.map_err(ApiError::from)
    }
}

/// Implementation for http::Error (used when building header values)
impl<T> IntoResponseError<T> for http::Result<T> {
    fn into_response_error(self) -> Result<T, ApiError> {
        self.map_err(|e| {
            tracing::error!("Failed to build response: {}", e);
            ApiError::internal()
        })
    }
}
