use thiserror::Error;

use crate::password::PasswordError;
use crate::token::TokenError;
use crate::userdb::UserError;
use crate::utils::UtilError;

/// Result kinds of every session operation.
///
/// The first group is meant for the caller. `Storage` and `Crypto` are
/// infrastructure failures and carry detail for logs only.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SessionError {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Account is deactivated")]
    AccountDeactivated,

    #[error("Account is temporarily locked due to too many failed login attempts")]
    AccountLocked,

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token")]
    TokenInvalid,

    #[error("Invalid refresh token")]
    InvalidRefreshToken,

    #[error("Current password is incorrect")]
    InvalidCurrentPassword,

    #[error("Password does not meet requirements")]
    WeakPassword(Vec<String>),

    #[error("Invalid or expired reset token")]
    InvalidOrExpiredResetToken,

    #[error("Account not found")]
    NotFound,

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Crypto error: {0}")]
    Crypto(String),
}

impl SessionError {
    /// Whether this is an infrastructure failure rather than a caller-facing outcome.
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::Storage(_) | Self::Crypto(_))
    }
}

// Conversions from lower layers log the underlying failure before it is flattened

impl From<UserError> for SessionError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::NotFound => Self::NotFound,
            other => {
                tracing::error!("User store error: {}", other);
                Self::Storage(other.to_string())
            }
        }
    }
}

impl From<TokenError> for SessionError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => Self::TokenExpired,
            TokenError::Invalid(reason) => {
                tracing::debug!("Token rejected: {}", reason);
                Self::TokenInvalid
            }
            TokenError::Signing(reason) => {
                tracing::error!("Token signing error: {}", reason);
                Self::Crypto(reason)
            }
        }
    }
}

impl From<PasswordError> for SessionError {
    fn from(err: PasswordError) -> Self {
        tracing::error!("Password hashing error: {}", err);
        Self::Crypto(err.to_string())
    }
}

impl From<UtilError> for SessionError {
    fn from(err: UtilError) -> Self {
        tracing::error!("Utils error: {}", err);
        Self::Crypto(err.to_string())
    }
}

impl From<tokio::task::JoinError> for SessionError {
    fn from(err: tokio::task::JoinError) -> Self {
        tracing::error!("Blocking task failed: {}", err);
        Self::Crypto(err.to_string())
    }
}
