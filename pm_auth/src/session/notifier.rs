use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::userdb::SanitizedAccount;

/// Delivery channel for password reset tokens.
///
/// Delivery itself (mail, SMS) lives outside this crate. A failed delivery
/// is logged by the caller and does not undo the stored token.
#[async_trait]
pub trait ResetNotifier: Send + Sync {
    async fn deliver(
        &self,
        account: &SanitizedAccount,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), String>;
}

/// Notifier that only records that a reset was requested.
///
/// The token value is never written to the log.
#[derive(Debug, Default, Clone)]
pub struct LoggingResetNotifier;

#[async_trait]
impl ResetNotifier for LoggingResetNotifier {
    async fn deliver(
        &self,
        account: &SanitizedAccount,
        _token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), String> {
        tracing::info!(
            account_id = %account.id,
            expires_at = %expires_at,
            "Password reset requested; no delivery channel configured"
        );
        Ok(())
    }
}

/// Development notifier that writes the full reset link to the log.
///
/// Anyone with log access can take over the account, so only enable it on
/// local setups without a mail channel.
#[derive(Debug, Clone)]
pub struct ResetLinkLogger {
    base_url: String,
}

impl ResetLinkLogger {
    /// `base_url` is the frontend origin, e.g. `http://localhost:5173`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn reset_link(&self, token: &str) -> String {
        format!("{}/reset-password?token={}", self.base_url, token)
    }
}

#[async_trait]
impl ResetNotifier for ResetLinkLogger {
    async fn deliver(
        &self,
        account: &SanitizedAccount,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), String> {
        tracing::warn!(
            account_id = %account.id,
            email = %account.email,
            link = %self.reset_link(token),
            expires_at = %expires_at,
            "Password reset link (development only)"
        );
        Ok(())
    }
}
