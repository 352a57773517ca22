use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::userdb::{
    errors::UserError,
    types::{Account, NewAccount},
};

/// Persistent home of account records.
///
/// Every mutation is addressed by account id and touches only the named
/// fields. Updates addressed to an unknown id fail with [`UserError::NotFound`].
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Create the backing schema if it is missing and validate it.
    async fn init(&self) -> Result<(), UserError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<Account>, UserError>;

    /// Case-insensitive lookup.
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, UserError>;

    /// Account whose stored refresh token equals `token` and has not expired at `now`.
    async fn find_by_refresh_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Account>, UserError>;

    /// Account whose stored reset token equals `token` and has not expired at `now`.
    async fn find_by_reset_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Account>, UserError>;

    async fn create_account(&self, new: NewAccount) -> Result<Account, UserError>;

    async fn update_login_attempts(
        &self,
        id: &str,
        attempts: u32,
        lock_until: Option<DateTime<Utc>>,
    ) -> Result<(), UserError>;

    /// Reset the failure counter, clear any lock and stamp the login time.
    async fn record_successful_login(&self, id: &str, at: DateTime<Utc>)
    -> Result<(), UserError>;

    /// Overwrite the stored refresh token, or clear it with `None`.
    async fn set_refresh_token(
        &self,
        id: &str,
        token: Option<(&str, DateTime<Utc>)>,
    ) -> Result<(), UserError>;

    async fn set_reset_token(
        &self,
        id: &str,
        token: Option<(&str, DateTime<Utc>)>,
    ) -> Result<(), UserError>;

    /// Replace the password digest and clear the forced-change flag.
    async fn update_password(&self, id: &str, password_hash: &str) -> Result<(), UserError>;

    /// Single-use redemption of a reset token.
    ///
    /// In one atomic step: when `token` is still stored and unexpired at `now`,
    /// set the new digest, clear the forced-change flag and clear the reset
    /// token. Returns the affected account id, or `None` when nothing matched.
    async fn consume_reset_token(
        &self,
        token: &str,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<String>, UserError>;

    async fn set_requires_password_change(&self, id: &str, flag: bool) -> Result<(), UserError>;
}
