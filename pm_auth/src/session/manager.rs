use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::config::{AuthConfig, LockoutPolicy};
use crate::password::{PasswordHasher, validate_strength};
use crate::token::{TokenClaims, TokenPair, TokenService};
use crate::userdb::{
    Account, AccountLockState, CredentialStore, NewAccount, Role, SanitizedAccount, UserError,
};
use crate::utils::gen_token_id;

use super::errors::SessionError;
use super::notifier::{LoggingResetNotifier, ResetNotifier};
use super::types::{LoginOutcome, ResetTokenStatus};

/// Orchestrates login, rotation, revocation and the password flows.
///
/// Holds no per-session state. Everything persistent goes through the
/// [`CredentialStore`], so one manager can serve any number of requests.
pub struct SessionManager {
    store: Arc<dyn CredentialStore>,
    tokens: TokenService,
    hasher: Arc<PasswordHasher>,
    notifier: Arc<dyn ResetNotifier>,
    lockout: LockoutPolicy,
    reset_token_ttl: Duration,
    revoke_sessions_on_password_change: bool,
}

impl fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionManager")
            .field("tokens", &self.tokens)
            .field("lockout", &self.lockout)
            .field("reset_token_ttl", &self.reset_token_ttl)
            .field(
                "revoke_sessions_on_password_change",
                &self.revoke_sessions_on_password_change,
            )
            .finish_non_exhaustive()
    }
}

impl SessionManager {
    pub fn new(config: AuthConfig, store: Arc<dyn CredentialStore>) -> Result<Self, SessionError> {
        let hasher = PasswordHasher::new(config.bcrypt_cost)?;

        Ok(Self {
            store,
            tokens: TokenService::new(&config.token),
            hasher: Arc::new(hasher),
            notifier: Arc::new(LoggingResetNotifier),
            lockout: config.lockout,
            reset_token_ttl: config.reset_token_ttl,
            revoke_sessions_on_password_change: config.revoke_sessions_on_password_change,
        })
    }

    /// Replace the channel that receives password reset tokens.
    pub fn with_notifier(mut self, notifier: Arc<dyn ResetNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    /// Authenticate with email and password and open a session.
    #[tracing::instrument(skip(self, email, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginOutcome, SessionError> {
        let now = Utc::now();

        let Some(mut account) = self.store.find_by_email(email).await? else {
            // Same hashing work as a real check so timing does not reveal registration
            self.verify_dummy(password).await?;
            tracing::info!("Login rejected: unknown email");
            return Err(SessionError::InvalidCredentials);
        };

        match account.lock_state(now) {
            AccountLockState::Inactive => {
                tracing::info!(account_id = %account.id, "Login rejected: account deactivated");
                return Err(SessionError::AccountDeactivated);
            }
            AccountLockState::Locked(until) => {
                tracing::info!(account_id = %account.id, %until, "Login rejected: account locked");
                return Err(SessionError::AccountLocked);
            }
            AccountLockState::Unlocked => {}
        }

        if !self
            .verify_password(password, &account.password_hash)
            .await?
        {
            self.register_failed_attempt(&account, now).await?;
            return Err(SessionError::InvalidCredentials);
        }

        self.store.record_successful_login(&account.id, now).await?;
        account.login_attempts = 0;
        account.lock_until = None;
        account.last_login = Some(now);

        let tokens = self.open_session(&account).await?;
        tracing::info!(account_id = %account.id, "Login succeeded");

        Ok(LoginOutcome {
            tokens,
            account: account.sanitized(),
        })
    }

    /// Exchange a live refresh token for a fresh pair. The presented token is
    /// retired in the same step.
    #[tracing::instrument(skip(self, presented))]
    pub async fn refresh(&self, presented: &str) -> Result<LoginOutcome, SessionError> {
        let claims = self.tokens.verify_refresh(presented)?;

        let account = self
            .store
            .find_by_refresh_token(presented, Utc::now())
            .await?
            .ok_or_else(|| {
                tracing::info!(account_id = %claims.user_id, "Refresh rejected: token not current");
                SessionError::InvalidRefreshToken
            })?;

        if account.id != claims.user_id {
            tracing::warn!(
                account_id = %account.id,
                claimed = %claims.user_id,
                "Refresh rejected: token owner mismatch"
            );
            return Err(SessionError::InvalidRefreshToken);
        }
        if !account.is_active {
            return Err(SessionError::AccountDeactivated);
        }

        let tokens = self.open_session(&account).await?;
        tracing::debug!(account_id = %account.id, "Session rotated");

        Ok(LoginOutcome {
            tokens,
            account: account.sanitized(),
        })
    }

    /// Revoke the stored refresh token. Calling it again, or for an unknown
    /// account, is not an error.
    #[tracing::instrument(skip(self))]
    pub async fn logout(&self, account_id: &str) -> Result<(), SessionError> {
        match self.store.set_refresh_token(account_id, None).await {
            Ok(()) => {
                tracing::info!("Session revoked");
                Ok(())
            }
            Err(UserError::NotFound) => {
                tracing::debug!("Logout for unknown account");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Revoke the session identified by a refresh token.
    ///
    /// Only the account's current refresh token revokes anything; a token
    /// already retired by rotation is ignored. Returns whether a session
    /// was revoked.
    #[tracing::instrument(skip(self, presented))]
    pub async fn logout_by_refresh_token(&self, presented: &str) -> Result<bool, SessionError> {
        let Ok(claims) = self.tokens.verify_refresh(presented) else {
            tracing::debug!("Logout with unverifiable refresh token");
            return Ok(false);
        };

        match self
            .store
            .find_by_refresh_token(presented, Utc::now())
            .await?
        {
            Some(account) if account.id == claims.user_id => {
                self.logout(&account.id).await?;
                Ok(true)
            }
            _ => {
                tracing::info!(account_id = %claims.user_id, "Logout ignored: refresh token not current");
                Ok(false)
            }
        }
    }

    #[tracing::instrument(skip(self))]
    pub async fn current_account(&self, account_id: &str) -> Result<SanitizedAccount, SessionError> {
        self.store
            .find_by_id(account_id)
            .await?
            .map(|account| account.sanitized())
            .ok_or(SessionError::NotFound)
    }

    #[tracing::instrument(skip(self, current, new))]
    pub async fn change_password(
        &self,
        account_id: &str,
        current: &str,
        new: &str,
    ) -> Result<(), SessionError> {
        let account = self
            .store
            .find_by_id(account_id)
            .await?
            .ok_or(SessionError::NotFound)?;

        if !self.verify_password(current, &account.password_hash).await? {
            tracing::info!("Password change rejected: current password mismatch");
            return Err(SessionError::InvalidCurrentPassword);
        }

        let strength = validate_strength(new);
        if !strength.is_valid {
            return Err(SessionError::WeakPassword(strength.errors()));
        }

        let hash = self.hash_password(new).await?;
        self.store.update_password(&account.id, &hash).await?;

        if self.revoke_sessions_on_password_change {
            self.store.set_refresh_token(&account.id, None).await?;
        }

        tracing::info!("Password changed");
        Ok(())
    }

    /// Start the reset flow. Unknown emails succeed silently.
    #[tracing::instrument(skip(self, email))]
    pub async fn forgot_password(&self, email: &str) -> Result<(), SessionError> {
        let Some(account) = self.store.find_by_email(email).await? else {
            // Same token work and one store round-trip, matching the known-email path
            let token = gen_token_id()?;
            let _ = self
                .store
                .find_by_reset_token(&token, Utc::now() + self.reset_token_ttl)
                .await?;
            tracing::info!("Password reset requested for unknown email");
            return Ok(());
        };

        if !account.is_active {
            return Err(SessionError::AccountDeactivated);
        }

        let token = gen_token_id()?;
        let expires_at = Utc::now() + self.reset_token_ttl;
        self.store
            .set_reset_token(&account.id, Some((&token, expires_at)))
            .await?;

        if let Err(e) = self
            .notifier
            .deliver(&account.sanitized(), &token, expires_at)
            .await
        {
            tracing::warn!(account_id = %account.id, error = %e, "Reset token delivery failed");
        }

        tracing::info!(account_id = %account.id, "Password reset token issued");
        Ok(())
    }

    #[tracing::instrument(skip(self, token))]
    pub async fn validate_reset_token(&self, token: &str) -> Result<ResetTokenStatus, SessionError> {
        let status = match self.store.find_by_reset_token(token, Utc::now()).await? {
            Some(account) => ResetTokenStatus {
                is_valid: true,
                email: Some(account.email),
            },
            None => ResetTokenStatus::invalid(),
        };
        Ok(status)
    }

    /// Redeem a reset token. The token is usable exactly once.
    #[tracing::instrument(skip(self, token, new))]
    pub async fn reset_password(&self, token: &str, new: &str) -> Result<(), SessionError> {
        if self
            .store
            .find_by_reset_token(token, Utc::now())
            .await?
            .is_none()
        {
            return Err(SessionError::InvalidOrExpiredResetToken);
        }

        let strength = validate_strength(new);
        if !strength.is_valid {
            return Err(SessionError::WeakPassword(strength.errors()));
        }

        let hash = self.hash_password(new).await?;

        // A concurrent redemption may have won between lookup and here
        let account_id = self
            .store
            .consume_reset_token(token, &hash, Utc::now())
            .await?
            .ok_or(SessionError::InvalidOrExpiredResetToken)?;

        if self.revoke_sessions_on_password_change {
            self.store.set_refresh_token(&account_id, None).await?;
        }

        tracing::info!(account_id = %account_id, "Password reset completed");
        Ok(())
    }

    /// Require the account to pick a new password at its next opportunity.
    #[tracing::instrument(skip(self))]
    pub async fn force_password_change(&self, account_id: &str) -> Result<(), SessionError> {
        self.store
            .set_requires_password_change(account_id, true)
            .await?;
        tracing::info!("Password change forced");
        Ok(())
    }

    /// Check an access token. Pure: no store access.
    pub fn verify_access_token(&self, token: &str) -> Result<TokenClaims, SessionError> {
        Ok(self.tokens.verify_access(token)?)
    }

    /// Create an account with a plaintext initial password. The account must
    /// change that password after first login.
    #[tracing::instrument(skip(self, email, password))]
    pub async fn provision_account(
        &self,
        email: &str,
        name: &str,
        role: Role,
        password: &str,
    ) -> Result<SanitizedAccount, SessionError> {
        let strength = validate_strength(password);
        if !strength.is_valid {
            return Err(SessionError::WeakPassword(strength.errors()));
        }

        let password_hash = self.hash_password(password).await?;
        let account = self
            .store
            .create_account(NewAccount {
                email: email.to_string(),
                name: name.to_string(),
                role,
                password_hash,
            })
            .await?;

        Ok(account.sanitized())
    }

    async fn open_session(&self, account: &Account) -> Result<TokenPair, SessionError> {
        let token_id = self.tokens.new_token_id()?;
        let access = self.tokens.issue_access(account, &token_id)?;
        let refresh = self.tokens.issue_refresh(account, &token_id)?;

        // Overwrites any previous refresh token, which retires it
        self.store
            .set_refresh_token(&account.id, Some((&refresh.value, refresh.expires_at)))
            .await?;

        Ok(TokenPair { access, refresh })
    }

    async fn register_failed_attempt(
        &self,
        account: &Account,
        now: DateTime<Utc>,
    ) -> Result<(), SessionError> {
        let attempts = account.login_attempts.saturating_add(1);
        let lock_until = (attempts >= self.lockout.max_attempts)
            .then(|| now + self.lockout.lock_duration);

        self.store
            .update_login_attempts(&account.id, attempts, lock_until)
            .await?;

        match lock_until {
            Some(until) => tracing::warn!(
                account_id = %account.id,
                attempts,
                %until,
                "Account locked after repeated login failures"
            ),
            None => tracing::info!(account_id = %account.id, attempts, "Login rejected: wrong password"),
        }
        Ok(())
    }

    async fn hash_password(&self, plaintext: &str) -> Result<String, SessionError> {
        let hasher = self.hasher.clone();
        let plaintext = plaintext.to_string();
        Ok(tokio::task::spawn_blocking(move || hasher.hash(&plaintext)).await??)
    }

    async fn verify_password(&self, plaintext: &str, digest: &str) -> Result<bool, SessionError> {
        let hasher = self.hasher.clone();
        let plaintext = plaintext.to_string();
        let digest = digest.to_string();
        Ok(tokio::task::spawn_blocking(move || hasher.verify(&plaintext, &digest)).await?)
    }

    async fn verify_dummy(&self, plaintext: &str) -> Result<(), SessionError> {
        let hasher = self.hasher.clone();
        let plaintext = plaintext.to_string();
        tokio::task::spawn_blocking(move || hasher.verify_dummy(&plaintext)).await?;
        Ok(())
    }
}
