//! Central configuration for the pm_auth crate
//!
//! All settings are gathered into an [`AuthConfig`] that the process bootstrap
//! builds once (usually with [`AuthConfig::from_env`]) and hands to the
//! [`SessionManager`](crate::SessionManager). Nothing in this crate reads the
//! environment on its own.

use std::fmt;

use chrono::Duration;
use thiserror::Error;

use crate::password::{MAX_BCRYPT_COST, MIN_BCRYPT_COST};

/// Default issuer embedded in every token.
pub const DEFAULT_TOKEN_ISSUER: &str = "project-management-api";

const DEFAULT_ACCESS_TTL_SECS: i64 = 15 * 60;
const DEFAULT_REFRESH_TTL_SECS: i64 = 7 * 24 * 60 * 60;
const DEFAULT_BCRYPT_COST: u32 = 12;
const DEFAULT_MAX_LOGIN_ATTEMPTS: u32 = 5;
const DEFAULT_LOCK_SECS: i64 = 15 * 60;
const DEFAULT_RESET_TTL_SECS: i64 = 60 * 60;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Missing configuration value: {0}")]
    Missing(&'static str),

    #[error("Invalid configuration value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Signing material and lifetimes for the two token classes.
#[derive(Clone)]
pub struct TokenConfig {
    pub(crate) access_secret: Vec<u8>,
    pub(crate) refresh_secret: Vec<u8>,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    pub issuer: String,
}

impl TokenConfig {
    /// Build a token configuration with the default lifetimes (15 minutes / 7 days).
    ///
    /// Fails when either secret is empty or when both secrets are identical,
    /// since a refresh token must never verify as an access token.
    pub fn new(
        access_secret: impl Into<Vec<u8>>,
        refresh_secret: impl Into<Vec<u8>>,
    ) -> Result<Self, ConfigError> {
        let access_secret = access_secret.into();
        let refresh_secret = refresh_secret.into();

        if access_secret.is_empty() {
            return Err(ConfigError::Missing("JWT_ACCESS_SECRET"));
        }
        if refresh_secret.is_empty() {
            return Err(ConfigError::Missing("JWT_REFRESH_SECRET"));
        }
        if access_secret == refresh_secret {
            return Err(ConfigError::Invalid {
                key: "JWT_REFRESH_SECRET",
                reason: "must differ from JWT_ACCESS_SECRET".to_string(),
            });
        }

        Ok(Self {
            access_secret,
            refresh_secret,
            access_ttl: Duration::seconds(DEFAULT_ACCESS_TTL_SECS),
            refresh_ttl: Duration::seconds(DEFAULT_REFRESH_TTL_SECS),
            issuer: DEFAULT_TOKEN_ISSUER.to_string(),
        })
    }

    pub fn with_ttls(mut self, access_ttl: Duration, refresh_ttl: Duration) -> Self {
        self.access_ttl = access_ttl;
        self.refresh_ttl = refresh_ttl;
        self
    }

    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = issuer.into();
        self
    }
}

impl fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenConfig")
            .field("access_secret", &"[redacted]")
            .field("refresh_secret", &"[redacted]")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .field("issuer", &self.issuer)
            .finish()
    }
}

/// Brute-force lockout policy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LockoutPolicy {
    /// Failed attempts after which the account is locked
    pub max_attempts: u32,
    /// How long the lock lasts
    pub lock_duration: Duration,
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_LOGIN_ATTEMPTS,
            lock_duration: Duration::seconds(DEFAULT_LOCK_SECS),
        }
    }
}

/// Everything the session manager needs, injected at construction.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub token: TokenConfig,
    pub lockout: LockoutPolicy,
    /// bcrypt work factor
    pub bcrypt_cost: u32,
    /// Lifetime of a password reset token
    pub reset_token_ttl: Duration,
    /// Revoke the stored refresh token when the password is changed or reset
    pub revoke_sessions_on_password_change: bool,
}

impl AuthConfig {
    pub fn new(token: TokenConfig) -> Self {
        Self {
            token,
            lockout: LockoutPolicy::default(),
            bcrypt_cost: DEFAULT_BCRYPT_COST,
            reset_token_ttl: Duration::seconds(DEFAULT_RESET_TTL_SECS),
            revoke_sessions_on_password_change: true,
        }
    }

    /// Read the configuration from process environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `JWT_ACCESS_SECRET` | required |
    /// | `JWT_REFRESH_SECRET` | required, must differ from the access secret |
    /// | `JWT_ACCESS_EXPIRY_SECS` | 900 |
    /// | `JWT_REFRESH_EXPIRY_SECS` | 604800 |
    /// | `JWT_ISSUER` | `project-management-api` |
    /// | `BCRYPT_ROUNDS` | 12 |
    /// | `LOGIN_MAX_ATTEMPTS` | 5 |
    /// | `LOGIN_LOCK_SECS` | 900 |
    /// | `PASSWORD_RESET_TTL_SECS` | 3600 |
    /// | `REVOKE_SESSIONS_ON_PASSWORD_CHANGE` | true |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`AuthConfig::from_env`] but reading values through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let access_secret =
            lookup("JWT_ACCESS_SECRET").ok_or(ConfigError::Missing("JWT_ACCESS_SECRET"))?;
        let refresh_secret =
            lookup("JWT_REFRESH_SECRET").ok_or(ConfigError::Missing("JWT_REFRESH_SECRET"))?;

        let access_ttl = parse_number(&lookup, "JWT_ACCESS_EXPIRY_SECS", DEFAULT_ACCESS_TTL_SECS)?;
        let refresh_ttl =
            parse_number(&lookup, "JWT_REFRESH_EXPIRY_SECS", DEFAULT_REFRESH_TTL_SECS)?;

        let mut token = TokenConfig::new(access_secret, refresh_secret)?
            .with_ttls(Duration::seconds(access_ttl), Duration::seconds(refresh_ttl));
        if let Some(issuer) = lookup("JWT_ISSUER") {
            token = token.with_issuer(issuer);
        }

        let bcrypt_cost = parse_number(&lookup, "BCRYPT_ROUNDS", DEFAULT_BCRYPT_COST)?;
        if !(MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(&bcrypt_cost) {
            return Err(ConfigError::Invalid {
                key: "BCRYPT_ROUNDS",
                reason: format!("must be between {MIN_BCRYPT_COST} and {MAX_BCRYPT_COST}"),
            });
        }

        let max_attempts = parse_number(&lookup, "LOGIN_MAX_ATTEMPTS", DEFAULT_MAX_LOGIN_ATTEMPTS)?;
        if max_attempts == 0 {
            return Err(ConfigError::Invalid {
                key: "LOGIN_MAX_ATTEMPTS",
                reason: "must be at least 1".to_string(),
            });
        }
        let lock_secs = parse_number(&lookup, "LOGIN_LOCK_SECS", DEFAULT_LOCK_SECS)?;
        let reset_secs = parse_number(&lookup, "PASSWORD_RESET_TTL_SECS", DEFAULT_RESET_TTL_SECS)?;

        let revoke_sessions_on_password_change = lookup("REVOKE_SESSIONS_ON_PASSWORD_CHANGE")
            .map(|val| val.to_lowercase() != "false")
            .unwrap_or(true);

        Ok(Self {
            token,
            lockout: LockoutPolicy {
                max_attempts,
                lock_duration: Duration::seconds(lock_secs),
            },
            bcrypt_cost,
            reset_token_ttl: Duration::seconds(reset_secs),
            revoke_sessions_on_password_change,
        })
    }
}

fn parse_number<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            reason: e.to_string(),
        }),
    }
}
