//! pm_auth - Session and credential core for the project management backend
//!
//! This crate owns account credentials, the access/refresh token pair, login
//! lockout and the password reset flow. HTTP concerns live in `pm_auth_axum`.

mod config;
mod password;
mod session;
mod storage;
mod token;
mod userdb;
mod utils;

#[cfg(test)]
mod test_utils;

pub use config::{AuthConfig, ConfigError, DEFAULT_TOKEN_ISSUER, LockoutPolicy, TokenConfig};

pub use password::{
    MAX_BCRYPT_COST, MIN_BCRYPT_COST, PasswordError, PasswordHasher, PasswordRule,
    PasswordStrength, validate_strength,
};

pub use session::{
    LoggingResetNotifier, LoginOutcome, ResetLinkLogger, ResetNotifier, ResetTokenStatus,
    SessionError, SessionManager,
};

pub use storage::{
    DEFAULT_TABLE_PREFIX, DataStore, DataStoreConfig, DataStoreKind, PostgresDataStore,
    SqliteDataStore, StorageError,
};

pub use token::{IssuedToken, TokenClaims, TokenError, TokenKind, TokenPair, TokenService};

pub use userdb::{
    Account, AccountLockState, CredentialStore, InMemoryCredentialStore, NewAccount, Role,
    SanitizedAccount, SqlCredentialStore, UserError, normalize_email,
};

pub use utils::{UtilError, gen_token_id};
