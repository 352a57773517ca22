use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::errors::UserError;

/// Authorization class of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Manager,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Manager => "manager",
            Self::User => "user",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = UserError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Self::Admin),
            "manager" => Ok(Self::Manager),
            "user" => Ok(Self::User),
            other => Err(UserError::InvalidData(format!("Unknown role: {other}"))),
        }
    }
}

/// A credential record as held by the credential store.
///
/// Contains the password digest and live token values, so it never leaves
/// the library. Use [`SanitizedAccount`] for anything sent to a client.
#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    pub id: String,
    /// Always stored lowercase
    pub email: String,
    pub name: String,
    pub role: Role,
    pub password_hash: String,
    pub is_active: bool,
    pub login_attempts: u32,
    pub lock_until: Option<DateTime<Utc>>,
    pub last_login: Option<DateTime<Utc>>,
    pub refresh_token: Option<String>,
    pub refresh_token_expires_at: Option<DateTime<Utc>>,
    pub password_reset_token: Option<String>,
    pub password_reset_expires: Option<DateTime<Utc>>,
    pub requires_password_change: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Build a freshly provisioned account from provisioning input.
    pub fn provision(new: NewAccount, id: String, now: DateTime<Utc>) -> Self {
        Self {
            id,
            email: normalize_email(&new.email),
            name: new.name,
            role: new.role,
            password_hash: new.password_hash,
            is_active: true,
            login_attempts: 0,
            lock_until: None,
            last_login: None,
            refresh_token: None,
            refresh_token_expires_at: None,
            password_reset_token: None,
            password_reset_expires: None,
            requires_password_change: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn lock_state(&self, now: DateTime<Utc>) -> AccountLockState {
        if !self.is_active {
            return AccountLockState::Inactive;
        }
        match self.lock_until {
            Some(until) if until > now => AccountLockState::Locked(until),
            _ => AccountLockState::Unlocked,
        }
    }

    pub fn sanitized(&self) -> SanitizedAccount {
        SanitizedAccount::from(self)
    }
}

/// Lockout view of an account at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountLockState {
    Unlocked,
    Locked(DateTime<Utc>),
    Inactive,
}

/// Outward view of an account. Carries no password digest and no token values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SanitizedAccount {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub is_active: bool,
    pub login_attempts: u32,
    pub lock_until: Option<DateTime<Utc>>,
    pub last_login: Option<DateTime<Utc>>,
    pub requires_password_change: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Account> for SanitizedAccount {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id.clone(),
            email: account.email.clone(),
            name: account.name.clone(),
            role: account.role,
            is_active: account.is_active,
            login_attempts: account.login_attempts,
            lock_until: account.lock_until,
            last_login: account.last_login,
            requires_password_change: account.requires_password_change,
            created_at: account.created_at,
            updated_at: account.updated_at,
        }
    }
}

/// Provisioning input. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub name: String,
    pub role: Role,
    pub password_hash: String,
}

/// Lowercased, trimmed form used as the email comparison key.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Raw row shape shared by the SQL backends.
#[derive(Debug, FromRow)]
pub(crate) struct AccountRow {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: String,
    pub password_hash: String,
    pub is_active: bool,
    pub login_attempts: i64,
    pub lock_until: Option<DateTime<Utc>>,
    pub last_login: Option<DateTime<Utc>>,
    pub refresh_token: Option<String>,
    pub refresh_token_expires_at: Option<DateTime<Utc>>,
    pub password_reset_token: Option<String>,
    pub password_reset_expires: Option<DateTime<Utc>>,
    pub requires_password_change: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<AccountRow> for Account {
    type Error = UserError;

    fn try_from(row: AccountRow) -> Result<Self, Self::Error> {
        let login_attempts = u32::try_from(row.login_attempts).map_err(|_| {
            UserError::InvalidData(format!(
                "login_attempts out of range for account {}",
                row.id
            ))
        })?;

        Ok(Self {
            role: row.role.parse()?,
            id: row.id,
            email: row.email,
            name: row.name,
            password_hash: row.password_hash,
            is_active: row.is_active,
            login_attempts,
            lock_until: row.lock_until,
            last_login: row.last_login,
            refresh_token: row.refresh_token,
            refresh_token_expires_at: row.refresh_token_expires_at,
            password_reset_token: row.password_reset_token,
            password_reset_expires: row.password_reset_expires,
            requires_password_change: row.requires_password_change,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
