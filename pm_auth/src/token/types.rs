use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::userdb::Role;

/// The two token classes. Carried inside the claims so a token of one class is
/// refused by the verifier of the other even before the signature matters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Fixed claim schema shared by access and refresh tokens.
///
/// Unknown fields are rejected at verification time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TokenClaims {
    pub user_id: String,
    pub email: String,
    pub role: Role,
    pub token_id: String,
    pub typ: TokenKind,
    pub iss: String,
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

/// A signed token together with the instant it stops being valid.
#[derive(Debug, Clone, PartialEq)]
pub struct IssuedToken {
    pub value: String,
    pub expires_at: DateTime<Utc>,
}

/// Access and refresh token minted together under one token id.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenPair {
    pub access: IssuedToken,
    pub refresh: IssuedToken,
}
