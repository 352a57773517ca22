use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};

use crate::config::TokenConfig;
use crate::userdb::Account;
use crate::utils::{UtilError, gen_token_id};

use super::errors::TokenError;
use super::types::{IssuedToken, TokenClaims, TokenKind};

struct KeyPair {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl KeyPair {
    fn from_secret(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }
}

/// Issues and verifies the short-lived access token and the long-lived
/// refresh token. Each class has its own HMAC secret.
pub struct TokenService {
    access: KeyPair,
    refresh: KeyPair,
    access_ttl: Duration,
    refresh_ttl: Duration,
    issuer: String,
}

impl fmt::Debug for TokenService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenService")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .field("issuer", &self.issuer)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    pub fn new(config: &TokenConfig) -> Self {
        Self {
            access: KeyPair::from_secret(&config.access_secret),
            refresh: KeyPair::from_secret(&config.refresh_secret),
            access_ttl: config.access_ttl,
            refresh_ttl: config.refresh_ttl,
            issuer: config.issuer.clone(),
        }
    }

    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    /// Fresh `tokenId` shared by the two tokens of one pair.
    pub fn new_token_id(&self) -> Result<String, UtilError> {
        gen_token_id()
    }

    pub fn issue_access(
        &self,
        account: &Account,
        token_id: &str,
    ) -> Result<IssuedToken, TokenError> {
        self.issue_at(TokenKind::Access, account, token_id, Utc::now())
    }

    pub fn issue_refresh(
        &self,
        account: &Account,
        token_id: &str,
    ) -> Result<IssuedToken, TokenError> {
        self.issue_at(TokenKind::Refresh, account, token_id, Utc::now())
    }

    pub fn verify_access(&self, token: &str) -> Result<TokenClaims, TokenError> {
        self.verify(TokenKind::Access, token)
    }

    pub fn verify_refresh(&self, token: &str) -> Result<TokenClaims, TokenError> {
        self.verify(TokenKind::Refresh, token)
    }

    pub(crate) fn issue_at(
        &self,
        kind: TokenKind,
        account: &Account,
        token_id: &str,
        issued_at: DateTime<Utc>,
    ) -> Result<IssuedToken, TokenError> {
        let (keys, ttl) = self.select(kind);
        let expires_at = issued_at + ttl;

        let claims = TokenClaims {
            user_id: account.id.clone(),
            email: account.email.clone(),
            role: account.role,
            token_id: token_id.to_string(),
            typ: kind,
            iss: self.issuer.clone(),
            sub: account.id.clone(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        };

        let value = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &keys.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))?;

        Ok(IssuedToken { value, expires_at })
    }

    fn verify(&self, kind: TokenKind, token: &str) -> Result<TokenClaims, TokenError> {
        let (keys, _) = self.select(kind);

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_issuer(&[self.issuer.as_str()]);
        validation.required_spec_claims =
            HashSet::from(["exp", "iss", "sub"].map(|claim| claim.to_string()));

        let data = jsonwebtoken::decode::<TokenClaims>(token, &keys.decoding, &validation)?;
        let claims = data.claims;

        if claims.typ != kind {
            tracing::debug!(expected = ?kind, actual = ?claims.typ, "Token class mismatch");
            return Err(TokenError::Invalid("token class mismatch".to_string()));
        }
        if claims.sub != claims.user_id {
            return Err(TokenError::Invalid("subject mismatch".to_string()));
        }

        Ok(claims)
    }

    fn select(&self, kind: TokenKind) -> (&KeyPair, Duration) {
        match kind {
            TokenKind::Access => (&self.access, self.access_ttl),
            TokenKind::Refresh => (&self.refresh, self.refresh_ttl),
        }
    }
}
