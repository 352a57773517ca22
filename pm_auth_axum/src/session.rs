use axum::extract::{FromRef, FromRequestParts, OptionalFromRequestParts};
use http::{HeaderMap, request::Parts};

use pm_auth::{Role, SessionError, TokenClaims};

use crate::cookies::cookie_value;
use crate::error::ApiError;
use crate::state::AuthState;

/// Authenticated caller, available as an Axum extractor
///
/// Behind [`require_access_token`](crate::require_access_token) the identity
/// is taken from request extensions. Elsewhere the access token cookie is
/// verified on the spot.
///
/// # Example
///
/// ```no_run
/// use pm_auth_axum::AuthUser;
///
/// async fn protected_handler(user: AuthUser) -> String {
///     format!("Hello, {}!", user.email)
/// }
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct AuthUser {
    pub id: String,
    pub email: String,
    pub role: Role,
    /// Shared by the access/refresh pair this identity came from
    pub token_id: String,
}

impl From<TokenClaims> for AuthUser {
    fn from(claims: TokenClaims) -> Self {
        Self {
            id: claims.user_id,
            email: claims.email,
            role: claims.role,
            token_id: claims.token_id,
        }
    }
}

impl AuthUser {
    pub fn has_role(&self, roles: &[Role]) -> bool {
        roles.contains(&self.role)
    }
}

/// Verify the access token cookie and build the caller identity.
pub(crate) fn authenticate(headers: &HeaderMap, state: &AuthState) -> Result<AuthUser, ApiError> {
    let token = cookie_value(headers, &state.cookies.access_cookie_name).ok_or_else(|| {
        tracing::debug!("Access token cookie missing");
        ApiError::missing_token("Access token required")
    })?;

    match state.manager.verify_access_token(&token) {
        Ok(claims) => Ok(AuthUser::from(claims)),
        Err(SessionError::TokenExpired) => {
            tracing::debug!("Access token expired");
            Err(ApiError::token_expired("Access token expired"))
        }
        Err(e) => {
            tracing::debug!("Access token rejected: {}", e);
            Err(ApiError::invalid_token("Invalid access token"))
        }
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    AuthState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<AuthUser>() {
            return Ok(user.clone());
        }

        let state = AuthState::from_ref(state);
        authenticate(&parts.headers, &state)
    }
}

impl<S> OptionalFromRequestParts<S> for AuthUser
where
    AuthState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        let result: Result<Self, Self::Rejection> =
            <AuthUser as FromRequestParts<S>>::from_request_parts(parts, state).await;
        Ok(result.ok())
    }
}
