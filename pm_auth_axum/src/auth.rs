use axum::{
    Extension, Json, Router,
    extract::State,
    middleware::from_fn_with_state,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use http::HeaderMap;
use serde::{Deserialize, Serialize};

use pm_auth::SanitizedAccount;

use crate::cookies::{clear_session_cookies, cookie_value, set_session_cookies};
use crate::error::{ApiError, IntoResponseError};
use crate::middleware::require_access_token;
use crate::session::AuthUser;
use crate::state::AuthState;

pub(super) fn router(state: AuthState) -> Router<AuthState> {
    Router::new()
        .route(
            "/me",
            get(me).route_layer(from_fn_with_state(state, require_access_token)),
        )
        .route("/login", post(login))
        .route("/refresh", post(refresh))
        .route("/logout", post(logout))
}

#[derive(Debug, Deserialize)]
pub(crate) struct LoginRequest {
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    password: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SessionResponse {
    user: SanitizedAccount,
    message: &'static str,
}

#[derive(Debug, Serialize)]
pub(crate) struct MessageResponse {
    pub(crate) message: &'static str,
}

#[derive(Debug, Serialize)]
pub(crate) struct UserResponse {
    user: SanitizedAccount,
}

/// Trimmed-empty fields count as missing
pub(crate) fn required(field: Option<String>) -> Option<String> {
    field.filter(|value| !value.trim().is_empty())
}

fn session_headers(
    state: &AuthState,
    tokens: &pm_auth::TokenPair,
) -> Result<HeaderMap, ApiError> {
    let mut headers = HeaderMap::new();
    set_session_cookies(
        &mut headers,
        &state.cookies,
        tokens,
        state.manager.tokens().access_ttl().num_seconds(),
        state.manager.tokens().refresh_ttl().num_seconds(),
    )?;
    Ok(headers)
}

async fn login(
    State(state): State<AuthState>,
    Json(body): Json<LoginRequest>,
) -> Result<Response, ApiError> {
    let (Some(email), Some(password)) = (required(body.email), required(body.password)) else {
        return Err(ApiError::bad_request("Email and password are required"));
    };

    let outcome = state
        .manager
        .login(&email, &password)
        .await
        .into_response_error()?;
    let headers = session_headers(&state, &outcome.tokens)?;

    Ok((
        headers,
        Json(SessionResponse {
            user: outcome.account,
            message: "Login successful",
        }),
    )
        .into_response())
}

async fn refresh(State(state): State<AuthState>, headers: HeaderMap) -> Result<Response, ApiError> {
    let presented = cookie_value(&headers, &state.cookies.refresh_cookie_name)
        .ok_or_else(|| ApiError::missing_token("Refresh token required"))?;

    let outcome = state
        .manager
        .refresh(&presented)
        .await
        .into_response_error()?;
    let headers = session_headers(&state, &outcome.tokens)?;

    Ok((
        headers,
        Json(MessageResponse {
            message: "Token refreshed successfully",
        }),
    )
        .into_response())
}

/// Revoke whatever session the cookies identify, then clear them. Always 200.
async fn logout(
    State(state): State<AuthState>,
    user: Option<AuthUser>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    match user {
        Some(user) => {
            if let Err(e) = state.manager.logout(&user.id).await {
                tracing::warn!(account_id = %user.id, "Failed to revoke session on logout: {}", e);
            }
        }
        // An expired access token must not keep the refresh token alive, but
        // only the current refresh token may revoke it
        None => {
            if let Some(token) = cookie_value(&headers, &state.cookies.refresh_cookie_name) {
                if let Err(e) = state.manager.logout_by_refresh_token(&token).await {
                    tracing::warn!("Failed to revoke session on logout: {}", e);
                }
            }
        }
    }

    let mut response_headers = HeaderMap::new();
    clear_session_cookies(&mut response_headers, &state.cookies)?;

    Ok((
        response_headers,
        Json(MessageResponse {
            message: "Logout successful",
        }),
    )
        .into_response())
}

async fn me(
    State(state): State<AuthState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<UserResponse>, ApiError> {
    let account = state
        .manager
        .current_account(&user.id)
        .await
        .into_response_error()?;
    Ok(Json(UserResponse { user: account }))
}
