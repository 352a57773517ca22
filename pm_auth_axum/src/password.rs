use axum::{
    Extension, Json, Router,
    extract::{Query, State},
    middleware::from_fn_with_state,
    routing::{get, post},
};
use serde::Deserialize;

use pm_auth::{ResetTokenStatus, SessionError};

use crate::auth::{MessageResponse, required};
use crate::error::{ApiError, IntoResponseError};
use crate::middleware::require_access_token;
use crate::session::AuthUser;
use crate::state::AuthState;

const FORGOT_PASSWORD_MESSAGE: &str =
    "If an account with that email exists, a password reset link has been sent.";

pub(super) fn router(state: AuthState) -> Router<AuthState> {
    Router::new()
        .route(
            "/change-password",
            post(change_password).route_layer(from_fn_with_state(state, require_access_token)),
        )
        .route("/forgot-password", post(forgot_password))
        .route("/reset-password", post(reset_password))
        .route("/reset-password/validate", get(validate_reset_token))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ChangePasswordRequest {
    #[serde(default)]
    current_password: Option<String>,
    #[serde(default)]
    new_password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ForgotPasswordRequest {
    #[serde(default)]
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ResetPasswordRequest {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    new_password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ValidateQuery {
    #[serde(default)]
    token: Option<String>,
}

async fn change_password(
    State(state): State<AuthState>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let (Some(current), Some(new)) = (required(body.current_password), required(body.new_password))
    else {
        return Err(ApiError::bad_request(
            "Current password and new password are required",
        ));
    };

    state
        .manager
        .change_password(&user.id, &current, &new)
        .await
        .into_response_error()?;

    Ok(Json(MessageResponse {
        message: "Password changed successfully",
    }))
}

async fn forgot_password(
    State(state): State<AuthState>,
    Json(body): Json<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Some(email) = required(body.email) else {
        return Err(ApiError::bad_request("Email is required"));
    };

    match state.manager.forgot_password(&email).await {
        Ok(()) => Ok(Json(MessageResponse {
            message: FORGOT_PASSWORD_MESSAGE,
        })),
        Err(e @ SessionError::AccountDeactivated) => Err(ApiError::bad_request(e.to_string())),
        Err(e) => Err(e.into()),
    }
}

async fn reset_password(
    State(state): State<AuthState>,
    Json(body): Json<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let (Some(token), Some(new)) = (required(body.token), required(body.new_password)) else {
        return Err(ApiError::bad_request("Token and new password are required"));
    };

    state
        .manager
        .reset_password(&token, &new)
        .await
        .into_response_error()?;

    Ok(Json(MessageResponse {
        message: "Password has been reset successfully",
    }))
}

async fn validate_reset_token(
    State(state): State<AuthState>,
    Query(query): Query<ValidateQuery>,
) -> Result<Json<ResetTokenStatus>, ApiError> {
    let Some(token) = required(query.token) else {
        return Err(ApiError::bad_request("Token is required"));
    };

    let status = state
        .manager
        .validate_reset_token(&token)
        .await
        .into_response_error()?;
    Ok(Json(status))
}
