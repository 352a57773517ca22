use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use pm_auth::Role;

use crate::error::ApiError;
use crate::session::{AuthUser, authenticate};
use crate::state::AuthState;

/// Reject requests without a valid access token cookie, otherwise insert the
/// caller as [`AuthUser`] into request extensions.
///
/// Use with `axum::middleware::from_fn_with_state`.
pub async fn require_access_token(
    State(state): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Response {
    match authenticate(req.headers(), &state) {
        Ok(user) => {
            tracing::debug!(account_id = %user.id, role = %user.role, "Access token verified");
            req.extensions_mut().insert(user);
            next.run(req).await
        }
        Err(err) => err.into_response(),
    }
}

/// Allow only callers whose role is listed. Must run after
/// [`require_access_token`].
///
/// ```ignore
/// from_fn(|req: Request, next: Next| require_role(&[Role::Admin], req, next))
/// ```
pub async fn require_role(roles: &'static [Role], req: Request, next: Next) -> Response {
    let Some(user) = req.extensions().get::<AuthUser>() else {
        tracing::warn!("Role check without an authenticated caller");
        return ApiError::unauthorized().into_response();
    };

    if !user.has_role(roles) {
        tracing::info!(account_id = %user.id, role = %user.role, "Insufficient permissions");
        return ApiError::forbidden().into_response();
    }

    next.run(req).await
}

pub async fn require_admin(req: Request, next: Next) -> Response {
    require_role(&[Role::Admin], req, next).await
}

pub async fn require_manager_or_admin(req: Request, next: Next) -> Response {
    require_role(&[Role::Admin, Role::Manager], req, next).await
}
