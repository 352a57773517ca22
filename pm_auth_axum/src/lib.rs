//! pm_auth_axum - Axum transport for the pm_auth session core
//!
//! Sets and reads the session cookies, guards routes with the access token
//! and maps session failures to HTTP responses.

mod auth;
mod config;
mod cookies;
mod error;
mod middleware;
mod password;
mod router;
mod session;
mod state;

#[cfg(test)]
mod test_utils;

pub use config::{ACCESS_TOKEN_COOKIE, CookieConfig, REFRESH_TOKEN_COOKIE};
pub use error::{ApiError, ErrorBody, ErrorCode};
pub use middleware::{
    require_access_token, require_admin, require_manager_or_admin, require_role,
};
pub use router::{pm_auth_router, pm_auth_router_no_trace};
pub use session::AuthUser;
pub use state::AuthState;
