//! Combined router for all authentication endpoints

use axum::Router;
use tower_http::LatencyUnit;
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::state::AuthState;

/// Create a router for all authentication endpoints
///
/// Mount it under a prefix such as `/api/auth`. The endpoints are:
/// - `POST /login`, `POST /refresh`, `POST /logout`, `GET /me`
/// - `POST /change-password`, `POST /forgot-password`
/// - `POST /reset-password`, `GET /reset-password/validate?token=`
pub fn pm_auth_router(state: AuthState) -> Router {
    pm_auth_router_no_trace(state).layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(
                DefaultOnResponse::new()
                    .level(Level::INFO)
                    .latency_unit(LatencyUnit::Millis),
            ),
    )
}

/// Same as [`pm_auth_router`] without the HTTP tracing layer
///
/// Use this if you want to add your own tracing middleware.
pub fn pm_auth_router_no_trace(state: AuthState) -> Router {
    Router::new()
        .merge(super::auth::router(state.clone()))
        .merge(super::password::router(state.clone()))
        .with_state(state)
}
