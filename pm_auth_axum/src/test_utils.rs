//! Shared helpers for the router, middleware and extractor tests

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::response::Response;
use chrono::{DateTime, Utc};
use http::{Request, header::COOKIE, header::CONTENT_TYPE, header::SET_COOKIE, request::Builder};
use tokio::sync::Mutex;

use pm_auth::{
    AuthConfig, InMemoryCredentialStore, ResetNotifier, Role, SanitizedAccount, SessionManager,
    TokenConfig,
};

use crate::config::CookieConfig;
use crate::state::AuthState;

pub(crate) const TEST_PASSWORD: &str = "Password123";

#[derive(Debug, Default)]
pub(crate) struct RecordingNotifier {
    tokens: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub(crate) async fn last_token(&self) -> Option<String> {
        self.tokens.lock().await.last().cloned()
    }
}

#[async_trait]
impl ResetNotifier for RecordingNotifier {
    async fn deliver(
        &self,
        _account: &SanitizedAccount,
        token: &str,
        _expires_at: DateTime<Utc>,
    ) -> Result<(), String> {
        self.tokens.lock().await.push(token.to_string());
        Ok(())
    }
}

fn test_manager() -> SessionManager {
    let token = TokenConfig::new("axum-access-secret", "axum-refresh-secret")
        .expect("distinct secrets are valid");
    let mut config = AuthConfig::new(token);
    // Cheapest cost bcrypt accepts
    config.bcrypt_cost = 4;

    SessionManager::new(config, Arc::new(InMemoryCredentialStore::new()))
        .expect("test configuration is valid")
}

fn test_cookies() -> CookieConfig {
    CookieConfig {
        secure: false,
        ..CookieConfig::default()
    }
}

pub(crate) async fn test_state_with_notifier() -> (AuthState, Arc<RecordingNotifier>) {
    let notifier = Arc::new(RecordingNotifier::default());
    let manager = test_manager().with_notifier(notifier.clone());
    (AuthState::new(manager, test_cookies()), notifier)
}

/// State with one account whose password is [`TEST_PASSWORD`]
pub(crate) async fn seeded_state(email: &str, role: Role) -> (AuthState, SanitizedAccount) {
    let state = AuthState::new(test_manager(), test_cookies());
    let account = state
        .manager
        .provision_account(email, "Test User", role, TEST_PASSWORD)
        .await
        .expect("provisioning should succeed");
    (state, account)
}

pub(crate) fn with_cookie(builder: Builder, name: &str, value: &str) -> Builder {
    builder.header(COOKIE, format!("{name}={value}"))
}

pub(crate) fn json_request(
    method: &str,
    uri: &str,
    body: serde_json::Value,
    cookies: &[(&str, &str)],
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(CONTENT_TYPE, "application/json");

    if !cookies.is_empty() {
        let header = cookies
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; ");
        builder = builder.header(COOKIE, header);
    }

    builder
        .body(Body::from(body.to_string()))
        .expect("request should build")
}

pub(crate) async fn read_json(response: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body should be readable");
    serde_json::from_slice(&bytes).expect("body should be JSON")
}

pub(crate) fn set_cookie_headers(response: &Response) -> Vec<String> {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(str::to_string)
        .collect()
}

/// Value of the named cookie in the response's `Set-Cookie` headers
pub(crate) fn set_cookie_value(response: &Response, name: &str) -> Option<String> {
    set_cookie_headers(response).into_iter().find_map(|cookie| {
        let pair = cookie.split(';').next()?;
        let (key, value) = pair.split_once('=')?;
        (key == name && !value.is_empty()).then(|| value.to_string())
    })
}
