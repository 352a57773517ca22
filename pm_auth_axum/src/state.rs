use std::sync::Arc;

use pm_auth::SessionManager;

use crate::config::CookieConfig;

/// Shared state behind every auth route
#[derive(Debug, Clone)]
pub struct AuthState {
    pub manager: Arc<SessionManager>,
    pub cookies: CookieConfig,
}

impl AuthState {
    pub fn new(manager: SessionManager, cookies: CookieConfig) -> Self {
        Self {
            manager: Arc::new(manager),
            cookies,
        }
    }
}
