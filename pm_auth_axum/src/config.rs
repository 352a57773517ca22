//! Cookie settings for the transport layer

pub const ACCESS_TOKEN_COOKIE: &str = "access_token";
pub const REFRESH_TOKEN_COOKIE: &str = "refresh_token";

/// How session cookies are written. Owned by the bootstrap and passed in
/// through [`AuthState`](crate::AuthState).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieConfig {
    /// Adds the `Secure` attribute. Disable only for plain-HTTP development.
    pub secure: bool,
    pub access_cookie_name: String,
    pub refresh_cookie_name: String,
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            secure: true,
            access_cookie_name: ACCESS_TOKEN_COOKIE.to_string(),
            refresh_cookie_name: REFRESH_TOKEN_COOKIE.to_string(),
        }
    }
}

impl CookieConfig {
    /// Read `PM_AUTH_COOKIE_SECURE`. Any value other than "false" keeps `Secure` on.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let secure = lookup("PM_AUTH_COOKIE_SECURE")
            .map(|val| val.to_lowercase() != "false")
            .unwrap_or(true);

        Self {
            secure,
            ..Self::default()
        }
    }
}
