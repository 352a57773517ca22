use axum_extra::headers::{Cookie, HeaderMapExt};
use http::{HeaderMap, HeaderValue, header::SET_COOKIE};

use pm_auth::TokenPair;

use crate::config::CookieConfig;
use crate::error::{ApiError, IntoResponseError};

/// Append one `Set-Cookie` header. Session cookies are always script
/// inaccessible and same-site only.
pub(crate) fn header_set_cookie(
    headers: &mut HeaderMap,
    name: &str,
    value: &str,
    max_age: i64,
    secure: bool,
) -> Result<(), ApiError> {
    let mut cookie = format!("{name}={value}; HttpOnly; SameSite=Strict; Path=/; Max-Age={max_age}");
    if secure {
        cookie.push_str("; Secure");
    }

    let value = HeaderValue::from_str(&cookie)
        .map_err(http::Error::from)
        .into_response_error()?;
    headers.append(SET_COOKIE, value);
    Ok(())
}

/// Write both session cookies. Max-Age follows the token lifetimes.
pub(crate) fn set_session_cookies(
    headers: &mut HeaderMap,
    config: &CookieConfig,
    tokens: &TokenPair,
    access_ttl_secs: i64,
    refresh_ttl_secs: i64,
) -> Result<(), ApiError> {
    header_set_cookie(
        headers,
        &config.access_cookie_name,
        &tokens.access.value,
        access_ttl_secs,
        config.secure,
    )?;
    header_set_cookie(
        headers,
        &config.refresh_cookie_name,
        &tokens.refresh.value,
        refresh_ttl_secs,
        config.secure,
    )
}

pub(crate) fn clear_session_cookies(
    headers: &mut HeaderMap,
    config: &CookieConfig,
) -> Result<(), ApiError> {
    header_set_cookie(headers, &config.access_cookie_name, "", 0, config.secure)?;
    header_set_cookie(headers, &config.refresh_cookie_name, "", 0, config.secure)
}

/// Value of a named request cookie, ignoring empty values.
pub(crate) fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .typed_get::<Cookie>()
        .and_then(|cookies| cookies.get(name).map(str::to_string))
        .filter(|value| !value.is_empty())
}
