//! Refresh-token transport: the hardened cookie and its extraction.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use time::{Duration, OffsetDateTime};

use crate::jwt::REFRESH_TOKEN_DURATION_SECS;

/// Cookie name for the refresh token. The `__Host-` prefix marks it host-locked.
pub const REFRESH_COOKIE_NAME: &str = "__Host-refresh_token";

/// Form field carrying the refresh token on the form-based refresh path.
pub const REFRESH_FORM_FIELD: &str = "refresh_token";

/// Form body of `POST /refresh-token`.
#[derive(Debug, Deserialize)]
pub struct RefreshForm {
    #[serde(default)]
    pub refresh_token: String,
}

/// Build the refresh cookie for a newly issued refresh token.
///
/// The access token never goes into a cookie; it only travels in the body.
///
/// Browsers refuse to store a `__Host-` cookie that carries a `Domain`
/// attribute, so browser clients will not send this cookie back and have to
/// use the form refresh path. Non-browser clients that replay `Set-Cookie`
/// verbatim are unaffected.
pub fn refresh_cookie(token: String, domain: &str) -> Cookie<'static> {
    let ttl = Duration::seconds(REFRESH_TOKEN_DURATION_SECS as i64);
    Cookie::build((REFRESH_COOKIE_NAME, token))
        .path("/")
        .domain(domain.to_string())
        .expires(OffsetDateTime::now_utc() + ttl)
        .max_age(ttl)
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Strict)
        .build()
}

/// Cookie that removes the refresh token from the browser.
pub fn clear_refresh_cookie(domain: &str) -> Cookie<'static> {
    Cookie::build((REFRESH_COOKIE_NAME, ""))
        .path("/")
        .domain(domain.to_string())
        .max_age(Duration::ZERO)
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Strict)
        .build()
}

/// Read the refresh token from the request cookies.
pub fn refresh_token_from_jar(jar: &CookieJar) -> Option<&str> {
    jar.get(REFRESH_COOKIE_NAME)
        .map(|cookie| cookie.value())
        .filter(|value| !value.is_empty())
}
