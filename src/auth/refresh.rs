//! Refresh-token rotation.
//!
//! Both transports (form field and cookie) run the same algorithm; they only
//! differ in where the token came from and whether the early-refresh window
//! applies.

use super::errors::AuthError;
use super::state::AuthSettings;
use crate::db::UserLookup;
use crate::jwt::{RefreshClaims, TokenPair, now_secs};

/// Refresh is only allowed in the final window before expiry.
pub const EARLY_REFRESH_WINDOW_SECS: u64 = 30;

/// Where the presented refresh token was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshSource<'a> {
    Form(&'a str),
    Cookie(&'a str),
}

impl<'a> RefreshSource<'a> {
    pub fn token(&self) -> &'a str {
        match self {
            RefreshSource::Form(token) | RefreshSource::Cookie(token) => token,
        }
    }
}

/// Checks that vary between refresh transports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshPolicy {
    /// Reject with `TooEarly` while more than the window remains.
    pub enforce_early_window: bool,
}

impl RefreshPolicy {
    /// The form path always enforces the window; the cookie path only in strict mode.
    pub fn for_source(source: &RefreshSource<'_>, settings: &AuthSettings) -> Self {
        let enforce_early_window = match source {
            RefreshSource::Form(_) => true,
            RefreshSource::Cookie(_) => settings.strict_cookie_refresh,
        };
        Self {
            enforce_early_window,
        }
    }
}

/// Exchange a refresh token for a new token pair.
pub async fn refresh<U: UserLookup>(
    settings: &AuthSettings,
    users: &U,
    source: RefreshSource<'_>,
) -> Result<TokenPair, AuthError> {
    let policy = RefreshPolicy::for_source(&source, settings);
    refresh_with_policy(settings, users, source.token(), policy).await
}

/// True while more than the early-refresh window remains before `exp`.
/// Exactly `EARLY_REFRESH_WINDOW_SECS` left is already allowed.
pub fn is_too_early(exp: u64, now: u64) -> bool {
    exp.saturating_sub(now) > EARLY_REFRESH_WINDOW_SECS
}

/// Refresh algorithm with an explicit policy.
pub async fn refresh_with_policy<U: UserLookup>(
    settings: &AuthSettings,
    users: &U,
    token: &str,
    policy: RefreshPolicy,
) -> Result<TokenPair, AuthError> {
    let claims: RefreshClaims = settings.jwt.verify(token)?;

    let now = now_secs();
    if policy.enforce_early_window && is_too_early(claims.exp, now) {
        return Err(AuthError::TooEarly);
    }

    let user_id: i64 = claims
        .sub
        .parse()
        .map_err(|_| AuthError::MalformedToken)?;

    let user = users
        .find_by_id(user_id)
        .await
        .map_err(|e| {
            tracing::error!(user_id, error = %e, "Failed to look up user for refresh");
            AuthError::Storage(e.to_string())
        })?
        .ok_or(AuthError::UnknownSubject)?;

    settings.issue_at(&user, now).map_err(|e| {
        tracing::error!(user_id, error = %e, "Failed to issue token pair");
        AuthError::SigningFailure
    })
}
