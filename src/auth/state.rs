//! Immutable authentication settings shared by every request.

use crate::jwt::JwtConfig;

/// Signing keys plus the deployment identity tokens are bound to.
///
/// Built once at startup and shared behind an `Arc`; nothing mutates it afterwards.
#[derive(Clone)]
pub struct AuthSettings {
    pub jwt: JwtConfig,
    /// Issuer and audience of every access token.
    pub domain: String,
    /// `Domain` attribute of the refresh cookie.
    pub cookie_domain: String,
    /// Apply the early-refresh window to cookie-sourced refreshes as well.
    pub strict_cookie_refresh: bool,
}

impl AuthSettings {
    pub fn new(secret: &[u8], domain: impl Into<String>, cookie_domain: impl Into<String>) -> Self {
        Self {
            jwt: JwtConfig::new(secret),
            domain: domain.into(),
            cookie_domain: cookie_domain.into(),
            strict_cookie_refresh: false,
        }
    }

    pub fn with_strict_cookie_refresh(mut self, strict: bool) -> Self {
        self.strict_cookie_refresh = strict;
        self
    }
}
