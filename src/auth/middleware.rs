//! Authorization gate for protected routes.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderValue, header, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use super::errors::Unauthorized;
use super::state::AuthSettings;
use crate::jwt::AccessClaims;

/// Identity attached to a request that passed the gate.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub claims: AccessClaims,
    /// User id parsed from the subject claim.
    pub user_id: Option<i64>,
}

impl AuthenticatedUser {
    pub fn is_admin(&self) -> bool {
        self.claims.admin
    }
}

/// Middleware that rejects any request without a valid bearer access token.
///
/// `Vary: Authorization` is set on every response so caches never mix
/// authorized and anonymous responses for the same URL.
pub async fn require_auth(
    State(settings): State<Arc<AuthSettings>>,
    mut request: Request,
    next: Next,
) -> Response {
    let header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    let mut response = match settings.verify_access(header) {
        Ok(claims) => {
            let user_id = claims.sub.parse().ok();
            request
                .extensions_mut()
                .insert(AuthenticatedUser { claims, user_id });
            next.run(request).await
        }
        Err(e) => {
            tracing::debug!(
                method = %request.method(),
                uri = %request.uri(),
                reason = %e,
                "Rejected unauthorized request"
            );
            return Unauthorized.into_response();
        }
    };

    response
        .headers_mut()
        .append(header::VARY, HeaderValue::from_static("Authorization"));
    response
}

/// Extractor for handlers behind `require_auth`.
pub struct Auth(pub AuthenticatedUser);

impl<S> FromRequestParts<S> for Auth
where
    S: Send + Sync,
{
    type Rejection = Unauthorized;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .map(Auth)
            .ok_or(Unauthorized)
    }
}
