//! Authentication error types.

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::jwt::JwtError;

/// Every way token verification or refresh can fail.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("malformed token")]
    MalformedToken,
    #[error("invalid token signature")]
    BadSignature,
    #[error("token is expired")]
    ExpiredToken,
    #[error("incorrect issuer")]
    WrongIssuer,
    #[error("invalid authorization header")]
    MalformedHeader,
    #[error("unsupported authorization scheme")]
    UnsupportedScheme,
    #[error("unknown user")]
    UnknownSubject,
    #[error("refresh token does not need renewal yet")]
    TooEarly,
    #[error("failed to sign token")]
    SigningFailure,
    #[error("database error")]
    Storage(String),
}

impl From<JwtError> for AuthError {
    fn from(e: JwtError) -> Self {
        match e {
            JwtError::Malformed => AuthError::MalformedToken,
            JwtError::BadSignature => AuthError::BadSignature,
            JwtError::Expired => AuthError::ExpiredToken,
            JwtError::Signing(_) => AuthError::SigningFailure,
        }
    }
}

impl AuthError {
    /// Status reported at the refresh boundary.
    pub fn refresh_status(&self) -> StatusCode {
        match self {
            AuthError::TooEarly => too_early(),
            AuthError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

/// 425 Too Early.
pub fn too_early() -> StatusCode {
    StatusCode::from_u16(425).unwrap_or(StatusCode::BAD_REQUEST)
}

/// Opaque rejection at the authorization boundary.
///
/// Whatever check failed, the caller only ever sees `401 unauthorized`.
#[derive(Debug, Clone, Copy)]
pub struct Unauthorized;

impl IntoResponse for Unauthorized {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            error: &'static str,
        }

        let mut response = (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse {
                error: "unauthorized",
            }),
        )
            .into_response();
        response
            .headers_mut()
            .append(header::VARY, HeaderValue::from_static("Authorization"));
        response
    }
}
