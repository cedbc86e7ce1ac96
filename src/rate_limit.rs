//! Rate limiting for the login endpoint.
//!
//! Token bucket keyed by client address to slow down password guessing.
//! The address comes from the socket unless a trusted proxy header is configured.

use axum::{
    extract::{ConnectInfo, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{Quota, RateLimiter, clock::DefaultClock, state::keyed::DefaultKeyedStateStore};
use std::{net::SocketAddr, num::NonZeroU32, sync::Arc};

use crate::api::ApiError;
use crate::cli::ClientIpHeader;

/// Per-client rate limiter.
pub type IpLimiter = RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

/// Login attempts replenished per second.
const LOGIN_PER_SEC: NonZeroU32 = NonZeroU32::new(1).unwrap();

/// Login attempts allowed in a burst.
const LOGIN_BURST: NonZeroU32 = NonZeroU32::new(5).unwrap();

/// Bucket shared by requests that carry no socket address (in-process callers).
const UNKNOWN_CLIENT: &str = "unknown";

#[derive(Clone)]
pub struct RateLimitConfig {
    pub login: Arc<IpLimiter>,
    /// Header to read the client IP from. None means the socket address.
    ip_header: Option<ClientIpHeader>,
}

impl RateLimitConfig {
    pub fn new(ip_header: Option<ClientIpHeader>) -> Self {
        Self {
            login: Arc::new(RateLimiter::keyed(
                Quota::per_second(LOGIN_PER_SEC).allow_burst(LOGIN_BURST),
            )),
            ip_header,
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self::new(None)
    }
}

/// Rate limit key for a request.
///
/// With a configured header the header is required and never falls back to the
/// socket address. Without one, client-supplied headers are ignored.
fn client_key(
    headers: &HeaderMap,
    connect_info: Option<&ConnectInfo<SocketAddr>>,
    ip_header: Option<ClientIpHeader>,
) -> Result<String, &'static str> {
    match ip_header {
        Some(header) => {
            let value = headers
                .get(header.header_name())
                .ok_or("IP header not present")?
                .to_str()
                .map_err(|_| "IP header contains invalid characters")?;
            header.extract(value)
        }
        None => Ok(connect_info
            .map(|ci| ci.0.ip().to_string())
            .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())),
    }
}

/// Middleware for rate limiting login attempts.
pub async fn rate_limit_login(
    State(config): State<Arc<RateLimitConfig>>,
    request: Request,
    next: Next,
) -> Response {
    let key = match client_key(
        request.headers(),
        request.extensions().get::<ConnectInfo<SocketAddr>>(),
        config.ip_header,
    ) {
        Ok(key) => key,
        Err(reason) => {
            tracing::warn!(reason, "Unable to determine client IP for login");
            return ApiError::forbidden("Unable to determine client IP.").into_response();
        }
    };

    match config.login.check_key(&key) {
        Ok(_) => next.run(request).await,
        Err(_) => {
            tracing::warn!(client = %key, "Login rate limit exceeded");
            ApiError::TooManyRequests(
                "Too many authentication attempts. Please wait before trying again.".into(),
            )
            .into_response()
        }
    }
}
