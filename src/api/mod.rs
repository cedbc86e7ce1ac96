mod auth;
mod error;
mod users;

use axum::Router;
use std::sync::Arc;

use crate::auth::AuthSettings;
use crate::cli::ClientIpHeader;
use crate::db::Database;
use crate::rate_limit::RateLimitConfig;

pub use auth::AuthApiState;
pub use error::{ApiError, ResultExt};
pub use users::UsersState;

/// Create the API router.
pub fn create_api_router(
    db: Database,
    auth: Arc<AuthSettings>,
    ip_header: Option<ClientIpHeader>,
) -> Router {
    let rate_limit_config = Arc::new(RateLimitConfig::new(ip_header));

    let auth_state = AuthApiState {
        db: db.clone(),
        auth: auth.clone(),
    };

    let users_state = UsersState { db };

    Router::new()
        .merge(auth::router(auth_state, rate_limit_config))
        .nest("/users", users::router(users_state, auth))
}
