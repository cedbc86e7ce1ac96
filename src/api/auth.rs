//! Token endpoints.
//!
//! - POST `/auth` - Exchange email and password for a token pair
//! - POST `/refresh-token` - Refresh using the `refresh_token` form field
//! - POST `/refresh-cookie` - Refresh using the refresh cookie
//! - POST `/logout` - Clear the refresh cookie

use axum::{
    Form, Json, Router,
    extract::{
        State,
        rejection::{FormRejection, JsonRejection},
    },
    middleware,
    response::IntoResponse,
    routing::post,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

use super::error::{ApiError, ResultExt};
use crate::auth::{
    AuthSettings, RefreshForm, RefreshSource, clear_refresh_cookie, refresh, refresh_cookie,
    refresh_token_from_jar,
};
use crate::db::Database;
use crate::jwt::TokenPair;
use crate::password;
use crate::rate_limit::{RateLimitConfig, rate_limit_login};

#[derive(Clone)]
pub struct AuthApiState {
    pub db: Database,
    pub auth: Arc<AuthSettings>,
}

pub fn router(state: AuthApiState, rate_limit_config: Arc<RateLimitConfig>) -> Router {
    let login_router = Router::new()
        .route("/auth", post(authenticate))
        .with_state(state.clone())
        .layer(middleware::from_fn_with_state(
            rate_limit_config,
            rate_limit_login,
        ));

    Router::new()
        .route("/refresh-token", post(refresh_from_form))
        .route("/refresh-cookie", post(refresh_from_cookie))
        .route("/logout", post(logout))
        .with_state(state)
        .merge(login_router)
}

#[derive(Deserialize)]
struct Credentials {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

/// Place the refresh token in the cookie and the pair in the body.
fn token_response(state: &AuthApiState, jar: CookieJar, pair: TokenPair) -> impl IntoResponse + use<> {
    let jar = jar.add(refresh_cookie(
        pair.refresh_token.clone(),
        &state.auth.cookie_domain,
    ));
    (jar, Json(pair))
}

/// Log in with email and password.
/// Every failure is reported as the same 401 so callers cannot probe which check failed.
async fn authenticate(
    State(state): State<AuthApiState>,
    jar: CookieJar,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let unauthorized = || ApiError::unauthorized("unauthorized");

    let Json(credentials) = payload.map_err(|_| unauthorized())?;

    let user = state
        .db
        .users()
        .get_by_email(&credentials.email)
        .await
        .db_err("Failed to look up user")?
        .ok_or_else(|| {
            info!("Login attempt for unknown email");
            unauthorized()
        })?;

    if !password::verify(&credentials.password, &user.password_hash) {
        info!(user_id = user.id, "Login attempt with wrong password");
        return Err(unauthorized());
    }

    let pair = state.auth.issue(&user).map_err(|e| {
        warn!(user_id = user.id, error = %e, "Failed to issue token pair");
        unauthorized()
    })?;

    info!(user_id = user.id, "User logged in");
    Ok(token_response(&state, jar, pair))
}

/// Refresh using the `refresh_token` form field. Enforces the early-refresh window.
async fn refresh_from_form(
    State(state): State<AuthApiState>,
    jar: CookieJar,
    form: Result<Form<RefreshForm>, FormRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Form(form) = form.map_err(|e| ApiError::bad_request(e.body_text()))?;

    let pair = refresh(
        &state.auth,
        &state.db.users(),
        RefreshSource::Form(&form.refresh_token),
    )
    .await
    .inspect_err(|e| info!(reason = %e, "Form refresh rejected"))?;

    Ok(token_response(&state, jar, pair))
}

/// Refresh using the refresh cookie.
async fn refresh_from_cookie(
    State(state): State<AuthApiState>,
    jar: CookieJar,
) -> Result<impl IntoResponse, ApiError> {
    let token = refresh_token_from_jar(&jar)
        .ok_or_else(|| ApiError::unauthorized("unauthorized"))?
        .to_string();

    let pair = refresh(
        &state.auth,
        &state.db.users(),
        RefreshSource::Cookie(&token),
    )
    .await
    .inspect_err(|e| info!(reason = %e, "Cookie refresh rejected"))?;

    Ok(token_response(&state, jar, pair))
}

/// Clear the refresh cookie. Tokens already issued stay valid until they expire.
async fn logout(State(state): State<AuthApiState>, jar: CookieJar) -> impl IntoResponse {
    let jar = jar.add(clear_refresh_cookie(&state.auth.cookie_domain));
    (jar, Json(serde_json::json!({ "success": true })))
}
