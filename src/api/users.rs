//! User management endpoints. Every route sits behind the authorization gate;
//! routes that change accounts also require an admin token.

use axum::{
    Json, Router,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::get,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use super::error::{ApiError, ResultExt};
use crate::auth::{Auth, AuthSettings, AuthenticatedUser, require_auth};
use crate::db::{Database, NewUser, UserUpdate};
use crate::password;

#[derive(Clone)]
pub struct UsersState {
    pub db: Database,
}

pub fn router(state: UsersState, auth: Arc<AuthSettings>) -> Router {
    Router::new()
        .route("/", get(all_users))
        .route(
            "/{user_id}",
            get(get_user)
                .delete(delete_user)
                .put(insert_user)
                .patch(update_user),
        )
        .with_state(state)
        .layer(middleware::from_fn_with_state(auth, require_auth))
}

fn parse_user_id(path: Result<Path<i64>, PathRejection>) -> Result<i64, ApiError> {
    path.map(|Path(id)| id)
        .map_err(|_| ApiError::bad_request("Invalid user id"))
}

/// Routes that change accounts are reserved for admins.
fn require_admin(auth: &AuthenticatedUser) -> Result<(), ApiError> {
    if auth.is_admin() {
        Ok(())
    } else {
        Err(ApiError::forbidden("admin required"))
    }
}

/// Duplicate emails are the caller's fault; anything else is a server error.
fn unique_violation_as_bad_request(context: &'static str) -> impl Fn(sqlx::Error) -> ApiError {
    move |e| match e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            ApiError::bad_request("Email already in use")
        }
        e => ApiError::db_error(context, e),
    }
}

async fn all_users(State(state): State<UsersState>) -> Result<impl IntoResponse, ApiError> {
    let users = state.db.users().list().await.db_err("Failed to list users")?;
    Ok(Json(users))
}

async fn get_user(
    State(state): State<UsersState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_user_id(path)?;
    let user = state
        .db
        .users()
        .get_by_id(id)
        .await
        .db_err("Failed to get user")?
        .ok_or_else(|| ApiError::bad_request("unknown user"))?;
    Ok(Json(user))
}

async fn delete_user(
    State(state): State<UsersState>,
    Auth(auth): Auth,
    path: Result<Path<i64>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&auth)?;
    let id = parse_user_id(path)?;
    if !state
        .db
        .users()
        .delete(id)
        .await
        .db_err("Failed to delete user")?
    {
        return Err(ApiError::bad_request("unknown user"));
    }
    info!(user_id = id, by = ?auth.user_id, "User deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct InsertUserRequest {
    email: String,
    first_name: String,
    last_name: String,
    password: String,
    #[serde(default)]
    is_admin: bool,
}

/// The path id is validated but not used; the store assigns the new id.
async fn insert_user(
    State(state): State<UsersState>,
    Auth(auth): Auth,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<InsertUserRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&auth)?;
    parse_user_id(path)?;
    let Json(payload) = payload.map_err(|e| ApiError::bad_request(e.body_text()))?;

    let email = payload.email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(ApiError::bad_request("Invalid email"));
    }
    if payload.password.is_empty() {
        return Err(ApiError::bad_request("Password cannot be empty"));
    }

    let password_hash = password::hash(&payload.password).map_err(|e| {
        tracing::error!(error = %e, "Failed to hash password");
        ApiError::internal("Failed to hash password")
    })?;

    let new_user = NewUser {
        email: email.to_string(),
        first_name: payload.first_name,
        last_name: payload.last_name,
        password_hash,
        is_admin: payload.is_admin,
    };

    let id = state
        .db
        .users()
        .create(&new_user)
        .await
        .map_err(unique_violation_as_bad_request("Failed to insert user"))?;

    info!(user_id = id, by = ?auth.user_id, "User created");
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
struct UpdateUserRequest {
    /// Optional; must match the path when present.
    #[serde(default)]
    id: Option<i64>,
    email: String,
    first_name: String,
    last_name: String,
    #[serde(default)]
    is_admin: bool,
}

async fn update_user(
    State(state): State<UsersState>,
    Auth(auth): Auth,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&auth)?;
    let id = parse_user_id(path)?;
    let Json(payload) = payload.map_err(|e| ApiError::bad_request(e.body_text()))?;

    if payload.id.is_some_and(|body_id| body_id != id) {
        return Err(ApiError::bad_request("user id does not match path"));
    }

    let update = UserUpdate {
        id,
        email: payload.email,
        first_name: payload.first_name,
        last_name: payload.last_name,
        is_admin: payload.is_admin,
    };

    if !state
        .db
        .users()
        .update(&update)
        .await
        .map_err(unique_violation_as_bad_request("Failed to update user"))?
    {
        return Err(ApiError::bad_request("unknown user"));
    }
    info!(user_id = id, by = ?auth.user_id, "User updated");
    Ok(StatusCode::NO_CONTENT)
}
