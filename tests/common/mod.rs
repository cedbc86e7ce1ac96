#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, Response},
};
use tollgate::{
    ServerConfig,
    auth::AuthSettings,
    cli::ClientIpHeader,
    create_app,
    db::{Database, NewUser},
    password,
};

pub const TEST_SECRET: &[u8] = b"2dce505d96a53c5768052ee90f3df2055657518dad489160df9913f66042e160";
pub const TEST_DOMAIN: &str = "example.com";
pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const ADMIN_PASSWORD: &str = "secret";

pub struct TestApp {
    pub app: Router,
    pub db: Database,
    pub auth: AuthSettings,
    pub admin_id: i64,
}

pub async fn setup() -> TestApp {
    setup_with(false, None).await
}

pub async fn setup_with_strict_cookie_refresh(strict: bool) -> TestApp {
    setup_with(strict, None).await
}

/// App that keys the login rate limit on a trusted proxy header.
pub async fn setup_with_ip_header(header: ClientIpHeader) -> TestApp {
    setup_with(false, Some(header)).await
}

/// Build an app on an in-memory database seeded with one admin user.
pub async fn setup_with(strict: bool, ip_header: Option<ClientIpHeader>) -> TestApp {
    let db = Database::open(":memory:")
        .await
        .expect("Failed to open test database");

    let admin_id = db
        .users()
        .create(&NewUser {
            email: ADMIN_EMAIL.to_string(),
            first_name: "Admin".to_string(),
            last_name: "User".to_string(),
            password_hash: password::hash(ADMIN_PASSWORD).unwrap(),
            is_admin: true,
        })
        .await
        .expect("Failed to seed admin");

    let config = ServerConfig {
        db: db.clone(),
        jwt_secret: TEST_SECRET.to_vec(),
        domain: TEST_DOMAIN.to_string(),
        cookie_domain: "localhost".to_string(),
        strict_cookie_refresh: strict,
        ip_header,
    };

    TestApp {
        app: create_app(&config),
        auth: config.auth_settings(),
        db,
        admin_id,
    }
}

pub fn json_request(method: &str, uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn form_request(uri: &str, body: String) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/x-www-form-urlencoded")
        .body(Body::from(body))
        .unwrap()
}

pub fn bearer_request(method: &str, uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("Authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

/// Extract Set-Cookie headers from response
pub fn extract_set_cookies(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .collect()
}
