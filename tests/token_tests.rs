//! Tests for login, refresh rotation and the authorization gate.
//!
//! Tests cover:
//! - Login responses (body pair + hardened refresh cookie)
//! - Form-field refresh and its early-refresh window
//! - Cookie refresh, with and without strict mode
//! - Bearer access to protected routes

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use common::*;
use tollgate::auth::{AuthSettings, REFRESH_COOKIE_NAME, REFRESH_FORM_FIELD};
use tollgate::cli::ClientIpHeader;
use tollgate::jwt::{AccessClaims, RefreshClaims, TokenPair, now_secs};
use tower::ServiceExt;

fn refresh_token_expiring_in(auth: &AuthSettings, user_id: i64, secs: u64) -> String {
    auth.jwt
        .sign(&RefreshClaims {
            sub: user_id.to_string(),
            exp: now_secs() + secs,
        })
        .unwrap()
}

fn refresh_form(token: &str) -> String {
    format!("{}={}", REFRESH_FORM_FIELD, token)
}

fn cookie_request(token: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/refresh-cookie")
        .header(header::COOKIE, format!("{}={}", REFRESH_COOKIE_NAME, token))
        .body(Body::empty())
        .unwrap()
}

async fn token_pair(response: axum::http::Response<Body>) -> TokenPair {
    serde_json::from_value(body_json(response).await).unwrap()
}

// =============================================================================
// Login
// =============================================================================

#[tokio::test]
async fn test_login_returns_pair_and_cookie() {
    let ctx = setup().await;

    let response = ctx
        .app
        .clone()
        .oneshot(json_request(
            "POST",
            "/auth",
            r#"{"email":"admin@example.com","password":"secret"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let cookies = extract_set_cookies(&response);
    assert_eq!(cookies.len(), 1);
    let cookie = &cookies[0];
    assert!(cookie.starts_with("__Host-refresh_token="));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("Secure"));
    assert!(cookie.contains("SameSite=Strict"));
    assert!(cookie.contains("Path=/"));
    assert!(cookie.contains("Max-Age=86400"));

    let pair = token_pair(response).await;
    assert!(cookie.contains(&pair.refresh_token));
    assert!(!cookie.contains(&pair.access_token));

    let claims: AccessClaims = ctx.auth.jwt.verify(&pair.access_token).unwrap();
    assert_eq!(claims.sub, ctx.admin_id.to_string());
    assert_eq!(claims.name, "Admin User");
    assert_eq!(claims.iss, TEST_DOMAIN);
    assert_eq!(claims.aud, TEST_DOMAIN);
    assert!(claims.admin);
}

#[tokio::test]
async fn test_login_failures_are_unauthorized() {
    let ctx = setup_with_ip_header(ClientIpHeader::XForwardedFor).await;

    let cases = [
        ("not json", "I'm not json"),
        ("empty json", "{}"),
        ("empty email", r#"{"email":""}"#),
        ("empty password", r#"{"email":"admin@example.com","password":""}"#),
        ("wrong password", r#"{"email":"admin@example.com","password":"nope"}"#),
        ("invalid user", r#"{"email":"admin@someotherdomain.com","password":"secret"}"#),
    ];

    for (i, (name, body)) in cases.into_iter().enumerate() {
        // Each case comes from its own proxied client, so none hit the rate limit.
        let mut request = json_request("POST", "/auth", body);
        request.headers_mut().insert(
            "x-forwarded-for",
            format!("10.0.0.{}", i + 1).parse().unwrap(),
        );

        let response = ctx.app.clone().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "case: {}", name);
        assert!(extract_set_cookies(&response).is_empty(), "case: {}", name);
        assert_eq!(body_json(response).await["error"], "unauthorized", "case: {}", name);
    }
}

#[tokio::test]
async fn test_login_is_rate_limited() {
    let ctx = setup().await;

    let mut statuses = Vec::new();
    for _ in 0..6 {
        let response = ctx
            .app
            .clone()
            .oneshot(json_request(
                "POST",
                "/auth",
                r#"{"email":"nobody@example.com","password":"x"}"#,
            ))
            .await
            .unwrap();
        statuses.push(response.status());
    }

    assert_eq!(statuses.last(), Some(&StatusCode::TOO_MANY_REQUESTS));
}

#[tokio::test]
async fn test_rotating_forwarded_for_does_not_bypass_rate_limit() {
    let ctx = setup().await;

    let mut limited = false;
    for i in 0..20 {
        let mut request = json_request(
            "POST",
            "/auth",
            r#"{"email":"admin@example.com","password":"guess"}"#,
        );
        request.headers_mut().insert(
            "x-forwarded-for",
            format!("1.2.3.{}", i).parse().unwrap(),
        );

        let response = ctx.app.clone().oneshot(request).await.unwrap();
        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            limited = true;
            break;
        }
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    assert!(limited, "spoofed X-Forwarded-For values must share one bucket");
}

#[tokio::test]
async fn test_configured_ip_header_is_required() {
    let ctx = setup_with_ip_header(ClientIpHeader::XRealIp).await;

    let response = ctx
        .app
        .clone()
        .oneshot(json_request(
            "POST",
            "/auth",
            r#"{"email":"admin@example.com","password":"secret"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let mut request = json_request(
        "POST",
        "/auth",
        r#"{"email":"admin@example.com","password":"secret"}"#,
    );
    request
        .headers_mut()
        .insert("x-real-ip", "203.0.113.7".parse().unwrap());
    let response = ctx.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

// =============================================================================
// Form refresh
// =============================================================================

#[tokio::test]
async fn test_form_refresh_in_final_window() {
    let ctx = setup().await;
    let token = refresh_token_expiring_in(&ctx.auth, ctx.admin_id, 10);

    let response = ctx
        .app
        .clone()
        .oneshot(form_request("/refresh-token", refresh_form(&token)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        extract_set_cookies(&response)
            .iter()
            .any(|c| c.starts_with("__Host-refresh_token=") && c.contains("HttpOnly"))
    );

    let pair = token_pair(response).await;
    let claims: AccessClaims = ctx.auth.jwt.verify(&pair.access_token).unwrap();
    assert_eq!(claims.sub, ctx.admin_id.to_string());
    assert_ne!(pair.refresh_token, token);
}

#[tokio::test]
async fn test_form_refresh_too_early() {
    let ctx = setup().await;
    let token = refresh_token_expiring_in(&ctx.auth, ctx.admin_id, 10 * 60);

    let response = ctx
        .app
        .clone()
        .oneshot(form_request("/refresh-token", refresh_form(&token)))
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 425);
    assert!(extract_set_cookies(&response).is_empty());
}

#[tokio::test]
async fn test_form_refresh_fresh_login_token_is_too_early() {
    let ctx = setup().await;
    let pair = ctx
        .auth
        .issue(&ctx.db.users().get_by_id(ctx.admin_id).await.unwrap().unwrap())
        .unwrap();

    let response = ctx
        .app
        .clone()
        .oneshot(form_request("/refresh-token", refresh_form(&pair.refresh_token)))
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 425);
}

#[tokio::test]
async fn test_form_refresh_rejections_are_bad_request() {
    let ctx = setup().await;
    let other = AuthSettings::new(b"some-other-secret-some-other-secret", TEST_DOMAIN, "x");

    let expired = ctx
        .auth
        .jwt
        .sign(&RefreshClaims {
            sub: ctx.admin_id.to_string(),
            exp: now_secs() - 10,
        })
        .unwrap();

    let cases = [
        ("expired", expired),
        ("other secret", refresh_token_expiring_in(&other, ctx.admin_id, 10)),
        ("unknown user", refresh_token_expiring_in(&ctx.auth, 9999, 10)),
        ("garbage", "not-a-token".to_string()),
        ("empty", String::new()),
    ];

    for (name, token) in cases {
        let response = ctx
            .app
            .clone()
            .oneshot(form_request("/refresh-token", refresh_form(&token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "case: {}", name);
    }
}

#[tokio::test]
async fn test_form_refresh_unknown_user_message() {
    let ctx = setup().await;
    let token = refresh_token_expiring_in(&ctx.auth, 9999, 10);

    let response = ctx
        .app
        .clone()
        .oneshot(form_request("/refresh-token", refresh_form(&token)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "unknown user");
}

// =============================================================================
// Cookie refresh
// =============================================================================

#[tokio::test]
async fn test_cookie_refresh_bypasses_window_by_default() {
    let ctx = setup().await;
    let token = refresh_token_expiring_in(&ctx.auth, ctx.admin_id, 23 * 60 * 60 + 59 * 60);

    let response = ctx.app.clone().oneshot(cookie_request(&token)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let cookies = extract_set_cookies(&response);
    assert_eq!(cookies.len(), 1);

    let pair = token_pair(response).await;
    assert!(cookies[0].contains(&pair.refresh_token));
    assert!(ctx.auth.jwt.verify::<AccessClaims>(&pair.access_token).is_ok());
}

#[tokio::test]
async fn test_cookie_refresh_strict_mode() {
    let ctx = setup_with_strict_cookie_refresh(true).await;

    let early = refresh_token_expiring_in(&ctx.auth, ctx.admin_id, 10 * 60);
    let response = ctx.app.clone().oneshot(cookie_request(&early)).await.unwrap();
    assert_eq!(response.status().as_u16(), 425);

    let due = refresh_token_expiring_in(&ctx.auth, ctx.admin_id, 5);
    let response = ctx.app.clone().oneshot(cookie_request(&due)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_cookie_refresh_without_cookie() {
    let ctx = setup().await;

    let response = ctx
        .app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/refresh-cookie")
                .header(header::COOKIE, "refresh_token=wrong-name")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_cookie_refresh_with_access_token_is_rejected() {
    let ctx = setup().await;
    let user = ctx.db.users().get_by_id(ctx.admin_id).await.unwrap().unwrap();
    let pair = ctx.auth.issue(&user).unwrap();

    let response = ctx
        .app
        .clone()
        .oneshot(cookie_request(&pair.access_token))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_logout_clears_cookie() {
    let ctx = setup().await;

    let response = ctx
        .app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/logout")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let cookies = extract_set_cookies(&response);
    assert!(
        cookies
            .iter()
            .any(|c| c.starts_with("__Host-refresh_token=;") && c.contains("Max-Age=0"))
    );
}

// =============================================================================
// Authorization gate
// =============================================================================

#[tokio::test]
async fn test_login_then_access_protected_route() {
    let ctx = setup().await;

    let response = ctx
        .app
        .clone()
        .oneshot(json_request(
            "POST",
            "/auth",
            r#"{"email":"admin@example.com","password":"secret"}"#,
        ))
        .await
        .unwrap();
    let pair = token_pair(response).await;

    let response = ctx
        .app
        .clone()
        .oneshot(bearer_request("GET", "/users", &pair.access_token))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get(header::VARY).unwrap(), "Authorization");
    let users = body_json(response).await;
    assert_eq!(users[0]["email"], ADMIN_EMAIL);
    assert!(users[0].get("password_hash").is_none());
}

#[tokio::test]
async fn test_expired_access_token_is_unauthorized() {
    let ctx = setup().await;
    let user = ctx.db.users().get_by_id(ctx.admin_id).await.unwrap().unwrap();
    let pair = ctx.auth.issue_at(&user, now_secs() - 16 * 60).unwrap();

    let response = ctx
        .app
        .clone()
        .oneshot(bearer_request("GET", "/users", &pair.access_token))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.headers().get(header::VARY).unwrap(), "Authorization");
    assert_eq!(body_json(response).await["error"], "unauthorized");
}

#[tokio::test]
async fn test_gate_rejections_are_opaque() {
    let ctx = setup().await;
    let user = ctx.db.users().get_by_id(ctx.admin_id).await.unwrap().unwrap();
    let pair = ctx.auth.issue(&user).unwrap();
    let foreign = AuthSettings::new(TEST_SECRET, "anotherdomain.com", "localhost")
        .issue(&user)
        .unwrap();

    let headers = [
        format!("Bearer {}123", pair.access_token),
        format!("Bear {}", pair.access_token),
        format!("Bearer {} 123", pair.access_token),
        format!("Bearer {}", pair.refresh_token),
        format!("Bearer {}", foreign.access_token),
    ];

    for value in headers {
        let response = ctx
            .app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/users")
                    .header("Authorization", value.as_str())
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "header: {}", value);
        assert_eq!(body_json(response).await["error"], "unauthorized");
    }
}

#[tokio::test]
async fn test_no_header_is_unauthorized() {
    let ctx = setup().await;

    let response = ctx
        .app
        .clone()
        .oneshot(Request::builder().uri("/users").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
