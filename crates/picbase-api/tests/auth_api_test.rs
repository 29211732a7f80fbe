//! Account, session and middleware behavior over HTTP.

mod helpers;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use serde_json::json;
use uuid::Uuid;

use helpers::{spawn, spawn_with, AppOptions, PASSWORD};
use picbase_core::{SessionRepository, UserRepository};
use picbase_crypto::{generate_token, hash_token};

#[tokio::test]
async fn test_signup_then_login_and_me() {
    let app = spawn().await;

    let user = app.signup("ada").await;
    assert_eq!(user["username"], "ada");
    assert_eq!(user["email"], "ada@example.com");
    assert_eq!(user["is_active"], true);
    assert!(user.get("password_hash").is_none());

    let res = app.login("ada", PASSWORD).await;
    assert_eq!(res.status, StatusCode::OK);
    let body = res.json();
    let token = body["token"].as_str().unwrap();
    assert!(token.starts_with("pb_st_"));
    assert_eq!(body["token_type"], "Bearer");
    assert!(body["user"]["last_login"].is_string());

    let me = app.get("/api/v1/auth/me", Some(token)).await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.json()["username"], "ada");
}

#[tokio::test]
async fn test_signup_validation_and_conflicts() {
    let app = spawn().await;
    app.signup("ada").await;

    let weak = app
        .post_json(
            "/api/v1/auth/signup",
            None,
            json!({
                "username": "grace",
                "email": "grace@example.com",
                "full_name": "Grace Hopper",
                "password": "alllowercase1",
            }),
        )
        .await;
    assert_eq!(weak.status, StatusCode::BAD_REQUEST);
    assert!(weak.error().contains("uppercase"));

    let mismatch = app
        .post_json(
            "/api/v1/auth/signup",
            None,
            json!({
                "username": "grace",
                "email": "grace@example.com",
                "full_name": "Grace Hopper",
                "password": PASSWORD,
                "confirm_password": "Secret124",
            }),
        )
        .await;
    assert_eq!(mismatch.status, StatusCode::BAD_REQUEST);

    let taken = app
        .post_json(
            "/api/v1/auth/signup",
            None,
            json!({
                "username": "ada",
                "email": "other@example.com",
                "full_name": "Another Ada",
                "password": PASSWORD,
            }),
        )
        .await;
    assert_eq!(taken.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_bad_credentials_share_one_message() {
    let app = spawn().await;
    app.signup("ada").await;

    let wrong_password = app.login("ada", "Wrong1234").await;
    let unknown_user = app.login("nobody", PASSWORD).await;

    assert_eq!(wrong_password.status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_user.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password.error(), unknown_user.error());
}

#[tokio::test]
async fn test_deactivated_account_is_forbidden() {
    let app = spawn().await;
    let token = app.user_token("ada").await;
    let id: Uuid = app
        .get("/api/v1/auth/me", Some(&token))
        .await
        .json()["id"]
        .as_str()
        .unwrap()
        .parse()
        .unwrap();

    app.db.users.set_active(id, false).await.unwrap();

    assert_eq!(app.login("ada", PASSWORD).await.status, StatusCode::FORBIDDEN);
    assert_eq!(
        app.get("/api/v1/auth/me", Some(&token)).await.status,
        StatusCode::FORBIDDEN
    );
}

#[tokio::test]
async fn test_logout_ends_session() {
    let app = spawn().await;
    let token = app.user_token("ada").await;

    let res = app.post_json("/api/v1/auth/logout", Some(&token), json!({})).await;
    assert_eq!(res.status, StatusCode::NO_CONTENT);

    let me = app.get("/api/v1/auth/me", Some(&token)).await;
    assert_eq!(me.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_missing_or_malformed_token_is_unauthorized() {
    let app = spawn().await;

    let none = app.get("/api/v1/entries", None).await;
    assert_eq!(none.status, StatusCode::UNAUTHORIZED);
    assert_eq!(none.error(), "Authentication required");

    let garbage = app.get("/api/v1/entries", Some("not a token")).await;
    assert_eq!(garbage.status, StatusCode::UNAUTHORIZED);

    let unknown = app.get("/api/v1/entries", Some(&generate_token())).await;
    assert_eq!(unknown.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_expired_session_is_rejected() {
    let app = spawn().await;
    let user = app.signup("ada").await;
    let user_id: Uuid = user["id"].as_str().unwrap().parse().unwrap();

    let token = generate_token();
    app.db
        .sessions
        .create(user_id, &hash_token(&token), chrono::Duration::seconds(-5))
        .await
        .unwrap();

    let res = app.get("/api/v1/auth/me", Some(&token)).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert!(res.error().contains("expired"));
}

#[tokio::test]
async fn test_login_rate_limit() {
    let app = spawn_with(AppOptions {
        login_rate_limit_per_minute: 2,
        ..Default::default()
    })
    .await;
    app.signup("ada").await;

    assert_eq!(app.login("ada", PASSWORD).await.status, StatusCode::OK);
    assert_eq!(app.login("ada", "Wrong1234").await.status, StatusCode::UNAUTHORIZED);

    let limited = app.login("ada", PASSWORD).await;
    assert_eq!(limited.status, StatusCode::TOO_MANY_REQUESTS);
    assert!(limited.error().contains("Too many"));

    // Other routes are not limited
    assert_eq!(app.get("/health", None).await.status, StatusCode::OK);
}

#[tokio::test]
async fn test_health_and_openapi() {
    let app = spawn().await;

    let health = app.get("/health", None).await;
    assert_eq!(health.status, StatusCode::OK);
    let body = health.json();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"], true);
    assert_eq!(body["ai_enabled"], false);

    let doc = app.get("/api-docs/openapi.json", None).await;
    assert_eq!(doc.status, StatusCode::OK);
    let paths = &doc.json()["paths"];
    assert!(paths.get("/api/v1/entries").is_some());
    assert!(paths.get("/api/v1/ai/analyze").is_some());
}

#[tokio::test]
async fn test_request_id_is_returned() {
    let app = spawn().await;
    let response = tower::ServiceExt::oneshot(
        app.router.clone(),
        Request::builder()
            .method(Method::GET)
            .uri("/health")
            .body(Body::empty())
            .unwrap(),
    )
    .await
    .unwrap();

    let id = response
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .expect("request id header");
    let parsed: Uuid = id.parse().unwrap();
    assert_eq!(parsed.get_version_num(), 7);
    assert!(response.headers().get(header::CONTENT_TYPE).is_some());
}
