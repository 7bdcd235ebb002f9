//! Router tests that need no running database
//!
//! The pool points at a closed port, so anything past authentication
//! fails; these tests cover routing, authentication and error bodies.

mod helpers;

use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use chrono::Utc;
use jsonwebtoken::{EncodingKey, Header};
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use tower::ServiceExt;

use helpers::{test_settings, TEST_JWT_SECRET};
use kindergarten::database::DatabaseService;
use kindergarten::http::{create_router, AppState};
use kindergarten::services::auth::Claims;
use kindergarten::services::ServiceFactory;

fn offline_router() -> Router {
    let pool = PgPoolOptions::new()
        .acquire_timeout(Duration::from_millis(300))
        .connect_lazy("postgresql://nobody@127.0.0.1:1/nothing")
        .expect("lazy pool");
    let settings = test_settings();
    let services = ServiceFactory::new(DatabaseService::new(pool), &settings);
    create_router(AppState::new(services, settings))
}

async fn send(request: Request<Body>) -> (StatusCode, Value) {
    let response = offline_router().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).expect("request")
}

fn token(secret: &str, exp_offset_secs: i64) -> String {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: 1,
        iat: now,
        exp: now + exp_offset_secs,
    };
    jsonwebtoken::encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes()))
        .expect("token")
}

#[tokio::test]
async fn health_reports_unavailable_database() {
    let (status, body) = send(get("/health", None)).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["database_healthy"], false);
    assert_eq!(body["version"], kindergarten::VERSION);
}

#[tokio::test]
async fn api_requires_bearer_token() {
    for uri in ["/api/students", "/api/dashboard", "/api/reports/students_csv", "/api/accounts"] {
        let (status, body) = send(get(uri, None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{}", uri);
        assert_eq!(body["code"], "UNAUTHORIZED");
        assert_eq!(body["message"], "Missing bearer token");
    }
}

#[tokio::test]
async fn malformed_token_is_rejected() {
    let (status, body) = send(get("/api/groups", Some("not-a-jwt"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid or expired token");
}

#[tokio::test]
async fn token_signed_with_another_secret_is_rejected() {
    let forged = token("some-other-secret-that-is-long-enough", 3600);
    let (status, _) = send(get("/api/teachers", Some(&forged))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn expired_token_is_rejected() {
    let expired = token(TEST_JWT_SECRET, -3600);
    let (status, body) = send(get("/api/events", Some(&expired))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let (status, _) = send(get("/api/nothing-here", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_login_body_is_rejected() {
    let request = Request::builder()
        .method("POST")
        .uri("/api/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{"))
        .expect("request");
    let (status, _) = send(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
