//! Functional tests for per-user rate limiting

use axum::{
    body::Body,
    http::{header::AUTHORIZATION, Request, StatusCode},
    routing::get,
    Router,
};
use gen_studio::config::ApiKeyConfig;
use gen_studio::middleware::{AuthLayer, RateLimitLayer};
use tower::ServiceExt;

fn create_test_app(rps: u32, burst: u32) -> Router {
    let keys = vec![
        ApiKeyConfig {
            key: "key-alice".to_string(),
            user_id: "alice".to_string(),
        },
        ApiKeyConfig {
            key: "key-bob".to_string(),
            user_id: "bob".to_string(),
        },
    ];

    Router::new()
        .route("/health", get(|| async { "healthy" }))
        .route("/test", get(|| async { "OK" }))
        .layer(RateLimitLayer::new(rps, burst))
        .layer(AuthLayer::new(keys))
}

async fn get_as(app: &Router, uri: &str, key: &str) -> StatusCode {
    app.clone()
        .oneshot(
            Request::builder()
                .uri(uri)
                .header(AUTHORIZATION, format!("Bearer {}", key))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
        .status()
}

#[tokio::test]
async fn test_rate_limit_allows_within_limit() {
    let app = create_test_app(100, 100);
    assert_eq!(get_as(&app, "/test", "key-alice").await, StatusCode::OK);
}

#[tokio::test]
async fn test_rate_limit_burst_capacity() {
    let app = create_test_app(1, 5);

    for _ in 0..5 {
        assert_eq!(get_as(&app, "/test", "key-alice").await, StatusCode::OK);
    }
}

#[tokio::test]
async fn test_rate_limit_exceeded() {
    let app = create_test_app(1, 1);

    assert_eq!(get_as(&app, "/test", "key-alice").await, StatusCode::OK);

    let mut rate_limited = false;
    for _ in 0..10 {
        if get_as(&app, "/test", "key-alice").await == StatusCode::TOO_MANY_REQUESTS {
            rate_limited = true;
            break;
        }
    }

    assert!(rate_limited, "Expected rate limiting to kick in");
}

#[tokio::test]
async fn test_users_have_separate_budgets() {
    let app = create_test_app(1, 1);

    assert_eq!(get_as(&app, "/test", "key-alice").await, StatusCode::OK);
    assert_eq!(get_as(&app, "/test", "key-alice").await, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(get_as(&app, "/test", "key-bob").await, StatusCode::OK);
}

#[tokio::test]
async fn test_rate_limit_health_bypass() {
    let app = create_test_app(1, 1);

    for _ in 0..3 {
        let response = app
            .clone()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
