//! Middleware and routing tests.
//!
//! Tests verify:
//! - 404 JSON body for unknown routes and methods
//! - Per-IP rate limiting on `/api`
//! - Security and CORS headers on every response

use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use image::ImageFormat;
use tower::ServiceExt;

use webp_converter::RouterConfig;

use super::test_utils::{convert_form, convert_request, create_test_image, TestApp};

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

// =============================================================================
// Not Found
// =============================================================================

#[tokio::test]
async fn test_unknown_routes_return_json_404() {
    let app = TestApp::new();

    for uri in ["/", "/health", "/api", "/api/unknown", "/api/convert/extra"] {
        let response = app.router.clone().oneshot(get(uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "uri {}", uri);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], br#"{"error":"Route not found"}"#);
    }
}

#[tokio::test]
async fn test_wrong_method_on_convert_is_404() {
    let app = TestApp::new();

    let response = app
        .router
        .clone()
        .oneshot(get("/api/convert"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// =============================================================================
// Rate Limiting
// =============================================================================

#[tokio::test]
async fn test_rate_limit_rejects_after_quota() {
    let app = TestApp::with_config(
        RouterConfig::new()
            .with_tracing(false)
            .with_rate_limit(2, Duration::from_secs(60)),
    );
    let png = create_test_image(8, 8, ImageFormat::Png);

    for expected_remaining in ["1", "0"] {
        let response = app
            .router
            .clone()
            .oneshot(convert_request(convert_form(&png, "rl", "50")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get("x-ratelimit-remaining").unwrap(),
            expected_remaining
        );
    }

    let response = app
        .router
        .clone()
        .oneshot(convert_request(convert_form(&png, "rl", "50")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().contains_key("retry-after"));

    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(
        std::str::from_utf8(&body).unwrap(),
        "Too many requests from this IP, please try again after 1 minute"
    );
    assert!(app.scratch_is_empty());
}

#[tokio::test]
async fn test_rate_limit_does_not_apply_outside_api() {
    let app = TestApp::with_config(
        RouterConfig::new()
            .with_tracing(false)
            .with_rate_limit(1, Duration::from_secs(60)),
    );

    for _ in 0..3 {
        let response = app.router.clone().oneshot(get("/other")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(!response.headers().contains_key("x-ratelimit-limit"));
    }
}

// =============================================================================
// Response Headers
// =============================================================================

#[tokio::test]
async fn test_security_headers_present() {
    let app = TestApp::new();

    let response = app.router.clone().oneshot(get("/nope")).await.unwrap();
    let headers = response.headers();

    assert_eq!(headers.get("x-content-type-options").unwrap(), "nosniff");
    assert_eq!(headers.get("x-frame-options").unwrap(), "SAMEORIGIN");
    assert!(headers.contains_key("content-security-policy"));
    assert!(headers.contains_key("strict-transport-security"));
    assert!(!headers.contains_key("x-powered-by"));
}

#[tokio::test]
async fn test_cors_any_origin() {
    let app = TestApp::new();
    let png = create_test_image(8, 8, ImageFormat::Png);

    let mut request = convert_request(convert_form(&png, "cors", "50"));
    request
        .headers_mut()
        .insert("origin", "https://site.example".parse().unwrap());

    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("access-control-allow-origin").unwrap(),
        "*"
    );
}

#[tokio::test]
async fn test_cors_preflight_with_configured_origin() {
    let app = TestApp::with_config(
        RouterConfig::new()
            .with_tracing(false)
            .with_cors_origins(vec!["https://allowed.example".to_string()]),
    );

    let request = Request::builder()
        .method("OPTIONS")
        .uri("/api/convert")
        .header("origin", "https://allowed.example")
        .header("access-control-request-method", "POST")
        .body(Body::empty())
        .unwrap();

    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("access-control-allow-origin").unwrap(),
        "https://allowed.example"
    );
}
