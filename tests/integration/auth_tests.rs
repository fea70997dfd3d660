//! Authentication integration tests.
//!
//! Tests verify:
//! - Valid bearer tokens work
//! - Expired tokens are rejected
//! - Invalid signatures are rejected
//! - Missing or malformed Authorization headers are handled
//! - Health endpoints stay public

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;

use whatsapp_api::{create_router, ApiTokenAuth, RouterConfig};

use super::test_utils::{get_json, send, MockWhatsAppService};

const TEST_SECRET: &str = "test-secret-key-for-hmac-signing";

fn protected_router(service: &MockWhatsAppService) -> Router {
    create_router(
        Some(Arc::new(service.clone())),
        RouterConfig::new(TEST_SECRET).with_tracing(false),
    )
}

fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

fn authorized_get(uri: &str, authorization: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("authorization", authorization)
        .body(Body::empty())
        .unwrap()
}

// =============================================================================
// Valid Tokens
// =============================================================================

#[tokio::test]
async fn test_valid_token_succeeds() {
    let service = MockWhatsAppService::logged_in();
    let auth = ApiTokenAuth::new(TEST_SECRET);
    let (token, _) = auth.issue(Duration::from_secs(3600));

    let request = authorized_get("/whatsapp/status", &format!("Bearer {}", token));
    let (status, json) = send(protected_router(&service), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
}

#[tokio::test]
async fn test_valid_token_on_send() {
    let service = MockWhatsAppService::logged_in();
    let auth = ApiTokenAuth::new(TEST_SECRET);
    let (token, _) = auth.issue(Duration::from_secs(3600));

    let request = Request::builder()
        .method("POST")
        .uri("/whatsapp/send")
        .header("authorization", format!("Bearer {}", token))
        .header("content-type", "application/json")
        .body(Body::from(
            r#"{"phone_number":"+62 812-3456-789","message":"hello"}"#,
        ))
        .unwrap();

    let (status, json) = send(protected_router(&service), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["phone_number"], "628123456789");
}

// =============================================================================
// Rejected Tokens
// =============================================================================

#[tokio::test]
async fn test_missing_token() {
    let service = MockWhatsAppService::logged_in();

    let (status, json) = get_json(protected_router(&service), "/whatsapp/status").await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["success"], false);
    assert_eq!(json["message"], "Missing authorization token");
}

#[tokio::test]
async fn test_expired_token() {
    let service = MockWhatsAppService::logged_in();
    let auth = ApiTokenAuth::new(TEST_SECRET);
    let token = auth.issue_with_expiry(now() - 60);

    let request = authorized_get("/whatsapp/status", &format!("Bearer {}", token));
    let (status, json) = send(protected_router(&service), request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(json["message"].as_str().unwrap().contains("expired"));
}

#[tokio::test]
async fn test_token_signed_with_other_secret() {
    let service = MockWhatsAppService::logged_in();
    let auth = ApiTokenAuth::new("some-other-secret");
    let (token, _) = auth.issue(Duration::from_secs(3600));

    let request = authorized_get("/whatsapp/status", &format!("Bearer {}", token));
    let (status, json) = send(protected_router(&service), request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["message"], "Invalid token signature");
}

#[tokio::test]
async fn test_tampered_expiry() {
    let service = MockWhatsAppService::logged_in();
    let auth = ApiTokenAuth::new(TEST_SECRET);
    let (token, expiry) = auth.issue(Duration::from_secs(60));

    let signature = token.split_once('.').unwrap().1;
    let forged = format!("{}.{}", expiry + 86400, signature);

    let request = authorized_get("/whatsapp/status", &format!("Bearer {}", forged));
    let (status, _) = send(protected_router(&service), request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_malformed_tokens() {
    let service = MockWhatsAppService::logged_in();
    let expiry = now() + 3600;

    let cases = [
        "Basic dXNlcjpwYXNz".to_string(),
        "Bearer no-dot-here".to_string(),
        format!("Bearer abc.{}", "00".repeat(32)),
        format!("Bearer {}.not-hex", expiry),
    ];

    for authorization in cases {
        let request = authorized_get("/whatsapp/status", &authorization);
        let (status, json) = send(protected_router(&service), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", authorization);
        assert_eq!(json["success"], false);
    }
}

#[tokio::test]
async fn test_auth_runs_before_content_type_check() {
    let service = MockWhatsAppService::logged_in();

    let request = Request::builder()
        .method("POST")
        .uri("/whatsapp/send")
        .header("content-type", "text/plain")
        .body(Body::from("hello"))
        .unwrap();

    let (status, _) = send(protected_router(&service), request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(service.send_calls(), 0);
}

#[tokio::test]
async fn test_every_operation_route_is_protected() {
    let service = MockWhatsAppService::logged_in();

    for (method, uri) in [
        ("GET", "/whatsapp/status"),
        ("GET", "/whatsapp/qr"),
        ("GET", "/whatsapp/device"),
        ("POST", "/whatsapp/send"),
        ("POST", "/logout/whatsapp"),
        ("POST", "/logout/whastapp"),
    ] {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from("{}"))
            .unwrap();

        let (status, _) = send(protected_router(&service), request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{} {}", method, uri);
    }

    assert_eq!(service.logout_calls(), 0);
    assert_eq!(service.qr_calls(), 0);
}

// =============================================================================
// Public Routes
// =============================================================================

#[tokio::test]
async fn test_health_routes_are_public() {
    let service = MockWhatsAppService::logged_in();

    let (status, _) = get_json(protected_router(&service), "/health").await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = get_json(protected_router(&service), "/whatsapp/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "WhatsApp service is healthy");
}
