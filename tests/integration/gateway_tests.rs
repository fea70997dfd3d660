//! Gateway bridge integration tests.
//!
//! These tests run [`GatewayService`] against a fake gateway served by axum
//! on an ephemeral local port.
//!
//! Tests verify:
//! - Session snapshots are fetched and cached
//! - QR sentinels decode to the right outcome
//! - Send and logout requests carry the expected payload and token
//! - Gateway errors surface through the API envelope

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use whatsapp_api::error::ServiceError;
use whatsapp_api::service::{
    GatewayConfig, GatewayService, QrOutcome, SessionSnapshot, WhatsAppService,
};
use whatsapp_api::{create_router, RouterConfig};

use super::test_utils::{get_json, post_json};

// =============================================================================
// Fake Gateway
// =============================================================================

#[derive(Default)]
struct FakeState {
    session: Value,
    qr: String,
    fail_send: bool,
    sent: Vec<Value>,
    logouts: usize,
    authorization: Vec<String>,
}

#[derive(Clone, Default)]
struct FakeGateway {
    state: Arc<Mutex<FakeState>>,
}

impl FakeGateway {
    fn new(session: Value) -> Self {
        let gateway = Self::default();
        gateway.state.lock().unwrap().session = session;
        gateway.state.lock().unwrap().qr = "data:image/png;base64,QUJD".to_string();
        gateway
    }

    fn with_qr(self, qr: &str) -> Self {
        self.state.lock().unwrap().qr = qr.to_string();
        self
    }

    fn failing_send(self) -> Self {
        self.state.lock().unwrap().fail_send = true;
        self
    }

    fn set_session(&self, session: Value) {
        self.state.lock().unwrap().session = session;
    }

    fn record_auth(&self, headers: &HeaderMap) {
        if let Some(value) = headers.get("authorization") {
            self.state
                .lock()
                .unwrap()
                .authorization
                .push(value.to_str().unwrap().to_string());
        }
    }

    /// Serve the fake on an ephemeral port and return its base URL.
    async fn spawn(&self) -> String {
        let app = Router::new()
            .route("/session", get(session).delete(delete_session))
            .route("/session/qr", post(qr))
            .route("/messages", post(messages))
            .with_state(self.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        format!("http://{}", addr)
    }
}

async fn session(State(fake): State<FakeGateway>, headers: HeaderMap) -> Json<Value> {
    fake.record_auth(&headers);
    Json(fake.state.lock().unwrap().session.clone())
}

async fn delete_session(State(fake): State<FakeGateway>, headers: HeaderMap) -> StatusCode {
    fake.record_auth(&headers);
    let mut state = fake.state.lock().unwrap();
    state.logouts += 1;
    state.session["logged_in"] = json!(false);
    state.session["device"] = Value::Null;
    StatusCode::NO_CONTENT
}

async fn qr(State(fake): State<FakeGateway>, headers: HeaderMap) -> Json<Value> {
    fake.record_auth(&headers);
    let mut state = fake.state.lock().unwrap();
    if state.qr == "success" {
        state.session["logged_in"] = json!(true);
    }
    Json(json!({ "qr": state.qr }))
}

async fn messages(
    State(fake): State<FakeGateway>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    fake.record_auth(&headers);
    let mut state = fake.state.lock().unwrap();
    if state.fail_send {
        return (
            StatusCode::BAD_GATEWAY,
            Json(json!({ "error": "recipient is not on WhatsApp" })),
        )
            .into_response();
    }
    state.sent.push(body);
    Json(json!({ "id": "3EB0C767D26A" })).into_response()
}

fn logged_in_session() -> Value {
    json!({
        "connected": true,
        "logged_in": true,
        "store_ready": true,
        "client_ready": true,
        "device": { "id": "628123456789.0:1@s.whatsapp.net", "name": "Pixel 8" }
    })
}

fn paired_out_session() -> Value {
    json!({
        "connected": true,
        "logged_in": false,
        "store_ready": true,
        "client_ready": true
    })
}

async fn connect(fake: &FakeGateway) -> GatewayService {
    let base_url = fake.spawn().await;
    GatewayService::new(
        GatewayConfig::new(base_url)
            .with_token("gateway-token")
            .with_timeout(Duration::from_secs(5)),
    )
    .unwrap()
}

// =============================================================================
// Session Snapshot
// =============================================================================

#[tokio::test]
async fn test_refresh_populates_snapshot() {
    let fake = FakeGateway::new(logged_in_session());
    let gateway = connect(&fake).await;

    assert!(!gateway.is_logged_in());

    let snapshot = gateway.refresh().await.unwrap();
    assert!(snapshot.connected);
    assert!(gateway.is_connected());
    assert!(gateway.is_logged_in());
    assert!(gateway.has_container());
    assert!(gateway.has_client());
    assert_eq!(gateway.device_identity().unwrap().name, "Pixel 8");
}

#[tokio::test]
async fn test_refresh_tolerates_missing_fields() {
    let fake = FakeGateway::new(json!({ "connected": true }));
    let gateway = connect(&fake).await;

    let snapshot = gateway.refresh().await.unwrap();
    assert_eq!(
        snapshot,
        SessionSnapshot {
            connected: true,
            ..SessionSnapshot::default()
        }
    );
}

#[tokio::test]
async fn test_refresh_failure_marks_disconnected() {
    let fake = FakeGateway::new(logged_in_session());
    let gateway = connect(&fake).await;
    gateway.refresh().await.unwrap();

    fake.set_session(json!("not an object"));
    assert!(gateway.refresh().await.is_err());

    assert!(!gateway.is_connected());
    assert!(gateway.is_logged_in());
}

#[tokio::test]
async fn test_unreachable_gateway() {
    // Bind and drop to get a port nothing listens on
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let gateway = GatewayService::new(
        GatewayConfig::new(format!("http://{}", addr)).with_timeout(Duration::from_secs(2)),
    )
    .unwrap();

    let result = gateway.fetch_session().await;
    assert!(matches!(result, Err(ServiceError::Transport(_))));
}

#[tokio::test]
async fn test_poller_picks_up_changes() {
    let fake = FakeGateway::new(paired_out_session());
    let gateway = connect(&fake).await;

    let handle = gateway.spawn_poller(Duration::from_millis(20));
    fake.set_session(logged_in_session());

    let mut logged_in = false;
    for _ in 0..50 {
        if gateway.is_logged_in() {
            logged_in = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    handle.abort();

    assert!(logged_in);
}

#[tokio::test]
async fn test_token_sent_to_gateway() {
    let fake = FakeGateway::new(logged_in_session());
    let gateway = connect(&fake).await;

    gateway.refresh().await.unwrap();

    let authorization = fake.state.lock().unwrap().authorization.clone();
    assert_eq!(authorization, vec!["Bearer gateway-token".to_string()]);
}

// =============================================================================
// QR
// =============================================================================

#[tokio::test]
async fn test_qr_code_passthrough() {
    let fake = FakeGateway::new(paired_out_session());
    let gateway = connect(&fake).await;

    let outcome = gateway.generate_qr().await.unwrap();
    assert_eq!(
        outcome,
        QrOutcome::Code("data:image/png;base64,QUJD".to_string())
    );
}

#[tokio::test]
async fn test_qr_success_refreshes_snapshot() {
    let fake = FakeGateway::new(paired_out_session()).with_qr("success");
    let gateway = connect(&fake).await;

    let outcome = gateway.generate_qr().await.unwrap();

    assert_eq!(outcome, QrOutcome::LoginSuccess);
    assert!(gateway.is_logged_in());
}

#[tokio::test]
async fn test_qr_already_connected() {
    let fake = FakeGateway::new(paired_out_session()).with_qr("already_connected");
    let gateway = connect(&fake).await;

    assert_eq!(
        gateway.generate_qr().await.unwrap(),
        QrOutcome::AlreadyConnected
    );
}

// =============================================================================
// Send and Logout
// =============================================================================

#[tokio::test]
async fn test_send_message_payload() {
    let fake = FakeGateway::new(logged_in_session());
    let gateway = connect(&fake).await;

    gateway
        .send_message("628123456789", "hello there")
        .await
        .unwrap();

    let sent = fake.state.lock().unwrap().sent.clone();
    assert_eq!(
        sent,
        vec![json!({ "phone_number": "628123456789", "message": "hello there" })]
    );
}

#[tokio::test]
async fn test_send_message_gateway_error() {
    let fake = FakeGateway::new(logged_in_session()).failing_send();
    let gateway = connect(&fake).await;

    let err = gateway
        .send_message("628123456789", "hello")
        .await
        .unwrap_err();

    match err {
        ServiceError::Gateway { status, message } => {
            assert_eq!(status, 502);
            assert_eq!(message, "recipient is not on WhatsApp");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_logout_clears_session() {
    let fake = FakeGateway::new(logged_in_session());
    let gateway = connect(&fake).await;
    gateway.refresh().await.unwrap();

    gateway.logout().await.unwrap();

    assert!(!gateway.is_logged_in());
    assert!(gateway.device_identity().is_none());
    assert_eq!(fake.state.lock().unwrap().logouts, 1);
}

// =============================================================================
// Through the API
// =============================================================================

#[tokio::test]
async fn test_api_over_gateway() {
    let fake = FakeGateway::new(logged_in_session());
    let gateway = connect(&fake).await;
    gateway.refresh().await.unwrap();

    let router = create_router(
        Some(Arc::new(gateway)),
        RouterConfig::without_auth().with_tracing(false),
    );

    let (status, json) = get_json(router.clone(), "/whatsapp/status").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["status"], "connected_and_logged_in");

    let (status, json) = post_json(
        router.clone(),
        "/whatsapp/send",
        r#"{"phone_number":"+62 812-3456-789","message":"hi"}"#,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["phone_number"], "628123456789");

    let (status, _) = post_json(router.clone(), "/logout/whatsapp", "{}").await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = get_json(router, "/whatsapp/device").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["success"], false);
}

#[tokio::test]
async fn test_api_surfaces_gateway_error() {
    let fake = FakeGateway::new(logged_in_session()).failing_send();
    let gateway = connect(&fake).await;
    gateway.refresh().await.unwrap();

    let router = create_router(
        Some(Arc::new(gateway)),
        RouterConfig::without_auth().with_tracing(false),
    );

    let (status, json) = post_json(
        router,
        "/whatsapp/send",
        r#"{"phone_number":"628123456789","message":"hi"}"#,
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        json["message"],
        "Failed to send message: gateway returned 502: recipient is not on WhatsApp"
    );
}
