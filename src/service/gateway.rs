//! HTTP bridge to an upstream WhatsApp gateway.
//!
//! The gateway owns the actual WhatsApp connection (socket, pairing, credential
//! store). This module speaks its small JSON API:
//!
//! ```text
//! GET    {base}/session       -> SessionSnapshot
//! POST   {base}/session/qr    -> {"qr": "<sentinel or data URI>"}
//! DELETE {base}/session       -> 2xx
//! POST   {base}/messages      <- {"phone_number": "...", "message": "..."}
//! ```
//!
//! Session state is cached in a snapshot so the synchronous state readers of
//! [`WhatsAppService`] never block on the network. The snapshot is refreshed
//! by [`GatewayService::refresh`], either explicitly or from the background
//! task started by [`GatewayService::spawn_poller`].

use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::ServiceError;

use super::{DeviceIdentity, QrOutcome, WhatsAppService};

/// Default timeout for gateway requests.
pub const DEFAULT_GATEWAY_TIMEOUT: Duration = Duration::from_secs(10);

// =============================================================================
// Configuration
// =============================================================================

/// Connection settings for the upstream gateway.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Base URL of the gateway (e.g., "http://127.0.0.1:9000/api")
    pub base_url: String,

    /// Bearer token sent with every gateway request
    pub token: Option<String>,

    /// Per-request timeout
    pub timeout: Duration,
}

impl GatewayConfig {
    /// Create a configuration for the given base URL with default timeout and no token.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: None,
            timeout: DEFAULT_GATEWAY_TIMEOUT,
        }
    }

    /// Set the bearer token for gateway requests.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Set the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

// =============================================================================
// Wire Types
// =============================================================================

/// Session state as reported by the gateway.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// Client socket is connected
    #[serde(default)]
    pub connected: bool,

    /// A device is paired and authenticated
    #[serde(default)]
    pub logged_in: bool,

    /// The credential store is available
    #[serde(default)]
    pub store_ready: bool,

    /// The client object has been created
    #[serde(default)]
    pub client_ready: bool,

    /// Paired device identity, if stored
    #[serde(default)]
    pub device: Option<DeviceIdentity>,
}

#[derive(Debug, Deserialize)]
struct QrBody {
    qr: String,
}

#[derive(Debug, Serialize)]
struct SendBody<'a> {
    phone_number: &'a str,
    message: &'a str,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
    message: Option<String>,
}

// =============================================================================
// GatewayService
// =============================================================================

/// [`WhatsAppService`] implementation backed by an upstream gateway.
///
/// Cloning is cheap; clones share the HTTP client and the session snapshot.
#[derive(Clone)]
pub struct GatewayService {
    http: Client,
    base_url: String,
    token: Option<String>,
    snapshot: Arc<RwLock<SessionSnapshot>>,
}

impl GatewayService {
    /// Create a new gateway bridge.
    ///
    /// The snapshot starts out empty (disconnected, logged out) until the
    /// first [`refresh`](Self::refresh).
    pub fn new(config: GatewayConfig) -> Result<Self, ServiceError> {
        let parsed = Url::parse(&config.base_url)
            .map_err(|e| ServiceError::Other(format!("invalid gateway URL: {}", e)))?;

        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(ServiceError::Other(format!(
                "invalid gateway URL scheme: {} (expected http or https)",
                parsed.scheme()
            )));
        }

        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ServiceError::Other(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token,
            snapshot: Arc::new(RwLock::new(SessionSnapshot::default())),
        })
    }

    /// Get the normalized base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Get a copy of the current session snapshot.
    pub fn snapshot(&self) -> SessionSnapshot {
        match self.snapshot.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn update_snapshot(&self, f: impl FnOnce(&mut SessionSnapshot)) {
        match self.snapshot.write() {
            Ok(mut guard) => f(&mut *guard),
            Err(poisoned) => f(&mut *poisoned.into_inner()),
        }
    }

    /// Fetch the session state from the gateway without touching the snapshot.
    pub async fn fetch_session(&self) -> Result<SessionSnapshot, ServiceError> {
        let response = self
            .authorize(self.http.get(self.url("/session")))
            .send()
            .await
            .map_err(transport_error)?;

        check_status(response)
            .await?
            .json::<SessionSnapshot>()
            .await
            .map_err(|e| ServiceError::InvalidResponse(e.to_string()))
    }

    /// Refresh the snapshot from the gateway.
    ///
    /// On failure the snapshot is marked disconnected. The login flag and
    /// device identity are left untouched.
    pub async fn refresh(&self) -> Result<SessionSnapshot, ServiceError> {
        match self.fetch_session().await {
            Ok(snapshot) => {
                let previous = self.snapshot();
                if previous.connected != snapshot.connected
                    || previous.logged_in != snapshot.logged_in
                {
                    info!(
                        connected = snapshot.connected,
                        logged_in = snapshot.logged_in,
                        "Gateway session state changed"
                    );
                }
                self.update_snapshot(|s| *s = snapshot.clone());
                Ok(snapshot)
            }
            Err(e) => {
                warn!("Failed to refresh gateway session: {}", e);
                self.update_snapshot(|s| s.connected = false);
                Err(e)
            }
        }
    }

    /// Spawn a background task that refreshes the snapshot periodically.
    pub fn spawn_poller(&self, interval: Duration) -> JoinHandle<()> {
        let service = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if service.refresh().await.is_ok() {
                    debug!("Gateway session refreshed");
                }
            }
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.token {
            Some(ref token) => request.bearer_auth(token),
            None => request,
        }
    }
}

#[async_trait]
impl WhatsAppService for GatewayService {
    fn is_connected(&self) -> bool {
        self.snapshot().connected
    }

    fn is_logged_in(&self) -> bool {
        self.snapshot().logged_in
    }

    async fn generate_qr(&self) -> Result<QrOutcome, ServiceError> {
        let response = self
            .authorize(self.http.post(self.url("/session/qr")))
            .send()
            .await
            .map_err(transport_error)?;

        let body = check_status(response)
            .await?
            .json::<QrBody>()
            .await
            .map_err(|e| ServiceError::InvalidResponse(e.to_string()))?;

        let outcome = QrOutcome::from_wire(body.qr);

        // Pairing may have completed; pick up the new state right away.
        // A failed refresh is already logged and leaves the outcome valid.
        if !matches!(outcome, QrOutcome::Code(_)) {
            if let Err(e) = self.refresh().await {
                debug!("Session refresh after QR outcome failed: {}", e);
            }
        }

        Ok(outcome)
    }

    async fn logout(&self) -> Result<(), ServiceError> {
        let response = self
            .authorize(self.http.delete(self.url("/session")))
            .send()
            .await
            .map_err(transport_error)?;

        check_status(response).await?;

        self.update_snapshot(|s| {
            s.logged_in = false;
            s.device = None;
        });

        Ok(())
    }

    async fn send_message(&self, phone_number: &str, message: &str) -> Result<(), ServiceError> {
        let response = self
            .authorize(self.http.post(self.url("/messages")))
            .json(&SendBody {
                phone_number,
                message,
            })
            .send()
            .await
            .map_err(transport_error)?;

        check_status(response).await?;
        Ok(())
    }

    fn has_container(&self) -> bool {
        self.snapshot().store_ready
    }

    fn has_client(&self) -> bool {
        self.snapshot().client_ready
    }

    fn device_identity(&self) -> Option<DeviceIdentity> {
        self.snapshot().device
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn transport_error(err: reqwest::Error) -> ServiceError {
    ServiceError::Transport(err.to_string())
}

/// Turn a non-success response into [`ServiceError::Gateway`].
async fn check_status(response: Response) -> Result<Response, ServiceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(ServiceError::Gateway {
        status: status.as_u16(),
        message: error_message(status.canonical_reason(), &body),
    })
}

/// Extract the most useful error text from a gateway error body.
///
/// Prefers a JSON `error` field, then `message`, then the raw body, then the
/// canonical reason phrase of the status.
fn error_message(reason: Option<&str>, body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        if let Some(text) = parsed.error.or(parsed.message) {
            return text;
        }
    }

    let trimmed = body.trim();
    if !trimmed.is_empty() {
        return trimmed.to_string();
    }

    reason.unwrap_or("unknown error").to_string()
}
