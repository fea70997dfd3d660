//! Messaging-client service abstraction.
//!
//! The HTTP handlers never talk to WhatsApp directly. They go through the
//! [`WhatsAppService`] trait, which is injected into the router at startup:
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │              HTTP Handlers              │
//! └────────────────────┬────────────────────┘
//!                      │  Arc<dyn WhatsAppService>
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │            GatewayService               │
//! │  (session snapshot + background poll)   │
//! └────────────────────┬────────────────────┘
//!                      │  HTTP
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │          Upstream WhatsApp gateway      │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use whatsapp_api::service::{GatewayService, GatewayConfig, WhatsAppService};
//!
//! let service = GatewayService::new(GatewayConfig::new("http://127.0.0.1:9000"))?;
//! service.refresh().await;
//!
//! if !service.is_logged_in() {
//!     let outcome = service.generate_qr().await?;
//! }
//! ```

mod gateway;

pub use gateway::{GatewayConfig, GatewayService, SessionSnapshot, DEFAULT_GATEWAY_TIMEOUT};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ServiceError;

// =============================================================================
// WhatsAppService Trait
// =============================================================================

/// Operations the API consumes from the messaging client.
///
/// The state readers (`is_connected`, `is_logged_in`, and the introspection
/// methods) are synchronous and infallible: they report the client's current
/// view of the session. Only the three actions can fail.
///
/// Implementations must be safe to call from many requests at once.
#[async_trait]
pub trait WhatsAppService: Send + Sync {
    /// Whether the client socket is currently connected.
    fn is_connected(&self) -> bool;

    /// Whether a device is paired and authenticated.
    fn is_logged_in(&self) -> bool;

    /// Start (or continue) the QR pairing flow.
    async fn generate_qr(&self) -> Result<QrOutcome, ServiceError>;

    /// Terminate the session and delete stored credentials.
    async fn logout(&self) -> Result<(), ServiceError>;

    /// Send a text message to a normalized phone number.
    async fn send_message(&self, phone_number: &str, message: &str) -> Result<(), ServiceError>;

    /// Whether the credential store backing the client is available.
    fn has_container(&self) -> bool;

    /// Whether the underlying client object exists.
    fn has_client(&self) -> bool;

    /// Identity of the paired device, if one is stored.
    fn device_identity(&self) -> Option<DeviceIdentity>;
}

// =============================================================================
// Value Types
// =============================================================================

/// Result of a QR generation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QrOutcome {
    /// Pairing completed while the QR flow was running
    LoginSuccess,

    /// The client was already connected; no QR needed
    AlreadyConnected,

    /// A QR payload (data URI) for the user to scan
    Code(String),
}

impl QrOutcome {
    /// Wire sentinel meaning pairing completed during generation.
    pub const SUCCESS_SENTINEL: &'static str = "success";

    /// Wire sentinel meaning the client was already connected.
    pub const ALREADY_CONNECTED_SENTINEL: &'static str = "already_connected";

    /// Decode the gateway's overloaded QR value.
    ///
    /// The two sentinels are matched exactly; any other value is a QR payload.
    pub fn from_wire(value: String) -> Self {
        match value.as_str() {
            Self::SUCCESS_SENTINEL => QrOutcome::LoginSuccess,
            Self::ALREADY_CONNECTED_SENTINEL => QrOutcome::AlreadyConnected,
            _ => QrOutcome::Code(value),
        }
    }
}

/// Stored identity of the paired device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceIdentity {
    /// Device JID
    pub id: String,

    /// Human-readable device name
    pub name: String,
}

/// Composite session state derived from the connection and login flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    ConnectedAndLoggedIn,
    LoggedInButDisconnected,
    ConnectedButNotLoggedIn,
    Disconnected,
}

impl SessionStatus {
    /// Derive the status from the two independent flags.
    pub fn from_flags(connected: bool, logged_in: bool) -> Self {
        match (connected, logged_in) {
            (true, true) => SessionStatus::ConnectedAndLoggedIn,
            (false, true) => SessionStatus::LoggedInButDisconnected,
            (true, false) => SessionStatus::ConnectedButNotLoggedIn,
            (false, false) => SessionStatus::Disconnected,
        }
    }

    /// Status label as it appears on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::ConnectedAndLoggedIn => "connected_and_logged_in",
            SessionStatus::LoggedInButDisconnected => "logged_in_but_disconnected",
            SessionStatus::ConnectedButNotLoggedIn => "connected_but_not_logged_in",
            SessionStatus::Disconnected => "disconnected",
        }
    }

    /// Human-readable description for the response envelope.
    pub fn description(&self) -> &'static str {
        match self {
            SessionStatus::ConnectedAndLoggedIn => "WhatsApp is connected and logged in",
            SessionStatus::LoggedInButDisconnected => "WhatsApp is logged in but disconnected",
            SessionStatus::ConnectedButNotLoggedIn => {
                "WhatsApp is connected but not logged in, scan the QR code to login"
            }
            SessionStatus::Disconnected => "WhatsApp is disconnected",
        }
    }
}
