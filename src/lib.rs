//! # WhatsApp API
//!
//! A JSON REST API exposing a WhatsApp client: QR login, connection status,
//! logout, message sending, device info and health checks.
//!
//! The WhatsApp connection itself is owned by an upstream gateway. This crate
//! provides the HTTP surface in front of it:
//!
//! - **Thin handlers**: each endpoint checks one precondition, makes one call
//!   into the [`WhatsAppService`] and wraps the result in a JSON envelope
//! - **Input validation**: phone numbers are normalized and bounds-checked,
//!   message bodies are length-checked, before a handler runs
//! - **Authentication**: optional HMAC-SHA256 bearer tokens
//!
//! ## Architecture
//!
//! - [`service`] - The `WhatsAppService` trait and the gateway bridge
//! - [`server`] - Axum-based HTTP server, validation and routes
//! - [`config`] - CLI and configuration types
//! - [`error`] - Service and validation error types
//!
//! ## Response Envelope
//!
//! ```json
//! { "success": true, "message": "Message sent successfully",
//!   "data": { "phone_number": "628123456789", "timestamp": 1735689600 } }
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use whatsapp_api::{create_router, GatewayConfig, GatewayService, RouterConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let service = GatewayService::new(GatewayConfig::new("http://127.0.0.1:9000")).unwrap();
//!     service.spawn_poller(std::time::Duration::from_secs(5));
//!
//!     let router = create_router(Some(Arc::new(service)), RouterConfig::new("secret"));
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await.unwrap();
//!     axum::serve(listener, router).await.unwrap();
//! }
//! ```

pub mod config;
pub mod error;
pub mod server;
pub mod service;

// Re-export commonly used types
pub use config::{CheckConfig, Cli, Command, ServeConfig, TokenConfig, TokenOutputFormat};
pub use error::{ServiceError, ValidationError};
pub use server::{
    auth_middleware, create_dev_router, create_router, ApiError, ApiResponse, ApiTokenAuth,
    AppState, AuthError, RouterConfig, SendMessageRequest, ValidatedSendMessage,
};
pub use service::{
    DeviceIdentity, GatewayConfig, GatewayService, QrOutcome, SessionSnapshot, SessionStatus,
    WhatsAppService,
};
