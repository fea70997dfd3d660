//! Router configuration for the WhatsApp API.
//!
//! This module defines the HTTP routes and applies middleware for
//! authentication, content-type checking and CORS.
//!
//! # Route Structure
//!
//! ```text
//! /health                  - Process liveness (public)
//! /whatsapp/health         - Service health snapshot (public)
//! /whatsapp/status         - Connection status (protected)
//! /whatsapp/qr             - QR login (protected)
//! /whatsapp/send           - Send message (protected)
//! /whatsapp/device         - Device info (protected)
//! /logout/whatsapp         - Logout (protected)
//! /logout/whastapp         - Legacy alias of /logout/whatsapp (protected)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use whatsapp_api::server::routes::{create_router, RouterConfig};
//! use whatsapp_api::service::{GatewayConfig, GatewayService};
//!
//! let service = GatewayService::new(GatewayConfig::new("http://127.0.0.1:9000"))?;
//! let config = RouterConfig::new("my-secret-key")
//!     .with_cors_origins(vec!["https://example.com".to_string()]);
//!
//! let router = create_router(Some(Arc::new(service)), config);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//! axum::serve(listener, router).await?;
//! ```

use std::sync::Arc;
use std::time::Duration;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use http::Method;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::auth::ApiTokenAuth;
use super::handlers::{
    device_info_handler, health_handler, liveness_handler, logout_handler, qr_handler,
    send_message_handler, status_handler, AppState,
};
use super::validation::require_json_content_type;
use crate::service::WhatsAppService;

/// Logout path with the historical misspelling, kept for existing clients.
pub const LEGACY_LOGOUT_PATH: &str = "/logout/whastapp";

// =============================================================================
// Router Configuration
// =============================================================================

/// Configuration for the HTTP router.
#[derive(Clone)]
pub struct RouterConfig {
    /// Secret key for bearer token authentication
    pub auth_secret: String,

    /// Whether authentication is enabled for the WhatsApp operation routes
    pub auth_enabled: bool,

    /// Allowed CORS origins (None = allow any origin)
    pub cors_origins: Option<Vec<String>>,

    /// Whether to enable request tracing
    pub enable_tracing: bool,
}

impl RouterConfig {
    /// Create a new router configuration with the given auth secret.
    ///
    /// By default:
    /// - Authentication is enabled
    /// - CORS allows any origin
    /// - Tracing is enabled
    pub fn new(auth_secret: impl Into<String>) -> Self {
        Self {
            auth_secret: auth_secret.into(),
            auth_enabled: true,
            cors_origins: None,
            enable_tracing: true,
        }
    }

    /// Create a configuration with authentication disabled.
    ///
    /// **Warning**: This should only be used for development/testing.
    pub fn without_auth() -> Self {
        Self {
            auth_secret: String::new(),
            auth_enabled: false,
            cors_origins: None,
            enable_tracing: true,
        }
    }

    /// Set specific allowed CORS origins.
    ///
    /// Pass an empty vec to disallow all cross-origin requests.
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = Some(origins);
        self
    }

    /// Allow any CORS origin.
    pub fn with_cors_any_origin(mut self) -> Self {
        self.cors_origins = None;
        self
    }

    /// Enable or disable authentication.
    pub fn with_auth_enabled(mut self, enabled: bool) -> Self {
        self.auth_enabled = enabled;
        self
    }

    /// Enable or disable request tracing.
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }
}

// =============================================================================
// Router Builder
// =============================================================================

/// Create the main application router.
///
/// # Arguments
///
/// * `service` - The messaging service, or `None` if it could not be set up.
///   Without a service every WhatsApp route answers 500 "not initialized".
/// * `config` - Router configuration
pub fn create_router(service: Option<Arc<dyn WhatsAppService>>, config: RouterConfig) -> Router {
    let app_state = AppState::from_option(service);

    let cors = build_cors_layer(&config);

    let operations = operation_routes(app_state.clone());
    let operations = if config.auth_enabled {
        let auth = ApiTokenAuth::new(&config.auth_secret);
        operations.layer(middleware::from_fn_with_state(
            auth,
            super::auth::auth_middleware,
        ))
    } else {
        operations
    };

    let public_routes = Router::new()
        .route("/health", get(liveness_handler))
        .route("/whatsapp/health", get(health_handler))
        .with_state(app_state);

    let router = Router::new()
        .merge(operations)
        .merge(public_routes)
        .layer(cors);

    if config.enable_tracing {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

/// Routes that act on the WhatsApp session.
///
/// The content-type gate sits inside the auth layer so unauthenticated
/// requests are rejected before their body is looked at.
fn operation_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/whatsapp/status", get(status_handler))
        .route("/whatsapp/qr", get(qr_handler))
        .route("/whatsapp/send", post(send_message_handler))
        .route("/whatsapp/device", get(device_info_handler))
        .route("/logout/whatsapp", post(logout_handler))
        .route(LEGACY_LOGOUT_PATH, post(logout_handler))
        .layer(middleware::from_fn(require_json_content_type))
        .with_state(app_state)
}

/// Build the CORS layer based on configuration.
fn build_cors_layer(config: &RouterConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .max_age(Duration::from_secs(86400)); // 24 hours

    match &config.cors_origins {
        None => cors.allow_origin(Any),
        Some(origins) if origins.is_empty() => cors,
        Some(origins) => {
            let parsed_origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
            cors.allow_origin(parsed_origins)
        }
    }
}

/// Create a development router with authentication disabled.
///
/// **Warning**: This should only be used for local development and testing.
pub fn create_dev_router(service: Arc<dyn WhatsAppService>) -> Router {
    create_router(Some(service), RouterConfig::without_auth())
}

// =============================================================================
// Tests
// =============================================================================
