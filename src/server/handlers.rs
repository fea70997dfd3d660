//! HTTP request handlers for the WhatsApp API.
//!
//! Every handler follows the same shape: obtain the service handle from
//! [`AppState`], check the session precondition, make one call into the
//! [`WhatsAppService`], and wrap the outcome in an [`ApiResponse`] envelope.
//!
//! # Endpoints
//!
//! - `GET /whatsapp/qr` - Generate a login QR code
//! - `GET /whatsapp/status` - Connection and login status
//! - `POST /whatsapp/send` - Send a text message
//! - `GET /whatsapp/device` - Paired device information
//! - `GET /whatsapp/health` - Service health snapshot
//! - `POST /logout/whatsapp` - Log out and delete the session
//! - `GET /health` - Process liveness

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::error::{ServiceError, ValidationError};
use crate::service::{QrOutcome, SessionStatus, WhatsAppService};

use super::validation::ValidatedSendMessage;

// =============================================================================
// Application State
// =============================================================================

/// Shared application state holding the messaging service handle.
///
/// The handle is optional: a server started without a configured backend
/// still answers every request, with a uniform "not initialized" error.
#[derive(Clone, Default)]
pub struct AppState {
    service: Option<Arc<dyn WhatsAppService>>,
}

impl AppState {
    /// Create application state with no service.
    pub fn uninitialized() -> Self {
        Self { service: None }
    }

    /// Create application state from an optional service handle.
    pub fn from_option(service: Option<Arc<dyn WhatsAppService>>) -> Self {
        Self { service }
    }

    /// Get the service handle, or fail with [`ApiError::NotInitialized`].
    pub fn service(&self) -> Result<&dyn WhatsAppService, ApiError> {
        self.service.as_deref().ok_or(ApiError::NotInitialized)
    }
}

// =============================================================================
// Response Types
// =============================================================================

/// JSON envelope returned by every endpoint.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    /// Whether the operation succeeded
    pub success: bool,

    /// Human-readable message
    pub message: String,

    /// Operation payload, omitted on errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    /// Create a success envelope with a payload.
    pub fn success(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    /// Create an error envelope with no payload.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
        }
    }
}

/// QR flow outcome label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QrStatus {
    LoggedIn,
    LoginSuccess,
    AlreadyConnected,
    QrGenerated,
}

/// Payload of the QR endpoint.
#[derive(Debug, Serialize)]
pub struct QrResponse {
    /// QR data URI, present only when status is `qr_generated`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qr_code: Option<String>,

    pub status: QrStatus,
    pub message: String,
    pub timestamp: u64,
}

/// Payload of the status endpoint.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub is_connected: bool,
    pub is_logged_in: bool,
    pub status: SessionStatus,
    pub message: String,
    pub timestamp: u64,
}

/// Payload of the logout endpoint.
#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub timestamp: u64,
}

/// Payload of the send-message endpoint.
#[derive(Debug, Serialize)]
pub struct SendMessageResponse {
    /// Normalized recipient phone number
    pub phone_number: String,
    pub timestamp: u64,
}

/// Payload of the device info endpoint.
#[derive(Debug, Serialize)]
pub struct DeviceInfo {
    pub device_id: Option<String>,
    pub device_name: Option<String>,
    pub is_connected: bool,
    pub is_logged_in: bool,
    pub timestamp: u64,
}

/// Payload of the WhatsApp health endpoint.
#[derive(Debug, Serialize)]
pub struct HealthData {
    /// Credential store is available
    pub container: bool,

    /// Client object exists
    pub client: bool,

    pub is_connected: bool,
    pub is_logged_in: bool,

    /// Process status, always "running" when this handler answers
    pub status: &'static str,

    pub timestamp: u64,
}

/// Process liveness response.
#[derive(Debug, Serialize)]
pub struct LivenessResponse {
    /// Service status
    pub status: String,

    /// Service version
    pub version: String,
}

// =============================================================================
// Error Mapping
// =============================================================================

/// Errors returned by the API handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// No messaging service was configured
    #[error("WhatsApp service not initialized")]
    NotInitialized,

    /// Logout requested without a session
    #[error("No active session to logout")]
    NoActiveSession,

    /// Operation requires a logged-in session
    #[error("WhatsApp is not logged in, please scan the QR code first")]
    NotLoggedIn,

    /// Request body failed validation
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// Request body is not declared as JSON
    #[error("Content-Type must be application/json")]
    UnsupportedContentType,

    /// The messaging service reported a failure
    #[error("{context}: {source}")]
    Service {
        context: &'static str,
        source: ServiceError,
    },
}

impl ApiError {
    /// Wrap a service failure with the operation that failed.
    pub fn service(context: &'static str, source: ServiceError) -> Self {
        ApiError::Service { context, source }
    }

    /// HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotInitialized | ApiError::Service { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::NotLoggedIn => StatusCode::UNAUTHORIZED,
            ApiError::NoActiveSession
            | ApiError::Validation(_)
            | ApiError::UnsupportedContentType => StatusCode::BAD_REQUEST,
        }
    }

    fn error_type(&self) -> &'static str {
        match self {
            ApiError::NotInitialized => "not_initialized",
            ApiError::NoActiveSession => "no_active_session",
            ApiError::NotLoggedIn => "not_logged_in",
            ApiError::Validation(_) => "invalid_request",
            ApiError::UnsupportedContentType => "unsupported_content_type",
            ApiError::Service { .. } => "service_error",
        }
    }
}

/// Convert ApiError to HTTP response.
///
/// - 5xx errors are logged at ERROR level
/// - 401 is logged at DEBUG level (expected while pairing)
/// - other 4xx errors are logged at WARN level
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_type = self.error_type();
        let message = self.to_string();

        if status.is_server_error() {
            error!(
                error_type = error_type,
                status = status.as_u16(),
                "Server error: {}",
                message
            );
        } else if status == StatusCode::UNAUTHORIZED {
            debug!(
                error_type = error_type,
                status = status.as_u16(),
                "Client error: {}",
                message
            );
        } else {
            warn!(
                error_type = error_type,
                status = status.as_u16(),
                "Client error: {}",
                message
            );
        }

        (status, Json(ApiResponse::error(message))).into_response()
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Current Unix time in seconds.
pub fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Mask all but the last four digits of a phone number for logging.
fn mask_phone(phone_number: &str) -> String {
    let visible = phone_number.len().saturating_sub(4);
    format!("{}{}", "*".repeat(visible), &phone_number[visible..])
}

// =============================================================================
// Handlers
// =============================================================================

/// Handle QR code generation.
///
/// # Endpoint
///
/// `GET /whatsapp/qr`
///
/// # Response
///
/// `200 OK` with `data.status` one of:
/// - `logged_in`: a session already exists, no QR is generated
/// - `login_success`: pairing completed while generating
/// - `already_connected`: the client was already connected
/// - `qr_generated`: `data.qr_code` holds a data URI to scan
///
/// # Errors
///
/// - `500 Internal Server Error`: service not initialized or QR generation failed
pub async fn qr_handler(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<QrResponse>>, ApiError> {
    let service = state.service()?;

    if service.is_logged_in() {
        let message = "Already logged in to WhatsApp";
        return Ok(Json(ApiResponse::success(
            message,
            QrResponse {
                qr_code: None,
                status: QrStatus::LoggedIn,
                message: message.to_string(),
                timestamp: unix_timestamp(),
            },
        )));
    }

    let outcome = service
        .generate_qr()
        .await
        .map_err(|e| ApiError::service("Failed to generate QR code", e))?;

    let (status, qr_code, message) = match outcome {
        QrOutcome::LoginSuccess => (QrStatus::LoginSuccess, None, "Login successful"),
        QrOutcome::AlreadyConnected => (
            QrStatus::AlreadyConnected,
            None,
            "WhatsApp is already connected",
        ),
        QrOutcome::Code(code) => (
            QrStatus::QrGenerated,
            Some(code),
            "QR code generated, scan it with WhatsApp to login",
        ),
    };

    info!(status = ?status, "QR request completed");

    Ok(Json(ApiResponse::success(
        message,
        QrResponse {
            qr_code,
            status,
            message: message.to_string(),
            timestamp: unix_timestamp(),
        },
    )))
}

/// Handle connection status requests.
///
/// # Endpoint
///
/// `GET /whatsapp/status`
///
/// # Response
///
/// `200 OK` with the two session flags and the derived status label.
pub async fn status_handler(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<StatusResponse>>, ApiError> {
    let service = state.service()?;

    let is_connected = service.is_connected();
    let is_logged_in = service.is_logged_in();
    let status = SessionStatus::from_flags(is_connected, is_logged_in);

    Ok(Json(ApiResponse::success(
        "Status retrieved successfully",
        StatusResponse {
            is_connected,
            is_logged_in,
            status,
            message: status.description().to_string(),
            timestamp: unix_timestamp(),
        },
    )))
}

/// Handle logout requests.
///
/// # Endpoint
///
/// `POST /logout/whatsapp`
///
/// # Errors
///
/// - `400 Bad Request`: no active session
/// - `500 Internal Server Error`: service not initialized or logout failed
pub async fn logout_handler(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<LogoutResponse>>, ApiError> {
    let service = state.service()?;

    if !service.is_logged_in() {
        return Err(ApiError::NoActiveSession);
    }

    service
        .logout()
        .await
        .map_err(|e| ApiError::service("Failed to logout", e))?;

    info!("WhatsApp session logged out");

    Ok(Json(ApiResponse::success(
        "Logged out successfully",
        LogoutResponse {
            timestamp: unix_timestamp(),
        },
    )))
}

/// Handle send-message requests.
///
/// # Endpoint
///
/// `POST /whatsapp/send`
///
/// # Request Body
///
/// ```json
/// { "phone_number": "+62 812-3456-789", "message": "hello" }
/// ```
///
/// # Response
///
/// `200 OK` echoing the normalized phone number.
///
/// # Errors
///
/// - `400 Bad Request`: invalid JSON, phone number or message
/// - `401 Unauthorized`: not logged in
/// - `500 Internal Server Error`: service not initialized or delivery failed
pub async fn send_message_handler(
    State(state): State<AppState>,
    ValidatedSendMessage(request): ValidatedSendMessage,
) -> Result<Json<ApiResponse<SendMessageResponse>>, ApiError> {
    let service = state.service()?;

    if !service.is_logged_in() {
        return Err(ApiError::NotLoggedIn);
    }

    service
        .send_message(&request.phone_number, &request.message)
        .await
        .map_err(|e| ApiError::service("Failed to send message", e))?;

    info!(
        recipient = %mask_phone(&request.phone_number),
        chars = request.message.chars().count(),
        "Message sent"
    );

    Ok(Json(ApiResponse::success(
        "Message sent successfully",
        SendMessageResponse {
            phone_number: request.phone_number,
            timestamp: unix_timestamp(),
        },
    )))
}

/// Handle device info requests.
///
/// # Endpoint
///
/// `GET /whatsapp/device`
///
/// # Response
///
/// `200 OK` with the paired device id and name. When the client or its
/// stored identity is missing, both are `null` and both flags are `false`.
///
/// # Errors
///
/// - `401 Unauthorized`: not logged in
/// - `500 Internal Server Error`: service not initialized
pub async fn device_info_handler(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<DeviceInfo>>, ApiError> {
    let service = state.service()?;

    if !service.is_logged_in() {
        return Err(ApiError::NotLoggedIn);
    }

    let identity = if service.has_client() {
        service.device_identity()
    } else {
        None
    };

    let info = match identity {
        Some(identity) => DeviceInfo {
            device_id: Some(identity.id),
            device_name: Some(identity.name),
            is_connected: service.is_connected(),
            is_logged_in: service.is_logged_in(),
            timestamp: unix_timestamp(),
        },
        None => DeviceInfo {
            device_id: None,
            device_name: None,
            is_connected: false,
            is_logged_in: false,
            timestamp: unix_timestamp(),
        },
    };

    Ok(Json(ApiResponse::success(
        "Device info retrieved successfully",
        info,
    )))
}

/// Handle WhatsApp health check requests.
///
/// # Endpoint
///
/// `GET /whatsapp/health`
///
/// # Response
///
/// `200 OK` with a snapshot of the service internals. The message says
/// whether the service is fully operational (connected and logged in).
pub async fn health_handler(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<HealthData>>, ApiError> {
    let service = state.service()?;

    let is_connected = service.is_connected();
    let is_logged_in = service.is_logged_in();

    let message = if is_connected && is_logged_in {
        "WhatsApp service is healthy"
    } else {
        "WhatsApp service is running but not fully operational"
    };

    Ok(Json(ApiResponse::success(
        message,
        HealthData {
            container: service.has_container(),
            client: service.has_client(),
            is_connected,
            is_logged_in,
            status: "running",
            timestamp: unix_timestamp(),
        },
    )))
}

/// Handle process liveness requests.
///
/// # Endpoint
///
/// `GET /health`
///
/// # Response
///
/// `200 OK` with JSON body:
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0"
/// }
/// ```
pub async fn liveness_handler() -> Json<LivenessResponse> {
    Json(LivenessResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// =============================================================================
// Tests
// =============================================================================
