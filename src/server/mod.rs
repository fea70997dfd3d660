//! HTTP server layer for the WhatsApp API.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         HTTP Layer                              │
//! │                                                                 │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────┐  ┌────────┐  │
//! │  │   routes    │  │    auth     │  │ validation  │  │handlers│  │
//! │  │ (router)    │  │ (bearer)    │  │ (body, CT)  │  │        │  │
//! │  └─────────────┘  └─────────────┘  └─────────────┘  └────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod auth;
pub mod handlers;
pub mod routes;
pub mod validation;

pub use auth::{auth_middleware, ApiTokenAuth, AuthError};
pub use handlers::{
    device_info_handler, health_handler, liveness_handler, logout_handler, qr_handler,
    send_message_handler, status_handler, unix_timestamp, ApiError, ApiResponse, AppState,
    DeviceInfo, HealthData, LivenessResponse, LogoutResponse, QrResponse, QrStatus,
    SendMessageResponse, StatusResponse,
};
pub use routes::{create_dev_router, create_router, RouterConfig, LEGACY_LOGOUT_PATH};
pub use validation::{
    normalize_phone_number, require_json_content_type, validate_message, validate_phone_number,
    SendMessageRequest, ValidatedSendMessage, MAX_MESSAGE_CHARS, MAX_PHONE_DIGITS,
    MIN_PHONE_DIGITS,
};
