//! Request validation for the WhatsApp API.
//!
//! Two request-pipeline stages live here:
//!
//! - [`require_json_content_type`]: middleware rejecting non-GET requests
//!   whose `Content-Type` is not JSON.
//! - [`ValidatedSendMessage`]: extractor that parses, validates and
//!   normalizes a send-message body. Handlers receive the normalized request
//!   as a typed argument, so an unvalidated body can never reach them.
//!
//! # Phone Number Normalization
//!
//! Spaces, hyphens and plus signs are stripped. What remains must be 10-15
//! ASCII digits:
//!
//! ```
//! use whatsapp_api::server::validation::validate_phone_number;
//!
//! assert_eq!(validate_phone_number("+62 812-3456-789").unwrap(), "628123456789");
//! assert!(validate_phone_number("123").is_err());
//! ```

use axum::{
    body::Bytes,
    extract::{FromRequest, Request},
    http::{header::CONTENT_TYPE, Method},
    middleware::Next,
    response::Response,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ValidationError;

use super::handlers::ApiError;

/// Minimum number of digits in a normalized phone number.
pub const MIN_PHONE_DIGITS: usize = 10;

/// Maximum number of digits in a normalized phone number (E.164).
pub const MAX_PHONE_DIGITS: usize = 15;

/// Maximum message length in characters.
pub const MAX_MESSAGE_CHARS: usize = 4096;

// =============================================================================
// Send Message Request
// =============================================================================

/// Body of a send-message request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendMessageRequest {
    /// Recipient phone number, including country code
    pub phone_number: String,

    /// Text message body
    pub message: String,
}

impl SendMessageRequest {
    /// Validate the request and return it with the phone number normalized.
    pub fn validate(mut self) -> Result<Self, ValidationError> {
        let phone_number = validate_phone_number(&self.phone_number)?;
        validate_message(&self.message)?;
        self.phone_number = phone_number;
        Ok(self)
    }
}

/// Strip spaces, hyphens and plus signs from a phone number.
pub fn normalize_phone_number(raw: &str) -> String {
    raw.chars()
        .filter(|c| !matches!(c, ' ' | '-' | '+'))
        .collect()
}

/// Validate a phone number and return its normalized form.
pub fn validate_phone_number(raw: &str) -> Result<String, ValidationError> {
    let normalized = normalize_phone_number(raw);

    if !normalized.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::PhoneNotNumeric);
    }
    if normalized.len() < MIN_PHONE_DIGITS {
        return Err(ValidationError::PhoneTooShort {
            min: MIN_PHONE_DIGITS,
        });
    }
    if normalized.len() > MAX_PHONE_DIGITS {
        return Err(ValidationError::PhoneTooLong {
            max: MAX_PHONE_DIGITS,
        });
    }

    Ok(normalized)
}

/// Validate a message body.
pub fn validate_message(message: &str) -> Result<(), ValidationError> {
    if message.trim().is_empty() {
        return Err(ValidationError::EmptyMessage);
    }
    if message.chars().count() > MAX_MESSAGE_CHARS {
        return Err(ValidationError::MessageTooLong {
            max: MAX_MESSAGE_CHARS,
        });
    }
    Ok(())
}

// =============================================================================
// Extractor
// =============================================================================

/// A send-message request that has passed validation.
///
/// Rejects with a 400 envelope when the body is not valid JSON or fails
/// validation.
#[derive(Debug, Clone)]
pub struct ValidatedSendMessage(pub SendMessageRequest);

impl<S> FromRequest<S> for ValidatedSendMessage
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let body = Bytes::from_request(req, state)
            .await
            .map_err(|e| ValidationError::InvalidJson(e.body_text()))?;

        let request: SendMessageRequest = serde_json::from_slice(&body)
            .map_err(|e| ValidationError::InvalidJson(e.to_string()))?;

        let request = request.validate()?;
        debug!(digits = request.phone_number.len(), "Send request validated");

        Ok(ValidatedSendMessage(request))
    }
}

// =============================================================================
// Content-Type Gate
// =============================================================================

/// Middleware requiring `Content-Type: application/json` on requests that
/// carry a body.
///
/// GET, HEAD and OPTIONS pass through untouched.
pub async fn require_json_content_type(request: Request, next: Next) -> Result<Response, ApiError> {
    if matches!(
        *request.method(),
        Method::GET | Method::HEAD | Method::OPTIONS
    ) {
        return Ok(next.run(request).await);
    }

    let is_json = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.contains("application/json"))
        .unwrap_or(false);

    if !is_json {
        return Err(ApiError::UnsupportedContentType);
    }

    Ok(next.run(request).await)
}

// =============================================================================
// Tests
// =============================================================================
