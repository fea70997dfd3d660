use thiserror::Error;

/// Errors reported by the messaging-client service.
#[derive(Debug, Clone, Error)]
pub enum ServiceError {
    /// The upstream gateway answered with a non-success status
    #[error("gateway returned {status}: {message}")]
    Gateway { status: u16, message: String },

    /// The upstream gateway could not be reached
    #[error("gateway unreachable: {0}")]
    Transport(String),

    /// The upstream gateway answered with a body we could not decode
    #[error("invalid gateway response: {0}")]
    InvalidResponse(String),

    /// Error raised by a service implementation that is not gateway-backed
    #[error("{0}")]
    Other(String),
}

/// Input validation failures for message-send requests.
///
/// The display text of each variant is the human-readable reason returned to
/// the client in the response envelope.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Request body is not valid JSON for the expected shape
    #[error("Invalid JSON format: {0}")]
    InvalidJson(String),

    /// Phone number still contains non-digit characters after normalization
    #[error("Phone number must contain only digits")]
    PhoneNotNumeric,

    /// Normalized phone number has fewer than 10 digits
    #[error("Phone number is too short (minimum {min} digits), please include country code")]
    PhoneTooShort { min: usize },

    /// Normalized phone number has more than 15 digits
    #[error("Phone number is too long (maximum {max} digits)")]
    PhoneTooLong { max: usize },

    /// Message body is empty or whitespace only
    #[error("Message cannot be empty")]
    EmptyMessage,

    /// Message body exceeds the character limit
    #[error("Message is too long (maximum {max} characters)")]
    MessageTooLong { max: usize },
}
