//! Shared error type across roomcast crates.

use thiserror::Error;

/// Client-facing error codes (stable API).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientCode {
    /// Invalid input / malformed message.
    BadRequest,
    /// Auth failed.
    AuthFailed,
    /// Payload too large.
    PayloadTooLarge,
    /// Internal server error.
    Internal,
}

impl ClientCode {
    /// String representation used in JSON responses.
    pub fn as_str(self) -> &'static str {
        match self {
            ClientCode::BadRequest => "BAD_REQUEST",
            ClientCode::AuthFailed => "AUTH_FAILED",
            ClientCode::PayloadTooLarge => "PAYLOAD_TOO_LARGE",
            ClientCode::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, RelayError>;

/// Unified error type used by core and gateway.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("auth failed")]
    AuthFailed,
    #[error("payload too large")]
    PayloadTooLarge,
    /// History append/fetch failure. Swallowed on the live delivery path;
    /// surfaced only on the HTTP history endpoint.
    #[error("persistence: {0}")]
    Persistence(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl RelayError {
    /// Map internal error to a stable client-facing code.
    pub fn client_code(&self) -> ClientCode {
        match self {
            RelayError::BadRequest(_) => ClientCode::BadRequest,
            RelayError::AuthFailed => ClientCode::AuthFailed,
            RelayError::PayloadTooLarge => ClientCode::PayloadTooLarge,
            RelayError::Persistence(_) => ClientCode::Internal,
            RelayError::Internal(_) => ClientCode::Internal,
        }
    }
}
