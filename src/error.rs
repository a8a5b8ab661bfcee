//! Gateway error types with HTTP status code mapping.
//!
//! [`GatewayError`] is the central error type for the gateway. Each variant
//! maps to a numeric code and, where it reaches the HTTP surface, to a status
//! code and structured JSON error response.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::ConnectionId;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 1002,
///     "message": "invalid channel name: foo",
///     "details": null
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code.
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Server-side error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category        | HTTP Status                 |
/// |-----------|-----------------|-----------------------------|
/// | 1000–1999 | Validation      | 400 Bad Request             |
/// | 2000–2999 | Authentication  | 401 Unauthorized            |
/// | 3000–3999 | Server          | 500 / 502                   |
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Request validation failed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A channel name could not be parsed.
    #[error("invalid channel name: {0}")]
    InvalidChannel(String),

    /// Missing, malformed, badly signed or expired credential.
    ///
    /// Deliberately carries no detail so callers cannot tell the cases apart.
    #[error("unauthorized")]
    Unauthorized,

    /// A connection identifier was registered twice.
    #[error("connection {0} is already registered")]
    AlreadyRegistered(ConnectionId),

    /// A single send within a broadcast fan-out failed.
    #[error("delivery to connection {connection_id} failed: {reason}")]
    DeliveryFailure {
        /// Recipient whose outbox rejected the frame.
        connection_id: ConnectionId,
        /// Why the outbox rejected it.
        reason: String,
    },

    /// The external relationship store failed.
    #[error("pairing store error: {0}")]
    PairingStore(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidRequest(_) => 1001,
            Self::InvalidChannel(_) => 1002,
            Self::Unauthorized => 2001,
            Self::Internal(_) => 3000,
            Self::AlreadyRegistered(_) => 3001,
            Self::DeliveryFailure { .. } => 3002,
            Self::PairingStore(_) => 3003,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) | Self::InvalidChannel(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::PairingStore(_) => StatusCode::BAD_GATEWAY,
            Self::AlreadyRegistered(_) | Self::DeliveryFailure { .. } | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<sqlx::Error> for GatewayError {
    fn from(err: sqlx::Error) -> Self {
        Self::PairingStore(err.to_string())
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: None,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn unauthorized_message_carries_no_detail() {
        assert_eq!(GatewayError::Unauthorized.to_string(), "unauthorized");
        assert_eq!(
            GatewayError::Unauthorized.status_code(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn codes_follow_ranges() {
        assert_eq!(GatewayError::InvalidChannel("x".into()).error_code(), 1002);
        assert_eq!(
            GatewayError::AlreadyRegistered(ConnectionId::new()).error_code(),
            3001
        );
        assert_eq!(
            GatewayError::PairingStore("down".into()).status_code(),
            StatusCode::BAD_GATEWAY
        );
    }
}
