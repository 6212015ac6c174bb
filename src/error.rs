//! API error types with HTTP status code mapping.
//!
//! [`ApiError`] is the central error type of the service. Each variant
//! maps to a specific HTTP status code and structured JSON error response.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

use crate::gateway::PaymentError;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 1002,
///     "message": "invalid package: nope",
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
    /// Numeric error code (see ranges on [`ApiError`]).
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
/// | Range     | Category         | HTTP Status               |
/// |-----------|------------------|---------------------------|
/// | 1000–1999 | Validation       | 400 Bad Request           |
/// | 2000–2999 | Not Found        | 404 Not Found             |
/// | 3000–3999 | Server           | 500 Internal Server Error |
/// | 5000–5999 | Payment provider | 502 Bad Gateway           |
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Request validation failed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The requested package id is not in the catalog.
    #[error("invalid package: {0}")]
    InvalidPackage(String),

    /// Webhook arrived without a `Stripe-Signature` header.
    #[error("missing Stripe signature")]
    MissingSignature,

    /// Webhook signature or payload was rejected.
    #[error("webhook error: {0}")]
    WebhookVerificationFailed(String),

    /// No payment transaction exists for the checkout session.
    #[error("payment transaction not found: {0}")]
    TransactionNotFound(String),

    /// No registration exists with the given id.
    #[error("registration not found: {0}")]
    RegistrationNotFound(String),

    /// No payment credential is configured.
    #[error("payment gateway not configured")]
    GatewayNotConfigured,

    /// Persistence layer failure.
    #[error("persistence error: {0}")]
    PersistenceError(String),

    /// The payment provider call failed.
    #[error("payment provider error: {0}")]
    Gateway(#[from] PaymentError),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidRequest(_) => 1001,
            Self::InvalidPackage(_) => 1002,
            Self::MissingSignature => 1003,
            Self::WebhookVerificationFailed(_) => 1004,
            Self::TransactionNotFound(_) => 2001,
            Self::RegistrationNotFound(_) => 2002,
            Self::Internal(_) => 3000,
            Self::PersistenceError(_) => 3001,
            Self::GatewayNotConfigured => 3002,
            Self::Gateway(_) => 5001,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_)
            | Self::InvalidPackage(_)
            | Self::MissingSignature
            | Self::WebhookVerificationFailed(_) => StatusCode::BAD_REQUEST,
            Self::TransactionNotFound(_) | Self::RegistrationNotFound(_) => StatusCode::NOT_FOUND,
            Self::GatewayNotConfigured | Self::PersistenceError(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::Gateway(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(code = self.error_code(), error = %self, "request failed");
        }
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
