//! Market error types with HTTP status code mapping.
//!
//! [`MarketError`] is the central error type for the service. Each variant
//! maps to a specific HTTP status code and structured JSON error response.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 2002,
///     "message": "invalid state: escrow is released, expected held",
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
    /// Numeric error code (see [`MarketError::error_code`]).
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
/// | Range     | Category              | HTTP Status                    |
/// |-----------|-----------------------|--------------------------------|
/// | 1000–1999 | Validation / Identity | 400 / 401 / 403                |
/// | 2000–2999 | State / Not Found     | 404 Not Found / 409 Conflict   |
/// | 3000–3999 | Server                | 500 Internal Server Error      |
#[derive(Debug, thiserror::Error)]
pub enum MarketError {
    /// Malformed input: negative price, empty required field, missing offer
    /// amount and similar.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The request carried no usable caller identity.
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    /// The caller has no active membership in the community.
    #[error("caller is not an active member of this community")]
    NotAMember,

    /// Wrong role or not the owner/party required by the operation.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// The id does not resolve, or resolves to another community.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of record that was looked up (e.g. `"listing"`).
        entity: &'static str,
        /// The identifier that failed to resolve.
        id: uuid::Uuid,
    },

    /// The operation is illegal for the record's current status.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// A unique constraint was violated by a concurrent writer.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The reviewer already reviewed this transaction.
    #[error("a review for this transaction was already submitted by this member")]
    DuplicateReview,

    /// Persistence layer failure.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl MarketError {
    /// Shorthand for [`MarketError::NotFound`].
    #[must_use]
    pub fn not_found(entity: &'static str, id: impl Into<uuid::Uuid>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::Validation(_) => 1001,
            Self::Unauthenticated(_) => 1401,
            Self::NotAMember => 1402,
            Self::PermissionDenied(_) => 1403,
            Self::NotFound { .. } => 2001,
            Self::InvalidState(_) => 2002,
            Self::Conflict(_) => 2003,
            Self::DuplicateReview => 2004,
            Self::Persistence(_) => 3001,
            Self::Internal(_) => 3000,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::NotAMember | Self::PermissionDenied(_) => StatusCode::FORBIDDEN,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::InvalidState(_) | Self::Conflict(_) | Self::DuplicateReview => {
                StatusCode::CONFLICT
            }
            Self::Persistence(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<sqlx::Error> for MarketError {
    fn from(err: sqlx::Error) -> Self {
        Self::Persistence(err.to_string())
    }
}

impl IntoResponse for MarketError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
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
