//! API error types with structured JSON responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::db::DatabaseError;
use crate::dose::LifecycleError;
use crate::extraction::ExtractionError;
use crate::models::ValidationError;

/// Structured error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
}

/// API-level errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Authentication required")]
    Unauthorized,
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),
    #[error("Already resolved")]
    AlreadyResolved,
    #[error("This sharing link has been deactivated")]
    ShareRevoked,
    #[error("Rate limit exceeded")]
    RateLimited,
    #[error("Payment required")]
    PaymentRequired,
    #[error("Extraction failed: {0}")]
    ExtractionFailed(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "AUTH_REQUIRED",
                "Authentication required".to_string(),
            ),
            ApiError::NotFound(detail) => (StatusCode::NOT_FOUND, "NOT_FOUND", detail.clone()),
            ApiError::BadRequest(detail) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", detail.clone())
            }
            ApiError::Validation(err) => {
                (StatusCode::BAD_REQUEST, "VALIDATION", err.to_string())
            }
            ApiError::AlreadyResolved => (
                StatusCode::CONFLICT,
                "ALREADY_RESOLVED",
                "This dose has already been resolved".to_string(),
            ),
            ApiError::ShareRevoked => (
                StatusCode::FORBIDDEN,
                "SHARE_REVOKED",
                "This sharing link has been deactivated".to_string(),
            ),
            ApiError::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                "RATE_LIMITED",
                "Rate limit exceeded. Please try again later.".to_string(),
            ),
            ApiError::PaymentRequired => (
                StatusCode::PAYMENT_REQUIRED,
                "PAYMENT_REQUIRED",
                "Payment required. Please add credits to continue.".to_string(),
            ),
            ApiError::ExtractionFailed(detail) => {
                tracing::warn!(detail, "Prescription extraction failed");
                (
                    StatusCode::BAD_GATEWAY,
                    "EXTRACTION_FAILED",
                    "Could not analyze the prescription. Please add medicines manually.".to_string(),
                )
            }
            ApiError::Internal(detail) => {
                tracing::error!(detail, "API internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL",
                    "An internal error occurred".to_string(),
                )
            }
        };

        (
            status,
            Json(ErrorBody {
                error: ErrorDetail { code, message },
            }),
        )
            .into_response()
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<LifecycleError> for ApiError {
    fn from(err: LifecycleError) -> Self {
        match err {
            LifecycleError::NotFound(id) => ApiError::NotFound(format!("Dose log {id} not found")),
            LifecycleError::AlreadyResolved(_) => ApiError::AlreadyResolved,
            LifecycleError::Database(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<ExtractionError> for ApiError {
    fn from(err: ExtractionError) -> Self {
        match err {
            ExtractionError::RateLimited => ApiError::RateLimited,
            ExtractionError::PaymentRequired => ApiError::PaymentRequired,
            ExtractionError::MissingApiKey
            | ExtractionError::Gateway(_)
            | ExtractionError::Http(_) => ApiError::ExtractionFailed(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_match_taxonomy() {
        assert_eq!(
            ApiError::Unauthorized.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::RateLimited.into_response().status(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            ApiError::PaymentRequired.into_response().status(),
            StatusCode::PAYMENT_REQUIRED
        );
        assert_eq!(
            ApiError::ShareRevoked.into_response().status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::AlreadyResolved.into_response().status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::ExtractionFailed("x".into()).into_response().status(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn extraction_errors_map_to_distinct_variants() {
        assert!(matches!(
            ApiError::from(ExtractionError::RateLimited),
            ApiError::RateLimited
        ));
        assert!(matches!(
            ApiError::from(ExtractionError::PaymentRequired),
            ApiError::PaymentRequired
        ));
        assert!(matches!(
            ApiError::from(ExtractionError::Gateway("boom".into())),
            ApiError::ExtractionFailed(_)
        ));
    }

    #[test]
    fn validation_maps_to_bad_request() {
        let resp = ApiError::Validation(ValidationError::NoSlotEnabled).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
