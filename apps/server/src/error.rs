//! # API Error Type
//!
//! Unified error type for HTTP handlers.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in the Agency API                         │
//! │                                                                         │
//! │  POST /api/sales/{id}/complete                                          │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  Handler: Result<Json<T>, ApiError>                              │  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  ValidationError ─► CoreError ─► DbError ─► ApiError ───────────►│  │
//! │  │                                                │                 │  │
//! │  │                                                ▼                 │  │
//! │  │                                  status code + { code, message } │  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                                                                         │
//! │  HTTP/1.1 409 Conflict                                                  │
//! │  { "code": "INSUFFICIENT_STOCK",                                        │
//! │    "message": "Insufficient stock for Arduino Uno R3 (ARD-UNO): …" }    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Database and internal failures are logged with their detail and answered
//! with a generic message.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::error;

use agency_core::{CoreError, ValidationError};
use agency_db::DbError;

/// Error body returned by every failing endpoint.
///
/// ```json
/// {
///   "code": "NOT_FOUND",
///   "message": "Product not found: 5f0c…"
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Resource not found (404)
    NotFound,

    /// Input validation failed (400)
    ValidationError,

    /// `X-Actor` header missing or empty (401)
    MissingActor,

    /// Unique value already taken (409)
    Duplicate,

    /// Not enough stock for a sale or movement (409)
    InsufficientStock,

    /// Sale state does not allow the operation (409)
    InvalidStatus,

    /// Movement type the ledger does not apply (400)
    UnsupportedMovement,

    /// Row still referenced or constraint refused (409)
    Conflict,

    /// Unreadable CSV or missing columns (400)
    CsvError,

    /// Database operation failed (500)
    DatabaseError,

    /// Internal server error (500)
    Internal,
}

impl ErrorCode {
    pub fn status(self) -> StatusCode {
        match self {
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::ValidationError | ErrorCode::UnsupportedMovement | ErrorCode::CsvError => {
                StatusCode::BAD_REQUEST
            }
            ErrorCode::MissingActor => StatusCode::UNAUTHORIZED,
            ErrorCode::Duplicate
            | ErrorCode::InsufficientStock
            | ErrorCode::InvalidStatus
            | ErrorCode::Conflict => StatusCode::CONFLICT,
            ErrorCode::DatabaseError | ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::validation(err.to_string())
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let code = match &err {
            CoreError::ProductNotFound(_)
            | CoreError::CategoryNotFound(_)
            | CoreError::CustomerNotFound(_)
            | CoreError::SaleNotFound(_)
            | CoreError::SaleItemNotFound(_) => ErrorCode::NotFound,
            CoreError::InsufficientStock { .. } => ErrorCode::InsufficientStock,
            CoreError::InvalidSaleStatus { .. } => ErrorCode::InvalidStatus,
            CoreError::UnsupportedMovement { .. } => ErrorCode::UnsupportedMovement,
            CoreError::Validation(_) | CoreError::AmountOverflow(_) => ErrorCode::ValidationError,
        };
        ApiError::new(code, err.to_string())
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Domain(core) => core.into(),
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            DbError::UniqueViolation { .. } => ApiError::new(ErrorCode::Duplicate, err.to_string()),
            DbError::ForeignKeyViolation { .. } | DbError::ConstraintViolation { .. } => {
                ApiError::new(ErrorCode::Conflict, err.to_string())
            }
            DbError::Csv(message) => ApiError::new(ErrorCode::CsvError, message),
            DbError::ConnectionFailed(_)
            | DbError::MigrationFailed(_)
            | DbError::QueryFailed(_)
            | DbError::PoolExhausted => {
                error!(error = %err, "Database error");
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
            DbError::Internal(_) => {
                error!(error = %err, "Internal database error");
                ApiError::internal("Internal server error")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.code.status(), Json(self)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_stock_is_conflict() {
        let err: ApiError = DbError::Domain(CoreError::InsufficientStock {
            product: "Arduino Uno R3".to_string(),
            sku: "ARD-UNO".to_string(),
            available: 3,
            requested: 5,
        })
        .into();
        assert_eq!(err.code, ErrorCode::InsufficientStock);
        assert_eq!(err.code.status(), StatusCode::CONFLICT);
        assert!(err.message.contains("ARD-UNO"));
    }

    #[test]
    fn test_validation_is_bad_request() {
        let err: ApiError = DbError::from(ValidationError::Required {
            field: "name".to_string(),
        })
        .into();
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert_eq!(err.code.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.message, "Validation error: name is required");
    }

    #[test]
    fn test_amount_overflow_is_bad_request() {
        let err: ApiError = DbError::Domain(CoreError::AmountOverflow("sale total".to_string())).into();
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert_eq!(err.code.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_database_detail_hidden() {
        let err: ApiError = DbError::QueryFailed("no such table: sales".to_string()).into();
        assert_eq!(err.code, ErrorCode::DatabaseError);
        assert!(!err.message.contains("sales"));
    }

    #[test]
    fn test_error_code_serialization() {
        let json = serde_json::to_string(&ErrorCode::InsufficientStock).unwrap();
        assert_eq!(json, "\"INSUFFICIENT_STOCK\"");
        let json = serde_json::to_string(&ErrorCode::MissingActor).unwrap();
        assert_eq!(json, "\"MISSING_ACTOR\"");
    }

    #[test]
    fn test_duplicate_and_not_found() {
        let err: ApiError = DbError::duplicate("products.sku", "ARD-UNO").into();
        assert_eq!(err.code.status(), StatusCode::CONFLICT);

        let err: ApiError = DbError::not_found("Customer", "c-1").into();
        assert_eq!(err.code, ErrorCode::NotFound);
        assert_eq!(err.message, "Customer not found: c-1");
    }
}
