//! # Terminal Error Type
//!
//! Unified error type for everything the cashier can trigger.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Till POS                               │
//! │                                                                         │
//! │  Cashier types: add COKE-330                                           │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  Command handler → Result<T, TerminalError>                      │  │
//! │  │         │                                                        │  │
//! │  │         ├── Cart rule broken?   CoreError ──┐                    │  │
//! │  │         │                                   ▼                    │  │
//! │  │         ├── Database failed?    DbError ──► TerminalError ──────►│  │
//! │  │         │                                                        │  │
//! │  │         └── Success ────────────────────────────────────────────►│  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                                                                         │
//! │  ! Insufficient stock for COKE-330: 3 available, 4 requested           │
//! │    (printed as a notification, the loop keeps running)                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Both a machine-readable `code` and a human-readable `message` are kept so
//! the same error can be printed or serialized for a front end.

use serde::Serialize;
use till_core::{CoreError, ValidationError};
use till_db::DbError;

/// Error shown to the cashier.
///
/// ## Serialization
/// ```json
/// {
///   "code": "INSUFFICIENT_STOCK",
///   "message": "Insufficient stock for COKE-330: 3 available, 4 requested"
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TerminalError {
    /// Machine-readable error code
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Error codes for notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Product, line or sale not found
    NotFound,

    /// Input validation failed
    ValidationError,

    /// Database operation failed; the same checkout may be retried
    DatabaseError,

    /// Business rule rejected the operation
    BusinessLogic,

    /// Internal error
    Internal,

    /// Cart operation failed
    CartError,

    /// Insufficient stock
    InsufficientStock,

    /// Payment could not be settled
    PaymentError,

    /// Command could not be parsed
    UnknownCommand,
}

impl TerminalError {
    /// Creates a new terminal error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        TerminalError {
            code,
            message: message.into(),
        }
    }

    /// Creates a not found error.
    pub fn not_found(resource: &str, id: &str) -> Self {
        TerminalError::new(
            ErrorCode::NotFound,
            format!("{} not found: {}", resource, id),
        )
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        TerminalError::new(ErrorCode::ValidationError, message)
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        TerminalError::new(ErrorCode::Internal, message)
    }

    /// Creates a cart error.
    pub fn cart(message: impl Into<String>) -> Self {
        TerminalError::new(ErrorCode::CartError, message)
    }

    /// Creates a payment error.
    pub fn payment(message: impl Into<String>) -> Self {
        TerminalError::new(ErrorCode::PaymentError, message)
    }

    /// Creates an unknown command error.
    pub fn usage(message: impl Into<String>) -> Self {
        TerminalError::new(ErrorCode::UnknownCommand, message)
    }
}

/// Converts database errors to terminal errors.
///
/// Query details are logged, the cashier only sees a generic message.
/// Failures that may clear up on their own (locked file, closed pool) get a
/// retry hint: the cart and checkout key are still there.
impl From<DbError> for TerminalError {
    fn from(err: DbError) -> Self {
        let transient = err.is_transient();
        let mut terminal = match err {
            DbError::NotFound { entity, id } => TerminalError::not_found(&entity, &id),
            DbError::UniqueViolation { field, value } => TerminalError::new(
                ErrorCode::ValidationError,
                format!("{} '{}' already exists", field, value),
            ),
            DbError::InsufficientStock {
                sku,
                available,
                requested,
                ..
            } => TerminalError::new(
                ErrorCode::InsufficientStock,
                format!(
                    "Insufficient stock for {}: {} available, {} requested. Sale not recorded.",
                    sku, available, requested
                ),
            ),
            DbError::ConnectionFailed(e) => {
                tracing::error!("Database connection failed: {}", e);
                TerminalError::new(ErrorCode::DatabaseError, "Database connection failed")
            }
            DbError::MigrationFailed(e) => {
                tracing::error!("Database migration failed: {}", e);
                TerminalError::new(ErrorCode::DatabaseError, "Database migration failed")
            }
            DbError::QueryFailed(e) => {
                tracing::error!("Database query failed: {}", e);
                TerminalError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
            DbError::TransactionFailed(e) => {
                tracing::error!("Transaction failed: {}", e);
                TerminalError::new(ErrorCode::DatabaseError, "Database transaction failed")
            }
            DbError::ForeignKeyViolation { message } => {
                tracing::error!("Foreign key violation: {}", message);
                TerminalError::new(ErrorCode::ValidationError, "Invalid reference")
            }
            DbError::PoolExhausted => {
                TerminalError::new(ErrorCode::DatabaseError, "Database pool exhausted")
            }
            DbError::Internal(e) => {
                tracing::error!("Internal database error: {}", e);
                TerminalError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        };
        if transient {
            terminal.message.push_str(", try again");
        }
        terminal
    }
}

/// Converts core errors to terminal errors.
impl From<CoreError> for TerminalError {
    fn from(err: CoreError) -> Self {
        let message = err.to_string();
        let code = match err {
            CoreError::ProductNotFound(_) | CoreError::LineNotFound(_) => ErrorCode::NotFound,
            CoreError::ProductInactive(_) => ErrorCode::BusinessLogic,
            CoreError::InsufficientStock { .. } => ErrorCode::InsufficientStock,
            CoreError::CartTooLarge { .. } | CoreError::EmptyCart => ErrorCode::CartError,
            CoreError::QuantityTooLarge { .. }
            | CoreError::DiscountExceedsLine { .. }
            | CoreError::DiscountExceedsSubtotal { .. } => ErrorCode::ValidationError,
            CoreError::InsufficientTender { .. } | CoreError::InvalidPaymentAmount { .. } => {
                ErrorCode::PaymentError
            }
            CoreError::Validation(_) => ErrorCode::ValidationError,
        };
        TerminalError::new(code, message)
    }
}

impl From<ValidationError> for TerminalError {
    fn from(err: ValidationError) -> Self {
        TerminalError::validation(err.to_string())
    }
}

impl std::fmt::Display for TerminalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for TerminalError {}

/// Result type for terminal operations.
pub type TerminalResult<T> = Result<T, TerminalError>;

#[cfg(test)]
mod tests {
    use super::*;
    use till_core::Money;

    #[test]
    fn test_core_error_codes() {
        let err: TerminalError = CoreError::InsufficientTender {
            tendered: Money::from_cents(15_000),
            total: Money::from_cents(19_800),
        }
        .into();
        assert_eq!(err.code, ErrorCode::PaymentError);
        assert_eq!(err.message, "Tendered $150.00 is less than total $198.00");

        let err: TerminalError = CoreError::EmptyCart.into();
        assert_eq!(err.code, ErrorCode::CartError);
    }

    #[test]
    fn test_db_errors_hide_details() {
        let err: TerminalError = DbError::QueryFailed("no such column: foo".to_string()).into();
        assert_eq!(err.code, ErrorCode::DatabaseError);
        assert!(!err.message.contains("foo"));
    }

    #[test]
    fn test_transient_db_errors_suggest_retry() {
        let err: TerminalError =
            DbError::TransactionFailed("database is locked".to_string()).into();
        assert_eq!(err.message, "Database transaction failed, try again");

        let err: TerminalError = DbError::PoolExhausted.into();
        assert_eq!(err.message, "Database pool exhausted, try again");

        let err: TerminalError = DbError::MigrationFailed("checksum".to_string()).into();
        assert_eq!(err.message, "Database migration failed");

        let err: TerminalError = DbError::InsufficientStock {
            product_id: "p1".to_string(),
            sku: "COKE-330".to_string(),
            available: 0,
            requested: 1,
        }
        .into();
        assert!(!err.message.contains("try again"));
    }

    #[test]
    fn test_serializes_code_and_message() {
        let err = TerminalError::not_found("Product", "COKE-330");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], "NOT_FOUND");
        assert_eq!(json["message"], "Product not found: COKE-330");
    }
}
