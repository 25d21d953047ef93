//! # Error Types
//!
//! Domain-specific error types for till-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  till-core errors (this file)                                          │
//! │  ├── CoreError        - Cart, stock and settlement rule violations     │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  till-db errors (separate crate)                                       │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  till-terminal errors (in app)                                         │
//! │  └── TerminalError    - What the cashier sees (notification)           │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → TerminalError → Notification      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (SKU, line, amounts)
//! 3. Errors are enum variants, never String
//! 4. Each error variant maps to a user-facing message

use thiserror::Error;

use crate::money::Money;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// A failed cart operation never changes the cart; the caller shows the
/// message and the cashier tries again.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Product cannot be found.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Product is inactive and cannot be sold.
    #[error("Product {0} is not available for sale")]
    ProductInactive(String),

    /// Insufficient stock to apply the requested quantity.
    ///
    /// ## User Workflow
    /// ```text
    /// Cart: COKE-330 x3, stock = 3
    ///      │
    ///      ▼
    /// Scan COKE-330 again
    ///      │
    ///      ▼
    /// InsufficientStock { sku: "COKE-330", available: 3, requested: 4 }
    ///      │
    ///      ▼
    /// Notification: "Only 3 COKE-330 in stock", cart stays at x3
    /// ```
    #[error("Insufficient stock for {sku}: available {available}, requested {requested}")]
    InsufficientStock {
        sku: String,
        available: i64,
        requested: i64,
    },

    /// No line with this ID in the cart.
    #[error("Cart line not found: {0}")]
    LineNotFound(String),

    /// Cart has exceeded maximum allowed lines.
    #[error("Cart cannot have more than {max} items")]
    CartTooLarge { max: usize },

    /// Line quantity exceeds maximum allowed.
    #[error("Quantity {requested} exceeds maximum allowed ({max})")]
    QuantityTooLarge { requested: i64, max: i64 },

    /// Line discount would exceed the line value.
    #[error("Discount {discount} exceeds line value {line_value} for {sku}")]
    DiscountExceedsLine {
        sku: String,
        discount: Money,
        line_value: Money,
    },

    /// Order discount would exceed the cart subtotal.
    #[error("Order discount {discount} exceeds subtotal {subtotal}")]
    DiscountExceedsSubtotal { discount: Money, subtotal: Money },

    /// Checkout was attempted on an empty cart.
    #[error("Cart is empty")]
    EmptyCart,

    /// Cash tendered does not cover the total.
    ///
    /// The checkout button stays disabled; nothing is submitted.
    #[error("Tendered {tendered} is less than total {total}")]
    InsufficientTender { tendered: Money, total: Money },

    /// Payment amount is invalid.
    #[error("Invalid payment amount: {reason}")]
    InvalidPaymentAmount { reason: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Used for early validation before business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Amount is above what the till accepts.
    #[error("{field} must not exceed {max}")]
    AmountTooLarge { field: String, max: Money },

    /// Invalid format (e.g., invalid UUID, malformed amount).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

impl ValidationError {
    pub(crate) fn invalid_format(field: &str, reason: &str) -> Self {
        ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: reason.to_string(),
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            sku: "COKE-330".to_string(),
            available: 3,
            requested: 4,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for COKE-330: available 3, requested 4"
        );

        let err = CoreError::InsufficientTender {
            tendered: Money::from_cents(15_000),
            total: Money::from_cents(19_800),
        };
        assert_eq!(err.to_string(), "Tendered $150.00 is less than total $198.00");
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "sku".to_string(),
        };
        assert_eq!(err.to_string(), "sku is required");

        let err = ValidationError::MustNotBeNegative {
            field: "discount".to_string(),
        };
        assert_eq!(err.to_string(), "discount must not be negative");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "sku".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
