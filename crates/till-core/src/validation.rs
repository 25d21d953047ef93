//! # Validation Module
//!
//! Input validation for values typed at the till.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Command parsing (till-terminal)                              │
//! │  ├── Amounts parsed with Money::parse                                  │
//! │  └── Line references resolved to line IDs                              │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Cart / settlement (till-core)                                │
//! │  └── THIS MODULE: Business rule validation                             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── CHECK constraints (quantity > 0, stock >= 0)                      │
//! │  ├── UNIQUE constraints (invoice number, checkout key)                 │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use till_core::validation::{validate_sku, validate_quantity};
//!
//! validate_sku("COKE-330").unwrap();
//! validate_quantity(5).unwrap();
//! ```

use crate::error::ValidationError;
use crate::money::Money;
use crate::{MAX_AMOUNT_CENTS, MAX_CART_ITEMS, MAX_ITEM_QUANTITY};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Longest customer name stored on a sale.
pub const MAX_CUSTOMER_NAME_LEN: usize = 120;

/// Longest customer phone stored on a sale.
pub const MAX_CUSTOMER_PHONE_LEN: usize = 32;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a SKU (Stock Keeping Unit).
///
/// ## Rules
/// - Must not be empty
/// - At most 50 characters
/// - Only letters, digits, hyphens and underscores
///
/// ## Example
/// ```rust
/// use till_core::validation::validate_sku;
///
/// assert!(validate_sku("COKE-330").is_ok());
/// assert!(validate_sku("").is_err());
/// assert!(validate_sku("A".repeat(100).as_str()).is_err());
/// ```
pub fn validate_sku(sku: &str) -> ValidationResult<()> {
    let sku = sku.trim();

    if sku.is_empty() {
        return Err(ValidationError::Required {
            field: "sku".to_string(),
        });
    }

    if sku.len() > 50 {
        return Err(ValidationError::TooLong {
            field: "sku".to_string(),
            max: 50,
        });
    }

    if !sku
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::invalid_format(
            "sku",
            "must contain only letters, numbers, hyphens, and underscores",
        ));
    }

    Ok(())
}

/// Validates a product name.
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    if name.chars().count() > 200 {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: 200,
        });
    }

    Ok(())
}

/// Validates a search query.
///
/// ## Rules
/// - Can be empty (returns the default listing)
/// - Maximum 100 characters
///
/// ## Returns
/// The trimmed query string.
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();

    if query.chars().count() > 100 {
        return Err(ValidationError::TooLong {
            field: "query".to_string(),
            max: 100,
        });
    }

    Ok(query.to_string())
}

/// Normalizes the optional customer name captured at payment.
///
/// Blank input means "no name". Anything else is trimmed and length-checked.
pub fn validate_customer_name(name: Option<&str>) -> ValidationResult<Option<String>> {
    optional_text("customer name", name, MAX_CUSTOMER_NAME_LEN)
}

/// Normalizes the optional customer phone captured at payment.
///
/// ## Rules
/// - Blank means "no phone"
/// - Digits plus `+`, `-`, spaces and parentheses
/// - At least 5 digits
pub fn validate_customer_phone(phone: Option<&str>) -> ValidationResult<Option<String>> {
    let phone = match optional_text("customer phone", phone, MAX_CUSTOMER_PHONE_LEN)? {
        Some(phone) => phone,
        None => return Ok(None),
    };

    if !phone
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | ' ' | '(' | ')'))
    {
        return Err(ValidationError::invalid_format(
            "customer phone",
            "may only contain digits, spaces, and + - ( )",
        ));
    }

    if phone.chars().filter(|c| c.is_ascii_digit()).count() < 5 {
        return Err(ValidationError::invalid_format(
            "customer phone",
            "must contain at least 5 digits",
        ));
    }

    Ok(Some(phone))
}

fn optional_text(field: &str, value: Option<&str>, max: usize) -> ValidationResult<Option<String>> {
    let value = match value.map(str::trim) {
        Some(v) if !v.is_empty() => v,
        _ => return Ok(None),
    };

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(Some(value.to_string()))
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a quantity value.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY (999)
///
/// ## User Workflow
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Cart: Type Quantity                                                    │
/// │                                                                         │
/// │  Cashier types: qty 2 5                                                │
/// │       │                                                                 │
/// │       ▼                                                                 │
/// │  validate_quantity(5) ← THIS FUNCTION                                  │
/// │       │                                                                 │
/// │       ├── qty <= 0? → Error: "quantity must be positive"               │
/// │       │                                                                 │
/// │       ├── qty > 999? → Error: "quantity must be between 1 and 999"     │
/// │       │                                                                 │
/// │       └── OK → stock and discount checks in Cart::update_quantity      │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a price in cents.
///
/// Zero is allowed (free items). Same ceiling as typed amounts.
///
/// ## Example
/// ```rust
/// use till_core::validation::validate_price_cents;
///
/// assert!(validate_price_cents(1099).is_ok());
/// assert!(validate_price_cents(0).is_ok());
/// assert!(validate_price_cents(-100).is_err());
/// ```
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    validate_money_amount("price", Money::from_cents(cents))
}

/// Validates an amount typed at the till (discount, tax, tender).
///
/// ## Rules
/// - Must not be negative
/// - Must not exceed MAX_AMOUNT_CENTS (10,000,000.00)
///
/// ## Example
/// ```rust
/// use till_core::money::Money;
/// use till_core::validation::validate_money_amount;
///
/// assert!(validate_money_amount("tax", Money::from_cents(1_800)).is_ok());
/// assert!(validate_money_amount("tax", Money::from_cents(-1)).is_err());
/// assert!(validate_money_amount("tax", Money::from_cents(i64::MAX / 100)).is_err());
/// ```
pub fn validate_money_amount(field: &str, amount: Money) -> ValidationResult<()> {
    if amount.is_negative() {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }

    if amount.cents() > MAX_AMOUNT_CENTS {
        return Err(ValidationError::AmountTooLarge {
            field: field.to_string(),
            max: Money::from_cents(MAX_AMOUNT_CENTS),
        });
    }

    Ok(())
}

/// Validates a tax rate in basis points.
///
/// ## Rules
/// - Must be between 0 and 10000 (0% to 100%)
pub fn validate_tax_rate_bps(bps: u32) -> ValidationResult<()> {
    if bps > 10000 {
        return Err(ValidationError::OutOfRange {
            field: "tax_rate".to_string(),
            min: 0,
            max: 10000,
        });
    }

    Ok(())
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Validates that one more line fits in the cart.
pub fn validate_cart_size(current_items: usize) -> ValidationResult<()> {
    if current_items >= MAX_CART_ITEMS {
        return Err(ValidationError::OutOfRange {
            field: "cart items".to_string(),
            min: 0,
            max: MAX_CART_ITEMS as i64,
        });
    }

    Ok(())
}

// =============================================================================
// UUID Validators
// =============================================================================

/// Validates a UUID string format.
///
/// ## Example
/// ```rust
/// use till_core::validation::validate_uuid;
///
/// assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("not-a-uuid").is_err());
/// ```
pub fn validate_uuid(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "id".to_string(),
        });
    }

    uuid::Uuid::parse_str(id)
        .map_err(|_| ValidationError::invalid_format("id", "must be a valid UUID"))?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_sku() {
        assert!(validate_sku("COKE-330").is_ok());
        assert!(validate_sku("ABC123").is_ok());
        assert!(validate_sku("product_1").is_ok());

        assert!(validate_sku("").is_err());
        assert!(validate_sku("   ").is_err());
        assert!(validate_sku("has space").is_err());
        assert!(validate_sku(&"A".repeat(100)).is_err());
    }

    #[test]
    fn test_validate_product_name() {
        assert!(validate_product_name("Coca-Cola 330ml").is_ok());
        assert!(validate_product_name("").is_err());
        assert!(validate_product_name(&"A".repeat(300)).is_err());
    }

    #[test]
    fn test_validate_search_query_trims() {
        assert_eq!(validate_search_query("  coke ").unwrap(), "coke");
        assert_eq!(validate_search_query("").unwrap(), "");
        assert!(validate_search_query(&"q".repeat(101)).is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(999).is_ok());

        assert!(matches!(
            validate_quantity(0),
            Err(ValidationError::MustBePositive { .. })
        ));
        assert!(validate_quantity(-1).is_err());
        assert!(matches!(
            validate_quantity(1000),
            Err(ValidationError::OutOfRange { max: 999, .. })
        ));
    }

    #[test]
    fn test_validate_price_cents() {
        assert!(validate_price_cents(0).is_ok());
        assert!(validate_price_cents(1099).is_ok());
        assert!(validate_price_cents(-100).is_err());
        assert!(validate_price_cents(MAX_AMOUNT_CENTS + 1).is_err());
    }

    #[test]
    fn test_validate_money_amount() {
        assert!(validate_money_amount("discount", Money::zero()).is_ok());
        assert!(validate_money_amount("discount", Money::from_cents(1)).is_ok());
        assert!(validate_money_amount("discount", Money::from_cents(MAX_AMOUNT_CENTS)).is_ok());

        assert!(matches!(
            validate_money_amount("discount", Money::from_cents(-1)),
            Err(ValidationError::MustNotBeNegative { .. })
        ));
        assert!(matches!(
            validate_money_amount("tax", Money::from_cents(MAX_AMOUNT_CENTS + 1)),
            Err(ValidationError::AmountTooLarge { .. })
        ));
    }

    #[test]
    fn test_largest_parseable_amount_is_rejected() {
        let huge = Money::parse("92233720368547758").unwrap();
        let err = validate_money_amount("tax", huge).unwrap_err();
        assert_eq!(err.to_string(), "tax must not exceed $10000000.00");
    }

    #[test]
    fn test_validate_customer_name() {
        assert_eq!(validate_customer_name(None).unwrap(), None);
        assert_eq!(validate_customer_name(Some("   ")).unwrap(), None);
        assert_eq!(
            validate_customer_name(Some(" Ayesha Khan ")).unwrap(),
            Some("Ayesha Khan".to_string())
        );
        assert!(validate_customer_name(Some(&"n".repeat(121))).is_err());
    }

    #[test]
    fn test_validate_customer_phone() {
        assert_eq!(validate_customer_phone(Some("")).unwrap(), None);
        assert_eq!(
            validate_customer_phone(Some("+92 300-1234567")).unwrap(),
            Some("+92 300-1234567".to_string())
        );
        assert!(validate_customer_phone(Some("call me")).is_err());
        assert!(validate_customer_phone(Some("123")).is_err());
    }

    #[test]
    fn test_validate_cart_size() {
        assert!(validate_cart_size(0).is_ok());
        assert!(validate_cart_size(MAX_CART_ITEMS - 1).is_ok());
        assert!(validate_cart_size(MAX_CART_ITEMS).is_err());
    }

    #[test]
    fn test_validate_uuid() {
        assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
        assert!(validate_uuid("").is_err());
        assert!(validate_uuid("not-a-uuid").is_err());
    }

    #[test]
    fn test_validate_tax_rate_bps() {
        assert!(validate_tax_rate_bps(0).is_ok());
        assert!(validate_tax_rate_bps(825).is_ok());
        assert!(validate_tax_rate_bps(10000).is_ok());
        assert!(validate_tax_rate_bps(10001).is_err());
    }
}
