//! # Domain Types
//!
//! Core domain types used throughout Till POS.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │      Sale       │   │    SaleItem     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  sale_id (FK)   │       │
//! │  │  sku (business) │   │  invoice_number │   │  *_snapshot     │       │
//! │  │  price_cents    │   │  checkout_key   │   │  discount_cents │       │
//! │  │  current_stock  │   │  total_cents    │   │  line_total     │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐                             │
//! │  │    TaxRate      │   │ PaymentMethod   │                             │
//! │  │  ─────────────  │   │  ─────────────  │                             │
//! │  │  bps (u32)      │   │  Cash           │                             │
//! │  │  825 = 8.25%    │   │  Card           │                             │
//! │  └─────────────────┘   │  MobileTransfer │                             │
//! │                        └─────────────────┘                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - Business ID: (sku, invoice_number) - human-readable

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000
/// 825 bps = 8.25%
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Parses a percentage string such as `"8.25"` into basis points.
    ///
    /// Percentages use the same two-decimal grammar as money amounts, so
    /// `"8.25"` becomes 825 bps without going through a float.
    pub fn parse_percentage(input: &str) -> Result<Self, ValidationError> {
        let bps = Money::parse(input)
            .map_err(|_| ValidationError::invalid_format("tax_rate", "must be a percentage"))?
            .cents();
        if !(0..=10_000).contains(&bps) {
            return Err(ValidationError::OutOfRange {
                field: "tax_rate".to_string(),
                min: 0,
                max: 100,
            });
        }
        Ok(TaxRate(bps as u32))
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Zero tax rate.
    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }

    /// Checks if tax rate is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

// =============================================================================
// Product
// =============================================================================

/// A product available for sale.
///
/// Read-only reference data from the cart's point of view: the cart reads
/// the selling price and the stock ceiling, and only the persistence layer
/// decrements `current_stock`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Stock Keeping Unit - business identifier.
    pub sku: String,

    /// Barcode (EAN-13, UPC-A, etc.).
    pub barcode: Option<String>,

    /// Display name shown to cashier and on receipt.
    pub name: String,

    /// Unit label shown next to quantities ("pcs", "kg", "box").
    pub unit_label: String,

    /// Selling price in cents.
    pub price_cents: i64,

    /// Units currently available.
    pub current_stock: i64,

    /// Whether product is active (soft delete).
    pub is_active: bool,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the selling price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Checks if `quantity` units can be sold from current stock.
    pub fn can_sell(&self, quantity: i64) -> bool {
        self.is_active && self.current_stock >= quantity
    }
}

// =============================================================================
// Payment Method
// =============================================================================

/// How a sale is paid. Only cash takes a tendered amount.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Physical cash payment.
    Cash,
    /// Card payment on an external terminal.
    Card,
    /// Bank or wallet transfer from the customer's phone.
    MobileTransfer,
}

impl PaymentMethod {
    /// All methods, in the order the payment dialog lists them.
    pub const ALL: [PaymentMethod; 3] = [
        PaymentMethod::Cash,
        PaymentMethod::Card,
        PaymentMethod::MobileTransfer,
    ];

    /// Stable lowercase name (matches the database and serde encoding).
    pub const fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::MobileTransfer => "mobile_transfer",
        }
    }

    /// Whether a tendered amount is required.
    #[inline]
    pub const fn requires_tender(&self) -> bool {
        matches!(self, PaymentMethod::Cash)
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cash" => Ok(PaymentMethod::Cash),
            "card" | "credit" | "debit" => Ok(PaymentMethod::Card),
            "mobile" | "mobile_transfer" | "mobile-transfer" | "transfer" => {
                Ok(PaymentMethod::MobileTransfer)
            }
            _ => Err(ValidationError::NotAllowed {
                field: "payment method".to_string(),
                allowed: PaymentMethod::ALL
                    .iter()
                    .map(|m| m.as_str().to_string())
                    .collect(),
            }),
        }
    }
}

// =============================================================================
// Sale
// =============================================================================

/// A completed sale. Immutable once written.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Sale {
    pub id: String,
    /// Human-readable number printed on the receipt (`INV-20261019-0001`).
    pub invoice_number: String,
    /// Identifies the checkout attempt; retries reuse it.
    pub checkout_key: String,
    /// Σ line totals (after line discounts).
    pub subtotal_cents: i64,
    /// Order discount + Σ line discounts (informational).
    pub discount_cents: i64,
    pub tax_cents: i64,
    pub total_cents: i64,
    pub payment_method: PaymentMethod,
    /// For cash: amount the customer handed over.
    pub tendered_cents: Option<i64>,
    pub change_cents: i64,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub device_id: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Sale {
    /// Returns the grand total as Money.
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    /// Returns the change handed back as Money.
    #[inline]
    pub fn change(&self) -> Money {
        Money::from_cents(self.change_cents)
    }
}

// =============================================================================
// Sale Item
// =============================================================================

/// A line item in a sale.
/// Uses snapshot pattern to freeze product data at time of sale.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SaleItem {
    pub id: String,
    pub sale_id: String,
    pub product_id: String,
    /// SKU at time of sale (frozen).
    pub sku_snapshot: String,
    /// Product name at time of sale (frozen).
    pub name_snapshot: String,
    /// Unit price in cents at time of sale (frozen).
    pub unit_price_cents: i64,
    /// Quantity sold.
    pub quantity: i64,
    /// Discount applied to this line.
    pub discount_cents: i64,
    /// unit_price × quantity − discount.
    pub line_total_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl SaleItem {
    /// Returns the unit price as Money.
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    /// Returns the line total as Money.
    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.line_total_cents)
    }
}

// =============================================================================
// Sale Receipt
// =============================================================================

/// What sale persistence hands back: the stored header and its lines.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleReceipt {
    pub sale: Sale,
    pub items: Vec<SaleItem>,
    /// True when the checkout key was already recorded and nothing new was
    /// written.
    pub replayed: bool,
}

// =============================================================================
// Unit Tests
// =============================================================================
