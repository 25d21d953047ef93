//! # till-core: Pure Business Logic for Till POS
//!
//! This crate is the **heart** of Till POS. It contains the cart pricing
//! engine as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Till POS Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 till-terminal (PosSession)                      │   │
//! │  │    add ──► qty / discount ──► pay ──► confirm ──► receipt       │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ till-core (THIS CRATE) ★                        │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌──────────┐ ┌────────┐  │   │
//! │  │   │  money  │ │  cart   │ │ pricing │ │settlement│ │checkout│  │   │
//! │  │   │  Money  │ │  Cart   │ │ Totals  │ │  Tender  │ │Request │  │   │
//! │  │   └─────────┘ └─────────┘ └─────────┘ └──────────┘ └────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    till-db (Database Layer)                     │   │
//! │  │        SQLite, migrations, transactional checkout               │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Sale, PaymentMethod, etc.)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`cart`] - The cart store and its mutations
//! - [`pricing`] - Pure totals calculation
//! - [`settlement`] - Tender validation and change calculation
//! - [`checkout`] - The request handed to sale persistence
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Example Usage
//!
//! ```rust
//! use till_core::money::Money;
//! use till_core::settlement::settle;
//! use till_core::PaymentMethod;
//!
//! let total = Money::from_cents(19_800);
//! let settlement = settle(total, PaymentMethod::Cash, Some(Money::from_cents(20_000))).unwrap();
//! assert_eq!(settlement.change_due.to_string(), "$2.00");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod checkout;
pub mod error;
pub mod money;
pub mod pricing;
pub mod settlement;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use cart::{Cart, CartLine, OrderTax};
pub use checkout::{CheckoutLine, CheckoutRequest, Customer};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use pricing::CartTotals;
pub use settlement::Settlement;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum distinct lines allowed in a single cart
///
/// ## Business Reason
/// Prevents runaway carts and keeps a checkout inside one reasonable
/// transaction.
pub const MAX_CART_ITEMS: usize = 100;

/// Maximum quantity of a single line in cart
///
/// ## Business Reason
/// Prevents accidental over-ordering (e.g., typing 1000 instead of 10)
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Largest single amount the till accepts, in cents (10,000,000.00)
///
/// ## Business Reason
/// Covers any real price, discount, tax or cash tender. With the line and
/// quantity caps above, every cart total stays far inside `i64`.
pub const MAX_AMOUNT_CENTS: i64 = 1_000_000_000;

/// Default invoice number prefix (`INV-20261019-0001`).
pub const DEFAULT_INVOICE_PREFIX: &str = "INV";
