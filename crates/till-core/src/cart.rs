//! # Cart Store
//!
//! The in-progress sale: an ordered list of lines plus order-level
//! discount and tax.
//!
//! ## Cart Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Cart Operations                                      │
//! │                                                                         │
//! │  Cashier Action           Cart Method             Change                │
//! │  ──────────────           ───────────             ──────                │
//! │                                                                         │
//! │  Scan product ──────────► add() ────────────────► qty += 1 / new line  │
//! │                                                                         │
//! │  Type quantity ─────────► update_quantity() ────► qty = n (n ≥ 1)      │
//! │                                                                         │
//! │  Stepper +/- ───────────► increment()/decrement() qty ± 1, floor 1     │
//! │                                                                         │
//! │  Line discount ─────────► update_discount() ────► discount = d         │
//! │                                                                         │
//! │  Click Remove ──────────► remove() ─────────────► line dropped         │
//! │                                                                         │
//! │  Cancel sale ───────────► clear() ──────────────► empty, adjustments 0 │
//! │                                                                         │
//! │  Every method validates first and mutates last: an Err leaves the      │
//! │  cart exactly as it was.                                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Invariants
//! - Lines are unique by `product_id` (adding the same product bumps quantity)
//! - 1 ≤ quantity ≤ min(available stock, MAX_ITEM_QUANTITY)
//! - 0 ≤ discount ≤ unit price × quantity, so a line total is never negative
//! - Prices, discounts and a fixed tax stay within MAX_AMOUNT_CENTS, so no
//!   total can overflow
//! - At most MAX_CART_ITEMS lines

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::pricing::{self, CartTotals};
use crate::types::{Product, TaxRate};
use crate::validation::{
    validate_cart_size, validate_money_amount, validate_price_cents, validate_quantity,
};

// =============================================================================
// Cart Line
// =============================================================================

/// One product entry in the cart.
///
/// ## Snapshot
/// The unit price and the stock ceiling are captured when the line is
/// created. A later price change in the catalog does not reprice the line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CartLine {
    /// Cart-local identifier (UUID v4).
    pub line_id: String,
    pub product_id: String,
    pub sku: String,
    pub name: String,
    pub unit_label: String,
    pub unit_price: Money,
    pub quantity: i64,
    pub discount: Money,
    /// Stock on hand when the product was last read.
    pub available_stock: i64,
    #[ts(as = "String")]
    pub added_at: DateTime<Utc>,
}

impl CartLine {
    /// Creates a single-unit line from a product at its current price.
    pub fn from_product(product: &Product) -> Self {
        CartLine {
            line_id: Uuid::new_v4().to_string(),
            product_id: product.id.clone(),
            sku: product.sku.clone(),
            name: product.name.clone(),
            unit_label: product.unit_label.clone(),
            unit_price: product.price(),
            quantity: 1,
            discount: Money::zero(),
            available_stock: product.current_stock,
            added_at: Utc::now(),
        }
    }

    /// unit price × quantity, before the line discount.
    #[inline]
    pub fn gross(&self) -> Money {
        self.unit_price.multiply_quantity(self.quantity)
    }

    /// unit price × quantity − line discount.
    #[inline]
    pub fn line_total(&self) -> Money {
        self.gross() - self.discount
    }

    fn check_stock(&self, requested: i64) -> CoreResult<()> {
        if requested > self.available_stock {
            return Err(CoreError::InsufficientStock {
                sku: self.sku.clone(),
                available: self.available_stock,
                requested,
            });
        }
        Ok(())
    }

    fn check_discount(&self, discount: Money, quantity: i64) -> CoreResult<()> {
        let line_value = self.unit_price.multiply_quantity(quantity);
        if discount > line_value {
            return Err(CoreError::DiscountExceedsLine {
                sku: self.sku.clone(),
                discount,
                line_value,
            });
        }
        Ok(())
    }
}

// =============================================================================
// Order Tax
// =============================================================================

/// How the order-level tax is expressed.
///
/// A fixed amount stays as typed. A rate is re-applied to
/// (subtotal − order discount) every time totals are derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
#[ts(export)]
pub enum OrderTax {
    Amount(Money),
    Rate(TaxRate),
}

impl Default for OrderTax {
    fn default() -> Self {
        OrderTax::Amount(Money::zero())
    }
}

// =============================================================================
// Cart
// =============================================================================

/// The shopping cart.
///
/// Owned by whoever drives the sale (one cart per session); nothing here is
/// global.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Cart {
    lines: Vec<CartLine>,
    order_discount: Money,
    order_tax: OrderTax,
    #[ts(as = "String")]
    created_at: DateTime<Utc>,
}

impl Default for Cart {
    fn default() -> Self {
        Cart::new()
    }
}

impl Cart {
    /// Creates a new empty cart.
    pub fn new() -> Self {
        Cart {
            lines: Vec::new(),
            order_discount: Money::zero(),
            order_tax: OrderTax::default(),
            created_at: Utc::now(),
        }
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    /// Lines in insertion order.
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Looks up a line by its ID.
    pub fn line(&self, line_id: &str) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.line_id == line_id)
    }

    /// Looks up the line holding a product.
    pub fn find_by_product(&self, product_id: &str) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.product_id == product_id)
    }

    /// Returns the number of distinct lines.
    pub fn item_count(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn order_discount(&self) -> Money {
        self.order_discount
    }

    /// The order-level tax as it was entered.
    pub fn order_tax_input(&self) -> OrderTax {
        self.order_tax
    }

    /// The order-level tax amount for the current contents.
    pub fn order_tax(&self) -> Money {
        match self.order_tax {
            OrderTax::Amount(amount) => amount,
            OrderTax::Rate(rate) => {
                let taxable = (pricing::subtotal(&self.lines) - self.order_discount).floor_zero();
                taxable.calculate_tax(rate)
            }
        }
    }

    /// When the cart was created or last cleared.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Derives all totals from the current contents.
    pub fn totals(&self) -> CartTotals {
        pricing::calculate(&self.lines, self.order_discount, self.order_tax())
    }

    // -------------------------------------------------------------------------
    // Mutations
    // -------------------------------------------------------------------------

    /// Adds one unit of a product.
    ///
    /// ## Behavior
    /// - Already in cart: quantity + 1, if stock allows
    /// - Not in cart: new line at the product's current price, discount 0
    ///
    /// The product passed in is the freshest read of the catalog, so its
    /// stock replaces the line's snapshot.
    ///
    /// ## Returns
    /// The line that was created or bumped.
    pub fn add(&mut self, product: &Product) -> CoreResult<&CartLine> {
        if !product.is_active {
            return Err(CoreError::ProductInactive(product.sku.clone()));
        }
        validate_price_cents(product.price_cents)?;

        if let Some(index) = self.position_of_product(&product.id) {
            let line = &mut self.lines[index];
            let requested = line.quantity + 1;
            if requested > crate::MAX_ITEM_QUANTITY {
                return Err(CoreError::QuantityTooLarge {
                    requested,
                    max: crate::MAX_ITEM_QUANTITY,
                });
            }
            if requested > product.current_stock {
                return Err(CoreError::InsufficientStock {
                    sku: product.sku.clone(),
                    available: product.current_stock,
                    requested,
                });
            }
            line.available_stock = product.current_stock;
            line.quantity = requested;
            return Ok(&self.lines[index]);
        }

        validate_cart_size(self.lines.len()).map_err(|_| CoreError::CartTooLarge {
            max: crate::MAX_CART_ITEMS,
        })?;

        if product.current_stock < 1 {
            return Err(CoreError::InsufficientStock {
                sku: product.sku.clone(),
                available: product.current_stock,
                requested: 1,
            });
        }

        self.lines.push(CartLine::from_product(product));
        let index = self.lines.len() - 1;
        Ok(&self.lines[index])
    }

    /// Sets a line's quantity from direct numeric entry.
    ///
    /// ## Behavior
    /// - qty ≤ 0: rejected (use [`Cart::remove`] to drop a line)
    /// - qty > available stock: rejected
    /// - qty would leave the discount larger than the line value: rejected
    pub fn update_quantity(&mut self, line_id: &str, quantity: i64) -> CoreResult<&CartLine> {
        validate_quantity(quantity)?;

        let index = self.position_of_line(line_id)?;
        let line = &self.lines[index];
        line.check_stock(quantity)?;
        line.check_discount(line.discount, quantity)?;

        self.lines[index].quantity = quantity;
        Ok(&self.lines[index])
    }

    /// Stepper "+": one more unit, subject to stock.
    pub fn increment(&mut self, line_id: &str) -> CoreResult<&CartLine> {
        let index = self.position_of_line(line_id)?;
        let next = self.lines[index].quantity + 1;
        self.update_quantity(line_id, next)
    }

    /// Stepper "−": one fewer unit, clamped at 1.
    pub fn decrement(&mut self, line_id: &str) -> CoreResult<&CartLine> {
        let index = self.position_of_line(line_id)?;
        let next = (self.lines[index].quantity - 1).max(1);
        self.update_quantity(line_id, next)
    }

    /// Replaces a line's discount.
    ///
    /// The discount must be non-negative, within MAX_AMOUNT_CENTS and no
    /// larger than unit price × quantity.
    pub fn update_discount(&mut self, line_id: &str, discount: Money) -> CoreResult<&CartLine> {
        validate_money_amount("discount", discount)?;

        let index = self.position_of_line(line_id)?;
        let line = &self.lines[index];
        line.check_discount(discount, line.quantity)?;

        self.lines[index].discount = discount;
        Ok(&self.lines[index])
    }

    /// Removes a line and returns it.
    pub fn remove(&mut self, line_id: &str) -> CoreResult<CartLine> {
        let index = self.position_of_line(line_id)?;
        Ok(self.lines.remove(index))
    }

    /// Sets the order-level discount.
    ///
    /// Must be non-negative and no larger than the current subtotal.
    pub fn set_order_discount(&mut self, discount: Money) -> CoreResult<()> {
        validate_money_amount("order discount", discount)?;

        let subtotal = pricing::subtotal(&self.lines);
        if discount > subtotal {
            return Err(CoreError::DiscountExceedsSubtotal { discount, subtotal });
        }

        self.order_discount = discount;
        Ok(())
    }

    /// Sets the order-level tax to a fixed amount, at most MAX_AMOUNT_CENTS.
    pub fn set_order_tax(&mut self, tax: Money) -> CoreResult<()> {
        validate_money_amount("order tax", tax)?;
        self.order_tax = OrderTax::Amount(tax);
        Ok(())
    }

    /// Sets the order-level tax to a rate re-applied on every recompute.
    ///
    /// ## Returns
    /// The tax amount for the current contents.
    pub fn apply_tax_rate(&mut self, rate: TaxRate) -> CoreResult<Money> {
        crate::validation::validate_tax_rate_bps(rate.bps())?;
        self.order_tax = OrderTax::Rate(rate);
        Ok(self.order_tax())
    }

    /// Empties the cart and resets order-level discount and tax.
    ///
    /// Clearing an empty cart is a no-op apart from the timestamp.
    pub fn clear(&mut self) {
        self.lines.clear();
        self.order_discount = Money::zero();
        self.order_tax = OrderTax::default();
        self.created_at = Utc::now();
    }

    // -------------------------------------------------------------------------
    // Helpers
    // -------------------------------------------------------------------------

    fn position_of_product(&self, product_id: &str) -> Option<usize> {
        self.lines.iter().position(|l| l.product_id == product_id)
    }

    fn position_of_line(&self, line_id: &str) -> CoreResult<usize> {
        self.lines
            .iter()
            .position(|l| l.line_id == line_id)
            .ok_or_else(|| CoreError::LineNotFound(line_id.to_string()))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
