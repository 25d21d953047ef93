//! # Pricing Calculator
//!
//! Pure derivation of cart totals. Nothing here is stored: totals are
//! recomputed from the lines every time they are read, so they can never
//! drift from the cart contents.
//!
//! ## Formula
//! ```text
//! line_total   = unit_price × quantity − line_discount
//! subtotal     = Σ line_total
//! grand_total  = max(0, subtotal − order_discount + order_tax)
//!
//! gross_subtotal = Σ unit_price × quantity        (display only)
//! total_discount = Σ line_discount + order_discount (display only)
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::cart::CartLine;
use crate::money::Money;

/// Everything the totals panel and the payment dialog show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CartTotals {
    /// Distinct lines.
    pub line_count: usize,
    /// Σ quantity.
    pub total_quantity: i64,
    pub gross_subtotal: Money,
    pub line_discount: Money,
    pub subtotal: Money,
    pub order_discount: Money,
    pub total_discount: Money,
    pub tax: Money,
    pub grand_total: Money,
}

/// Σ line totals.
pub fn subtotal(lines: &[CartLine]) -> Money {
    lines.iter().map(CartLine::line_total).sum()
}

/// Derives the totals for a set of lines and order-level adjustments.
///
/// ## Example
/// ```rust
/// use till_core::money::Money;
/// use till_core::pricing::calculate;
///
/// let totals = calculate(&[], Money::zero(), Money::zero());
/// assert!(totals.grand_total.is_zero());
/// ```
pub fn calculate(lines: &[CartLine], order_discount: Money, order_tax: Money) -> CartTotals {
    let gross_subtotal: Money = lines.iter().map(CartLine::gross).sum();
    let line_discount: Money = lines.iter().map(|l| l.discount).sum();
    let subtotal = subtotal(lines);

    CartTotals {
        line_count: lines.len(),
        total_quantity: lines.iter().map(|l| l.quantity).sum(),
        gross_subtotal,
        line_discount,
        subtotal,
        order_discount,
        total_discount: line_discount + order_discount,
        tax: order_tax,
        grand_total: (subtotal - order_discount + order_tax).floor_zero(),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn line(price: i64, qty: i64, discount: i64) -> CartLine {
        CartLine {
            line_id: uuid::Uuid::new_v4().to_string(),
            product_id: uuid::Uuid::new_v4().to_string(),
            sku: "SKU".to_string(),
            name: "Item".to_string(),
            unit_label: "pcs".to_string(),
            unit_price: Money::from_cents(price),
            quantity: qty,
            discount: Money::from_cents(discount),
            available_stock: 100,
            added_at: Utc::now(),
        }
    }

    #[test]
    fn test_empty_cart_totals_are_zero() {
        let totals = calculate(&[], Money::zero(), Money::zero());
        assert_eq!(totals, CartTotals::default());
    }

    #[test]
    fn test_subtotal_is_sum_of_line_totals() {
        let lines = vec![line(10_000, 2, 2_000), line(350, 3, 0)];
        let totals = calculate(&lines, Money::zero(), Money::zero());

        assert_eq!(totals.gross_subtotal.cents(), 21_050);
        assert_eq!(totals.line_discount.cents(), 2_000);
        assert_eq!(totals.subtotal.cents(), 19_050);
        assert_eq!(totals.grand_total.cents(), 19_050);
        assert_eq!(totals.line_count, 2);
        assert_eq!(totals.total_quantity, 5);
    }

    #[test]
    fn test_order_adjustments() {
        let lines = vec![line(10_000, 2, 2_000)];
        let totals = calculate(&lines, Money::from_cents(500), Money::from_cents(1_800));

        assert_eq!(totals.subtotal.cents(), 18_000);
        assert_eq!(totals.total_discount.cents(), 2_500);
        assert_eq!(totals.grand_total.cents(), 19_300);
    }

    #[test]
    fn test_grand_total_never_negative() {
        let lines = vec![line(100, 1, 0)];
        let totals = calculate(&lines, Money::from_cents(500), Money::zero());
        assert!(totals.grand_total.is_zero());
    }

    #[test]
    fn test_line_discount_is_not_counted_twice() {
        let lines = vec![line(1_000, 1, 1_000)];
        let totals = calculate(&lines, Money::zero(), Money::from_cents(50));
        assert!(totals.subtotal.is_zero());
        assert_eq!(totals.grand_total.cents(), 50);
    }
}
