//! # Checkout Request
//!
//! The snapshot of a cart that sale persistence writes. Built once the
//! settlement has been accepted; from then on the cart itself is not
//! consulted, so the persisted figures are exactly what the cashier saw.
//!
//! ## Checkout Flow
//! ```text
//! Cart ──► totals() ──► settle() ──► CheckoutRequest::from_cart()
//!                                          │
//!                                          ▼
//!                         till-db record_checkout (one transaction)
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::cart::{Cart, CartLine};
use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::pricing::CartTotals;
use crate::settlement::Settlement;
use crate::validation::{validate_customer_name, validate_customer_phone};

/// One line as it will be frozen into `sale_items`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CheckoutLine {
    pub product_id: String,
    pub sku: String,
    pub name: String,
    pub unit_price: Money,
    pub quantity: i64,
    pub discount: Money,
    pub line_total: Money,
}

impl From<&CartLine> for CheckoutLine {
    fn from(line: &CartLine) -> Self {
        CheckoutLine {
            product_id: line.product_id.clone(),
            sku: line.sku.clone(),
            name: line.name.clone(),
            unit_price: line.unit_price,
            quantity: line.quantity,
            discount: line.discount,
            line_total: line.line_total(),
        }
    }
}

/// Optional customer details captured at payment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Customer {
    pub name: Option<String>,
    pub phone: Option<String>,
}

impl Customer {
    /// Normalizes raw input: blank fields become `None`.
    pub fn new(name: Option<&str>, phone: Option<&str>) -> CoreResult<Self> {
        Ok(Customer {
            name: validate_customer_name(name)?,
            phone: validate_customer_phone(phone)?,
        })
    }

    pub fn is_anonymous(&self) -> bool {
        self.name.is_none() && self.phone.is_none()
    }
}

/// Everything needed to persist one sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CheckoutRequest {
    /// Stable across retries of the same payment attempt.
    pub checkout_key: String,
    pub lines: Vec<CheckoutLine>,
    pub totals: CartTotals,
    pub settlement: Settlement,
    pub customer: Customer,
    pub device_id: String,
}

impl CheckoutRequest {
    /// Freezes a cart into a request.
    ///
    /// ## Errors
    /// - `EmptyCart` when there is nothing to sell
    /// - `InvalidPaymentAmount` when the settlement was made for a
    ///   different total than the cart now shows
    pub fn from_cart(
        checkout_key: impl Into<String>,
        cart: &Cart,
        settlement: Settlement,
        customer: Customer,
        device_id: impl Into<String>,
    ) -> CoreResult<Self> {
        if cart.is_empty() {
            return Err(CoreError::EmptyCart);
        }

        let totals = cart.totals();
        if settlement.amount_due != totals.grand_total {
            return Err(CoreError::InvalidPaymentAmount {
                reason: format!(
                    "settled {} but cart total is {}",
                    settlement.amount_due, totals.grand_total
                ),
            });
        }

        Ok(CheckoutRequest {
            checkout_key: checkout_key.into(),
            lines: cart.lines().iter().map(CheckoutLine::from).collect(),
            totals,
            settlement,
            customer,
            device_id: device_id.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settlement::settle;
    use crate::types::{PaymentMethod, Product};
    use chrono::Utc;

    fn cart_with_item() -> Cart {
        let mut cart = Cart::new();
        cart.add(&Product {
            id: "p1".to_string(),
            sku: "COKE-330".to_string(),
            barcode: None,
            name: "Coke 330ml".to_string(),
            unit_label: "can".to_string(),
            price_cents: 150,
            current_stock: 10,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        })
        .unwrap();
        cart
    }

    #[test]
    fn test_from_cart_snapshots_lines() {
        let cart = cart_with_item();
        let settlement = settle(cart.totals().grand_total, PaymentMethod::Card, None).unwrap();

        let request =
            CheckoutRequest::from_cart("key-1", &cart, settlement, Customer::default(), "till-1")
                .unwrap();

        assert_eq!(request.lines.len(), 1);
        assert_eq!(request.lines[0].sku, "COKE-330");
        assert_eq!(request.lines[0].line_total.cents(), 150);
        assert_eq!(request.totals.grand_total.cents(), 150);
        assert_eq!(request.checkout_key, "key-1");
    }

    #[test]
    fn test_empty_cart_is_rejected() {
        let settlement = settle(Money::zero(), PaymentMethod::Card, None).unwrap();
        let err = CheckoutRequest::from_cart(
            "key",
            &Cart::new(),
            settlement,
            Customer::default(),
            "till-1",
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::EmptyCart));
    }

    #[test]
    fn test_stale_settlement_is_rejected() {
        let cart = cart_with_item();
        let settlement = settle(Money::from_cents(99), PaymentMethod::Card, None).unwrap();
        let err =
            CheckoutRequest::from_cart("key", &cart, settlement, Customer::default(), "till-1");
        assert!(matches!(err, Err(CoreError::InvalidPaymentAmount { .. })));
    }

    #[test]
    fn test_customer_blank_fields_are_dropped() {
        let customer = Customer::new(Some("  "), Some("")).unwrap();
        assert!(customer.is_anonymous());
        assert!(Customer::new(None, Some("abc")).is_err());
    }
}
