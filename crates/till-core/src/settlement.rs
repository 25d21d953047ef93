//! # Payment Settlement
//!
//! Validates the tendered amount against the grand total and computes
//! change. Runs before anything is written, so a rejected settlement never
//! reaches the database.
//!
//! ## Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Method          Tendered         Result                                │
//! │  ──────          ────────         ──────                                │
//! │  cash            ≥ total          change = tendered − total            │
//! │  cash            < total          InsufficientTender                   │
//! │  cash            missing          InvalidPaymentAmount                 │
//! │  cash            > 10,000,000.00  Validation (AmountTooLarge)          │
//! │  card / mobile   ignored          amount due = total, change = 0       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::PaymentMethod;
use crate::validation::validate_money_amount;

/// The accepted outcome of a payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Settlement {
    pub method: PaymentMethod,
    pub amount_due: Money,
    /// Only recorded for cash.
    pub tendered: Option<Money>,
    pub change_due: Money,
}

/// Settles a grand total with the chosen method.
///
/// ## Example
/// ```rust
/// use till_core::money::Money;
/// use till_core::settlement::settle;
/// use till_core::PaymentMethod;
///
/// let card = settle(Money::from_cents(19_800), PaymentMethod::Card, None).unwrap();
/// assert!(card.change_due.is_zero());
/// ```
pub fn settle(
    total: Money,
    method: PaymentMethod,
    tendered: Option<Money>,
) -> CoreResult<Settlement> {
    if total.is_negative() {
        return Err(CoreError::InvalidPaymentAmount {
            reason: format!("total {} is negative", total),
        });
    }

    if !method.requires_tender() {
        return Ok(Settlement {
            method,
            amount_due: total,
            tendered: None,
            change_due: Money::zero(),
        });
    }

    let tendered = tendered.ok_or_else(|| CoreError::InvalidPaymentAmount {
        reason: "cash payment needs a tendered amount".to_string(),
    })?;
    validate_money_amount("tendered", tendered)?;

    if tendered < total {
        return Err(CoreError::InsufficientTender { tendered, total });
    }

    Ok(Settlement {
        method,
        amount_due: total,
        tendered: Some(tendered),
        change_due: tendered - total,
    })
}
