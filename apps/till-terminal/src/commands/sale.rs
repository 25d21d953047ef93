//! # Sale Commands
//!
//! Payment and sale history.
//!
//! ## Checkout Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Checkout Flow                                        │
//! │                                                                         │
//! │  pay ──────────► "Total due $198.00"   (checkout key allocated)        │
//! │   │                                                                     │
//! │   ├── cancel ──► back to editing, cart untouched                       │
//! │   │                                                                     │
//! │   ▼                                                                     │
//! │  confirm cash 200 "Ayesha"                                             │
//! │   │                                                                     │
//! │   ├── tendered < total ──► "Tendered $150.00 is less than ..."         │
//! │   ├── database error   ──► cart kept, same key, confirm again          │
//! │   │                                                                     │
//! │   ▼                                                                     │
//! │  Receipt printed, cart cleared                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use till_core::{Money, PaymentMethod};
use tracing::debug;

use crate::error::TerminalResult;
use crate::receipt::render_receipt;
use crate::state::{PosSession, SaleStore, TerminalConfig};

/// Sales listed by `sales`.
pub const RECENT_SALES_LIMIT: u32 = 10;

/// Opens the payment step and shows what is due.
pub fn pay<S: SaleStore>(
    session: &mut PosSession<S>,
    config: &TerminalConfig,
) -> TerminalResult<String> {
    let total = session.open_payment()?;
    Ok(format!(
        "Total due {}\nconfirm cash <tendered> [name] [phone] | confirm card|mobile [name] [phone] | cancel",
        config.format_currency(total)
    ))
}

pub fn cancel<S: SaleStore>(session: &mut PosSession<S>) -> TerminalResult<String> {
    session.cancel_payment()?;
    Ok("Payment cancelled, cart kept".to_string())
}

/// Settles the payment, records the sale and prints the receipt.
pub async fn confirm<S: SaleStore>(
    session: &mut PosSession<S>,
    config: &TerminalConfig,
    method: PaymentMethod,
    tendered: Option<Money>,
    customer_name: Option<&str>,
    customer_phone: Option<&str>,
) -> TerminalResult<String> {
    debug!(method = %method, "confirm command");

    let receipt = session
        .confirm_payment(method, tendered, customer_name, customer_phone)
        .await?;
    Ok(render_receipt(&receipt, config))
}

/// Lists the newest sales.
pub async fn recent<S: SaleStore>(
    session: &PosSession<S>,
    config: &TerminalConfig,
) -> TerminalResult<String> {
    let sales = session.store().recent_sales(RECENT_SALES_LIMIT).await?;
    if sales.is_empty() {
        return Ok("No sales yet".to_string());
    }

    let lines: Vec<String> = sales
        .iter()
        .map(|sale| {
            format!(
                "{:<20}  {}  {:<15}  {:>10}",
                sale.invoice_number,
                sale.created_at.format("%H:%M"),
                sale.payment_method.as_str(),
                config.format_currency(sale.total())
            )
        })
        .collect();
    Ok(lines.join("\n"))
}
