//! # Cart Commands
//!
//! Commands that edit the cart or show it.
//!
//! ## Cart Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Cart Lifecycle                                       │
//! │                                                                         │
//! │  ┌──────────┐     ┌──────────┐     ┌──────────┐     ┌──────────┐       │
//! │  │  Empty   │────►│ In Cart  │────►│ Payment  │────►│ Recorded │       │
//! │  │  Cart    │     │          │     │ Pending  │     │   Sale   │       │
//! │  └──────────┘     └──────────┘     └──────────┘     └──────────┘       │
//! │                        │                 │                              │
//! │                   add (product.rs)   confirm (sale.rs)                  │
//! │                   qty, inc, dec                                         │
//! │                   discount, remove                                      │
//! │                   order-discount, tax                                   │
//! │                        │                                                │
//! │                        ▼                                                │
//! │                   clear ──────────────────────────────►                 │
//! │                                                      (back to empty)   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every edit answers with the touched line and the new total, so the
//! cashier never has to type `show` after each scan.

use serde_json::json;
use till_core::{Cart, CartLine, Money, OrderTax, TaxRate};

use crate::error::{TerminalError, TerminalResult};
use crate::state::{PosSession, SaleStore, TerminalConfig};

pub fn set_quantity<S: SaleStore>(
    session: &mut PosSession<S>,
    config: &TerminalConfig,
    position: usize,
    quantity: i64,
) -> TerminalResult<String> {
    let line_id = session.line_id_at(position)?;
    let line = session.update_quantity(&line_id, quantity)?;
    Ok(edited(session.cart(), config, position, &line))
}

/// Stepper `inc` / `dec`. `dec` stops at 1.
pub fn step<S: SaleStore>(
    session: &mut PosSession<S>,
    config: &TerminalConfig,
    position: usize,
    up: bool,
) -> TerminalResult<String> {
    let line_id = session.line_id_at(position)?;
    let line = if up {
        session.increment(&line_id)?
    } else {
        session.decrement(&line_id)?
    };
    Ok(edited(session.cart(), config, position, &line))
}

pub fn set_discount<S: SaleStore>(
    session: &mut PosSession<S>,
    config: &TerminalConfig,
    position: usize,
    amount: Money,
) -> TerminalResult<String> {
    let line_id = session.line_id_at(position)?;
    let line = session.update_discount(&line_id, amount)?;
    Ok(edited(session.cart(), config, position, &line))
}

pub fn remove<S: SaleStore>(
    session: &mut PosSession<S>,
    config: &TerminalConfig,
    position: usize,
) -> TerminalResult<String> {
    let line_id = session.line_id_at(position)?;
    let line = session.remove(&line_id)?;
    Ok(format!(
        "Removed {} {}\n{}",
        line.sku,
        line.name,
        total_line(session.cart(), config)
    ))
}

pub fn set_order_discount<S: SaleStore>(
    session: &mut PosSession<S>,
    config: &TerminalConfig,
    amount: Money,
) -> TerminalResult<String> {
    session.set_order_discount(amount)?;
    Ok(format!(
        "Order discount {}\n{}",
        config.format_currency(amount),
        total_line(session.cart(), config)
    ))
}

pub fn set_order_tax<S: SaleStore>(
    session: &mut PosSession<S>,
    config: &TerminalConfig,
    amount: Money,
) -> TerminalResult<String> {
    session.set_order_tax(amount)?;
    Ok(format!(
        "Order tax {}\n{}",
        config.format_currency(amount),
        total_line(session.cart(), config)
    ))
}

pub fn set_tax_rate<S: SaleStore>(
    session: &mut PosSession<S>,
    config: &TerminalConfig,
    rate: TaxRate,
) -> TerminalResult<String> {
    let tax = session.apply_tax_rate(rate)?;
    Ok(format!(
        "Order tax {}% = {}\n{}",
        rate.percentage(),
        config.format_currency(tax),
        total_line(session.cart(), config)
    ))
}

pub fn clear<S: SaleStore>(session: &mut PosSession<S>) -> String {
    session.clear();
    "Cart cleared".to_string()
}

/// `show`: the cart plus a reminder when a payment is open.
pub fn show<S: SaleStore>(session: &PosSession<S>, config: &TerminalConfig) -> String {
    let mut text = render_cart(session.cart(), config);
    if session.is_payment_pending() {
        text.push_str("\nPayment pending: 'confirm ...' or 'cancel'");
    }
    text
}

/// Renders the cart as a table.
///
/// ## Output
/// ```text
///  #  SKU           Item                  Qty    Price     Disc    Total
///  1  RICE-1KG      Rice 1kg                2  $100.00   $20.00  $180.00
/// ------------------------------------------------------------------------
///                                             Subtotal           $180.00
///                                             Tax                 $18.00
///                                             TOTAL              $198.00
/// ```
pub fn render_cart(cart: &Cart, config: &TerminalConfig) -> String {
    if cart.is_empty() {
        return "Cart is empty".to_string();
    }

    let money = |m: Money| config.format_currency(m);
    let mut out = vec![format!(
        "{:>2}  {:<12}  {:<20}  {:>4}  {:>9}  {:>9}  {:>9}",
        "#", "SKU", "Item", "Qty", "Price", "Disc", "Total"
    )];

    for (index, line) in cart.lines().iter().enumerate() {
        out.push(format!(
            "{:>2}  {:<12}  {:<20}  {:>4}  {:>9}  {:>9}  {:>9}",
            index + 1,
            clip(&line.sku, 12),
            clip(&line.name, 20),
            line.quantity,
            money(line.unit_price),
            money(line.discount),
            money(line.line_total())
        ));
    }
    out.push("-".repeat(78));

    let totals = cart.totals();
    let summary = |label: &str, amount: Money| format!("{:>58}  {:>18}", label, money(amount));
    out.push(summary("Subtotal", totals.subtotal));
    if totals.order_discount.is_positive() {
        out.push(summary("Order discount", Money::zero() - totals.order_discount));
    }
    let tax_label = match cart.order_tax_input() {
        OrderTax::Rate(rate) => format!("Tax ({}%)", rate.percentage()),
        OrderTax::Amount(_) => "Tax".to_string(),
    };
    if totals.tax.is_positive() || matches!(cart.order_tax_input(), OrderTax::Rate(_)) {
        out.push(summary(&tax_label, totals.tax));
    }
    out.push(summary("TOTAL", totals.grand_total));

    out.join("\n")
}

/// `show json`: the cart and its totals as pretty JSON.
pub fn cart_json(cart: &Cart) -> TerminalResult<String> {
    let value = json!({
        "cart": cart,
        "totals": cart.totals(),
    });
    serde_json::to_string_pretty(&value)
        .map_err(|e| TerminalError::internal(format!("Could not serialize cart: {}", e)))
}

fn edited(cart: &Cart, config: &TerminalConfig, position: usize, line: &CartLine) -> String {
    format!(
        "{:>2}  {} x{}  {}\n{}",
        position,
        line.sku,
        line.quantity,
        config.format_currency(line.line_total()),
        total_line(cart, config)
    )
}

fn total_line(cart: &Cart, config: &TerminalConfig) -> String {
    let totals = cart.totals();
    format!(
        "{} line(s), total {}",
        totals.line_count,
        config.format_currency(totals.grand_total)
    )
}

fn clip(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use till_core::Product;

    fn product(id: &str, sku: &str, price_cents: i64, stock: i64) -> Product {
        Product {
            id: id.to_string(),
            sku: sku.to_string(),
            barcode: None,
            name: format!("{} name", sku),
            unit_label: "pcs".to_string(),
            price_cents,
            current_stock: stock,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn scenario_cart() -> Cart {
        let mut cart = Cart::new();
        let rice = product("p1", "RICE-1KG", 10_000, 10);
        cart.add(&rice).unwrap();
        let line_id = cart.add(&rice).unwrap().line_id.clone();
        cart.update_discount(&line_id, Money::from_cents(2_000)).unwrap();
        cart.set_order_tax(Money::from_cents(1_800)).unwrap();
        cart
    }

    #[test]
    fn test_render_empty_cart() {
        assert_eq!(render_cart(&Cart::new(), &TerminalConfig::default()), "Cart is empty");
    }

    #[test]
    fn test_render_cart_totals() {
        let text = render_cart(&scenario_cart(), &TerminalConfig::default());

        assert!(text.contains("RICE-1KG"));
        assert!(text.contains("$180.00"));
        assert!(text.contains("$18.00"));
        assert!(text.contains("$198.00"));
        assert!(!text.contains("Order discount"));
    }

    #[test]
    fn test_render_tax_rate_label() {
        let mut cart = Cart::new();
        cart.add(&product("p1", "A-1", 1_000, 5)).unwrap();
        cart.apply_tax_rate(TaxRate::from_bps(825)).unwrap();

        let text = render_cart(&cart, &TerminalConfig::default());
        assert!(text.contains("Tax (8.25%)"));
        assert!(text.contains("$0.83"));
    }

    #[test]
    fn test_cart_json_has_totals() {
        let json: serde_json::Value =
            serde_json::from_str(&cart_json(&scenario_cart()).unwrap()).unwrap();

        assert_eq!(json["totals"]["grandTotal"], 19_800);
        assert_eq!(json["totals"]["subtotal"], 18_000);
        assert_eq!(json["cart"]["lines"][0]["quantity"], 2);
    }
}
