//! # Receipt Rendering
//!
//! Fixed-width plain-text receipts for thermal printers and the terminal.
//!
//! ## Layout (42 columns)
//! ```text
//!             Till POS Dev Store
//! Invoice: INV-20261019-0001
//! Date:    2026-10-19 14:03
//! ------------------------------------------
//! Rice 1kg
//!   2 x $100.00                      $200.00
//!   Discount                         -$20.00
//! ------------------------------------------
//! Subtotal                           $180.00
//! Tax                                 $18.00
//! ==========================================
//! TOTAL                              $198.00
//! Paid by cash
//! Tendered                           $200.00
//! Change                               $2.00
//! ------------------------------------------
//!                 Thank you!
//! ```

use chrono::Local;
use till_core::{Money, SaleReceipt};

use crate::state::TerminalConfig;

/// Renders a stored sale as a receipt.
///
/// Everything printed comes from the stored rows, so a reprint matches
/// the original. A replayed checkout is marked as a duplicate.
pub fn render_receipt(receipt: &SaleReceipt, config: &TerminalConfig) -> String {
    let width = config.receipt_width;
    let sale = &receipt.sale;
    let money = |cents: i64| config.format_currency(Money::from_cents(cents));
    let mut out: Vec<String> = Vec::new();

    out.push(center(&config.store_name, width));
    if receipt.replayed {
        out.push(center("*** DUPLICATE ***", width));
    }
    out.push(fit(&format!("Invoice: {}", sale.invoice_number), width));
    out.push(fit(
        &format!(
            "Date:    {}",
            sale.created_at.with_timezone(&Local).format("%Y-%m-%d %H:%M")
        ),
        width,
    ));
    out.push("-".repeat(width));

    for item in &receipt.items {
        out.push(fit(&item.name_snapshot, width));
        let gross = item.unit_price_cents * item.quantity;
        out.push(two_col(
            &format!("  {} x {}", item.quantity, money(item.unit_price_cents)),
            &money(gross),
            width,
        ));
        if item.discount_cents > 0 {
            out.push(two_col(
                "  Discount",
                &money(-item.discount_cents),
                width,
            ));
        }
    }
    out.push("-".repeat(width));

    // Stored discount is order discount + line discounts.
    let line_discounts: i64 = receipt.items.iter().map(|i| i.discount_cents).sum();
    let order_discount = sale.discount_cents - line_discounts;

    out.push(two_col("Subtotal", &money(sale.subtotal_cents), width));
    if order_discount > 0 {
        out.push(two_col("Order discount", &money(-order_discount), width));
    }
    if sale.tax_cents > 0 {
        out.push(two_col("Tax", &money(sale.tax_cents), width));
    }
    out.push("=".repeat(width));
    out.push(two_col("TOTAL", &money(sale.total_cents), width));
    out.push(fit(&format!("Paid by {}", sale.payment_method), width));
    if let Some(tendered) = sale.tendered_cents {
        out.push(two_col("Tendered", &money(tendered), width));
        out.push(two_col("Change", &money(sale.change_cents), width));
    }

    if let Some(name) = &sale.customer_name {
        out.push(fit(&format!("Customer: {}", name), width));
    }
    if let Some(phone) = &sale.customer_phone {
        out.push(fit(&format!("Phone:    {}", phone), width));
    }

    out.push("-".repeat(width));
    out.push(center("Thank you!", width));

    out.join("\n")
}

/// Left text, right-aligned amount. The left side is cut to fit.
fn two_col(left: &str, right: &str, width: usize) -> String {
    let right_len = right.chars().count();
    let room = width.saturating_sub(right_len + 1);
    let left = truncate(left, room);
    let pad = width.saturating_sub(left.chars().count() + right_len);
    format!("{}{}{}", left, " ".repeat(pad), right)
}

fn center(text: &str, width: usize) -> String {
    let text = truncate(text, width);
    let pad = (width - text.chars().count()) / 2;
    format!("{}{}", " ".repeat(pad), text)
}

fn fit(text: &str, width: usize) -> String {
    truncate(text, width).to_string()
}

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use till_core::{PaymentMethod, Sale, SaleItem};

    fn receipt(method: PaymentMethod, tendered: Option<i64>, replayed: bool) -> SaleReceipt {
        let now = Utc::now();
        SaleReceipt {
            sale: Sale {
                id: "s1".to_string(),
                invoice_number: "INV-20261019-0001".to_string(),
                checkout_key: "k1".to_string(),
                subtotal_cents: 18_000,
                discount_cents: 2_500,
                tax_cents: 1_800,
                total_cents: 19_300,
                payment_method: method,
                tendered_cents: tendered,
                change_cents: tendered.map(|t| t - 19_300).unwrap_or(0),
                customer_name: Some("Ayesha".to_string()),
                customer_phone: None,
                device_id: "till-01".to_string(),
                created_at: now,
            },
            items: vec![SaleItem {
                id: "i1".to_string(),
                sale_id: "s1".to_string(),
                product_id: "p1".to_string(),
                sku_snapshot: "RICE-1KG".to_string(),
                name_snapshot: "Basmati Rice Premium Long Grain 1kg Family Pack".to_string(),
                unit_price_cents: 10_000,
                quantity: 2,
                discount_cents: 2_000,
                line_total_cents: 18_000,
                created_at: now,
            }],
            replayed,
        }
    }

    #[test]
    fn test_cash_receipt_contents() {
        let text = render_receipt(
            &receipt(PaymentMethod::Cash, Some(20_000), false),
            &TerminalConfig::default(),
        );

        assert!(text.contains("Invoice: INV-20261019-0001"));
        assert!(text.contains("2 x $100.00"));
        assert!(text.contains("-$20.00"));
        assert!(text.contains("Order discount"));
        assert!(text.contains("-$5.00"));
        assert!(text.contains("$193.00"));
        assert!(text.contains("Paid by cash"));
        assert!(text.contains("$7.00"));
        assert!(text.contains("Customer: Ayesha"));
        assert!(!text.contains("DUPLICATE"));
    }

    #[test]
    fn test_card_receipt_has_no_change_line() {
        let text = render_receipt(
            &receipt(PaymentMethod::Card, None, false),
            &TerminalConfig::default(),
        );
        assert!(text.contains("Paid by card"));
        assert!(!text.contains("Change"));
        assert!(!text.contains("Tendered"));
    }

    #[test]
    fn test_replay_is_marked_duplicate() {
        let text = render_receipt(
            &receipt(PaymentMethod::Card, None, true),
            &TerminalConfig::default(),
        );
        assert!(text.contains("*** DUPLICATE ***"));
    }

    #[test]
    fn test_lines_never_exceed_width() {
        let config = TerminalConfig {
            receipt_width: 32,
            ..TerminalConfig::default()
        };
        let text = render_receipt(&receipt(PaymentMethod::Cash, Some(20_000), false), &config);
        for line in text.lines() {
            assert!(line.chars().count() <= 32, "too wide: {:?}", line);
        }
    }

    #[test]
    fn test_two_col_alignment() {
        assert_eq!(two_col("Tax", "$1.00", 12), "Tax    $1.00");
        assert_eq!(two_col("Subtotal long", "$1.00", 12), "Subtot $1.00");
    }
}
