//! # Product Commands
//!
//! Catalog search and adding products to the cart.
//!
//! ## Search Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Product Search Flow                                  │
//! │                                                                         │
//! │  Cashier types: search rice                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  validate_search_query() ── trims, rejects over-long input             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SaleStore::search_products("rice", 20)                                │
//! │       │   exact SKU / barcode matches first, then name matches         │
//! │       ▼                                                                 │
//! │  Table with SKU, name, price, stock and product ID                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  add RICE-1KG   (or the barcode, or the product ID)                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::time::Instant;

use till_core::validation::validate_search_query;
use tracing::{debug, info};

use crate::error::TerminalResult;
use crate::state::{PosSession, SaleStore, TerminalConfig};

/// Rows shown per search.
pub const SEARCH_LIMIT: u32 = 20;

/// Searches active products.
pub async fn search<S: SaleStore>(
    session: &PosSession<S>,
    config: &TerminalConfig,
    query: &str,
) -> TerminalResult<String> {
    let query = validate_search_query(query)?;
    let start = Instant::now();

    let products = session.store().search_products(&query, SEARCH_LIMIT).await?;

    info!(
        query = %query,
        results = products.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Product search"
    );

    if products.is_empty() {
        return Ok(format!("No products match '{}'", query));
    }

    let mut out = vec![format!(
        "{:<12}  {:<24}  {:>9}  {:>6}  {}",
        "SKU", "Name", "Price", "Stock", "ID"
    )];
    for product in &products {
        out.push(format!(
            "{:<12}  {:<24}  {:>9}  {:>6}  {}",
            product.sku,
            product.name.chars().take(24).collect::<String>(),
            config.format_currency(product.price()),
            product.current_stock,
            product.id
        ));
    }
    Ok(out.join("\n"))
}

/// Adds one unit by barcode, SKU or product ID.
pub async fn add<S: SaleStore>(
    session: &mut PosSession<S>,
    config: &TerminalConfig,
    code: &str,
) -> TerminalResult<String> {
    debug!(code = %code, "add command");

    let line = session.add_by_code(code).await?;
    let position = session
        .cart()
        .lines()
        .iter()
        .position(|l| l.line_id == line.line_id)
        .map(|i| i + 1)
        .unwrap_or_default();
    let totals = session.cart().totals();

    Ok(format!(
        "{:>2}  {} {} x{} @ {}  {}\n{} line(s), total {}",
        position,
        line.sku,
        line.name,
        line.quantity,
        config.format_currency(line.unit_price),
        config.format_currency(line.line_total()),
        totals.line_count,
        config.format_currency(totals.grand_total)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::state::DbStore;
    use chrono::Utc;
    use till_core::Product;
    use till_db::{Database, DbConfig};

    async fn session_with_products() -> PosSession<DbStore> {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        for (sku, barcode, name) in [
            ("RICE-1KG", "8961000000011", "Basmati Rice 1kg"),
            ("RICE-5KG", "8961000000028", "Basmati Rice 5kg"),
            ("TEA-250", "8961000000035", "Green Tea 250g"),
        ] {
            let now = Utc::now();
            db.products()
                .insert(&Product {
                    id: uuid::Uuid::new_v4().to_string(),
                    sku: sku.to_string(),
                    barcode: Some(barcode.to_string()),
                    name: name.to_string(),
                    unit_label: "pack".to_string(),
                    price_cents: 450,
                    current_stock: 5,
                    is_active: true,
                    created_at: now,
                    updated_at: now,
                })
                .await
                .unwrap();
        }
        PosSession::new(DbStore::new(db, "INV"), "till-01")
    }

    #[tokio::test]
    async fn test_search_lists_matches() {
        let session = session_with_products().await;
        let text = search(&session, &TerminalConfig::default(), "rice")
            .await
            .unwrap();

        assert!(text.contains("RICE-1KG"));
        assert!(text.contains("RICE-5KG"));
        assert!(!text.contains("TEA-250"));
        assert!(text.contains("$4.50"));
    }

    #[tokio::test]
    async fn test_search_no_results() {
        let session = session_with_products().await;
        let text = search(&session, &TerminalConfig::default(), "coffee")
            .await
            .unwrap();
        assert_eq!(text, "No products match 'coffee'");
    }

    #[tokio::test]
    async fn test_add_by_barcode_reports_line() {
        let mut session = session_with_products().await;
        let config = TerminalConfig::default();

        add(&mut session, &config, "8961000000035").await.unwrap();
        let text = add(&mut session, &config, "TEA-250").await.unwrap();

        assert!(text.starts_with(" 1  TEA-250 Green Tea 250g x2"));
        assert!(text.contains("total $9.00"));
    }

    #[tokio::test]
    async fn test_add_unknown_code() {
        let mut session = session_with_products().await;
        let err = add(&mut session, &TerminalConfig::default(), "NOPE-1")
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }
}
