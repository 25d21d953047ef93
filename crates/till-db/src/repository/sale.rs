//! # Sale Repository
//!
//! Database operations for sales and sale items.
//!
//! ## Checkout Transaction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    record_checkout(request)                             │
//! │                                                                         │
//! │  checkout_key already stored? ──yes──► return stored sale (replayed)   │
//! │       │ no                                                              │
//! │       ▼                                                                 │
//! │  BEGIN                                                                  │
//! │   1. for each line:                                                    │
//! │        UPDATE products SET current_stock = current_stock - qty         │
//! │        WHERE id = ? AND current_stock >= qty                           │
//! │        0 rows ──► ROLLBACK, InsufficientStock                          │
//! │   2. next invoice number for today  (INV-20261019-0007)                │
//! │   3. INSERT sales                                                      │
//! │   4. INSERT sale_items (one per line, snapshot of name/price)          │
//! │  COMMIT                                                                 │
//! │                                                                         │
//! │  Any failure leaves no sale, no items, and no stock change.            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Local, Utc};
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use till_core::{CheckoutRequest, Sale, SaleItem, SaleReceipt, DEFAULT_INVOICE_PREFIX};

const SALE_COLUMNS: &str = r#"
    id,
    invoice_number,
    checkout_key,
    subtotal_cents,
    discount_cents,
    tax_cents,
    total_cents,
    payment_method,
    tendered_cents,
    change_cents,
    customer_name,
    customer_phone,
    device_id,
    created_at
"#;

const SALE_ITEM_COLUMNS: &str = r#"
    id,
    sale_id,
    product_id,
    sku_snapshot,
    name_snapshot,
    unit_price_cents,
    quantity,
    discount_cents,
    line_total_cents,
    created_at
"#;

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
    invoice_prefix: String,
}

impl SaleRepository {
    /// Creates a new SaleRepository with the default invoice prefix.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository {
            pool,
            invoice_prefix: DEFAULT_INVOICE_PREFIX.to_string(),
        }
    }

    /// Uses a store-specific invoice prefix (`SHOP1-20261019-0001`).
    pub fn with_invoice_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.invoice_prefix = prefix.into();
        self
    }

    // -------------------------------------------------------------------------
    // Checkout
    // -------------------------------------------------------------------------

    /// Persists a checkout atomically.
    ///
    /// ## Idempotency
    /// The request's `checkout_key` is stored with the sale. Submitting the
    /// same key again returns the stored sale with `replayed = true` and
    /// writes nothing, so a retry after a lost response never sells twice.
    ///
    /// ## Errors
    /// - `InsufficientStock` - a line needs more than is on hand now
    /// - `NotFound` - a product was deleted since it was added to the cart
    /// - Anything else from SQLite; in every case the transaction is rolled
    ///   back and the same request may be retried
    pub async fn record_checkout(&self, request: &CheckoutRequest) -> DbResult<SaleReceipt> {
        if let Some(receipt) = self.find_receipt_by_checkout_key(&request.checkout_key).await? {
            info!(
                checkout_key = %request.checkout_key,
                invoice_number = %receipt.sale.invoice_number,
                "Checkout already recorded, returning stored sale"
            );
            return Ok(receipt);
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        match self.write_checkout(&mut tx, request).await {
            Ok(receipt) => {
                tx.commit()
                    .await
                    .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

                info!(
                    sale_id = %receipt.sale.id,
                    invoice_number = %receipt.sale.invoice_number,
                    total_cents = receipt.sale.total_cents,
                    items = receipt.items.len(),
                    "Checkout recorded"
                );
                Ok(receipt)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(error = %rollback_err, "Rollback failed");
                }

                // A concurrent submission with the same key won the race.
                if err.is_unique_violation_on("checkout_key") {
                    if let Some(receipt) =
                        self.find_receipt_by_checkout_key(&request.checkout_key).await?
                    {
                        return Ok(receipt);
                    }
                }

                warn!(checkout_key = %request.checkout_key, error = %err, "Checkout rolled back");
                Err(err)
            }
        }
    }

    async fn write_checkout(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        request: &CheckoutRequest,
    ) -> DbResult<SaleReceipt> {
        let now = Utc::now();

        // Stock first: the first write takes the database write lock, so the
        // invoice count below cannot race another till.
        for line in &request.lines {
            decrement_stock(tx, &line.product_id, line.quantity, now).await?;
        }

        let invoice_number = self.next_invoice_number(tx, now).await?;
        let totals = &request.totals;
        let settlement = &request.settlement;

        let sale = Sale {
            id: Uuid::new_v4().to_string(),
            invoice_number,
            checkout_key: request.checkout_key.clone(),
            subtotal_cents: totals.subtotal.cents(),
            discount_cents: totals.total_discount.cents(),
            tax_cents: totals.tax.cents(),
            total_cents: totals.grand_total.cents(),
            payment_method: settlement.method,
            tendered_cents: settlement.tendered.map(|m| m.cents()),
            change_cents: settlement.change_due.cents(),
            customer_name: request.customer.name.clone(),
            customer_phone: request.customer.phone.clone(),
            device_id: request.device_id.clone(),
            created_at: now,
        };

        debug!(id = %sale.id, invoice_number = %sale.invoice_number, "Inserting sale");

        sqlx::query(
            r#"
            INSERT INTO sales (
                id, invoice_number, checkout_key,
                subtotal_cents, discount_cents, tax_cents, total_cents,
                payment_method, tendered_cents, change_cents,
                customer_name, customer_phone, device_id, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            "#,
        )
        .bind(&sale.id)
        .bind(&sale.invoice_number)
        .bind(&sale.checkout_key)
        .bind(sale.subtotal_cents)
        .bind(sale.discount_cents)
        .bind(sale.tax_cents)
        .bind(sale.total_cents)
        .bind(sale.payment_method)
        .bind(sale.tendered_cents)
        .bind(sale.change_cents)
        .bind(&sale.customer_name)
        .bind(&sale.customer_phone)
        .bind(&sale.device_id)
        .bind(sale.created_at)
        .execute(&mut **tx)
        .await?;

        let mut items = Vec::with_capacity(request.lines.len());
        for (line_no, line) in request.lines.iter().enumerate() {
            let item = SaleItem {
                id: generate_sale_item_id(),
                sale_id: sale.id.clone(),
                product_id: line.product_id.clone(),
                sku_snapshot: line.sku.clone(),
                name_snapshot: line.name.clone(),
                unit_price_cents: line.unit_price.cents(),
                quantity: line.quantity,
                discount_cents: line.discount.cents(),
                line_total_cents: line.line_total.cents(),
                created_at: now,
            };

            sqlx::query(
                r#"
                INSERT INTO sale_items (
                    id, sale_id, product_id, line_no,
                    sku_snapshot, name_snapshot, unit_price_cents,
                    quantity, discount_cents, line_total_cents, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                "#,
            )
            .bind(&item.id)
            .bind(&item.sale_id)
            .bind(&item.product_id)
            .bind(line_no as i64 + 1)
            .bind(&item.sku_snapshot)
            .bind(&item.name_snapshot)
            .bind(item.unit_price_cents)
            .bind(item.quantity)
            .bind(item.discount_cents)
            .bind(item.line_total_cents)
            .bind(item.created_at)
            .execute(&mut **tx)
            .await?;

            items.push(item);
        }

        Ok(SaleReceipt {
            sale,
            items,
            replayed: false,
        })
    }

    /// Builds `{PREFIX}-{YYYYMMDD}-{NNNN}` from today's count (local date).
    async fn next_invoice_number(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        now: DateTime<Utc>,
    ) -> DbResult<String> {
        let day_prefix = format!(
            "{}-{}-",
            self.invoice_prefix,
            now.with_timezone(&Local).format("%Y%m%d")
        );

        let issued: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM sales WHERE substr(invoice_number, 1, ?1) = ?2")
                .bind(day_prefix.chars().count() as i64)
                .bind(&day_prefix)
                .fetch_one(&mut **tx)
                .await?;

        Ok(format_invoice_number(&day_prefix, issued + 1))
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    /// Gets a sale by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Sale>> {
        self.fetch_sale_where("id", id).await
    }

    /// Gets a sale by the number printed on the receipt.
    pub async fn get_by_invoice_number(&self, invoice_number: &str) -> DbResult<Option<Sale>> {
        self.fetch_sale_where("invoice_number", invoice_number).await
    }

    /// Gets the sale recorded for a checkout attempt, if any.
    pub async fn get_by_checkout_key(&self, checkout_key: &str) -> DbResult<Option<Sale>> {
        self.fetch_sale_where("checkout_key", checkout_key).await
    }

    async fn fetch_sale_where(&self, column: &'static str, value: &str) -> DbResult<Option<Sale>> {
        let sql = format!("SELECT {SALE_COLUMNS} FROM sales WHERE {column} = ?1");

        let sale = sqlx::query_as::<_, Sale>(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;

        Ok(sale)
    }

    /// Gets all items for a sale, in cart order.
    pub async fn get_items(&self, sale_id: &str) -> DbResult<Vec<SaleItem>> {
        let sql = format!(
            "SELECT {SALE_ITEM_COLUMNS} FROM sale_items WHERE sale_id = ?1 ORDER BY line_no"
        );

        let items = sqlx::query_as::<_, SaleItem>(&sql)
            .bind(sale_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(items)
    }

    /// Loads a sale with its items.
    pub async fn get_receipt(&self, sale_id: &str) -> DbResult<SaleReceipt> {
        let sale = self
            .get_by_id(sale_id)
            .await?
            .ok_or_else(|| DbError::not_found("Sale", sale_id))?;
        let items = self.get_items(&sale.id).await?;

        Ok(SaleReceipt {
            sale,
            items,
            replayed: false,
        })
    }

    async fn find_receipt_by_checkout_key(&self, checkout_key: &str) -> DbResult<Option<SaleReceipt>> {
        let Some(sale) = self.get_by_checkout_key(checkout_key).await? else {
            return Ok(None);
        };
        let items = self.get_items(&sale.id).await?;

        Ok(Some(SaleReceipt {
            sale,
            items,
            replayed: true,
        }))
    }

    /// Most recent sales first.
    pub async fn list_recent(&self, limit: u32) -> DbResult<Vec<Sale>> {
        let sql = format!(
            "SELECT {SALE_COLUMNS} FROM sales ORDER BY created_at DESC, invoice_number DESC LIMIT ?1"
        );

        let sales = sqlx::query_as::<_, Sale>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(sales)
    }
}

/// Conditionally takes stock for one line.
///
/// The `current_stock >= qty` guard is what makes overselling impossible
/// even when two tills sell the last unit at the same moment.
async fn decrement_stock(
    tx: &mut Transaction<'_, Sqlite>,
    product_id: &str,
    quantity: i64,
    now: DateTime<Utc>,
) -> DbResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE products
        SET current_stock = current_stock - ?2,
            updated_at = ?3
        WHERE id = ?1 AND current_stock >= ?2
        "#,
    )
    .bind(product_id)
    .bind(quantity)
    .bind(now)
    .execute(&mut **tx)
    .await?;

    if result.rows_affected() == 1 {
        return Ok(());
    }

    let row: Option<(String, i64)> =
        sqlx::query_as("SELECT sku, current_stock FROM products WHERE id = ?1")
            .bind(product_id)
            .fetch_optional(&mut **tx)
            .await?;

    match row {
        Some((sku, available)) => Err(DbError::InsufficientStock {
            product_id: product_id.to_string(),
            sku,
            available,
            requested: quantity,
        }),
        None => Err(DbError::not_found("Product", product_id)),
    }
}

/// `INV-20261019-` + 7 → `INV-20261019-0007`.
fn format_invoice_number(day_prefix: &str, sequence: i64) -> String {
    format!("{}{:04}", day_prefix, sequence)
}

/// Generates a new sale item ID.
pub fn generate_sale_item_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================
