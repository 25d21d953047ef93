//! # Product Repository
//!
//! Database operations for the product catalog.
//!
//! ## Key Operations
//! - Lookup by scanned code (barcode first, then SKU)
//! - Substring search over SKU and name
//! - Stock adjustments as deltas
//!
//! ## Code Lookup
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    What the scanner sends                               │
//! │                                                                         │
//! │  "5449000000996" ──► barcode = ?  ──► hit  ──► Coca-Cola 330ml         │
//! │                          │                                              │
//! │                          └── miss ──► sku = ? ──► hit / None           │
//! │                                                                         │
//! │  Typed "COKE-330" takes the same path and lands on the SKU match.      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use till_core::Product;

/// Column list shared by every product SELECT.
const PRODUCT_COLUMNS: &str = r#"
    id,
    sku,
    barcode,
    name,
    unit_label,
    price_cents,
    current_stock,
    is_active,
    created_at,
    updated_at
"#;

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = ProductRepository::new(pool);
///
/// let results = repo.search("coke", 20).await?;
/// let product = repo.find_by_code("COKE-330").await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Searches active products by SKU, name or exact barcode.
    ///
    /// ## Arguments
    /// * `query` - Search term (partial SKU or name)
    /// * `limit` - Maximum results to return
    ///
    /// An empty query lists active products by name.
    pub async fn search(&self, query: &str, limit: u32) -> DbResult<Vec<Product>> {
        let query = query.trim();

        debug!(query = %query, limit = %limit, "Searching products");

        if query.is_empty() {
            return self.list_active(limit).await;
        }

        let pattern = format!("%{}%", escape_like(query));

        let sql = format!(
            r#"
            SELECT {PRODUCT_COLUMNS}
            FROM products
            WHERE is_active = 1
              AND (sku LIKE ?1 ESCAPE '\' OR name LIKE ?1 ESCAPE '\' OR barcode = ?2)
            ORDER BY
                CASE WHEN sku = ?2 OR barcode = ?2 THEN 0 ELSE 1 END,
                name
            LIMIT ?3
            "#
        );

        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(&pattern)
            .bind(query)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        debug!(count = products.len(), "Search returned products");
        Ok(products)
    }

    /// Lists active products (no search filter), sorted by name.
    async fn list_active(&self, limit: u32) -> DbResult<Vec<Product>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE is_active = 1 ORDER BY name LIMIT ?1"
        );

        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(products)
    }

    /// Gets a product by its ID.
    ///
    /// ## Returns
    /// * `Ok(Some(Product))` - Product found
    /// * `Ok(None)` - Product not found
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        self.fetch_one_where("id", id).await
    }

    /// Gets a product by its SKU (e.g., "COKE-330").
    pub async fn get_by_sku(&self, sku: &str) -> DbResult<Option<Product>> {
        self.fetch_one_where("sku", sku).await
    }

    /// Gets a product by its barcode.
    pub async fn get_by_barcode(&self, barcode: &str) -> DbResult<Option<Product>> {
        self.fetch_one_where("barcode", barcode).await
    }

    /// Resolves a scanned or typed code: barcode first, then SKU.
    pub async fn find_by_code(&self, code: &str) -> DbResult<Option<Product>> {
        let code = code.trim();
        if code.is_empty() {
            return Ok(None);
        }

        if let Some(product) = self.get_by_barcode(code).await? {
            return Ok(Some(product));
        }
        self.get_by_sku(code).await
    }

    async fn fetch_one_where(&self, column: &'static str, value: &str) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE {column} = ?1");

        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Inserts a new product.
    ///
    /// ## Returns
    /// * `Ok(Product)` - Inserted product
    /// * `Err(DbError::UniqueViolation)` - SKU or barcode already exists
    pub async fn insert(&self, product: &Product) -> DbResult<Product> {
        debug!(sku = %product.sku, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, sku, barcode, name, unit_label,
                price_cents, current_stock, is_active,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&product.id)
        .bind(&product.sku)
        .bind(&product.barcode)
        .bind(&product.name)
        .bind(&product.unit_label)
        .bind(product.price_cents)
        .bind(product.current_stock)
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(product.clone())
    }

    /// Adjusts stock by a delta (positive for restocking, negative for
    /// write-offs).
    ///
    /// ## Delta, Not Absolute
    /// ```text
    /// ❌ UPDATE products SET current_stock = 7 WHERE id = ?
    /// ✅ UPDATE products SET current_stock = current_stock + ?delta
    ///       WHERE id = ? AND current_stock + ?delta >= 0
    /// ```
    /// A concurrent checkout between read and write cannot be overwritten,
    /// and stock never goes below zero.
    ///
    /// ## Returns
    /// The stock level after the adjustment.
    pub async fn adjust_stock(&self, id: &str, delta: i64) -> DbResult<i64> {
        debug!(id = %id, delta = %delta, "Adjusting stock");

        let updated: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE products
            SET current_stock = current_stock + ?2,
                updated_at = ?3
            WHERE id = ?1 AND current_stock + ?2 >= 0
            RETURNING current_stock
            "#,
        )
        .bind(id)
        .bind(delta)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        match updated {
            Some(stock) => Ok(stock),
            None => match self.get_by_id(id).await? {
                Some(product) => Err(DbError::InsufficientStock {
                    product_id: product.id,
                    sku: product.sku,
                    available: product.current_stock,
                    requested: -delta,
                }),
                None => Err(DbError::not_found("Product", id)),
            },
        }
    }

    /// Counts active products (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE is_active = 1")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

/// Escapes `%`, `_` and `\` so user input matches literally inside LIKE.
fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Helper to generate a new product ID.
pub fn generate_product_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    fn product(sku: &str, name: &str, barcode: Option<&str>, stock: i64) -> Product {
        let now = Utc::now();
        Product {
            id: generate_product_id(),
            sku: sku.to_string(),
            barcode: barcode.map(str::to_string),
            name: name.to_string(),
            unit_label: "pcs".to_string(),
            price_cents: 150,
            current_stock: stock,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let db = db().await;
        let p = product("COKE-330", "Coca-Cola 330ml", Some("5449000000996"), 12);
        db.products().insert(&p).await.unwrap();

        let by_id = db.products().get_by_id(&p.id).await.unwrap().unwrap();
        assert_eq!(by_id.sku, "COKE-330");
        assert_eq!(by_id.current_stock, 12);
        assert!(by_id.is_active);

        assert!(db.products().get_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_sku_is_unique_violation() {
        let db = db().await;
        db.products()
            .insert(&product("COKE-330", "Coke", None, 1))
            .await
            .unwrap();

        let err = db
            .products()
            .insert(&product("COKE-330", "Coke again", None, 1))
            .await
            .unwrap_err();
        assert!(err.is_unique_violation_on("sku"));
    }

    #[tokio::test]
    async fn test_find_by_code_prefers_barcode() {
        let db = db().await;
        let coke = product("COKE-330", "Coca-Cola 330ml", Some("5449000000996"), 5);
        let odd = product("5449000000996", "SKU that looks like a barcode", None, 5);
        db.products().insert(&coke).await.unwrap();
        db.products().insert(&odd).await.unwrap();

        let hit = db.products().find_by_code("5449000000996").await.unwrap().unwrap();
        assert_eq!(hit.id, coke.id);

        let hit = db.products().find_by_code(" COKE-330 ").await.unwrap().unwrap();
        assert_eq!(hit.id, coke.id);

        assert!(db.products().find_by_code("").await.unwrap().is_none());
        assert!(db.products().find_by_code("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_search() {
        let db = db().await;
        db.products()
            .insert(&product("COKE-330", "Coca-Cola 330ml", None, 5))
            .await
            .unwrap();
        db.products()
            .insert(&product("COKE-500", "Coca-Cola 500ml", None, 5))
            .await
            .unwrap();
        db.products()
            .insert(&product("PEPSI-330", "Pepsi 330ml", None, 5))
            .await
            .unwrap();

        assert_eq!(db.products().search("coca", 20).await.unwrap().len(), 2);
        assert_eq!(db.products().search("330", 20).await.unwrap().len(), 2);
        assert_eq!(db.products().search("", 20).await.unwrap().len(), 3);
        assert_eq!(db.products().search("", 1).await.unwrap().len(), 1);
        assert!(db.products().search("100%", 20).await.unwrap().is_empty());

        let exact = db.products().search("PEPSI-330", 20).await.unwrap();
        assert_eq!(exact[0].sku, "PEPSI-330");
    }

    #[tokio::test]
    async fn test_search_skips_inactive() {
        let db = db().await;
        let p = product("OLD-1", "Discontinued", None, 5);
        db.products().insert(&p).await.unwrap();
        sqlx::query("UPDATE products SET is_active = 0 WHERE id = ?1")
            .bind(&p.id)
            .execute(db.pool())
            .await
            .unwrap();

        assert!(db.products().search("Discontinued", 20).await.unwrap().is_empty());
        assert_eq!(db.products().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_adjust_stock() {
        let db = db().await;
        let p = product("RICE-1", "Rice 1kg", None, 3);
        db.products().insert(&p).await.unwrap();

        assert_eq!(db.products().adjust_stock(&p.id, 7).await.unwrap(), 10);
        assert_eq!(db.products().adjust_stock(&p.id, -10).await.unwrap(), 0);

        let err = db.products().adjust_stock(&p.id, -1).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::InsufficientStock {
                available: 0,
                requested: 1,
                ..
            }
        ));

        assert!(matches!(
            db.products().adjust_stock("missing", 1).await,
            Err(DbError::NotFound { .. })
        ));
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("coke"), "coke");
    }
}
