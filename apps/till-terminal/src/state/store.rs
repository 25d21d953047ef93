//! # Store State
//!
//! The catalog and sale persistence a session talks to.
//!
//! ## Why a Trait?
//! `PosSession` owns the cart and never reaches for a global database.
//! Production hands it a `DbStore`; session tests hand it an in-memory fake
//! that can be told to fail, so the "persistence failed, cart kept" path is
//! testable without breaking SQLite.
//!
//! ```text
//! ┌──────────────────┐        ┌────────────────────────────────────────┐
//! │   PosSession     │ ─────► │  SaleStore                             │
//! │   (one cart)     │        │   ├── DbStore   → till-db repositories │
//! └──────────────────┘        │   └── fakes     → session tests        │
//!                             └────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use till_core::{CheckoutRequest, Product, Sale, SaleReceipt};
use till_db::{Database, DbResult};

/// Product lookup plus atomic sale recording.
#[async_trait]
pub trait SaleStore: Send + Sync {
    /// Loads a product by its id.
    async fn find_product(&self, id: &str) -> DbResult<Option<Product>>;

    /// Loads a product by barcode, falling back to SKU.
    async fn find_product_by_code(&self, code: &str) -> DbResult<Option<Product>>;

    /// Searches active products by name, SKU or barcode.
    async fn search_products(&self, query: &str, limit: u32) -> DbResult<Vec<Product>>;

    /// Writes the sale, its lines and the stock decrements as one unit.
    ///
    /// A request whose checkout key is already recorded returns the stored
    /// receipt with `replayed = true`.
    async fn record_sale(&self, request: &CheckoutRequest) -> DbResult<SaleReceipt>;

    /// Newest sales first.
    async fn recent_sales(&self, limit: u32) -> DbResult<Vec<Sale>>;
}

/// `SaleStore` backed by the SQLite database.
///
/// ## Thread Safety
/// `Database` wraps a `SqlitePool`, which is cheap to clone and safe to
/// share, so no extra locking is needed here.
#[derive(Debug, Clone)]
pub struct DbStore {
    db: Database,
    invoice_prefix: String,
}

impl DbStore {
    /// Creates a store whose sales get `invoice_prefix` invoice numbers.
    pub fn new(db: Database, invoice_prefix: impl Into<String>) -> Self {
        DbStore {
            db,
            invoice_prefix: invoice_prefix.into(),
        }
    }
}

#[async_trait]
impl SaleStore for DbStore {
    async fn find_product(&self, id: &str) -> DbResult<Option<Product>> {
        self.db.products().get_by_id(id).await
    }

    async fn find_product_by_code(&self, code: &str) -> DbResult<Option<Product>> {
        self.db.products().find_by_code(code).await
    }

    async fn search_products(&self, query: &str, limit: u32) -> DbResult<Vec<Product>> {
        self.db.products().search(query, limit).await
    }

    async fn record_sale(&self, request: &CheckoutRequest) -> DbResult<SaleReceipt> {
        self.db
            .sales()
            .with_invoice_prefix(self.invoice_prefix.clone())
            .record_checkout(request)
            .await
    }

    async fn recent_sales(&self, limit: u32) -> DbResult<Vec<Sale>> {
        self.db.sales().list_recent(limit).await
    }
}
