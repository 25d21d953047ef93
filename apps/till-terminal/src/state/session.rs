//! # Session State
//!
//! One cashier, one cart, one checkout at a time.
//!
//! ## Checkout Phases
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Session Lifecycle                                    │
//! │                                                                         │
//! │  ┌──────────┐   pay    ┌──────────────────┐  confirm ok  ┌──────────┐  │
//! │  │   Open   │────────►│  PaymentPending  │─────────────►│   Open   │  │
//! │  │ (editing)│◄────────│  { checkout_key } │              │ (cleared)│  │
//! │  └──────────┘  cancel  └──────────────────┘              └──────────┘  │
//! │       ▲        or any          │                                        │
//! │       │      cart edit         │ confirm failed                         │
//! │       │                        ▼                                        │
//! │       │               stays PaymentPending, same key,                   │
//! │       │               cart untouched → cashier retries                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Checkout Key
//! The key identifies one payment attempt. It survives failed attempts and
//! cancels so a retry after a lost response is replayed by the store rather
//! than sold twice. Any change to the cart drops it, because the next
//! payment is for a different sale.

use tracing::{debug, error, info, warn};
use uuid::Uuid;

use till_core::settlement::settle;
use till_core::{
    Cart, CartLine, CheckoutRequest, CoreError, Customer, Money, PaymentMethod, Product,
    SaleReceipt, TaxRate,
};

use super::store::SaleStore;
use crate::error::{TerminalError, TerminalResult};

/// Where the session is in the checkout flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutPhase {
    /// Cart is editable.
    Open,
    /// Payment dialog is open for this attempt.
    PaymentPending { checkout_key: String },
}

/// A cashier session.
///
/// Generic over the store so tests can inject failures.
pub struct PosSession<S: SaleStore> {
    store: S,
    cart: Cart,
    phase: CheckoutPhase,
    /// Kept across failed attempts until the cart changes.
    checkout_key: Option<String>,
    device_id: String,
    default_tax_rate: Option<TaxRate>,
}

impl<S: SaleStore> PosSession<S> {
    /// Creates a session with an empty cart.
    pub fn new(store: S, device_id: impl Into<String>) -> Self {
        PosSession {
            store,
            cart: Cart::new(),
            phase: CheckoutPhase::Open,
            checkout_key: None,
            device_id: device_id.into(),
            default_tax_rate: None,
        }
    }

    /// Applies `rate` as the order tax of every new cart.
    pub fn with_default_tax_rate(mut self, rate: Option<TaxRate>) -> Self {
        self.default_tax_rate = rate;
        self.reset_cart();
        self
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    pub fn phase(&self) -> &CheckoutPhase {
        &self.phase
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn is_payment_pending(&self) -> bool {
        matches!(self.phase, CheckoutPhase::PaymentPending { .. })
    }

    /// Resolves a 1-based cart position to its line ID.
    pub fn line_id_at(&self, position: usize) -> TerminalResult<String> {
        position
            .checked_sub(1)
            .and_then(|index| self.cart.lines().get(index))
            .map(|line| line.line_id.clone())
            .ok_or_else(|| {
                TerminalError::not_found("Cart line", &position.to_string())
            })
    }

    // =========================================================================
    // Cart Operations
    // =========================================================================

    /// Adds one unit of a product by its ID.
    pub async fn add_product(&mut self, product_id: &str) -> TerminalResult<CartLine> {
        let product = self
            .store
            .find_product(product_id)
            .await?
            .ok_or_else(|| CoreError::ProductNotFound(product_id.to_string()))?;
        self.add_loaded(&product)
    }

    /// Adds one unit of a product by barcode, SKU or ID.
    ///
    /// ## User Workflow
    /// ```text
    /// Scanner types 5449000000996 ──► barcode match ──► line added / +1
    /// Cashier types COKE-330      ──► SKU match     ──► line added / +1
    /// Search result id pasted     ──► ID match      ──► line added / +1
    /// ```
    pub async fn add_by_code(&mut self, code: &str) -> TerminalResult<CartLine> {
        let product = match self.store.find_product_by_code(code).await? {
            Some(product) => product,
            None => self
                .store
                .find_product(code.trim())
                .await?
                .ok_or_else(|| CoreError::ProductNotFound(code.trim().to_string()))?,
        };
        self.add_loaded(&product)
    }

    fn add_loaded(&mut self, product: &Product) -> TerminalResult<CartLine> {
        let line = self
            .cart
            .add(product)
            .map_err(|e| rejected("add", e))?
            .clone();
        debug!(sku = %line.sku, quantity = line.quantity, "Cart line added");
        self.invalidate_payment();
        Ok(line)
    }

    pub fn update_quantity(&mut self, line_id: &str, quantity: i64) -> TerminalResult<CartLine> {
        let line = self
            .cart
            .update_quantity(line_id, quantity)
            .map_err(|e| rejected("qty", e))?
            .clone();
        debug!(sku = %line.sku, quantity, "Cart line quantity set");
        self.invalidate_payment();
        Ok(line)
    }

    pub fn increment(&mut self, line_id: &str) -> TerminalResult<CartLine> {
        let line = self
            .cart
            .increment(line_id)
            .map_err(|e| rejected("inc", e))?
            .clone();
        self.invalidate_payment();
        Ok(line)
    }

    pub fn decrement(&mut self, line_id: &str) -> TerminalResult<CartLine> {
        let line = self
            .cart
            .decrement(line_id)
            .map_err(|e| rejected("dec", e))?
            .clone();
        self.invalidate_payment();
        Ok(line)
    }

    pub fn update_discount(&mut self, line_id: &str, discount: Money) -> TerminalResult<CartLine> {
        let line = self
            .cart
            .update_discount(line_id, discount)
            .map_err(|e| rejected("discount", e))?
            .clone();
        debug!(sku = %line.sku, discount = %discount, "Cart line discount set");
        self.invalidate_payment();
        Ok(line)
    }

    pub fn remove(&mut self, line_id: &str) -> TerminalResult<CartLine> {
        let line = self.cart.remove(line_id).map_err(|e| rejected("remove", e))?;
        debug!(sku = %line.sku, "Cart line removed");
        self.invalidate_payment();
        Ok(line)
    }

    pub fn set_order_discount(&mut self, discount: Money) -> TerminalResult<()> {
        self.cart
            .set_order_discount(discount)
            .map_err(|e| rejected("order-discount", e))?;
        self.invalidate_payment();
        Ok(())
    }

    pub fn set_order_tax(&mut self, tax: Money) -> TerminalResult<()> {
        self.cart
            .set_order_tax(tax)
            .map_err(|e| rejected("tax", e))?;
        self.invalidate_payment();
        Ok(())
    }

    /// Sets a percentage tax and returns the amount it comes to now.
    pub fn apply_tax_rate(&mut self, rate: TaxRate) -> TerminalResult<Money> {
        let tax = self
            .cart
            .apply_tax_rate(rate)
            .map_err(|e| rejected("tax-rate", e))?;
        self.invalidate_payment();
        Ok(tax)
    }

    /// Empties the cart. The default tax rate, if any, comes back.
    pub fn clear(&mut self) {
        self.reset_cart();
        self.invalidate_payment();
        debug!("Cart cleared");
    }

    // =========================================================================
    // Checkout
    // =========================================================================

    /// Opens the payment dialog.
    ///
    /// Returns the grand total to collect. A key left over from a failed
    /// attempt on the same cart is reused.
    pub fn open_payment(&mut self) -> TerminalResult<Money> {
        if self.cart.is_empty() {
            return Err(rejected("pay", CoreError::EmptyCart));
        }

        let checkout_key = self
            .checkout_key
            .get_or_insert_with(|| Uuid::new_v4().to_string())
            .clone();
        let total = self.cart.totals().grand_total;

        debug!(checkout_key = %checkout_key, total = %total, "Payment opened");
        self.phase = CheckoutPhase::PaymentPending { checkout_key };
        Ok(total)
    }

    /// Closes the payment dialog without touching the cart.
    pub fn cancel_payment(&mut self) -> TerminalResult<()> {
        if !self.is_payment_pending() {
            return Err(TerminalError::payment("No payment in progress"));
        }
        self.phase = CheckoutPhase::Open;
        debug!("Payment cancelled");
        Ok(())
    }

    /// Settles the payment and records the sale.
    ///
    /// ## Flow
    /// ```text
    /// settle(total, method, tendered) ──✗──► error, nothing submitted
    ///        │
    ///        ▼
    /// Customer::new(name, phone)      ──✗──► error, nothing submitted
    ///        │
    ///        ▼
    /// store.record_sale(request)      ──✗──► error, cart + key kept
    ///        │
    ///        ▼
    /// cart cleared, key dropped, receipt returned
    /// ```
    pub async fn confirm_payment(
        &mut self,
        method: PaymentMethod,
        tendered: Option<Money>,
        customer_name: Option<&str>,
        customer_phone: Option<&str>,
    ) -> TerminalResult<SaleReceipt> {
        let checkout_key = match &self.phase {
            CheckoutPhase::PaymentPending { checkout_key } => checkout_key.clone(),
            CheckoutPhase::Open => {
                return Err(TerminalError::payment(
                    "No payment in progress, use 'pay' first",
                ))
            }
        };

        let total = self.cart.totals().grand_total;
        let settlement = settle(total, method, tendered).map_err(|e| rejected("confirm", e))?;
        let customer =
            Customer::new(customer_name, customer_phone).map_err(|e| rejected("confirm", e))?;
        let request = CheckoutRequest::from_cart(
            checkout_key.clone(),
            &self.cart,
            settlement,
            customer,
            self.device_id.clone(),
        )
        .map_err(|e| rejected("confirm", e))?;

        let receipt = match self.store.record_sale(&request).await {
            Ok(receipt) => receipt,
            Err(e) => {
                error!(
                    checkout_key = %checkout_key,
                    error = %e,
                    "Sale not recorded, cart kept for retry"
                );
                return Err(e.into());
            }
        };

        info!(
            invoice = %receipt.sale.invoice_number,
            total = %receipt.sale.total(),
            method = %method,
            replayed = receipt.replayed,
            "Sale completed"
        );

        self.reset_cart();
        self.checkout_key = None;
        self.phase = CheckoutPhase::Open;
        Ok(receipt)
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn reset_cart(&mut self) {
        self.cart.clear();
        if let Some(rate) = self.default_tax_rate {
            // The configured rate was validated at startup.
            if let Err(e) = self.cart.apply_tax_rate(rate) {
                warn!(error = %e, "Default tax rate rejected");
            }
        }
    }

    /// Any cart change ends the current payment attempt.
    fn invalidate_payment(&mut self) {
        if self.is_payment_pending() {
            debug!("Cart changed, pending payment cancelled");
        }
        self.phase = CheckoutPhase::Open;
        self.checkout_key = None;
    }
}

fn rejected(operation: &str, err: CoreError) -> TerminalError {
    warn!(operation, error = %err, "Operation rejected");
    err.into()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::state::store::DbStore;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use till_core::Sale;
    use till_db::{Database, DbConfig, DbError, DbResult};

    /// DbStore that fails the next `failures` sale writes.
    struct FlakyStore {
        inner: DbStore,
        failures: AtomicUsize,
        attempts: AtomicUsize,
    }

    impl FlakyStore {
        fn new(inner: DbStore, failures: usize) -> Self {
            FlakyStore {
                inner,
                failures: AtomicUsize::new(failures),
                attempts: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl SaleStore for FlakyStore {
        async fn find_product(&self, id: &str) -> DbResult<Option<Product>> {
            self.inner.find_product(id).await
        }

        async fn find_product_by_code(&self, code: &str) -> DbResult<Option<Product>> {
            self.inner.find_product_by_code(code).await
        }

        async fn search_products(&self, query: &str, limit: u32) -> DbResult<Vec<Product>> {
            self.inner.search_products(query, limit).await
        }

        async fn record_sale(&self, request: &CheckoutRequest) -> DbResult<SaleReceipt> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            let remaining = self.failures.load(Ordering::SeqCst);
            if remaining > 0 {
                self.failures.store(remaining - 1, Ordering::SeqCst);
                return Err(DbError::TransactionFailed("database is locked".to_string()));
            }
            self.inner.record_sale(request).await
        }

        async fn recent_sales(&self, limit: u32) -> DbResult<Vec<Sale>> {
            self.inner.recent_sales(limit).await
        }
    }

    async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    async fn seed(db: &Database, sku: &str, barcode: Option<&str>, price_cents: i64, stock: i64) -> Product {
        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4().to_string(),
            sku: sku.to_string(),
            barcode: barcode.map(str::to_string),
            name: format!("{} name", sku),
            unit_label: "pcs".to_string(),
            price_cents,
            current_stock: stock,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        db.products().insert(&product).await.unwrap()
    }

    async fn stock_of(db: &Database, id: &str) -> i64 {
        db.products().get_by_id(id).await.unwrap().unwrap().current_stock
    }

    fn session(db: &Database) -> PosSession<DbStore> {
        PosSession::new(DbStore::new(db.clone(), "INV"), "till-01")
    }

    #[tokio::test]
    async fn test_add_by_barcode_sku_and_id() {
        let db = db().await;
        let coke = seed(&db, "COKE-330", Some("5449000000996"), 150, 10).await;
        let mut s = session(&db);

        s.add_by_code("5449000000996").await.unwrap();
        s.add_by_code("COKE-330").await.unwrap();
        let line = s.add_by_code(&coke.id).await.unwrap();

        assert_eq!(line.quantity, 3);
        assert_eq!(s.cart().item_count(), 1);
    }

    #[tokio::test]
    async fn test_add_unknown_product() {
        let db = db().await;
        let mut s = session(&db);

        let err = s.add_by_code("NOPE").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
        let err = s.add_product("missing-id").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
        assert!(s.cart().is_empty());
    }

    #[tokio::test]
    async fn test_add_beyond_stock_keeps_quantity() {
        let db = db().await;
        let p = seed(&db, "TEA-1", None, 100, 3).await;
        let mut s = session(&db);
        for _ in 0..3 {
            s.add_product(&p.id).await.unwrap();
        }

        let err = s.add_product(&p.id).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InsufficientStock);
        assert_eq!(s.cart().lines()[0].quantity, 3);
    }

    #[tokio::test]
    async fn test_line_positions_are_one_based() {
        let db = db().await;
        let a = seed(&db, "A-1", None, 100, 5).await;
        let b = seed(&db, "B-1", None, 100, 5).await;
        let mut s = session(&db);
        s.add_product(&a.id).await.unwrap();
        s.add_product(&b.id).await.unwrap();

        let second = s.line_id_at(2).unwrap();
        assert_eq!(s.cart().line(&second).unwrap().product_id, b.id);
        assert_eq!(s.line_id_at(0).unwrap_err().code, ErrorCode::NotFound);
        assert_eq!(s.line_id_at(3).unwrap_err().code, ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_pay_on_empty_cart_rejected() {
        let db = db().await;
        let mut s = session(&db);

        let err = s.open_payment().unwrap_err();
        assert_eq!(err.code, ErrorCode::CartError);
        assert_eq!(s.phase(), &CheckoutPhase::Open);
    }

    #[tokio::test]
    async fn test_confirm_without_pay_rejected() {
        let db = db().await;
        let p = seed(&db, "A-1", None, 100, 5).await;
        let mut s = session(&db);
        s.add_product(&p.id).await.unwrap();

        let err = s
            .confirm_payment(PaymentMethod::Card, None, None, None)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::PaymentError);
    }

    #[tokio::test]
    async fn test_cash_checkout_clears_cart_and_decrements_stock() {
        let db = db().await;
        let p = seed(&db, "RICE-1KG", None, 10_000, 10).await;
        let mut s = session(&db);
        s.add_product(&p.id).await.unwrap();
        s.add_product(&p.id).await.unwrap();
        let line = s.line_id_at(1).unwrap();
        s.update_discount(&line, Money::from_cents(2_000)).unwrap();
        s.set_order_tax(Money::from_cents(1_800)).unwrap();

        assert_eq!(s.open_payment().unwrap(), Money::from_cents(19_800));
        let receipt = s
            .confirm_payment(
                PaymentMethod::Cash,
                Some(Money::from_cents(20_000)),
                Some("Ayesha"),
                None,
            )
            .await
            .unwrap();

        assert_eq!(receipt.sale.total_cents, 19_800);
        assert_eq!(receipt.sale.change_cents, 200);
        assert_eq!(receipt.sale.customer_name.as_deref(), Some("Ayesha"));
        assert!(!receipt.replayed);
        assert!(s.cart().is_empty());
        assert_eq!(s.phase(), &CheckoutPhase::Open);
        assert_eq!(stock_of(&db, &p.id).await, 8);
    }

    #[tokio::test]
    async fn test_insufficient_tender_keeps_payment_open() {
        let db = db().await;
        let p = seed(&db, "RICE-1KG", None, 19_800, 10).await;
        let mut s = session(&db);
        s.add_product(&p.id).await.unwrap();
        s.open_payment().unwrap();

        let err = s
            .confirm_payment(PaymentMethod::Cash, Some(Money::from_cents(15_000)), None, None)
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::PaymentError);
        assert!(s.is_payment_pending());
        assert_eq!(s.cart().item_count(), 1);
        assert_eq!(stock_of(&db, &p.id).await, 10);
    }

    #[tokio::test]
    async fn test_invalid_customer_phone_submits_nothing() {
        let db = db().await;
        let p = seed(&db, "A-1", None, 100, 5).await;
        let mut s = session(&db);
        s.add_product(&p.id).await.unwrap();
        s.open_payment().unwrap();

        let err = s
            .confirm_payment(PaymentMethod::Card, None, None, Some("call me"))
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::ValidationError);
        assert_eq!(stock_of(&db, &p.id).await, 5);
    }

    #[tokio::test]
    async fn test_failed_persistence_keeps_cart_and_key_for_retry() {
        let db = db().await;
        let p = seed(&db, "SOAP-1", None, 120, 3).await;
        let store = FlakyStore::new(DbStore::new(db.clone(), "INV"), 1);
        let mut s = PosSession::new(store, "till-01");
        s.add_product(&p.id).await.unwrap();
        s.open_payment().unwrap();
        let key = match s.phase() {
            CheckoutPhase::PaymentPending { checkout_key } => checkout_key.clone(),
            CheckoutPhase::Open => panic!("payment should be pending"),
        };

        let err = s
            .confirm_payment(PaymentMethod::Card, None, None, None)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::DatabaseError);
        assert!(err.message.ends_with("try again"));
        assert_eq!(s.cart().item_count(), 1);
        assert_eq!(
            s.phase(),
            &CheckoutPhase::PaymentPending {
                checkout_key: key.clone()
            }
        );
        assert_eq!(stock_of(&db, &p.id).await, 3);

        let receipt = s
            .confirm_payment(PaymentMethod::Card, None, None, None)
            .await
            .unwrap();
        assert_eq!(receipt.sale.checkout_key, key);
        assert_eq!(s.store().attempts.load(Ordering::SeqCst), 2);
        assert_eq!(stock_of(&db, &p.id).await, 2);
    }

    #[tokio::test]
    async fn test_cancel_then_pay_reuses_key() {
        let db = db().await;
        let p = seed(&db, "A-1", None, 100, 5).await;
        let mut s = session(&db);
        s.add_product(&p.id).await.unwrap();

        s.open_payment().unwrap();
        let first = s.phase().clone();
        s.cancel_payment().unwrap();
        assert_eq!(s.phase(), &CheckoutPhase::Open);
        assert_eq!(s.cart().item_count(), 1);

        s.open_payment().unwrap();
        assert_eq!(s.phase(), &first);
    }

    #[tokio::test]
    async fn test_cart_edit_cancels_pending_payment_and_drops_key() {
        let db = db().await;
        let p = seed(&db, "A-1", None, 100, 5).await;
        let mut s = session(&db);
        s.add_product(&p.id).await.unwrap();
        s.open_payment().unwrap();
        let first = s.phase().clone();

        let line = s.line_id_at(1).unwrap();
        s.increment(&line).unwrap();
        assert_eq!(s.phase(), &CheckoutPhase::Open);

        assert_eq!(s.open_payment().unwrap(), Money::from_cents(200));
        assert_ne!(s.phase(), &first);
    }

    #[tokio::test]
    async fn test_rejected_edit_leaves_payment_pending() {
        let db = db().await;
        let p = seed(&db, "A-1", None, 100, 1).await;
        let mut s = session(&db);
        s.add_product(&p.id).await.unwrap();
        s.open_payment().unwrap();

        let line = s.line_id_at(1).unwrap();
        assert!(s.increment(&line).is_err());
        assert!(s.is_payment_pending());
    }

    #[tokio::test]
    async fn test_default_tax_rate_survives_checkout_and_clear() {
        let db = db().await;
        let p = seed(&db, "A-1", None, 1_000, 5).await;
        let mut s = session(&db).with_default_tax_rate(Some(TaxRate::from_bps(1_000)));

        s.add_product(&p.id).await.unwrap();
        assert_eq!(s.cart().totals().tax, Money::from_cents(100));
        assert_eq!(s.open_payment().unwrap(), Money::from_cents(1_100));
        s.confirm_payment(PaymentMethod::Card, None, None, None)
            .await
            .unwrap();

        s.add_product(&p.id).await.unwrap();
        assert_eq!(s.cart().totals().tax, Money::from_cents(100));
        s.clear();
        s.add_product(&p.id).await.unwrap();
        assert_eq!(s.cart().totals().grand_total, Money::from_cents(1_100));
    }

    #[tokio::test]
    async fn test_stock_taken_elsewhere_fails_checkout_cart_intact() {
        let db = db().await;
        let p = seed(&db, "GUM-1", None, 50, 2).await;
        let mut s = session(&db);
        s.add_product(&p.id).await.unwrap();
        s.add_product(&p.id).await.unwrap();
        db.products().adjust_stock(&p.id, -1).await.unwrap();

        s.open_payment().unwrap();
        let err = s
            .confirm_payment(PaymentMethod::Card, None, None, None)
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::InsufficientStock);
        assert_eq!(s.cart().lines()[0].quantity, 2);
        assert!(s.is_payment_pending());
        assert!(s.store().recent_sales(10).await.unwrap().is_empty());
    }
}
