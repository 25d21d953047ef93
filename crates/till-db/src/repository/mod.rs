//! # Repository Module
//!
//! Database repository implementations for Till POS.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  PosSession                                                            │
//! │       │                                                                 │
//! │       │  db.products().find_by_code("5449000000996")                   │
//! │       │  db.sales().record_checkout(&request)                          │
//! │       ▼                                                                 │
//! │  ProductRepository                SaleRepository                       │
//! │  ├── search(query, limit)         ├── record_checkout(request)         │
//! │  ├── get_by_id / sku / barcode    ├── get_by_id / invoice / key        │
//! │  ├── insert(product)              ├── get_items(sale_id)               │
//! │  └── adjust_stock(id, delta)      └── list_recent(limit)               │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`product::ProductRepository`] - Product catalog lookup and stock
//! - [`sale::SaleRepository`] - Checkout transaction and sale history

pub mod product;
pub mod sale;
