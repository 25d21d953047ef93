//! # till-db: Database Layer for Till POS
//!
//! This crate provides database access for the Till POS terminal.
//! It uses SQLite for local storage with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Till POS Data Flow                               │
//! │                                                                         │
//! │  PosSession (add_by_code, confirm_payment)                             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     till-db (THIS CRATE)                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ ProductRepo   │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ SaleRepo      │    │ 001_init.sql │  │   │
//! │  │   │ Connection    │    │  └ checkout   │    │              │  │   │
//! │  │   │ Management    │    │    (one tx)   │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database                             │   │
//! │  │   ~/.local/share/till/till.db (TILL_DB_PATH overrides)         │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Opening the database, repository handles
//! - `migrations` - Embedded schema, applied on open
//! - [`error`] - Database error types
//! - [`repository`] - Product catalog and sale persistence
//!
//! ## Usage
//!
//! ```rust,ignore
//! use till_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("path/to/till.db")).await?;
//!
//! let products = db.products().search("coke", 20).await?;
//! let receipt = db.sales().record_checkout(&request).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::product::ProductRepository;
pub use repository::sale::SaleRepository;
