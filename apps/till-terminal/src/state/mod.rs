//! # State Module
//!
//! Everything the command loop holds between two lines of input.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    State Architecture                                   │
//! │                                                                         │
//! │  ┌──────────────────────────────┐        ┌──────────────────────────┐  │
//! │  │  PosSession<S: SaleStore>    │        │   TerminalConfig         │  │
//! │  │                              │        │                          │  │
//! │  │  Cart (owned, one per till)  │        │  store_name, device_id   │  │
//! │  │  CheckoutPhase + key         │        │  invoice_prefix          │  │
//! │  │  store: S ───────────────────┼──┐     │  default_tax_rate        │  │
//! │  └──────────────────────────────┘  │     └──────────────────────────┘  │
//! │                                    ▼                                    │
//! │                     ┌──────────────────────────────┐                    │
//! │                     │  DbStore                     │                    │
//! │                     │  Database (SQLite pool)      │                    │
//! │                     └──────────────────────────────┘                    │
//! │                                                                         │
//! │  The loop is single-threaded: the session is borrowed mutably by one   │
//! │  command at a time, so the cart needs no lock.                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod session;
mod store;

pub use config::{ConfigError, TerminalConfig};
pub use session::{CheckoutPhase, PosSession};
pub use store::{DbStore, SaleStore};
