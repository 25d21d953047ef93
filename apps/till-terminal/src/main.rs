//! # Till Terminal Entry Point
//!
//! ## Application Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Till POS Terminal                                │
//! │                                                                         │
//! │  stdin ──► commands/ ──► PosSession ──► till-core (cart, pricing,      │
//! │                              │                     settlement)          │
//! │                              ▼                                          │
//! │                          DbStore ──► till-db ──► till.db (SQLite, WAL)  │
//! │                                                                         │
//! │  stdout ◄── cart tables, receipts, "! error" notifications              │
//! │  stderr ◄── tracing logs                                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The setup lives in lib.rs so it can be tested.

use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    match till_terminal::run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Terminal stopped");
            eprintln!("till-terminal: {}", e);
            ExitCode::FAILURE
        }
    }
}
