//! # Database Handle
//!
//! Opens the till's SQLite file and hands out repositories.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  till-terminal run()                                                    │
//! │       │  DbConfig::new(TILL_DB_PATH or data dir)                        │
//! │       ▼                                                                 │
//! │  Database::new ── WAL, foreign keys ── migrations::apply                │
//! │       │                                                                 │
//! │       ├── products() ──► catalog lookups for add / search               │
//! │       ├── sales()    ──► record_checkout (one transaction), history     │
//! │       └── close()    ──► on quit / EOF                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! One terminal drives one session, so the pool stays small. A checkout
//! holds a single connection from `BEGIN` to `COMMIT`; WAL lets a lookup on
//! another connection read the last committed state meanwhile.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::product::ProductRepository;
use crate::repository::sale::SaleRepository;

const FILE_POOL_SIZE: u32 = 4;
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);

/// Where the till keeps its data.
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub database_path: PathBuf,
}

impl DbConfig {
    /// A database file, created on first open.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
        }
    }

    /// A private in-memory database, fresh for every `Database::new`.
    ///
    /// Used by tests throughout the workspace.
    pub fn in_memory() -> Self {
        DbConfig::new(":memory:")
    }

    pub fn is_in_memory(&self) -> bool {
        self.database_path.as_os_str() == ":memory:"
    }

    // Each in-memory connection would be its own database.
    fn pool_size(&self) -> u32 {
        if self.is_in_memory() {
            1
        } else {
            FILE_POOL_SIZE
        }
    }
}

/// Open database with its schema up to date. Clones share the pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens (or creates) the database and applies pending migrations.
    ///
    /// Synchronous mode is NORMAL: under WAL a power cut can lose the last
    /// committed sale but never leaves a half-written one.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(path = %config.database_path.display(), "Opening database");

        let options = if config.is_in_memory() {
            SqliteConnectOptions::new().in_memory(true)
        } else {
            SqliteConnectOptions::new()
                .filename(&config.database_path)
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal)
                .synchronous(SqliteSynchronous::Normal)
        }
        .foreign_keys(true);

        let mut pool_options = SqlitePoolOptions::new()
            .max_connections(config.pool_size())
            .acquire_timeout(ACQUIRE_TIMEOUT);
        if config.is_in_memory() {
            // Dropping the only connection would drop the database.
            pool_options = pool_options.idle_timeout(None).max_lifetime(None);
        }

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        migrations::apply(&pool).await?;

        Ok(Database { pool })
    }

    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Catalog reads and stock adjustments.
    pub fn products(&self) -> ProductRepository {
        ProductRepository::new(self.pool.clone())
    }

    /// Checkout recording and sale history, default invoice prefix.
    pub fn sales(&self) -> SaleRepository {
        SaleRepository::new(self.pool.clone())
    }

    /// Waits for open connections to finish, then closes the pool.
    pub async fn close(&self) {
        info!("Closing database");
        self.pool.close().await;
    }
}
