//! # Schema Migrations
//!
//! The SQL under `migrations/sqlite/` is compiled into the binary, so a
//! till never needs the files at runtime.
//!
//! ```text
//! migrations/sqlite/
//! └── 001_initial_schema.sql   products, sales (checkout_key UNIQUE), sale_items
//! ```
//!
//! New schema goes in a new `NNN_description.sql`. An applied file is never
//! edited: sqlx refuses to start when a recorded checksum no longer matches.

use sqlx::SqlitePool;
use tracing::info;

use crate::error::DbResult;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Brings the schema up to date. Already-applied files are skipped.
pub(crate) async fn apply(pool: &SqlitePool) -> DbResult<()> {
    MIGRATOR.run(pool).await?;
    info!(migrations = MIGRATOR.migrations.len(), "Schema up to date");
    Ok(())
}

#[cfg(test)]
pub(crate) fn count() -> usize {
    MIGRATOR.migrations.len()
}
