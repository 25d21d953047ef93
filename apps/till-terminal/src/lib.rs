//! # Till Terminal Library
//!
//! The cashier terminal: a line-oriented command loop over one
//! `PosSession`.
//!
//! ## Module Organization
//! ```text
//! till_terminal/
//! ├── lib.rs          ◄─── You are here (startup & command loop)
//! ├── state/
//! │   ├── mod.rs      ◄─── State type exports
//! │   ├── config.rs   ◄─── TerminalConfig from TILL_* variables
//! │   ├── store.rs    ◄─── SaleStore trait + DbStore
//! │   └── session.rs  ◄─── PosSession: cart + checkout phase
//! ├── commands/
//! │   ├── mod.rs      ◄─── Command parsing & dispatch
//! │   ├── product.rs  ◄─── search, add
//! │   ├── cart.rs     ◄─── cart edits, show
//! │   └── sale.rs     ◄─── pay, cancel, confirm, sales
//! ├── receipt.rs      ◄─── Fixed-width receipt rendering
//! └── error.rs        ◄─── TerminalError shown to the cashier
//! ```

pub mod commands;
pub mod error;
pub mod receipt;
pub mod state;

use std::path::PathBuf;

use directories::ProjectDirs;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use commands::{execute, parse_command, Outcome};
use state::{ConfigError, DbStore, PosSession, SaleStore, TerminalConfig};
use till_db::{Database, DbConfig, DbError};

/// Why the terminal could not start or keep reading input.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("database error: {0}")]
    Database(#[from] DbError),

    #[error("could not determine app data directory")]
    NoDataDir,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Runs the terminal on stdin/stdout.
///
/// ## Startup Sequence
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │                       Terminal Startup                                  │
/// │                                                                         │
/// │  1. Initialize Logging ───────────────────────────────────────────────► │
/// │     • tracing-subscriber with env filter, written to stderr             │
/// │     • Default: info,till=debug,sqlx=warn; override with RUST_LOG        │
/// │                                                                         │
/// │  2. Load Configuration ───────────────────────────────────────────────► │
/// │     • TILL_* environment variables over defaults                        │
/// │                                                                         │
/// │  3. Determine Database Path ──────────────────────────────────────────► │
/// │     • TILL_DB_PATH, or the platform data directory                      │
/// │                                                                         │
/// │  4. Connect to Database ──────────────────────────────────────────────► │
/// │     • SQLite with WAL mode, pending migrations applied                  │
/// │                                                                         │
/// │  5. Read Commands Until quit / EOF ───────────────────────────────────► │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub async fn run() -> Result<(), StartupError> {
    init_tracing();

    info!("Starting Till POS terminal");

    let config = TerminalConfig::from_env()?;
    let db_path = database_path(&config)?;
    info!(?db_path, "Database path determined");

    let db = Database::new(DbConfig::new(db_path)).await?;
    info!("Database connected and migrations applied");

    let store = DbStore::new(db.clone(), config.invoice_prefix.clone());
    let mut session = PosSession::new(store, config.device_id.clone())
        .with_default_tax_rate(config.default_tax_rate);

    info!(
        store = %config.store_name,
        device_id = %config.device_id,
        "Session ready"
    );

    let stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = tokio::io::stdout();
    let result = run_loop(stdin, &mut stdout, &mut session, &config).await;

    db.close().await;
    result
}

/// Reads commands line by line until `quit` or end of input.
///
/// Command errors are written as `! message` and the loop continues.
pub async fn run_loop<R, W, S>(
    reader: R,
    writer: &mut W,
    session: &mut PosSession<S>,
    config: &TerminalConfig,
) -> Result<(), StartupError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
    S: SaleStore,
{
    writer
        .write_all(format!("{}\nType 'help' for commands.\n", config.store_name).as_bytes())
        .await?;

    let mut lines = reader.lines();
    loop {
        writer.write_all(b"till> ").await?;
        writer.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        let output = match parse_command(&line) {
            Ok(None) => continue,
            Ok(Some(command)) => match execute(command, session, config).await {
                Ok(Outcome::Continue(text)) => text,
                Ok(Outcome::Quit) => break,
                Err(e) => format!("! {}", e.message),
            },
            Err(e) => format!("! {}", e.message),
        };

        writer.write_all(output.as_bytes()).await?;
        writer.write_all(b"\n").await?;
    }

    if !session.cart().is_empty() {
        warn!(
            lines = session.cart().item_count(),
            "Exiting with an unsold cart"
        );
    }
    writer.write_all(b"\nBye\n").await?;
    writer.flush().await?;
    Ok(())
}

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=till=trace` - Show trace for till crates only
/// - Default: `info,till=debug,sqlx=warn`
///
/// Logs go to stderr so they never mix with receipts on stdout.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,till=debug,sqlx=warn"));

    // A second call (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Determines the database file path.
///
/// ## Platform-Specific Paths
/// - **macOS**: `~/Library/Application Support/com.till.pos/till.db`
/// - **Windows**: `%APPDATA%\till\pos\data\till.db`
/// - **Linux**: `~/.local/share/pos/till.db`
///
/// ## Override
/// `TILL_DB_PATH` (via [`TerminalConfig::db_path`]) wins.
pub fn database_path(config: &TerminalConfig) -> Result<PathBuf, StartupError> {
    if let Some(path) = &config.db_path {
        return Ok(path.clone());
    }

    let proj_dirs = ProjectDirs::from("com", "till", "pos").ok_or(StartupError::NoDataDir)?;
    let data_dir = proj_dirs.data_dir();

    std::fs::create_dir_all(data_dir)?;

    Ok(data_dir.join("till.db"))
}
