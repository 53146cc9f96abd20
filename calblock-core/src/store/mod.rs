//! SQLite persistence: the blocker ledger, the calendar registry and stored
//! OAuth tokens, all in one database file.
//!
//! The pool is configured with:
//! - WAL journal mode
//! - a 5-second busy timeout
//! - a single connection for in-memory databases (SQLite in-memory databases
//!   are per-connection)
//!
//! Every access is one self-contained statement. Nothing here holds a
//! transaction open across a remote call.

mod ledger;
mod registry;
mod tokens;

use std::path::Path;
use std::time::Duration;

use sqlx::Row;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

use crate::error::{CalblockError, CalblockResult};

pub use ledger::{BlockerRecord, Ledger};
pub use registry::{CalendarSummary, Registry};
pub use tokens::TokenStore;

const SCHEMA_NAME: &str = "calblock";

/// Schema steps, applied in order. Each entry brings the database to the
/// version it is tagged with.
const MIGRATIONS: &[(i64, &[&str])] = &[
    (
        1,
        &[
            "CREATE TABLE IF NOT EXISTS tokens (
                account_name TEXT PRIMARY KEY,
                token TEXT
            )",
            "CREATE TABLE IF NOT EXISTS calendars (
                account_name TEXT,
                calendar_id TEXT,
                PRIMARY KEY (account_name, calendar_id)
            )",
            "CREATE TABLE IF NOT EXISTS blocker_events (
                event_id TEXT,
                calendar_id TEXT,
                account_name TEXT,
                origin_event_id TEXT,
                PRIMARY KEY (calendar_id, origin_event_id)
            )",
        ],
    ),
    (2, &["ALTER TABLE blocker_events ADD COLUMN last_updated TEXT"]),
    (3, &["ALTER TABLE blocker_events ADD COLUMN origin_calendar_id TEXT"]),
    (
        4,
        &[
            "ALTER TABLE calendars ADD COLUMN provider_type TEXT NOT NULL DEFAULT 'google'",
            "ALTER TABLE calendars ADD COLUMN provider_config TEXT",
            "ALTER TABLE blocker_events ADD COLUMN response_status TEXT",
        ],
    ),
];

/// Handle to the calblock database.
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Open (creating if needed) the database at `db_path` and bring its
    /// schema up to date.
    pub async fn open(db_path: &Path) -> CalblockResult<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| {
                CalblockError::Store(format!(
                    "Failed to open database at {}: {}",
                    db_path.display(),
                    e
                ))
            })?;

        let store = Store { pool };
        store.migrate().await?;

        tracing::debug!(path = %db_path.display(), "Database opened");

        Ok(store)
    }

    /// In-memory database for tests.
    pub async fn in_memory() -> CalblockResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;

        let store = Store { pool };
        store.migrate().await?;

        Ok(store)
    }

    pub fn ledger(&self) -> Ledger {
        Ledger::new(self.pool.clone())
    }

    pub fn registry(&self) -> Registry {
        Registry::new(self.pool.clone())
    }

    pub fn tokens(&self) -> TokenStore {
        TokenStore::new(self.pool.clone())
    }

    pub async fn schema_version(&self) -> CalblockResult<i64> {
        let row = sqlx::query("SELECT version FROM db_version WHERE name = ?")
            .bind(SCHEMA_NAME)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| r.get::<i64, _>("version")).unwrap_or(0))
    }

    async fn migrate(&self) -> CalblockResult<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS db_version (
                name TEXT PRIMARY KEY,
                version INTEGER
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("INSERT OR IGNORE INTO db_version (name, version) VALUES (?, 0)")
            .bind(SCHEMA_NAME)
            .execute(&self.pool)
            .await?;

        let current = self.schema_version().await?;

        for &(version, statements) in MIGRATIONS.iter().filter(|(v, _)| *v > current) {
            for statement in statements {
                sqlx::query(statement).execute(&self.pool).await.map_err(|e| {
                    CalblockError::Store(format!("Migration to v{} failed: {}", version, e))
                })?;
            }

            sqlx::query("UPDATE db_version SET version = ? WHERE name = ?")
                .bind(version)
                .bind(SCHEMA_NAME)
                .execute(&self.pool)
                .await?;

            tracing::debug!(version, "Applied schema migration");
        }

        Ok(())
    }
}
