//! # Connection Pool
//!
//! Opens the SQLite file, applies the pragmas every repository relies on,
//! and hands out repositories that share one pool.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    SQLite under concurrent requests                     │
//! │                                                                         │
//! │   GET /api/products/ ─┐                                                 │
//! │   GET /api/bills/    ─┼─► readers: parallel snapshots (WAL)             │
//! │   GET /api/reports/  ─┘                                                 │
//! │                                                                         │
//! │   POST bill A ─┐         ┌──────────────────────┐                       │
//! │   POST bill B ─┼────────►│ single write lock    │ B waits up to         │
//! │   POST restock─┘         │ (first INSERT/UPDATE)│ busy_timeout, then    │
//! │                          └──────────────────────┘ runs after A commits  │
//! │                                                                         │
//! │   foreign_keys = ON      line items RESTRICT product deletes            │
//! │   synchronous  = NORMAL  durable at checkpoint, safe with WAL           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::migrations::{self, MigrationStatus};
use crate::repository::category::CategoryRepository;
use crate::repository::invoice::InvoiceRepository;
use crate::repository::product::ProductRepository;
use crate::repository::proforma::ProformaRepository;
use crate::repository::report::ReportRepository;
use crate::repository::returns::ReturnRepository;
use crate::repository::service::ServiceRepository;
use crate::repository::user::UserRepository;

/// Path value that selects a private in-memory database.
const IN_MEMORY_PATH: &str = ":memory:";

// =============================================================================
// Configuration
// =============================================================================

/// Where the database lives and how the pool behaves.
///
/// ```rust,ignore
/// let config = DbConfig::new("./tally.db").max_connections(8);
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// SQLite file, created on first open. `:memory:` for tests.
    pub database_path: PathBuf,

    /// Pool size. Default 5.
    pub max_connections: u32,

    /// How long a request waits for a free pooled connection.
    pub acquire_timeout: Duration,

    /// How long a writer waits for SQLite's write lock before failing
    /// with "database is locked".
    pub busy_timeout: Duration,

    /// Apply pending migrations when opening. Default true.
    pub migrate: bool,
}

impl DbConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            acquire_timeout: Duration::from_secs(30),
            busy_timeout: Duration::from_secs(5),
            migrate: true,
        }
    }

    /// Single-connection in-memory database with the full schema.
    ///
    /// Each connection to `:memory:` would see its own empty database, hence
    /// the pool size of one.
    pub fn in_memory() -> Self {
        DbConfig {
            max_connections: 1,
            acquire_timeout: Duration::from_secs(5),
            ..DbConfig::new(IN_MEMORY_PATH)
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    /// Skip migrations, e.g. to inspect an old file as-is.
    pub fn without_migrations(mut self) -> Self {
        self.migrate = false;
        self
    }

    fn is_in_memory(&self) -> bool {
        self.database_path.as_os_str() == IN_MEMORY_PATH
    }

    fn connect_options(&self) -> DbResult<SqliteConnectOptions> {
        let url = if self.is_in_memory() {
            "sqlite::memory:".to_string()
        } else {
            format!("sqlite://{}?mode=rwc", self.database_path.display())
        };

        let options = SqliteConnectOptions::from_str(&url)
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            // Off by default in SQLite
            .foreign_keys(true)
            .busy_timeout(self.busy_timeout)
            .create_if_missing(true);

        Ok(options)
    }
}

// =============================================================================
// Database
// =============================================================================

/// Shared handle to the pool. Clones share the same connections.
///
/// Repositories are created per call and borrow nothing:
///
/// ```rust,ignore
/// let bills = state.db.invoices().list().await?;
/// ```
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens the pool and, unless disabled, migrates the schema.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(
            path = %config.database_path.display(),
            max_connections = config.max_connections,
            "Opening database"
        );

        let options = config.connect_options()?;
        debug!(busy_timeout_ms = config.busy_timeout.as_millis() as u64, "SQLite options ready");

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(1)
            .acquire_timeout(config.acquire_timeout)
            .connect_with(options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        let db = Database { pool };

        if config.migrate {
            db.run_migrations().await?;
        }

        Ok(db)
    }

    /// Applies pending migrations. Safe to call repeatedly.
    pub async fn run_migrations(&self) -> DbResult<()> {
        migrations::run_migrations(&self.pool).await?;
        info!("Schema up to date");
        Ok(())
    }

    pub async fn migration_status(&self) -> DbResult<MigrationStatus> {
        migrations::migration_status(&self.pool).await
    }

    /// Raw pool, for tests and one-off maintenance queries.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn products(&self) -> ProductRepository {
        ProductRepository::new(self.pool.clone())
    }

    pub fn categories(&self) -> CategoryRepository {
        CategoryRepository::new(self.pool.clone())
    }

    /// Bills. Creation runs the stock-deducting transaction.
    pub fn invoices(&self) -> InvoiceRepository {
        InvoiceRepository::new(self.pool.clone())
    }

    pub fn proformas(&self) -> ProformaRepository {
        ProformaRepository::new(self.pool.clone())
    }

    pub fn services(&self) -> ServiceRepository {
        ServiceRepository::new(self.pool.clone())
    }

    pub fn returns(&self) -> ReturnRepository {
        ReturnRepository::new(self.pool.clone())
    }

    pub fn users(&self) -> UserRepository {
        UserRepository::new(self.pool.clone())
    }

    pub fn reports(&self) -> ReportRepository {
        ReportRepository::new(self.pool.clone())
    }

    /// Waits for checked-out connections to return, then closes them.
    pub async fn close(&self) {
        self.pool.close().await;
        info!("Database closed");
    }

    /// `true` when a trivial query succeeds.
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_database_is_migrated() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        assert!(db.health_check().await);
        let status = db.migration_status().await.unwrap();
        assert!(status.is_current());
        assert!(status.applied >= 1);
    }

    #[tokio::test]
    async fn test_foreign_keys_enabled() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let enabled: i64 = sqlx::query_scalar("PRAGMA foreign_keys")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(enabled, 1);
    }

    #[tokio::test]
    async fn test_without_migrations_leaves_file_empty() {
        let dir = tempfile::tempdir().unwrap();
        let config = DbConfig::new(dir.path().join("bare.db")).without_migrations();
        let db = Database::new(config).await.unwrap();

        let tables: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sqlite_master WHERE name = 'products'")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(tables, 0);
    }

    #[test]
    fn test_config_builder() {
        let config = DbConfig::new("/tmp/tally-test.db")
            .max_connections(10)
            .busy_timeout(Duration::from_secs(1));

        assert_eq!(config.max_connections, 10);
        assert_eq!(config.busy_timeout, Duration::from_secs(1));
        assert!(config.migrate);
        assert!(!config.is_in_memory());

        let memory = DbConfig::in_memory();
        assert!(memory.is_in_memory());
        assert_eq!(memory.max_connections, 1);
    }
}
