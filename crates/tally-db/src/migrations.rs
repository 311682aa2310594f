//! # Database Migrations
//!
//! Embedded SQL migrations for Tally Billing.
//!
//! ```text
//! migrations/sqlite/
//! └── 001_initial_schema.sql   users, categories, products, invoices,
//!                              invoice_items, services, proforma_invoices,
//!                              proforma_items, returns
//! ```
//!
//! Applied migrations are tracked in `_sqlx_migrations`; running twice is a
//! no-op. Never edit an applied migration, add the next numbered file.

use serde::Serialize;
use sqlx::SqlitePool;
use tracing::info;

use crate::error::DbResult;

/// Migrations embedded at compile time from `migrations/sqlite`.
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Applies all pending migrations in filename order.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    info!(embedded = MIGRATOR.migrations.len(), "Checking for pending migrations");

    MIGRATOR.run(pool).await?;

    info!("All migrations applied successfully");
    Ok(())
}

/// Embedded vs applied migration counts, for the health endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MigrationStatus {
    pub embedded: usize,
    pub applied: usize,
}

impl MigrationStatus {
    pub fn is_current(&self) -> bool {
        self.applied >= self.embedded
    }
}

/// Reads the migration status. A database that was never migrated reports
/// zero applied.
pub async fn migration_status(pool: &SqlitePool) -> DbResult<MigrationStatus> {
    let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = 1")
        .fetch_one(pool)
        .await
        .unwrap_or(0);

    Ok(MigrationStatus {
        embedded: MIGRATOR.migrations.len(),
        applied: applied as usize,
    })
}
