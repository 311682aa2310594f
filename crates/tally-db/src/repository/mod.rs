//! # Repository Module
//!
//! Database repository implementations for Tally Billing.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  HTTP handler                                                          │
//! │       │                                                                 │
//! │       │  state.db.invoices().create(&new_invoice)                      │
//! │       ▼                                                                 │
//! │  InvoiceRepository                                                     │
//! │  ├── create(&self, new)      one transaction: header, lines, stock     │
//! │  ├── list(&self)             newest first, lines + products            │
//! │  └── get_by_number(&self, no)                                          │
//! │       │                                                                 │
//! │       │  SQL                                                            │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`product::ProductRepository`] - Inventory ledger
//! - [`category::CategoryRepository`] - Category labels
//! - [`invoice::InvoiceRepository`] - Bills with atomic stock deduction
//! - [`proforma::ProformaRepository`] - Quotations, no stock effect
//! - [`service::ServiceRepository`] - Service jobs
//! - [`returns::ReturnRepository`] - Returns against invoices
//! - [`user::UserRepository`] - Login accounts
//! - [`report::ReportRepository`] - Sales aggregation

use std::future::Future;

use sqlx::{Sqlite, SqlitePool, Transaction};
use tally_core::numbering::{DocumentKind, MAX_NUMBER_ATTEMPTS};
use tracing::warn;

use crate::error::DbResult;

pub mod category;
pub mod invoice;
pub mod product;
pub mod proforma;
pub mod report;
pub mod returns;
pub mod service;
pub mod user;

/// Opens a transaction that holds SQLite's write lock from its first
/// statement.
///
/// Needed whenever a transaction reads before it writes. Under WAL a
/// deferred transaction cannot upgrade a stale read snapshot to a write once
/// another writer has committed, and SQLite fails that upgrade with
/// "database is locked" without consulting `busy_timeout`. `BEGIN IMMEDIATE`
/// waits on the busy handler instead.
pub(crate) async fn begin_write(pool: &SqlitePool) -> DbResult<Transaction<'static, Sqlite>> {
    Ok(pool.begin_with("BEGIN IMMEDIATE").await?)
}

/// Runs `insert` with freshly generated document numbers until it stops
/// colliding on one of `unique_columns` (`table.column` as SQLite reports
/// it), or [`MAX_NUMBER_ATTEMPTS`] is reached.
///
/// Every attempt is a whole transaction of its own, so a collision leaves
/// nothing behind.
pub(crate) async fn with_fresh_number<T, F, Fut>(
    kind: DocumentKind,
    unique_columns: &[&str],
    mut insert: F,
) -> DbResult<T>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = DbResult<T>>,
{
    let mut attempt = 1;
    loop {
        match insert(kind.generate()).await {
            Err(err)
                if attempt < MAX_NUMBER_ATTEMPTS
                    && unique_columns.iter().any(|c| err.is_unique_violation_on(c)) =>
            {
                warn!(attempt, kind = ?kind, "Document number collision, retrying");
                attempt += 1;
            }
            result => return result,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;

    #[tokio::test]
    async fn test_retries_on_number_collision() {
        let mut calls = 0;
        let result = with_fresh_number(DocumentKind::Invoice, &["invoices.invoice_no"], |no| {
            calls += 1;
            let collide = calls < 3;
            async move {
                if collide {
                    Err(DbError::duplicate("invoices.invoice_no", no))
                } else {
                    Ok(no)
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(calls, 3);
        assert!(result.starts_with("INV-"));
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let mut calls = 0;
        let result: DbResult<()> =
            with_fresh_number(DocumentKind::Proforma, &["proforma_invoices.proforma_no"], |no| {
                calls += 1;
                async move { Err(DbError::duplicate("proforma_invoices.proforma_no", no)) }
            })
            .await;

        assert!(matches!(result, Err(DbError::UniqueViolation { .. })));
        assert_eq!(calls, MAX_NUMBER_ATTEMPTS);
    }

    #[tokio::test]
    async fn test_other_errors_are_not_retried() {
        let mut calls = 0;
        let result: DbResult<()> = with_fresh_number(DocumentKind::Invoice, &["invoices.invoice_no"], |_| {
            calls += 1;
            async { Err(DbError::duplicate("users.username", "admin")) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls, 1);
    }
}
