//! # Report Repository
//!
//! Read-side sales aggregation over invoices and services.
//!
//! ## Windows
//! ```text
//! total_sales      SUM(invoices.grand_total)   within [start, end] if given
//! service_income   SUM(services.price)         within [start, end] if given
//! daily_sales      SUM(invoices.grand_total)   today only, range ignored
//! monthly_sales    SUM(invoices.grand_total)   1st of month .. today, range ignored
//! total_revenue    total_sales + service_income
//! ```
//!
//! Dates are calendar days in UTC. An inclusive `[start, end]` is queried as
//! the half-open instant range `[start 00:00, end+1 00:00)`.

use chrono::{DateTime, Datelike, Days, NaiveDate, NaiveTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;

/// Inclusive calendar-day range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Aggregated sales figures, all in minor units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SalesReport {
    pub total_sales_cents: i64,
    pub service_income_cents: i64,
    pub daily_sales_cents: i64,
    pub monthly_sales_cents: i64,
    pub total_revenue_cents: i64,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

/// Repository for report queries.
#[derive(Debug, Clone)]
pub struct ReportRepository {
    pool: SqlitePool,
}

impl ReportRepository {
    /// Creates a new ReportRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ReportRepository { pool }
    }

    /// Builds the sales summary.
    ///
    /// `today` anchors the daily and month-to-date windows. Handlers pass
    /// `Utc::now().date_naive()`.
    pub async fn summary(&self, range: Option<DateRange>, today: NaiveDate) -> DbResult<SalesReport> {
        debug!(?range, %today, "Building sales report");

        let (from, until) = match range {
            Some(r) => (Some(day_start(r.start)), Some(day_after(r.end))),
            None => (None, None),
        };

        let total_sales_cents = self
            .sum_between("SELECT COALESCE(SUM(grand_total_cents), 0) FROM invoices", from, until)
            .await?;
        let service_income_cents = self
            .sum_between("SELECT COALESCE(SUM(service_price_cents), 0) FROM services", from, until)
            .await?;

        let daily_sales_cents = self
            .sum_between(
                "SELECT COALESCE(SUM(grand_total_cents), 0) FROM invoices",
                Some(day_start(today)),
                Some(day_after(today)),
            )
            .await?;

        let month_start = today.with_day(1).unwrap_or(today);
        let monthly_sales_cents = self
            .sum_between(
                "SELECT COALESCE(SUM(grand_total_cents), 0) FROM invoices",
                Some(day_start(month_start)),
                Some(day_after(today)),
            )
            .await?;

        Ok(SalesReport {
            total_sales_cents,
            service_income_cents,
            daily_sales_cents,
            monthly_sales_cents,
            total_revenue_cents: total_sales_cents + service_income_cents,
            start: range.map(|r| r.start),
            end: range.map(|r| r.end),
        })
    }

    /// Runs a `SUM` query, optionally bounded on `created_at`.
    async fn sum_between(
        &self,
        base: &str,
        from: Option<DateTime<Utc>>,
        until: Option<DateTime<Utc>>,
    ) -> DbResult<i64> {
        let total: i64 = match (from, until) {
            (Some(from), Some(until)) => {
                let sql = format!("{base} WHERE created_at >= ?1 AND created_at < ?2");
                sqlx::query_scalar(&sql)
                    .bind(from)
                    .bind(until)
                    .fetch_one(&self.pool)
                    .await?
            }
            _ => sqlx::query_scalar(base).fetch_one(&self.pool).await?,
        };
        Ok(total)
    }
}

fn day_start(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

fn day_after(date: NaiveDate) -> DateTime<Utc> {
    day_start(date.checked_add_days(Days::new(1)).unwrap_or(date))
}

// =============================================================================
// Unit Tests
// =============================================================================
