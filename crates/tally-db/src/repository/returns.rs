//! # Return Repository
//!
//! Returns are records against an existing invoice. They do not restock and
//! do not touch the invoice's totals.

use chrono::Utc;
use serde::Serialize;
use sqlx::{FromRow, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use tally_core::{CoreError, ReturnRecord, ReturnType};

/// A return to record. Validated by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReturn {
    pub invoice_no: String,
    pub product_name: String,
    pub quantity: i64,
    pub return_type: ReturnType,
    pub reason: String,
}

/// A return with the number of the invoice it was made against.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ReturnDetails {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub record: ReturnRecord,
    pub invoice_no: String,
}

/// Repository for return database operations.
#[derive(Debug, Clone)]
pub struct ReturnRepository {
    pool: SqlitePool,
}

impl ReturnRepository {
    /// Creates a new ReturnRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ReturnRepository { pool }
    }

    /// Records a return.
    ///
    /// ## Returns
    /// * `Err(Domain(InvoiceNotFound))` - no invoice with that number
    pub async fn create(&self, new: &NewReturn) -> DbResult<ReturnDetails> {
        debug!(invoice_no = %new.invoice_no, "Recording return");

        let invoice_id: Option<String> = sqlx::query_scalar("SELECT id FROM invoices WHERE invoice_no = ?1")
            .bind(&new.invoice_no)
            .fetch_optional(&self.pool)
            .await?;

        let invoice_id = invoice_id
            .ok_or_else(|| DbError::Domain(CoreError::InvoiceNotFound(new.invoice_no.clone())))?;

        let record = ReturnRecord {
            id: Uuid::new_v4().to_string(),
            invoice_id,
            product_name: new.product_name.clone(),
            quantity: new.quantity,
            return_type: new.return_type,
            reason: new.reason.clone(),
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO returns (
                id, invoice_id, product_name, quantity, return_type, reason, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&record.id)
        .bind(&record.invoice_id)
        .bind(&record.product_name)
        .bind(record.quantity)
        .bind(record.return_type)
        .bind(&record.reason)
        .bind(record.created_at)
        .execute(&self.pool)
        .await?;

        info!(
            invoice_no = %new.invoice_no,
            return_type = record.return_type.as_str(),
            quantity = record.quantity,
            "Return recorded"
        );

        Ok(ReturnDetails {
            record,
            invoice_no: new.invoice_no.clone(),
        })
    }

    /// Lists all returns, newest first.
    pub async fn list(&self) -> DbResult<Vec<ReturnDetails>> {
        let returns = sqlx::query_as::<_, ReturnDetails>(
            r#"
            SELECT
                r.id, r.invoice_id, r.product_name, r.quantity,
                r.return_type, r.reason, r.created_at,
                i.invoice_no
            FROM returns r
            INNER JOIN invoices i ON i.id = r.invoice_id
            ORDER BY r.created_at DESC, r.id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(returns)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::invoice::{LineRequest, NewInvoice};
    use crate::repository::product::NewProduct;
    use crate::{Database, DbConfig};

    #[tokio::test]
    async fn test_return_has_no_stock_or_total_effect() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product = db
            .products()
            .create(NewProduct {
                name: "Earbuds".to_string(),
                imei: None,
                selling_price_cents: 150_000,
                purchase_price_cents: 100_000,
                tax_rate_bps: 1800,
                category: None,
                stock: 5,
                agency_name: String::new(),
            })
            .await
            .unwrap();
        let invoice = db
            .invoices()
            .create(&NewInvoice {
                customer_name: "Meera".to_string(),
                customer_phone: String::new(),
                created_by: None,
                items: vec![LineRequest {
                    product_id: product.id.clone(),
                    quantity: 2,
                }],
            })
            .await
            .unwrap();

        let recorded = db
            .returns()
            .create(&NewReturn {
                invoice_no: invoice.invoice.invoice_no.clone(),
                product_name: "Earbuds".to_string(),
                quantity: 1,
                return_type: ReturnType::Replace,
                reason: "Left bud silent".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(recorded.record.return_type, ReturnType::Replace);

        let stock = db.products().get_by_id(&product.id).await.unwrap().unwrap().stock;
        assert_eq!(stock, 3);
        let header = db
            .invoices()
            .get_by_number(&invoice.invoice.invoice_no)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(header.grand_total_cents, invoice.invoice.grand_total_cents);

        let listed = db.returns().list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].invoice_no, invoice.invoice.invoice_no);
    }

    #[tokio::test]
    async fn test_return_against_unknown_invoice() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let err = db
            .returns()
            .create(&NewReturn {
                invoice_no: "INV-DEADBEEF".to_string(),
                product_name: "Anything".to_string(),
                quantity: 1,
                return_type: ReturnType::Refund,
                reason: String::new(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::InvoiceNotFound(_))));
    }
}
