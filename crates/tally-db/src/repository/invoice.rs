//! # Invoice Repository
//!
//! Bills: creation with atomic stock deduction, and listing.
//!
//! ## Creation Transaction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  validate: ≥ 1 line, every quantity ≥ 1        (before any store I/O)  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  BEGIN                                                                  │
//! │  INSERT invoices (zero totals)   ◄── first statement is a write, so    │
//! │       │                              SQLite hands this transaction     │
//! │       │                              the write lock now and concurrent │
//! │       │                              creations queue behind it         │
//! │       ▼                                                                 │
//! │  for each line, in input order:                                         │
//! │    SELECT product            ── missing ──► ProductNotFound            │
//! │    snapshot price + tax rate                                            │
//! │    UPDATE stock - qty WHERE stock >= qty ── 0 rows ──► InsufficientStock│
//! │    INSERT invoice_items                                                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  UPDATE invoices SET subtotal, gst_amount, grand_total                  │
//! │  COMMIT                                                                 │
//! │                                                                         │
//! │  Any `?` before COMMIT drops the transaction: every decrement and      │
//! │  insert is rolled back.                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;

use chrono::Utc;
use serde::Serialize;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::DbResult;
use crate::repository::product::{deduct_stock, fetch_product, fetch_referenced_products};
use crate::repository::with_fresh_number;
use tally_core::validation::{validate_line_count, validate_quantity};
use tally_core::{
    CoreError, DocumentKind, DocumentTotals, Invoice, InvoiceItem, LineAmounts, Product,
};

const INVOICE_COLUMNS: &str = "id, invoice_no, customer_name, customer_phone, subtotal_cents, \
     gst_amount_cents, grand_total_cents, created_by, created_at";

const ITEM_COLUMNS: &str =
    "id, invoice_id, product_id, quantity, price_cents, total_cents, tax_cents";

// =============================================================================
// Inputs & Outputs
// =============================================================================

/// One requested line: which product and how many.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineRequest {
    pub product_id: String,
    pub quantity: i64,
}

/// A bill to create. Text fields are validated by the caller.
#[derive(Debug, Clone)]
pub struct NewInvoice {
    pub customer_name: String,
    pub customer_phone: String,
    pub created_by: Option<String>,
    pub items: Vec<LineRequest>,
}

/// A line with the product it references.
#[derive(Debug, Clone, Serialize)]
pub struct InvoiceLine {
    #[serde(flatten)]
    pub item: InvoiceItem,
    pub product: Option<Product>,
}

/// An invoice header with its lines.
#[derive(Debug, Clone, Serialize)]
pub struct InvoiceDetails {
    #[serde(flatten)]
    pub invoice: Invoice,
    pub items: Vec<InvoiceLine>,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for invoice database operations.
#[derive(Debug, Clone)]
pub struct InvoiceRepository {
    pool: SqlitePool,
}

impl InvoiceRepository {
    /// Creates a new InvoiceRepository.
    pub fn new(pool: SqlitePool) -> Self {
        InvoiceRepository { pool }
    }

    /// Creates a bill: validates, deducts stock, persists header and lines,
    /// all or nothing.
    ///
    /// ## Returns
    /// * `Err(Domain(EmptyDocument))` - no lines
    /// * `Err(Domain(Validation(..)))` - a quantity below 1 or above the cap
    /// * `Err(Domain(ProductNotFound))` - unknown product id
    /// * `Err(Domain(InsufficientStock))` - stock would go negative
    ///
    /// ## Example
    /// ```rust,ignore
    /// let details = db.invoices().create(&NewInvoice {
    ///     customer_name: "Asha".into(),
    ///     customer_phone: String::new(),
    ///     created_by: Some(user.id.clone()),
    ///     items: vec![LineRequest { product_id, quantity: 3 }],
    /// }).await?;
    /// assert_eq!(details.invoice.grand_total_cents, 35_400);
    /// ```
    pub async fn create(&self, new: &NewInvoice) -> DbResult<InvoiceDetails> {
        validate_line_count(new.items.len())?;
        for (index, line) in new.items.iter().enumerate() {
            validate_quantity(&format!("items[{index}].quantity"), line.quantity)?;
        }

        with_fresh_number(DocumentKind::Invoice, &["invoices.invoice_no"], |invoice_no| {
            self.insert_with_number(new, invoice_no)
        })
        .await
    }

    async fn insert_with_number(&self, new: &NewInvoice, invoice_no: String) -> DbResult<InvoiceDetails> {
        debug!(invoice_no = %invoice_no, lines = new.items.len(), "Creating invoice");

        let mut invoice = Invoice {
            id: Uuid::new_v4().to_string(),
            invoice_no,
            customer_name: new.customer_name.clone(),
            customer_phone: new.customer_phone.clone(),
            subtotal_cents: 0,
            gst_amount_cents: 0,
            grand_total_cents: 0,
            created_by: new.created_by.clone(),
            created_at: Utc::now(),
        };

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO invoices (
                id, invoice_no, customer_name, customer_phone,
                subtotal_cents, gst_amount_cents, grand_total_cents,
                created_by, created_at
            ) VALUES (?1, ?2, ?3, ?4, 0, 0, 0, ?5, ?6)
            "#,
        )
        .bind(&invoice.id)
        .bind(&invoice.invoice_no)
        .bind(&invoice.customer_name)
        .bind(&invoice.customer_phone)
        .bind(&invoice.created_by)
        .bind(invoice.created_at)
        .execute(&mut *tx)
        .await?;

        let mut totals = DocumentTotals::new();
        let mut lines = Vec::with_capacity(new.items.len());

        for (position, request) in new.items.iter().enumerate() {
            let mut product = fetch_product(&mut tx, &request.product_id)
                .await?
                .ok_or_else(|| CoreError::ProductNotFound(request.product_id.clone()))?;

            let amounts = LineAmounts::compute(product.selling_price(), request.quantity, product.tax_rate());

            deduct_stock(&mut tx, &product, request.quantity).await?;
            product.stock -= request.quantity;

            let item = InvoiceItem {
                id: Uuid::new_v4().to_string(),
                invoice_id: invoice.id.clone(),
                product_id: product.id.clone(),
                quantity: request.quantity,
                price_cents: amounts.unit_price.cents(),
                total_cents: amounts.total.cents(),
                tax_cents: amounts.tax.cents(),
            };

            sqlx::query(
                r#"
                INSERT INTO invoice_items (
                    id, invoice_id, product_id, quantity,
                    price_cents, total_cents, tax_cents, position
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
            )
            .bind(&item.id)
            .bind(&item.invoice_id)
            .bind(&item.product_id)
            .bind(item.quantity)
            .bind(item.price_cents)
            .bind(item.total_cents)
            .bind(item.tax_cents)
            .bind(position as i64)
            .execute(&mut *tx)
            .await?;

            totals.add_line(&amounts);
            lines.push(InvoiceLine {
                item,
                product: Some(product),
            });
        }

        invoice.subtotal_cents = totals.subtotal().cents();
        invoice.gst_amount_cents = totals.gst_amount().cents();
        invoice.grand_total_cents = totals.grand_total().cents();

        sqlx::query(
            r#"
            UPDATE invoices SET
                subtotal_cents = ?2,
                gst_amount_cents = ?3,
                grand_total_cents = ?4
            WHERE id = ?1
            "#,
        )
        .bind(&invoice.id)
        .bind(invoice.subtotal_cents)
        .bind(invoice.gst_amount_cents)
        .bind(invoice.grand_total_cents)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(
            invoice_no = %invoice.invoice_no,
            lines = lines.len(),
            grand_total = %totals.grand_total(),
            "Invoice created"
        );

        Ok(InvoiceDetails {
            invoice,
            items: lines,
        })
    }

    /// Lists all invoices, newest first, with their lines and the products
    /// those lines reference.
    pub async fn list(&self) -> DbResult<Vec<InvoiceDetails>> {
        let sql = format!("SELECT {INVOICE_COLUMNS} FROM invoices ORDER BY created_at DESC, id");
        let invoices = sqlx::query_as::<_, Invoice>(&sql)
            .fetch_all(&self.pool)
            .await?;

        let sql = format!("SELECT {ITEM_COLUMNS} FROM invoice_items ORDER BY invoice_id, position");
        let items = sqlx::query_as::<_, InvoiceItem>(&sql)
            .fetch_all(&self.pool)
            .await?;

        let products: HashMap<String, Product> = fetch_referenced_products(&self.pool, "invoice_items")
            .await?
            .into_iter()
            .map(|p| (p.id.clone(), p))
            .collect();

        let mut lines_by_invoice: HashMap<String, Vec<InvoiceLine>> = HashMap::new();
        for item in items {
            let product = products.get(&item.product_id).cloned();
            lines_by_invoice
                .entry(item.invoice_id.clone())
                .or_default()
                .push(InvoiceLine { item, product });
        }

        let details = invoices
            .into_iter()
            .map(|invoice| {
                let items = lines_by_invoice.remove(&invoice.id).unwrap_or_default();
                InvoiceDetails { invoice, items }
            })
            .collect::<Vec<_>>();

        debug!(count = details.len(), "Listed invoices");
        Ok(details)
    }

    /// Gets an invoice header by its business number.
    pub async fn get_by_number(&self, invoice_no: &str) -> DbResult<Option<Invoice>> {
        let mut conn = self.pool.acquire().await?;
        fetch_invoice_by_number(&mut conn, invoice_no).await
    }

    /// Gets the lines of one invoice in input order.
    pub async fn get_items(&self, invoice_id: &str) -> DbResult<Vec<InvoiceItem>> {
        let sql = format!("SELECT {ITEM_COLUMNS} FROM invoice_items WHERE invoice_id = ?1 ORDER BY position");
        let items = sqlx::query_as::<_, InvoiceItem>(&sql)
            .bind(invoice_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(items)
    }

    /// Counts all invoices.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM invoices")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

// =============================================================================
// Connection-level helpers
// =============================================================================

/// Loads one invoice header by business number on the given connection.
pub(crate) async fn fetch_invoice_by_number(
    conn: &mut SqliteConnection,
    invoice_no: &str,
) -> DbResult<Option<Invoice>> {
    let sql = format!("SELECT {INVOICE_COLUMNS} FROM invoices WHERE invoice_no = ?1");
    let invoice = sqlx::query_as::<_, Invoice>(&sql)
        .bind(invoice_no)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(invoice)
}

/// Loads every invoice some proforma is linked to.
pub(crate) async fn fetch_linked_invoices(pool: &SqlitePool) -> DbResult<Vec<Invoice>> {
    let sql = format!(
        "SELECT {INVOICE_COLUMNS} FROM invoices \
         WHERE id IN (SELECT related_invoice_id FROM proforma_invoices)"
    );
    let invoices = sqlx::query_as::<_, Invoice>(&sql).fetch_all(pool).await?;

    Ok(invoices)
}

