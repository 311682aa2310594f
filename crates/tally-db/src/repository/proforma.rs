//! # Proforma Repository
//!
//! Quotation documents. Totals are computed exactly like a bill (price and
//! tax snapshot per line, rounded per line) but stock is never touched.
//!
//! ```text
//! ProformaInvoice ──1..n──► ProformaItem ──► Product (RESTRICT)
//!        │
//!        └── related_invoice_id ──► Invoice   (optional, set at creation
//!                                              or later via `link`)
//! ```

use std::collections::HashMap;

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::DbResult;
use crate::repository::invoice::{fetch_invoice_by_number, fetch_linked_invoices};
use crate::repository::product::{fetch_product, fetch_referenced_products};
use crate::repository::{begin_write, with_fresh_number};
use tally_core::validation::{validate_line_count, validate_quantity};
use tally_core::{
    CoreError, DocumentKind, DocumentTotals, Invoice, LineAmounts, Product, ProformaInvoice,
    ProformaItem,
};

const PROFORMA_COLUMNS: &str = "p.id, p.proforma_no, p.customer_name, p.customer_phone, \
     p.billing_address, p.delivery_address, p.issue_date, p.valid_until, p.currency, \
     p.discount_amount_cents, p.shipping_charge_cents, p.insurance_charge_cents, \
     p.subtotal_cents, p.gst_amount_cents, p.grand_total_cents, p.incoterms, \
     p.country_of_origin, p.port_of_loading, p.payment_terms, p.bank_name, \
     p.account_number, p.ifsc_swift, p.related_invoice_id, p.created_by, p.created_at";

const ITEM_COLUMNS: &str =
    "id, proforma_id, product_id, hsn_sac, quantity, price_cents, total_cents, tax_cents";

// =============================================================================
// Inputs & Outputs
// =============================================================================

/// One requested quotation line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProformaLineRequest {
    pub product_id: String,
    pub quantity: i64,
    pub hsn_sac: String,
}

/// A proforma to create. Text fields are validated by the caller.
#[derive(Debug, Clone)]
pub struct NewProforma {
    pub customer_name: String,
    pub customer_phone: String,
    pub billing_address: String,
    pub delivery_address: String,
    pub issue_date: NaiveDate,
    pub valid_until: Option<NaiveDate>,
    pub currency: String,
    pub discount_amount_cents: i64,
    pub shipping_charge_cents: i64,
    pub insurance_charge_cents: i64,
    pub incoterms: String,
    pub country_of_origin: String,
    pub port_of_loading: String,
    pub payment_terms: String,
    pub bank_name: String,
    pub account_number: String,
    pub ifsc_swift: String,
    /// Business number of an existing invoice to link at creation.
    pub related_invoice_no: Option<String>,
    pub created_by: Option<String>,
    pub items: Vec<ProformaLineRequest>,
}

/// A quotation line with the product it references.
#[derive(Debug, Clone, Serialize)]
pub struct ProformaLine {
    #[serde(flatten)]
    pub item: ProformaItem,
    pub product: Option<Product>,
}

/// A proforma header, the linked invoice header, and its lines.
#[derive(Debug, Clone, Serialize)]
pub struct ProformaDetails {
    #[serde(flatten)]
    pub proforma: ProformaInvoice,
    pub related_invoice: Option<Invoice>,
    pub items: Vec<ProformaLine>,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for proforma database operations.
#[derive(Debug, Clone)]
pub struct ProformaRepository {
    pool: SqlitePool,
}

impl ProformaRepository {
    /// Creates a new ProformaRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProformaRepository { pool }
    }

    /// Creates a proforma with all its lines in one transaction.
    ///
    /// Discount, shipping and insurance are stored as given and are not
    /// part of `grand_total_cents`.
    ///
    /// ## Returns
    /// * `Err(Domain(EmptyDocument))` - no lines
    /// * `Err(Domain(ProductNotFound))` - unknown product id
    /// * `Err(Domain(InvoiceNotFound))` - `related_invoice_no` doesn't exist
    pub async fn create(&self, new: &NewProforma) -> DbResult<ProformaDetails> {
        validate_line_count(new.items.len())?;
        for (index, line) in new.items.iter().enumerate() {
            validate_quantity(&format!("items[{index}].quantity"), line.quantity)?;
        }

        with_fresh_number(DocumentKind::Proforma, &["proforma_invoices.proforma_no"], |proforma_no| {
            self.insert_with_number(new, proforma_no)
        })
        .await
    }

    async fn insert_with_number(&self, new: &NewProforma, proforma_no: String) -> DbResult<ProformaDetails> {
        debug!(proforma_no = %proforma_no, lines = new.items.len(), "Creating proforma");

        let mut proforma = ProformaInvoice {
            id: Uuid::new_v4().to_string(),
            proforma_no,
            customer_name: new.customer_name.clone(),
            customer_phone: new.customer_phone.clone(),
            billing_address: new.billing_address.clone(),
            delivery_address: new.delivery_address.clone(),
            issue_date: new.issue_date,
            valid_until: new.valid_until,
            currency: new.currency.clone(),
            discount_amount_cents: new.discount_amount_cents,
            shipping_charge_cents: new.shipping_charge_cents,
            insurance_charge_cents: new.insurance_charge_cents,
            subtotal_cents: 0,
            gst_amount_cents: 0,
            grand_total_cents: 0,
            incoterms: new.incoterms.clone(),
            country_of_origin: new.country_of_origin.clone(),
            port_of_loading: new.port_of_loading.clone(),
            payment_terms: new.payment_terms.clone(),
            bank_name: new.bank_name.clone(),
            account_number: new.account_number.clone(),
            ifsc_swift: new.ifsc_swift.clone(),
            related_invoice_id: None,
            created_by: new.created_by.clone(),
            created_at: Utc::now(),
        };

        let mut tx = begin_write(&self.pool).await?;

        let related_invoice = match &new.related_invoice_no {
            Some(invoice_no) => Some(resolve_invoice(&mut tx, invoice_no).await?),
            None => None,
        };
        proforma.related_invoice_id = related_invoice.as_ref().map(|invoice| invoice.id.clone());

        let mut totals = DocumentTotals::new();
        let mut lines = Vec::with_capacity(new.items.len());
        let mut computed = Vec::with_capacity(new.items.len());

        for request in &new.items {
            let product = fetch_product(&mut tx, &request.product_id)
                .await?
                .ok_or_else(|| CoreError::ProductNotFound(request.product_id.clone()))?;

            let amounts = LineAmounts::compute(product.selling_price(), request.quantity, product.tax_rate());
            totals.add_line(&amounts);

            let item = ProformaItem {
                id: Uuid::new_v4().to_string(),
                proforma_id: proforma.id.clone(),
                product_id: product.id.clone(),
                hsn_sac: request.hsn_sac.clone(),
                quantity: request.quantity,
                price_cents: amounts.unit_price.cents(),
                total_cents: amounts.total.cents(),
                tax_cents: amounts.tax.cents(),
            };
            computed.push(item.clone());
            lines.push(ProformaLine {
                item,
                product: Some(product),
            });
        }

        proforma.subtotal_cents = totals.subtotal().cents();
        proforma.gst_amount_cents = totals.gst_amount().cents();
        proforma.grand_total_cents = totals.grand_total().cents();

        sqlx::query(
            r#"
            INSERT INTO proforma_invoices (
                id, proforma_no, customer_name, customer_phone,
                billing_address, delivery_address, issue_date, valid_until,
                currency, discount_amount_cents, shipping_charge_cents, insurance_charge_cents,
                subtotal_cents, gst_amount_cents, grand_total_cents,
                incoterms, country_of_origin, port_of_loading,
                payment_terms, bank_name, account_number, ifsc_swift,
                related_invoice_id, created_by, created_at
            ) VALUES (
                ?1, ?2, ?3, ?4,
                ?5, ?6, ?7, ?8,
                ?9, ?10, ?11, ?12,
                ?13, ?14, ?15,
                ?16, ?17, ?18,
                ?19, ?20, ?21, ?22,
                ?23, ?24, ?25
            )
            "#,
        )
        .bind(&proforma.id)
        .bind(&proforma.proforma_no)
        .bind(&proforma.customer_name)
        .bind(&proforma.customer_phone)
        .bind(&proforma.billing_address)
        .bind(&proforma.delivery_address)
        .bind(proforma.issue_date)
        .bind(proforma.valid_until)
        .bind(&proforma.currency)
        .bind(proforma.discount_amount_cents)
        .bind(proforma.shipping_charge_cents)
        .bind(proforma.insurance_charge_cents)
        .bind(proforma.subtotal_cents)
        .bind(proforma.gst_amount_cents)
        .bind(proforma.grand_total_cents)
        .bind(&proforma.incoterms)
        .bind(&proforma.country_of_origin)
        .bind(&proforma.port_of_loading)
        .bind(&proforma.payment_terms)
        .bind(&proforma.bank_name)
        .bind(&proforma.account_number)
        .bind(&proforma.ifsc_swift)
        .bind(&proforma.related_invoice_id)
        .bind(&proforma.created_by)
        .bind(proforma.created_at)
        .execute(&mut *tx)
        .await?;

        for (position, item) in computed.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO proforma_items (
                    id, proforma_id, product_id, hsn_sac, quantity,
                    price_cents, total_cents, tax_cents, position
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                "#,
            )
            .bind(&item.id)
            .bind(&item.proforma_id)
            .bind(&item.product_id)
            .bind(&item.hsn_sac)
            .bind(item.quantity)
            .bind(item.price_cents)
            .bind(item.total_cents)
            .bind(item.tax_cents)
            .bind(position as i64)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        info!(
            proforma_no = %proforma.proforma_no,
            lines = lines.len(),
            grand_total = %totals.grand_total(),
            "Proforma created"
        );

        Ok(ProformaDetails {
            proforma,
            related_invoice,
            items: lines,
        })
    }

    /// Links a proforma to the invoice it was realized as.
    ///
    /// ## Returns
    /// * `Err(Domain(ProformaNotFound))` - unknown proforma id
    /// * `Err(Domain(InvoiceNotFound))` - unknown invoice number
    pub async fn link_invoice(&self, proforma_id: &str, invoice_no: &str) -> DbResult<ProformaInvoice> {
        debug!(proforma_id = %proforma_id, invoice_no = %invoice_no, "Linking proforma to invoice");

        let mut tx = begin_write(&self.pool).await?;

        let invoice = resolve_invoice(&mut tx, invoice_no).await?;

        let result = sqlx::query("UPDATE proforma_invoices SET related_invoice_id = ?2 WHERE id = ?1")
            .bind(proforma_id)
            .bind(&invoice.id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::ProformaNotFound(proforma_id.to_string()).into());
        }

        let sql = format!("SELECT {PROFORMA_COLUMNS} FROM proforma_invoices p WHERE p.id = ?1");
        let proforma = sqlx::query_as::<_, ProformaInvoice>(&sql)
            .bind(proforma_id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(proforma_no = %proforma.proforma_no, invoice_no = %invoice_no, "Proforma linked");
        Ok(proforma)
    }

    /// Lists all proformas, newest first, with lines, products and the
    /// linked invoice header.
    pub async fn list(&self) -> DbResult<Vec<ProformaDetails>> {
        let sql = format!("SELECT {PROFORMA_COLUMNS} FROM proforma_invoices p ORDER BY p.created_at DESC, p.id");
        let proformas = sqlx::query_as::<_, ProformaInvoice>(&sql)
            .fetch_all(&self.pool)
            .await?;

        let invoices: HashMap<String, Invoice> = fetch_linked_invoices(&self.pool)
            .await?
            .into_iter()
            .map(|i| (i.id.clone(), i))
            .collect();

        let sql = format!("SELECT {ITEM_COLUMNS} FROM proforma_items ORDER BY proforma_id, position");
        let items = sqlx::query_as::<_, ProformaItem>(&sql)
            .fetch_all(&self.pool)
            .await?;

        let products: HashMap<String, Product> = fetch_referenced_products(&self.pool, "proforma_items")
            .await?
            .into_iter()
            .map(|p| (p.id.clone(), p))
            .collect();

        let mut lines_by_proforma: HashMap<String, Vec<ProformaLine>> = HashMap::new();
        for item in items {
            let product = products.get(&item.product_id).cloned();
            lines_by_proforma
                .entry(item.proforma_id.clone())
                .or_default()
                .push(ProformaLine { item, product });
        }

        let details = proformas
            .into_iter()
            .map(|proforma| {
                let items = lines_by_proforma.remove(&proforma.id).unwrap_or_default();
                let related_invoice = proforma
                    .related_invoice_id
                    .as_ref()
                    .and_then(|id| invoices.get(id))
                    .cloned();
                ProformaDetails {
                    proforma,
                    related_invoice,
                    items,
                }
            })
            .collect::<Vec<_>>();

        debug!(count = details.len(), "Listed proformas");
        Ok(details)
    }
}

/// Loads the invoice a proforma is being linked to.
async fn resolve_invoice(conn: &mut SqliteConnection, invoice_no: &str) -> DbResult<Invoice> {
    fetch_invoice_by_number(conn, invoice_no)
        .await?
        .ok_or_else(|| CoreError::InvoiceNotFound(invoice_no.to_string()).into())
}

// =============================================================================
// Unit Tests
// =============================================================================
