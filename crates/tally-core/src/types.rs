//! # Domain Types
//!
//! Core domain types used throughout Tally Billing.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │    Invoice      │   │ ProformaInvoice │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  name / imei    │◄──│  invoice_no     │   │  proforma_no    │       │
//! │  │  selling_price  │   │  subtotal       │   │  trade terms    │       │
//! │  │  stock (>= 0)   │   │  grand_total    │   │  related_invoice│──┐    │
//! │  └─────────────────┘   └────────┬────────┘   └─────────────────┘  │    │
//! │           ▲                     │ 1..n              ▲              │    │
//! │           │            ┌────────▼────────┐          └──────────────┘    │
//! │           └────────────│  InvoiceItem    │   (optional link to the      │
//! │            RESTRICT    │  price snapshot │    realized invoice)         │
//! │                        └─────────────────┘                              │
//! │                                                                         │
//! │  Service (SVC-/SIN-)    ReturnRecord (refund | replace)    User        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every document has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - Business number: (`invoice_no`, `proforma_no`, ...) - human-readable,
//!   generated once at creation and never changed

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::access::AccessLevel;
use crate::money::Money;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000
/// 1800 bps = 18% (a common GST slab)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Creates a tax rate from a whole percentage.
    #[inline]
    pub const fn from_whole_percent(pct: u32) -> Self {
        TaxRate(pct * 100)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Zero tax rate.
    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }

    /// Checks if tax rate is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

// =============================================================================
// Category
// =============================================================================

/// A product category label.
///
/// Products carry the category *name* as a plain string; this table only
/// collects the distinct names for pickers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Category {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Product
// =============================================================================

/// A product held in inventory.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name shown on bills.
    pub name: String,

    /// Optional serial identifier (IMEI for handsets).
    pub imei: Option<String>,

    /// Selling price in minor units.
    pub selling_price_cents: i64,

    /// Purchase price in minor units (for margin reporting).
    pub purchase_price_cents: i64,

    /// Tax rate in basis points (1800 = 18%).
    pub tax_rate_bps: u32,

    /// Denormalized category name.
    pub category: Option<String>,

    /// Units on hand. Never negative.
    pub stock: i64,

    /// Supplier / agency the product was bought from.
    pub agency_name: String,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the selling price as a Money type.
    #[inline]
    pub fn selling_price(&self) -> Money {
        Money::from_cents(self.selling_price_cents)
    }

    /// Returns the purchase price as a Money type.
    #[inline]
    pub fn purchase_price(&self) -> Money {
        Money::from_cents(self.purchase_price_cents)
    }

    /// Returns the tax rate.
    #[inline]
    pub fn tax_rate(&self) -> TaxRate {
        TaxRate::from_bps(self.tax_rate_bps)
    }

    /// Checks whether `quantity` units can be taken from stock.
    pub fn can_fulfil(&self, quantity: i64) -> bool {
        quantity > 0 && self.stock >= quantity
    }
}

// =============================================================================
// Invoice (Bill)
// =============================================================================

/// A finalized sale. Created once with all its items and never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Invoice {
    pub id: String,

    /// Business number, e.g. `INV-9F2C01AB`.
    pub invoice_no: String,

    pub customer_name: String,
    pub customer_phone: String,

    pub subtotal_cents: i64,
    pub gst_amount_cents: i64,
    pub grand_total_cents: i64,

    /// User id of the cashier. Null once that user is removed.
    pub created_by: Option<String>,

    pub created_at: DateTime<Utc>,
}

impl Invoice {
    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents)
    }

    #[inline]
    pub fn gst_amount(&self) -> Money {
        Money::from_cents(self.gst_amount_cents)
    }

    #[inline]
    pub fn grand_total(&self) -> Money {
        Money::from_cents(self.grand_total_cents)
    }
}

/// A line item on an invoice.
///
/// ## Price Snapshot
/// ```text
/// Product.selling_price at time of sale ──► InvoiceItem.price_cents
///
/// Later price changes on the product never touch existing lines.
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct InvoiceItem {
    pub id: String,
    pub invoice_id: String,
    pub product_id: String,
    pub quantity: i64,
    pub price_cents: i64,
    pub total_cents: i64,
    pub tax_cents: i64,
}

// =============================================================================
// Service
// =============================================================================

/// A billable service job (repairs, installation, ...). No stock interaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Service {
    pub id: String,

    /// Job number, e.g. `SVC-01AB23CD`.
    pub service_id: String,

    /// Service invoice number, e.g. `SIN-45EF67AB`.
    pub service_invoice_no: String,

    pub customer_name: String,
    pub customer_phone: String,
    pub service_type: String,
    pub issue: Option<String>,
    pub service_price_cents: i64,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Proforma Invoice
// =============================================================================

/// A quotation document. Carries totals like an invoice but never moves stock.
///
/// Discount, shipping and insurance are informational header fields; they
/// are not folded into `grand_total_cents`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ProformaInvoice {
    pub id: String,
    pub proforma_no: String,

    // Buyer
    pub customer_name: String,
    pub customer_phone: String,
    pub billing_address: String,
    pub delivery_address: String,

    // Dates
    pub issue_date: NaiveDate,
    pub valid_until: Option<NaiveDate>,

    // Commercial
    pub currency: String,
    pub discount_amount_cents: i64,
    pub shipping_charge_cents: i64,
    pub insurance_charge_cents: i64,

    pub subtotal_cents: i64,
    pub gst_amount_cents: i64,
    pub grand_total_cents: i64,

    // Trade
    pub incoterms: String,
    pub country_of_origin: String,
    pub port_of_loading: String,

    // Payment
    pub payment_terms: String,
    pub bank_name: String,
    pub account_number: String,
    pub ifsc_swift: String,

    /// Invoice this quotation was eventually realized as.
    pub related_invoice_id: Option<String>,

    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A line item on a proforma invoice.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ProformaItem {
    pub id: String,
    pub proforma_id: String,
    pub product_id: String,

    /// HSN (goods) or SAC (services) classification code.
    pub hsn_sac: String,

    pub quantity: i64,
    pub price_cents: i64,
    pub total_cents: i64,
    pub tax_cents: i64,
}

// =============================================================================
// Returns
// =============================================================================

/// What the customer gets back for a returned item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum ReturnType {
    /// Money back.
    Refund,
    /// Swap for another unit.
    Replace,
}

impl ReturnType {
    /// All accepted wire values, in display order.
    pub const ALLOWED: [&'static str; 2] = ["refund", "replace"];

    /// Parses the wire value.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "refund" => Some(ReturnType::Refund),
            "replace" => Some(ReturnType::Replace),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReturnType::Refund => "refund",
            ReturnType::Replace => "replace",
        }
    }
}

/// A return recorded against an existing invoice.
///
/// Purely a record: it neither restocks the product nor changes the
/// original invoice's totals.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ReturnRecord {
    pub id: String,
    pub invoice_id: String,
    pub product_name: String,
    pub quantity: i64,
    pub return_type: ReturnType,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// User
// =============================================================================

/// A login account.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct User {
    pub id: String,
    pub username: String,

    /// Argon2 PHC string. Never serialized.
    #[serde(skip_serializing, default)]
    pub password_hash: String,

    /// May use inventory, invoice and report pages and create bills.
    pub is_staff: bool,

    /// Superuser. Implies everything staff can do.
    pub is_admin: bool,

    /// Inactive users cannot log in.
    pub is_active: bool,

    pub created_at: DateTime<Utc>,
}

impl User {
    /// Access level derived from the role flags.
    pub fn access_level(&self) -> AccessLevel {
        AccessLevel::from_flags(self.is_staff, self.is_admin)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn product(stock: i64) -> Product {
        Product {
            id: "p-1".to_string(),
            name: "Phone".to_string(),
            imei: None,
            selling_price_cents: 10_000,
            purchase_price_cents: 8_000,
            tax_rate_bps: 1800,
            category: Some("Mobiles".to_string()),
            stock,
            agency_name: String::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_tax_rate_from_whole_percent() {
        assert_eq!(TaxRate::from_whole_percent(18).bps(), 1800);
        assert_eq!(TaxRate::from_bps(1800).percentage(), 18.0);
    }

    #[test]
    fn test_can_fulfil() {
        let p = product(2);
        assert!(p.can_fulfil(2));
        assert!(!p.can_fulfil(5));
        assert!(!p.can_fulfil(0));
    }

    #[test]
    fn test_return_type_parse() {
        assert_eq!(ReturnType::parse("refund"), Some(ReturnType::Refund));
        assert_eq!(ReturnType::parse(" replace "), Some(ReturnType::Replace));
        assert_eq!(ReturnType::parse("exchange"), None);
        assert_eq!(ReturnType::Replace.as_str(), "replace");
    }

    #[test]
    fn test_user_password_hash_not_serialized() {
        let user = User {
            id: "u-1".to_string(),
            username: "admin".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            is_staff: true,
            is_admin: true,
            is_active: true,
            created_at: Utc::now(),
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("argon2"));
        assert_eq!(user.access_level(), AccessLevel::Admin);
    }
}
