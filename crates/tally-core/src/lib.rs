//! # tally-core: Pure Business Logic for Tally Billing
//!
//! This crate holds the rules of the billing system as pure functions with
//! zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Tally Billing Architecture                         │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Browser pages / JSON clients                 │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ HTTP                                   │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    apps/web (axum)                              │   │
//! │  │    access middleware, handlers, sessions                        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ tally-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌──────────┐ ┌────────┐  │   │
//! │  │   │  types  │ │  money  │ │ totals  │ │validation│ │ access │  │   │
//! │  │   │ Product │ │  Money  │ │  lines  │ │  fields  │ │ policy │  │   │
//! │  │   │ Invoice │ │ TaxRate │ │ headers │ │  ranges  │ │        │  │   │
//! │  │   └─────────┘ └─────────┘ └─────────┘ └──────────┘ └────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    tally-db (Database Layer)                    │   │
//! │  │        SQLite schema, repositories, creation transactions       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Invoice, ProformaInvoice, ...)
//! - [`money`] - Money type with integer arithmetic
//! - [`totals`] - Line and document totals
//! - [`validation`] - Field validation
//! - [`access`] - Path-based access policy
//! - [`numbering`] - Document numbers (`INV-`, `SVC-`, `SIN-`, `PF-`)
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use tally_core::money::Money;
//! use tally_core::types::TaxRate;
//!
//! let line_total = Money::from_cents(30_000); // 300.00
//! let gst = line_total.calculate_tax(TaxRate::from_bps(1800)); // 18%
//!
//! assert_eq!(gst.cents(), 5_400); // 54.00
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod access;
pub mod error;
pub mod money;
pub mod numbering;
pub mod totals;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use access::{AccessDecision, AccessLevel, Requirement};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use numbering::DocumentKind;
pub use totals::{DocumentTotals, LineAmounts};
pub use types::*;
pub use validation::ValidationErrors;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum lines on a single bill or proforma.
pub const MAX_DOCUMENT_ITEMS: usize = 100;

/// Maximum quantity on a single line.
///
/// ## Business Reason
/// Catches typos (10000 instead of 10) and, together with
/// [`MAX_PRICE_CENTS`] and [`MAX_DOCUMENT_ITEMS`], keeps every document
/// total far inside `i64`.
pub const MAX_ITEM_QUANTITY: i64 = 10_000;

/// Largest stock count a product may hold.
///
/// Restocking past it is refused, so `stock + quantity` never leaves
/// SQLite's integer range.
pub const MAX_STOCK: i64 = 1_000_000_000;

/// Largest accepted money amount: twelve digits, two of them decimals
/// (9,999,999,999.99).
pub const MAX_PRICE_CENTS: i64 = 999_999_999_999;

/// Largest accepted tax rate (100%).
pub const MAX_TAX_RATE_BPS: u32 = 10_000;

/// Currency used when a proforma does not name one.
pub const DEFAULT_CURRENCY: &str = "INR";
