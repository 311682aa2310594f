//! # Totals Module
//!
//! Line and document totals for bills and proforma invoices.
//!
//! ## Computation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                   Per line (price snapshot at creation)                 │
//! │                                                                         │
//! │   total = unit_price × quantity                                         │
//! │   tax   = round_half_up(total × rate_bps / 10000)                       │
//! │                                                                         │
//! │                   Per document                                          │
//! │                                                                         │
//! │   subtotal    = Σ line.total                                            │
//! │   gst_amount  = Σ line.tax       (rounded per line, then summed)        │
//! │   grand_total = subtotal + gst_amount                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Rounding per line keeps the stored lines and header reconciling exactly:
//! the header is always the plain sum of what was persisted on the lines.
//!
//! ## Example
//! ```rust
//! use tally_core::money::Money;
//! use tally_core::totals::{DocumentTotals, LineAmounts};
//! use tally_core::types::TaxRate;
//!
//! let line = LineAmounts::compute(Money::from_cents(10_000), 3, TaxRate::from_bps(1800));
//! let mut totals = DocumentTotals::new();
//! totals.add_line(&line);
//!
//! assert_eq!(totals.subtotal().to_string(), "300.00");
//! assert_eq!(totals.gst_amount().to_string(), "54.00");
//! assert_eq!(totals.grand_total().to_string(), "354.00");
//! ```

use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::types::TaxRate;

// =============================================================================
// Line Amounts
// =============================================================================

/// The computed amounts of one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineAmounts {
    pub unit_price: Money,
    pub quantity: i64,
    pub tax_rate: TaxRate,
    pub total: Money,
    pub tax: Money,
}

impl LineAmounts {
    /// Computes a line from its price snapshot, quantity and tax rate.
    pub fn compute(unit_price: Money, quantity: i64, tax_rate: TaxRate) -> Self {
        let total = unit_price.multiply_quantity(quantity);
        let tax = total.calculate_tax(tax_rate);

        LineAmounts {
            unit_price,
            quantity,
            tax_rate,
            total,
            tax,
        }
    }
}

// =============================================================================
// Document Totals
// =============================================================================

/// Running totals for a document header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentTotals {
    subtotal: Money,
    gst_amount: Money,
    line_count: usize,
}

impl DocumentTotals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accumulates one line.
    pub fn add_line(&mut self, line: &LineAmounts) {
        self.subtotal += line.total;
        self.gst_amount += line.tax;
        self.line_count += 1;
    }

    #[inline]
    pub fn subtotal(&self) -> Money {
        self.subtotal
    }

    #[inline]
    pub fn gst_amount(&self) -> Money {
        self.gst_amount
    }

    #[inline]
    pub fn grand_total(&self) -> Money {
        self.subtotal + self.gst_amount
    }

    #[inline]
    pub fn line_count(&self) -> usize {
        self.line_count
    }
}

impl<'a> FromIterator<&'a LineAmounts> for DocumentTotals {
    fn from_iter<I: IntoIterator<Item = &'a LineAmounts>>(iter: I) -> Self {
        let mut totals = DocumentTotals::new();
        for line in iter {
            totals.add_line(line);
        }
        totals
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
