//! # Document Numbers
//!
//! Human-readable business numbers for documents: a kind prefix followed by
//! eight uppercase hex characters taken from a fresh UUID v4.
//!
//! ```text
//! INV-9F2C01AB   invoice (bill)
//! SVC-01AB23CD   service job
//! SIN-45EF67AB   service invoice
//! PF-7C0D11E2    proforma invoice
//! ```
//!
//! 32 random bits make collisions rare but not impossible, so the database
//! keeps a `UNIQUE` constraint on every number column and the repositories
//! retry with a new number (up to [`MAX_NUMBER_ATTEMPTS`]) on a violation.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How many fresh numbers a repository tries before giving up.
pub const MAX_NUMBER_ATTEMPTS: usize = 5;

/// Number of hex characters after the prefix.
const SUFFIX_LEN: usize = 8;

/// Which kind of document a number belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Invoice,
    ServiceJob,
    ServiceInvoice,
    Proforma,
}

impl DocumentKind {
    pub const fn prefix(&self) -> &'static str {
        match self {
            DocumentKind::Invoice => "INV-",
            DocumentKind::ServiceJob => "SVC-",
            DocumentKind::ServiceInvoice => "SIN-",
            DocumentKind::Proforma => "PF-",
        }
    }

    /// Generates a fresh number for this kind.
    ///
    /// ## Example
    /// ```rust
    /// use tally_core::numbering::DocumentKind;
    ///
    /// let no = DocumentKind::Invoice.generate();
    /// assert!(no.starts_with("INV-"));
    /// assert_eq!(no.len(), 12);
    /// ```
    pub fn generate(&self) -> String {
        let hex = Uuid::new_v4().simple().to_string();
        format!("{}{}", self.prefix(), hex[..SUFFIX_LEN].to_ascii_uppercase())
    }

    /// Checks that `number` has this kind's shape.
    pub fn matches(&self, number: &str) -> bool {
        number.strip_prefix(self.prefix()).is_some_and(|suffix| {
            suffix.len() == SUFFIX_LEN
                && suffix
                    .chars()
                    .all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c))
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
