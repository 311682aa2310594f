//! # Validation Module
//!
//! Input validation utilities for Tally Billing.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: HTTP handler (apps/web)                                      │
//! │  ├── Type validation (JSON deserialization)                            │
//! │  └── THIS MODULE, every field, errors collected field-by-field         │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Builders (tally-db)                                          │
//! │  ├── Line count / quantity re-checked before the transaction opens    │
//! │  └── Stock checked inside the transaction                              │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── CHECK (stock >= 0), NOT NULL                                      │
//! │  ├── UNIQUE document numbers                                           │
//! │  └── Foreign keys (RESTRICT on products)                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use tally_core::validation::{validate_quantity, ValidationErrors};
//!
//! let mut errors = ValidationErrors::new();
//! errors.check(validate_quantity("items[0].quantity", 3));
//! errors.check(validate_quantity("items[1].quantity", 0));
//! assert_eq!(errors.len(), 1);
//! ```

use chrono::NaiveDate;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::{MAX_DOCUMENT_ITEMS, MAX_ITEM_QUANTITY, MAX_PRICE_CENTS, MAX_STOCK, MAX_TAX_RATE_BPS};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Error Collector
// =============================================================================

/// Collects every failing field of a request instead of stopping at the first.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: Vec<ValidationError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the error of a failed check. Returns the value on success.
    pub fn check<T>(&mut self, result: ValidationResult<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                self.errors.push(err);
                None
            }
        }
    }

    pub fn push(&mut self, err: ValidationError) {
        self.errors.push(err);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.errors.iter()
    }

    /// `Ok(())` when nothing failed.
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl From<ValidationError> for ValidationErrors {
    fn from(err: ValidationError) -> Self {
        ValidationErrors { errors: vec![err] }
    }
}

impl IntoIterator for ValidationErrors {
    type Item = ValidationError;
    type IntoIter = std::vec::IntoIter<ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

// =============================================================================
// String Validators
// =============================================================================

/// Validates a required text field and returns it trimmed.
///
/// ## Example
/// ```rust
/// use tally_core::validation::validate_required_text;
///
/// assert_eq!(validate_required_text("customer_name", "  Asha ", 200).unwrap(), "Asha");
/// assert!(validate_required_text("customer_name", "   ", 200).is_err());
/// ```
pub fn validate_required_text(field: &str, value: &str, max: usize) -> ValidationResult<String> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    validate_optional_text(field, value, max)
}

/// Validates an optional text field (empty allowed) and returns it trimmed.
pub fn validate_optional_text(field: &str, value: &str, max: usize) -> ValidationResult<String> {
    let value = value.trim();

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(value.to_string())
}

/// Validates a phone number.
///
/// ## Rules
/// - May be empty
/// - At most 15 characters
/// - Digits, spaces, `+` and `-` only
pub fn validate_phone(field: &str, phone: &str) -> ValidationResult<String> {
    let phone = validate_optional_text(field, phone, 15)?;

    if !phone
        .chars()
        .all(|c| c.is_ascii_digit() || c == '+' || c == '-' || c == ' ')
    {
        return Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "must contain only digits, spaces, '+' and '-'".to_string(),
        });
    }

    Ok(phone)
}

/// Validates a currency code and returns it uppercased.
///
/// ## Example
/// ```rust
/// use tally_core::validation::validate_currency;
///
/// assert_eq!(validate_currency("inr").unwrap(), "INR");
/// assert!(validate_currency("").is_err());
/// assert!(validate_currency("U$D").is_err());
/// ```
pub fn validate_currency(code: &str) -> ValidationResult<String> {
    let code = validate_required_text("currency", code, 10)?;

    if !code.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(ValidationError::InvalidFormat {
            field: "currency".to_string(),
            reason: "must contain only letters".to_string(),
        });
    }

    Ok(code.to_ascii_uppercase())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY
///
/// ## User Workflow
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Bill: items[i].quantity                                               │
/// │       │                                                                 │
/// │       ├── qty <= 0?   → "items[i].quantity must be greater than 0"     │
/// │       │                                                                 │
/// │       ├── qty > max?  → "items[i].quantity must be between 1 and max"  │
/// │       │                                                                 │
/// │       └── OK → line is computed inside the transaction                 │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub fn validate_quantity(field: &str, qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a money amount in minor units.
///
/// ## Rules
/// - Must be non-negative (zero allowed)
/// - At most MAX_PRICE_CENTS (twelve digits with two decimals)
///
/// ## Example
/// ```rust
/// use tally_core::validation::validate_amount_cents;
///
/// assert!(validate_amount_cents("selling_price_cents", 10_000).is_ok());
/// assert!(validate_amount_cents("selling_price_cents", 0).is_ok());
/// assert!(validate_amount_cents("selling_price_cents", -1).is_err());
/// ```
pub fn validate_amount_cents(field: &str, cents: i64) -> ValidationResult<()> {
    if !(0..=MAX_PRICE_CENTS).contains(&cents) {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_PRICE_CENTS,
        });
    }

    Ok(())
}

/// Validates a tax rate in basis points (0% to 100%).
pub fn validate_tax_rate_bps(bps: u32) -> ValidationResult<()> {
    if bps > MAX_TAX_RATE_BPS {
        return Err(ValidationError::OutOfRange {
            field: "tax_rate_bps".to_string(),
            min: 0,
            max: MAX_TAX_RATE_BPS as i64,
        });
    }

    Ok(())
}

/// Validates a stock count: 0 to MAX_STOCK.
pub fn validate_stock(field: &str, stock: i64) -> ValidationResult<()> {
    if !(0..=MAX_STOCK).contains(&stock) {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_STOCK,
        });
    }

    Ok(())
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Validates the number of lines on a bill or proforma.
///
/// ## Rules
/// - At least one line
/// - At most MAX_DOCUMENT_ITEMS lines
pub fn validate_line_count(count: usize) -> CoreResult<()> {
    if count == 0 {
        return Err(CoreError::EmptyDocument);
    }

    if count > MAX_DOCUMENT_ITEMS {
        return Err(CoreError::DocumentTooLarge {
            max: MAX_DOCUMENT_ITEMS,
        });
    }

    Ok(())
}

// =============================================================================
// Date Validators
// =============================================================================

/// Parses a `YYYY-MM-DD` date.
///
/// ## Example
/// ```rust
/// use tally_core::validation::parse_date;
///
/// assert!(parse_date("start", "2024-03-01").is_ok());
/// assert!(parse_date("start", "01/03/2024").is_err());
/// ```
pub fn parse_date(field: &str, value: &str) -> ValidationResult<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
        ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "expected YYYY-MM-DD".to_string(),
        }
    })
}

/// Validates that a quotation does not expire before it is issued.
pub fn validate_validity(issue_date: NaiveDate, valid_until: Option<NaiveDate>) -> ValidationResult<()> {
    match valid_until {
        Some(until) if until < issue_date => Err(ValidationError::InvalidFormat {
            field: "valid_until".to_string(),
            reason: "must not be before issue_date".to_string(),
        }),
        _ => Ok(()),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
