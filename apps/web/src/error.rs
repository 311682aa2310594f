//! # API Errors
//!
//! Every handler returns [`ApiResult`]. Errors from the lower layers convert
//! with `?` and render as one JSON shape:
//!
//! ```text
//! {
//!   "code": "VALIDATION_ERROR",
//!   "message": "Invalid input",
//!   "fields": { "customer_name": ["customer_name is required"] }
//! }
//! ```
//!
//! ## Mapping
//! ```text
//! ValidationError(s)            → 400 VALIDATION_ERROR (per field)
//! CoreError::EmptyDocument      → 400 VALIDATION_ERROR ("items")
//! *NotFound                     → 404 NOT_FOUND
//! CoreError::InsufficientStock  → 409 INSUFFICIENT_STOCK
//! CoreError::ProductInUse       → 409 REFERENTIAL_CONFLICT
//! DbError::UniqueViolation      → 400 VALIDATION_ERROR (duplicate field)
//! everything else               → 500 INTERNAL (logged, message hidden)
//! ```

use std::collections::BTreeMap;

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tally_core::{CoreError, ValidationError, ValidationErrors};
use tally_db::DbError;
use tracing::error;

/// Result type for handlers.
pub type ApiResult<T> = Result<T, ApiError>;

/// An error response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
    pub fields: BTreeMap<String, Vec<String>>,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    code: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    fields: &'a BTreeMap<String, Vec<String>>,
}

impl ApiError {
    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        ApiError {
            status,
            code,
            message: message.into(),
            fields: BTreeMap::new(),
        }
    }

    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "UNAUTHENTICATED", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, "FORBIDDEN", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", message)
    }

    /// A 400 naming one failing field.
    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut err = Self::bad_request("Invalid input");
        err.fields.entry(field.into()).or_default().push(message.into());
        err
    }

    pub fn insufficient_stock(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, "INSUFFICIENT_STOCK", message)
    }

    pub fn referential_conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, "REFERENTIAL_CONFLICT", message)
    }

    /// A 500 with a generic message. Log the cause before calling.
    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL", "Internal server error")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            code: self.code,
            message: &self.message,
            fields: &self.fields,
        };
        (self.status, Json(body)).into_response()
    }
}

// =============================================================================
// Conversions
// =============================================================================

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        let mut api = ApiError::bad_request("Invalid input");
        for err in errors {
            api.fields
                .entry(err.field().to_string())
                .or_default()
                .push(err.to_string());
        }
        api
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ValidationErrors::from(err).into()
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ProductNotFound(_)
            | CoreError::InvoiceNotFound(_)
            | CoreError::ProformaNotFound(_) => ApiError::not_found(err.to_string()),
            CoreError::InsufficientStock { .. } => ApiError::insufficient_stock(err.to_string()),
            CoreError::ProductInUse { .. } => ApiError::referential_conflict(err.to_string()),
            CoreError::EmptyDocument | CoreError::DocumentTooLarge { .. } => {
                ApiError::field("items", err.to_string())
            }
            CoreError::Validation(v) => v.into(),
        }
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Domain(core) => core.into(),
            DbError::NotFound { entity, .. } => ApiError::not_found(format!("{entity} not found")),
            DbError::UniqueViolation { field, value } => {
                // "table.column" → "column"
                let column = field.rsplit('.').next().unwrap_or(&field).to_string();
                ApiError::field(column.clone(), format!("{column} '{value}' already exists"))
            }
            DbError::ForeignKeyViolation { message } => {
                error!(%message, "Unexpected foreign key violation");
                ApiError::referential_conflict("The record is referenced by other records")
            }
            DbError::CheckViolation(message) => {
                error!(%message, "Check constraint rejected a write");
                ApiError::bad_request("Invalid input")
            }
            other => {
                error!(error = %other, "Database error");
                ApiError::internal()
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_errors_group_by_field() {
        let mut errors = ValidationErrors::new();
        errors.push(ValidationError::Required {
            field: "customer_name".to_string(),
        });
        errors.push(ValidationError::MustBePositive {
            field: "items[0].quantity".to_string(),
        });

        let api = ApiError::from(errors);
        assert_eq!(api.status, StatusCode::BAD_REQUEST);
        assert_eq!(api.code, "VALIDATION_ERROR");
        assert_eq!(api.fields["customer_name"], vec!["customer_name is required"]);
        assert_eq!(
            api.fields["items[0].quantity"],
            vec!["items[0].quantity must be greater than 0"]
        );
    }

    #[test]
    fn test_core_error_status_codes() {
        let stock = ApiError::from(CoreError::InsufficientStock {
            product: "Phone".to_string(),
            available: 2,
            requested: 5,
        });
        assert_eq!(stock.status, StatusCode::CONFLICT);
        assert_eq!(stock.code, "INSUFFICIENT_STOCK");

        let in_use = ApiError::from(CoreError::ProductInUse {
            product_id: "p1".to_string(),
        });
        assert_eq!(in_use.code, "REFERENTIAL_CONFLICT");
        assert_eq!(
            in_use.message,
            "This product is used in one or more bills or proforma invoices."
        );

        let missing = ApiError::from(DbError::Domain(CoreError::ProductNotFound("p9".to_string())));
        assert_eq!(missing.status, StatusCode::NOT_FOUND);

        let empty = ApiError::from(CoreError::EmptyDocument);
        assert_eq!(empty.fields["items"], vec!["At least one item is required"]);
    }

    #[test]
    fn test_duplicate_names_the_column() {
        let api = ApiError::from(DbError::duplicate("categories.name", "Mobiles"));
        assert_eq!(api.status, StatusCode::BAD_REQUEST);
        assert_eq!(api.fields["name"], vec!["name 'Mobiles' already exists"]);
    }

    #[test]
    fn test_internal_errors_hide_details() {
        let api = ApiError::from(DbError::QueryFailed("disk I/O error".to_string()));
        assert_eq!(api.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(api.message, "Internal server error");
    }
}
