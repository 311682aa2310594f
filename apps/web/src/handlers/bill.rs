//! Bill (invoice) endpoints.
//!
//! ## Create flow
//! ```text
//! POST /api/bills/create/
//!   │
//!   ├── staff or admin?                 no  → 403
//!   ├── every field valid?              no  → 400 { fields: {...} }
//!   │
//!   ▼
//! InvoiceRepository::create (one transaction)
//!   ├── unknown product                     → 404, nothing written
//!   ├── stock < quantity                    → 409, nothing written
//!   └── committed                           → 201 { invoice_no, grand_total_cents }
//! ```

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tally_core::validation::{validate_phone, validate_quantity, validate_required_text, ValidationErrors};
use tally_core::{Requirement, ValidationError, MAX_DOCUMENT_ITEMS};
use tally_db::{InvoiceDetails, LineRequest, NewInvoice};
use tracing::info;

use super::ListResponse;
use crate::error::ApiResult;
use crate::middleware::CurrentUser;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct BillItemRequest {
    pub product_id: String,
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateBillRequest {
    pub customer_name: String,
    #[serde(default)]
    pub customer_phone: String,
    #[serde(default)]
    pub items: Vec<BillItemRequest>,
}

#[derive(Debug, Serialize)]
pub struct CreateBillResponse {
    pub invoice_no: String,
    pub grand_total_cents: i64,
}

impl CreateBillRequest {
    fn validate(self, created_by: String) -> Result<NewInvoice, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let customer_name = errors.check(validate_required_text("customer_name", &self.customer_name, 200));
        let customer_phone = errors.check(validate_phone("customer_phone", &self.customer_phone));
        validate_items(&mut errors, self.items.len());

        let mut items = Vec::with_capacity(self.items.len());
        for (index, item) in self.items.into_iter().enumerate() {
            let product_id = errors.check(validate_required_text(
                &format!("items[{index}].product_id"),
                &item.product_id,
                64,
            ));
            errors.check(validate_quantity(&format!("items[{index}].quantity"), item.quantity));
            if let Some(product_id) = product_id {
                items.push(LineRequest {
                    product_id,
                    quantity: item.quantity,
                });
            }
        }

        match (customer_name, customer_phone) {
            (Some(customer_name), Some(customer_phone)) if errors.is_empty() => Ok(NewInvoice {
                customer_name,
                customer_phone,
                created_by: Some(created_by),
                items,
            }),
            _ => Err(errors),
        }
    }
}

/// Line-count check shared by bills and proformas.
pub(crate) fn validate_items(errors: &mut ValidationErrors, count: usize) {
    if count == 0 {
        errors.push(ValidationError::Required {
            field: "items".to_string(),
        });
    } else if count > MAX_DOCUMENT_ITEMS {
        errors.push(ValidationError::OutOfRange {
            field: "items".to_string(),
            min: 1,
            max: MAX_DOCUMENT_ITEMS as i64,
        });
    }
}

/// `POST /api/bills/create/`
pub async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    payload: Result<Json<CreateBillRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<CreateBillResponse>)> {
    user.require(Requirement::StaffOrAdmin)?;
    let Json(req) = payload?;

    let new = req.validate(user.id.clone())?;
    let details = state.db.invoices().create(&new).await?;

    info!(
        invoice_no = %details.invoice.invoice_no,
        grand_total_cents = details.invoice.grand_total_cents,
        by = %user.username,
        "Bill created"
    );

    Ok((
        StatusCode::CREATED,
        Json(CreateBillResponse {
            invoice_no: details.invoice.invoice_no,
            grand_total_cents: details.invoice.grand_total_cents,
        }),
    ))
}

/// `GET /api/bills/`
pub async fn list(
    State(state): State<AppState>,
    _user: CurrentUser,
) -> ApiResult<Json<ListResponse<InvoiceDetails>>> {
    let bills = state.db.invoices().list().await?;
    Ok(Json(bills.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(product_id: &str, quantity: i64) -> BillItemRequest {
        BillItemRequest {
            product_id: product_id.to_string(),
            quantity,
        }
    }

    #[test]
    fn test_valid_bill() {
        let req = CreateBillRequest {
            customer_name: "Asha".to_string(),
            customer_phone: "98450 12345".to_string(),
            items: vec![item("p1", 3), item("p2", 1)],
        };

        let new = req.validate("u1".to_string()).unwrap();
        assert_eq!(new.items.len(), 2);
        assert_eq!(new.items[0], LineRequest { product_id: "p1".to_string(), quantity: 3 });
        assert_eq!(new.created_by.as_deref(), Some("u1"));
    }

    #[test]
    fn test_errors_reported_per_field() {
        let req = CreateBillRequest {
            customer_name: " ".to_string(),
            customer_phone: "call me".to_string(),
            items: vec![item("p1", 0), item("", 2)],
        };

        let errors = req.validate("u1".to_string()).unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field()).collect();
        assert_eq!(
            fields,
            vec!["customer_name", "customer_phone", "items[0].quantity", "items[1].product_id"]
        );
    }

    #[test]
    fn test_empty_items_required() {
        let req = CreateBillRequest {
            customer_name: "Asha".to_string(),
            customer_phone: String::new(),
            items: Vec::new(),
        };

        let errors = req.validate("u1".to_string()).unwrap_err();
        assert_eq!(errors.iter().next().map(|e| e.field()), Some("items"));
    }
}
