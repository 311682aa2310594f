//! Return endpoints.
//!
//! A return is recorded against an invoice number. It does not restock the
//! product or change the invoice.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use tally_core::validation::{validate_optional_text, validate_quantity, validate_required_text, ValidationErrors};
use tally_core::{Requirement, ReturnType, ValidationError};
use tally_db::{NewReturn, ReturnDetails};
use tracing::info;

use super::ListResponse;
use crate::error::ApiResult;
use crate::middleware::CurrentUser;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateReturnRequest {
    pub invoice_no: String,
    pub product_name: String,
    pub quantity: i64,
    pub return_type: String,
    #[serde(default)]
    pub reason: String,
}

impl CreateReturnRequest {
    fn validate(self) -> Result<NewReturn, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let invoice_no = errors.check(validate_required_text("invoice_no", &self.invoice_no, 20));
        let product_name = errors.check(validate_required_text("product_name", &self.product_name, 255));
        errors.check(validate_quantity("quantity", self.quantity));
        let return_type = ReturnType::parse(&self.return_type);
        if return_type.is_none() {
            errors.push(ValidationError::NotAllowed {
                field: "return_type".to_string(),
                allowed: ReturnType::ALLOWED.iter().map(|s| s.to_string()).collect(),
            });
        }
        let reason = errors.check(validate_optional_text("reason", &self.reason, 2000));

        match (invoice_no, product_name, return_type, reason) {
            (Some(invoice_no), Some(product_name), Some(return_type), Some(reason)) if errors.is_empty() => {
                Ok(NewReturn {
                    invoice_no,
                    product_name,
                    quantity: self.quantity,
                    return_type,
                    reason,
                })
            }
            _ => Err(errors),
        }
    }
}

/// `POST /api/returns/create/`
pub async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    payload: Result<Json<CreateReturnRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ReturnDetails>)> {
    user.require(Requirement::StaffOrAdmin)?;
    let Json(req) = payload?;

    let new = req.validate()?;
    let details = state.db.returns().create(&new).await?;

    info!(
        invoice_no = %details.invoice_no,
        return_type = details.record.return_type.as_str(),
        by = %user.username,
        "Return recorded"
    );
    Ok((StatusCode::CREATED, Json(details)))
}

/// `GET /api/returns/`
pub async fn list(
    State(state): State<AppState>,
    _user: CurrentUser,
) -> ApiResult<Json<ListResponse<ReturnDetails>>> {
    let returns = state.db.returns().list().await?;
    Ok(Json(returns.into()))
}
