//! Service job endpoints.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tally_core::validation::{
    validate_amount_cents, validate_optional_text, validate_phone, validate_required_text, ValidationErrors,
};
use tally_core::{Requirement, Service};
use tally_db::NewService;
use tracing::info;

use super::ListResponse;
use crate::error::ApiResult;
use crate::middleware::CurrentUser;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateServiceRequest {
    pub customer_name: String,
    #[serde(default)]
    pub customer_phone: String,
    pub service_type: String,
    #[serde(default)]
    pub issue: Option<String>,
    pub service_price_cents: i64,
}

#[derive(Debug, Serialize)]
pub struct CreateServiceResponse {
    pub service_id: String,
    pub service_invoice_no: String,
}

impl CreateServiceRequest {
    fn validate(self, created_by: String) -> Result<NewService, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let customer_name = errors.check(validate_required_text("customer_name", &self.customer_name, 200));
        let customer_phone = errors.check(validate_phone("customer_phone", &self.customer_phone));
        let service_type = errors.check(validate_required_text("service_type", &self.service_type, 200));
        let issue = match &self.issue {
            Some(issue) => errors
                .check(validate_optional_text("issue", issue, 2000))
                .map(|issue| Some(issue).filter(|s| !s.is_empty())),
            None => Some(None),
        };
        errors.check(validate_amount_cents("service_price_cents", self.service_price_cents));

        match (customer_name, customer_phone, service_type, issue) {
            (Some(customer_name), Some(customer_phone), Some(service_type), Some(issue)) if errors.is_empty() => {
                Ok(NewService {
                    customer_name,
                    customer_phone,
                    service_type,
                    issue,
                    service_price_cents: self.service_price_cents,
                    created_by: Some(created_by),
                })
            }
            _ => Err(errors),
        }
    }
}

/// `POST /api/services/create/`
pub async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    payload: Result<Json<CreateServiceRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<CreateServiceResponse>)> {
    user.require(Requirement::StaffOrAdmin)?;
    let Json(req) = payload?;

    let new = req.validate(user.id.clone())?;
    let service = state.db.services().create(&new).await?;

    info!(service_id = %service.service_id, by = %user.username, "Service recorded");
    Ok((
        StatusCode::CREATED,
        Json(CreateServiceResponse {
            service_id: service.service_id,
            service_invoice_no: service.service_invoice_no,
        }),
    ))
}

/// `GET /api/services/`
pub async fn list(State(state): State<AppState>, _user: CurrentUser) -> ApiResult<Json<ListResponse<Service>>> {
    let services = state.db.services().list().await?;
    Ok(Json(services.into()))
}
