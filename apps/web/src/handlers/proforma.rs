//! Proforma invoice endpoints.
//!
//! Proformas are quotations: same line computation as bills, no stock
//! movement. Discount, shipping and insurance are stored as given and are
//! not part of `grand_total_cents`.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tally_core::validation::{
    parse_date, validate_amount_cents, validate_currency, validate_optional_text, validate_phone,
    validate_quantity, validate_required_text, validate_validity, ValidationErrors,
};
use tally_core::{ProformaInvoice, Requirement, DEFAULT_CURRENCY};
use tally_db::{NewProforma, ProformaDetails, ProformaLineRequest};
use tracing::info;

use super::bill::validate_items;
use super::ListResponse;
use crate::error::ApiResult;
use crate::middleware::CurrentUser;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ProformaItemRequest {
    pub product_id: String,
    pub quantity: i64,
    #[serde(default)]
    pub hsn_sac: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CreateProformaRequest {
    pub customer_name: String,
    pub customer_phone: String,
    pub billing_address: String,
    pub delivery_address: String,

    /// `YYYY-MM-DD`; today when absent.
    pub issue_date: Option<String>,
    pub valid_until: Option<String>,

    pub currency: Option<String>,
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

    pub related_invoice_no: Option<String>,
    pub items: Vec<ProformaItemRequest>,
}

#[derive(Debug, Serialize)]
pub struct CreateProformaResponse {
    pub proforma_no: String,
}

#[derive(Debug, Deserialize)]
pub struct LinkInvoiceRequest {
    pub invoice_no: String,
}

impl CreateProformaRequest {
    fn validate(self, created_by: String, today: NaiveDate) -> Result<NewProforma, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let mut text = |field: &str, value: &str, max: usize| {
            errors.check(validate_optional_text(field, value, max))
        };

        let billing_address = text("billing_address", &self.billing_address, 2000);
        let delivery_address = text("delivery_address", &self.delivery_address, 2000);
        let incoterms = text("incoterms", &self.incoterms, 50);
        let country_of_origin = text("country_of_origin", &self.country_of_origin, 100);
        let port_of_loading = text("port_of_loading", &self.port_of_loading, 100);
        let payment_terms = text("payment_terms", &self.payment_terms, 200);
        let bank_name = text("bank_name", &self.bank_name, 200);
        let account_number = text("account_number", &self.account_number, 50);
        let ifsc_swift = text("ifsc_swift", &self.ifsc_swift, 50);

        let customer_name = errors.check(validate_required_text("customer_name", &self.customer_name, 200));
        let customer_phone = errors.check(validate_phone("customer_phone", &self.customer_phone));

        let issue_date = match self.issue_date.as_deref().map(str::trim) {
            Some(value) if !value.is_empty() => errors.check(parse_date("issue_date", value)),
            _ => Some(today),
        };
        let valid_until = match self.valid_until.as_deref().map(str::trim) {
            Some(value) if !value.is_empty() => errors.check(parse_date("valid_until", value)).map(Some),
            _ => Some(None),
        };
        if let (Some(issue), Some(until)) = (issue_date, valid_until) {
            errors.check(validate_validity(issue, until));
        }

        let currency = match self.currency.as_deref().map(str::trim) {
            Some(code) if !code.is_empty() => errors.check(validate_currency(code)),
            _ => Some(DEFAULT_CURRENCY.to_string()),
        };
        errors.check(validate_amount_cents("discount_amount_cents", self.discount_amount_cents));
        errors.check(validate_amount_cents("shipping_charge_cents", self.shipping_charge_cents));
        errors.check(validate_amount_cents("insurance_charge_cents", self.insurance_charge_cents));

        let related_invoice_no = self
            .related_invoice_no
            .map(|no| no.trim().to_string())
            .filter(|no| !no.is_empty());

        validate_items(&mut errors, self.items.len());
        let mut items = Vec::with_capacity(self.items.len());
        for (index, item) in self.items.into_iter().enumerate() {
            let product_id = errors.check(validate_required_text(
                &format!("items[{index}].product_id"),
                &item.product_id,
                64,
            ));
            errors.check(validate_quantity(&format!("items[{index}].quantity"), item.quantity));
            let hsn_sac = errors.check(validate_optional_text(&format!("items[{index}].hsn_sac"), &item.hsn_sac, 20));
            if let (Some(product_id), Some(hsn_sac)) = (product_id, hsn_sac) {
                items.push(ProformaLineRequest {
                    product_id,
                    quantity: item.quantity,
                    hsn_sac,
                });
            }
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        // Every Option below is Some once no error was recorded.
        match (
            customer_name,
            customer_phone,
            billing_address,
            delivery_address,
            issue_date,
            valid_until,
            currency,
            incoterms,
            country_of_origin,
            port_of_loading,
            payment_terms,
            bank_name,
            account_number,
            ifsc_swift,
        ) {
            (
                Some(customer_name),
                Some(customer_phone),
                Some(billing_address),
                Some(delivery_address),
                Some(issue_date),
                Some(valid_until),
                Some(currency),
                Some(incoterms),
                Some(country_of_origin),
                Some(port_of_loading),
                Some(payment_terms),
                Some(bank_name),
                Some(account_number),
                Some(ifsc_swift),
            ) => Ok(NewProforma {
                customer_name,
                customer_phone,
                billing_address,
                delivery_address,
                issue_date,
                valid_until,
                currency,
                discount_amount_cents: self.discount_amount_cents,
                shipping_charge_cents: self.shipping_charge_cents,
                insurance_charge_cents: self.insurance_charge_cents,
                incoterms,
                country_of_origin,
                port_of_loading,
                payment_terms,
                bank_name,
                account_number,
                ifsc_swift,
                related_invoice_no,
                created_by: Some(created_by),
                items,
            }),
            _ => Err(errors),
        }
    }
}

/// `POST /api/proforma/create/`
pub async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    payload: Result<Json<CreateProformaRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<CreateProformaResponse>)> {
    user.require(Requirement::Admin)?;
    let Json(req) = payload?;

    let new = req.validate(user.id.clone(), Utc::now().date_naive())?;
    let details = state.db.proformas().create(&new).await?;

    info!(
        proforma_no = %details.proforma.proforma_no,
        grand_total_cents = details.proforma.grand_total_cents,
        by = %user.username,
        "Proforma created"
    );

    Ok((
        StatusCode::CREATED,
        Json(CreateProformaResponse {
            proforma_no: details.proforma.proforma_no,
        }),
    ))
}

/// `GET /api/proforma/`
pub async fn list(
    State(state): State<AppState>,
    _user: CurrentUser,
) -> ApiResult<Json<ListResponse<ProformaDetails>>> {
    let proformas = state.db.proformas().list().await?;
    Ok(Json(proformas.into()))
}

/// `POST /api/proforma/{id}/link/`
pub async fn link(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    payload: Result<Json<LinkInvoiceRequest>, JsonRejection>,
) -> ApiResult<Json<ProformaInvoice>> {
    user.require(Requirement::Admin)?;
    let Json(req) = payload?;

    let invoice_no = validate_required_text("invoice_no", &req.invoice_no, 20)?;
    let proforma = state.db.proformas().link_invoice(&id, &invoice_no).await?;

    Ok(Json(proforma))
}
