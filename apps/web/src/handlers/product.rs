//! Product endpoints.
//!
//! ```text
//! GET    /api/products/               authenticated   list, newest first
//! POST   /api/products/create/        admin           201 + product
//! PUT    /api/products/{id}/          admin           partial update
//! DELETE /api/products/{id}/delete/   admin           409 if referenced
//! POST   /api/products/{id}/restock/  admin           stock += quantity
//! ```

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use tally_core::validation::{
    validate_amount_cents, validate_optional_text, validate_quantity, validate_required_text,
    validate_stock, validate_tax_rate_bps, ValidationErrors,
};
use tally_core::{Product, Requirement};
use tally_db::{NewProduct, ProductUpdate};
use tracing::info;

use super::ListResponse;
use crate::error::ApiResult;
use crate::middleware::CurrentUser;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    #[serde(default)]
    pub imei: Option<String>,
    pub selling_price_cents: i64,
    pub purchase_price_cents: i64,
    #[serde(default)]
    pub tax_rate_bps: u32,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub stock: i64,
    #[serde(default)]
    pub agency_name: String,
}

impl CreateProductRequest {
    fn validate(self) -> Result<NewProduct, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let name = errors.check(validate_required_text("name", &self.name, 200));
        let imei = match &self.imei {
            Some(imei) => errors.check(validate_optional_text("imei", imei, 50)).map(Some),
            None => Some(None),
        };
        errors.check(validate_amount_cents("selling_price_cents", self.selling_price_cents));
        errors.check(validate_amount_cents("purchase_price_cents", self.purchase_price_cents));
        errors.check(validate_tax_rate_bps(self.tax_rate_bps));
        errors.check(validate_stock("stock", self.stock));
        let category = match &self.category {
            Some(category) => errors
                .check(validate_optional_text("category", category, 100))
                .map(Some),
            None => Some(None),
        };
        let agency_name = errors.check(validate_optional_text("agency_name", &self.agency_name, 200));

        match (name, imei, category, agency_name) {
            (Some(name), Some(imei), Some(category), Some(agency_name)) if errors.is_empty() => {
                Ok(NewProduct {
                    name,
                    imei,
                    selling_price_cents: self.selling_price_cents,
                    purchase_price_cents: self.purchase_price_cents,
                    tax_rate_bps: self.tax_rate_bps,
                    category,
                    stock: self.stock,
                    agency_name,
                })
            }
            _ => Err(errors),
        }
    }
}

/// Every field optional; absent fields are left unchanged.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub imei: Option<String>,
    pub selling_price_cents: Option<i64>,
    pub purchase_price_cents: Option<i64>,
    pub tax_rate_bps: Option<u32>,
    pub category: Option<String>,
    pub stock: Option<i64>,
    pub agency_name: Option<String>,
}

impl UpdateProductRequest {
    fn validate(self) -> Result<ProductUpdate, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let update = ProductUpdate {
            name: self
                .name
                .and_then(|name| errors.check(validate_required_text("name", &name, 200))),
            imei: self
                .imei
                .and_then(|imei| errors.check(validate_optional_text("imei", &imei, 50))),
            selling_price_cents: self.selling_price_cents.and_then(|cents| {
                errors
                    .check(validate_amount_cents("selling_price_cents", cents))
                    .map(|()| cents)
            }),
            purchase_price_cents: self.purchase_price_cents.and_then(|cents| {
                errors
                    .check(validate_amount_cents("purchase_price_cents", cents))
                    .map(|()| cents)
            }),
            tax_rate_bps: self
                .tax_rate_bps
                .and_then(|bps| errors.check(validate_tax_rate_bps(bps)).map(|()| bps)),
            category: self
                .category
                .and_then(|category| errors.check(validate_optional_text("category", &category, 100))),
            stock: self
                .stock
                .and_then(|stock| errors.check(validate_stock("stock", stock)).map(|()| stock)),
            agency_name: self
                .agency_name
                .and_then(|agency| errors.check(validate_optional_text("agency_name", &agency, 200))),
        };

        errors.into_result().map(|()| update)
    }
}

#[derive(Debug, Deserialize)]
pub struct RestockRequest {
    pub quantity: i64,
}

/// `GET /api/products/`
pub async fn list(State(state): State<AppState>, _user: CurrentUser) -> ApiResult<Json<ListResponse<Product>>> {
    let products = state.db.products().list().await?;
    Ok(Json(products.into()))
}

/// `POST /api/products/create/`
pub async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    payload: Result<Json<CreateProductRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Product>)> {
    user.require(Requirement::Admin)?;
    let Json(req) = payload?;

    let new = req.validate()?;
    let product = state.db.products().create(new).await?;

    info!(product_id = %product.id, name = %product.name, by = %user.username, "Product created");
    Ok((StatusCode::CREATED, Json(product)))
}

/// `PUT /api/products/{id}/`
pub async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    payload: Result<Json<UpdateProductRequest>, JsonRejection>,
) -> ApiResult<Json<Product>> {
    user.require(Requirement::Admin)?;
    let Json(req) = payload?;

    let update = req.validate()?;
    let product = state.db.products().update(&id, update).await?;

    info!(product_id = %product.id, by = %user.username, "Product updated");
    Ok(Json(product))
}

/// `DELETE /api/products/{id}/delete/`
pub async fn delete(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    user.require(Requirement::Admin)?;

    state.db.products().delete(&id).await?;

    info!(product_id = %id, by = %user.username, "Product deleted");
    Ok(Json(json!({ "message": "Product deleted successfully" })))
}

/// `POST /api/products/{id}/restock/`
pub async fn restock(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    payload: Result<Json<RestockRequest>, JsonRejection>,
) -> ApiResult<Json<Product>> {
    user.require(Requirement::Admin)?;
    let Json(req) = payload?;

    validate_quantity("quantity", req.quantity)?;
    let product = state.db.products().restock(&id, req.quantity).await?;

    info!(product_id = %id, added = req.quantity, stock = product.stock, "Product restocked");
    Ok(Json(product))
}
