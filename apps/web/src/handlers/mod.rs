//! # HTTP Handlers
//!
//! One module per resource. Handlers stay thin: parse and validate the
//! request body, check the endpoint's role requirement, call one repository
//! operation, shape the response.
//!
//! ## Role requirements
//! ```text
//! authenticated     list endpoints, categories, /billing, /service
//! staff or admin    create bill, create service, create return
//! admin             product writes, reports, proforma create/link,
//!                   /proforma-invoice page
//! ```

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;

use crate::state::AppState;

pub mod auth;
pub mod bill;
pub mod category;
pub mod pages;
pub mod product;
pub mod proforma;
pub mod report;
pub mod returns;
pub mod service;

/// List endpoints wrap their rows as `{"results": [...]}`.
#[derive(Debug, Serialize)]
pub struct ListResponse<T> {
    pub results: Vec<T>,
}

impl<T> From<Vec<T>> for ListResponse<T> {
    fn from(results: Vec<T>) -> Self {
        ListResponse { results }
    }
}

/// Database liveness. Mounted outside the access middleware.
pub async fn health(State(state): State<AppState>) -> Response {
    if !state.db.health_check().await {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "unavailable", "database": "down" })),
        )
            .into_response();
    }

    match state.db.migration_status().await {
        Ok(migrations) => Json(json!({
            "status": "ok",
            "database": "up",
            "migrations": migrations,
        }))
        .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to read migration status");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unavailable", "database": "up" })),
            )
                .into_response()
        }
    }
}
