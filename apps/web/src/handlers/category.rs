//! Category endpoints. Open to every logged-in user.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use tally_core::validation::validate_required_text;
use tally_core::Category;
use tracing::info;

use super::ListResponse;
use crate::error::ApiResult;
use crate::middleware::CurrentUser;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateCategoryRequest {
    pub name: String,
}

/// `GET /api/categories/`
pub async fn list(State(state): State<AppState>, _user: CurrentUser) -> ApiResult<Json<ListResponse<Category>>> {
    let categories = state.db.categories().list().await?;
    Ok(Json(categories.into()))
}

/// `POST /api/categories/create/`
///
/// A name that already exists is a 400 on `name`.
pub async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    payload: Result<Json<CreateCategoryRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Category>)> {
    let Json(req) = payload?;
    let name = validate_required_text("name", &req.name, 100)?;

    let category = state.db.categories().create(&name).await?;

    info!(name = %category.name, by = %user.username, "Category created");
    Ok((StatusCode::CREATED, Json(category)))
}
