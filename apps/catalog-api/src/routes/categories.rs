use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use serde::Serialize;
use utoipa::ToSchema;

use crate::db::schema::categories;
use crate::error::ApiError;
use crate::models::category::{Category, CategoryResponse};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/categories", get(list_categories))
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CategoriesResponse {
    pub data: Vec<CategoryResponse>,
}

/// `GET /api/v1/categories` — All categories, ordered by name.
#[utoipa::path(
    get,
    path = "/api/v1/categories",
    tag = "Categories",
    responses((status = 200, description = "Category list", body = CategoriesResponse)),
)]
pub async fn list_categories(
    State(state): State<AppState>,
) -> Result<Json<CategoriesResponse>, ApiError> {
    let mut conn = state.db.get().await?;

    let rows: Vec<Category> = categories::table
        .order(categories::name.asc())
        .select(Category::as_select())
        .load(&mut conn)
        .await
        .map_err(ApiError::from)?;

    let data = rows.into_iter().map(CategoryResponse::from).collect();
    Ok(Json(CategoriesResponse { data }))
}
