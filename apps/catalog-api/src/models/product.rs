use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::Serialize;
use utoipa::ToSchema;

use crate::db::schema::products;

/// Image URL assigned to products created without one.
pub const DEFAULT_IMAGE_URL: &str = "https://via.placeholder.com/150";

/// Full product row from the database.
#[derive(Debug, Queryable, Selectable, Serialize)]
#[diesel(table_name = products)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Product {
    pub id: String,
    pub brand: String,
    pub model: String,
    pub description: String,
    pub price: f64,
    pub stock: i32,
    pub image_url: String,
    pub category_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_deleted: bool,
}

/// Insertable struct for creating a new product.
#[derive(Debug, Insertable)]
#[diesel(table_name = products)]
pub struct NewProduct {
    pub id: String,
    pub brand: String,
    pub model: String,
    pub description: String,
    pub price: f64,
    pub stock: i32,
    pub image_url: String,
    pub category_id: Option<String>,
}

/// Public-facing product response, with the category name resolved via the
/// list/detail queries' LEFT JOIN.
#[derive(Debug, Serialize, ToSchema)]
pub struct ProductResponse {
    pub id: String,
    pub brand: String,
    pub model: String,
    pub description: String,
    pub price: f64,
    pub stock: i32,
    pub image_url: String,
    pub category_id: Option<String>,
    pub category_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<(Product, Option<String>)> for ProductResponse {
    fn from((p, category_name): (Product, Option<String>)) -> Self {
        Self {
            id: p.id,
            brand: p.brand,
            model: p.model,
            description: p.description,
            price: p.price,
            stock: p.stock,
            image_url: p.image_url,
            category_id: p.category_id,
            category_name,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}
