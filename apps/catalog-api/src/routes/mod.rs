pub mod auth;
pub mod categories;
pub mod health;
pub mod products;

use axum::Router;
use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::session::middleware::SESSION_COOKIE;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new().merge(health::router()).nest(
        "/api/v1",
        auth::router()
            .merge(products::router())
            .merge(categories::router()),
    )
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "session",
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::new(SESSION_COOKIE))),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        // Health
        health::health,
        // Auth
        auth::login,
        auth::logout,
        auth::session_info,
        // Products
        products::list_products,
        products::get_product,
        products::create_product,
        products::update_product,
        products::delete_product,
        products::update_product_image,
        // Categories
        categories::list_categories,
    ),
    components(
        schemas(
            // Error types
            crate::error::ApiErrorBody,
            crate::error::ApiErrorDetail,
            crate::error::FieldError,
            // Models
            crate::models::product::ProductResponse,
            crate::models::category::CategoryResponse,
            // Route request/response types
            health::HealthResponse,
            auth::LoginRequest,
            auth::SessionResponse,
            products::ProductsResponse,
            products::CreateProductRequest,
            products::UpdateProductRequest,
            categories::CategoriesResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check"),
        (name = "Auth", description = "Login, logout, and session state"),
        (name = "Products", description = "Catalog products"),
        (name = "Categories", description = "Product categories"),
    )
)]
pub struct ApiDoc;
