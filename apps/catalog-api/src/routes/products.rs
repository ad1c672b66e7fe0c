use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{Json, Router};
use chrono::Utc;
use diesel::prelude::*;
use diesel_async::pooled_connection::deadpool::Object;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::middleware::AdminUser;
use crate::db::schema::{categories, products};
use crate::error::{ApiError, ApiErrorBody, FieldError};
use crate::models::category::Category;
use crate::models::product::{NewProduct, Product, ProductResponse, DEFAULT_IMAGE_URL};
use crate::AppState;

/// Largest accepted product image.
const MAX_IMAGE_BYTES: usize = 2 * 1024 * 1024;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/products", get(list_products).post(create_product))
        .route(
            "/products/{product_id}",
            get(get_product).put(update_product).delete(delete_product),
        )
        .route(
            "/products/{product_id}/image",
            put(update_product_image).layer(DefaultBodyLimit::max(4 * 1024 * 1024)),
        )
}

// ---------------------------------------------------------------------------
// GET /api/v1/products
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ListProductsQuery {
    /// Case-insensitive substring match against brand or model.
    #[serde(default)]
    pub search: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductsResponse {
    pub data: Vec<ProductResponse>,
}

/// `GET /api/v1/products` — List products with their category names.
#[utoipa::path(
    get,
    path = "/api/v1/products",
    tag = "Products",
    params(("search" = Option<String>, Query, description = "Filter by brand or model")),
    responses((status = 200, description = "Product list", body = ProductsResponse)),
)]
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ListProductsQuery>,
) -> Result<Json<ProductsResponse>, ApiError> {
    let mut conn = state.db.get().await?;

    let mut sql = products::table
        .left_join(categories::table)
        .select((Product::as_select(), categories::name.nullable()))
        .order(products::id.asc())
        .into_boxed();

    if let Some(term) = query.search.as_deref().map(str::trim) {
        if !term.is_empty() {
            let pattern = format!("%{term}%");
            sql = sql.filter(
                products::brand
                    .ilike(pattern.clone())
                    .or(products::model.ilike(pattern)),
            );
        }
    }

    let rows: Vec<(Product, Option<String>)> =
        sql.load(&mut conn).await.map_err(ApiError::from)?;

    let data = rows.into_iter().map(ProductResponse::from).collect();
    Ok(Json(ProductsResponse { data }))
}

// ---------------------------------------------------------------------------
// GET /api/v1/products/{product_id}
// ---------------------------------------------------------------------------

/// `GET /api/v1/products/{product_id}` — Product detail.
#[utoipa::path(
    get,
    path = "/api/v1/products/{product_id}",
    tag = "Products",
    responses(
        (status = 200, description = "Product detail", body = ProductResponse),
        (status = 404, description = "Unknown product", body = ApiErrorBody),
    ),
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
) -> Result<Json<ProductResponse>, ApiError> {
    let mut conn = state.db.get().await?;

    let row: (Product, Option<String>) = products::table
        .left_join(categories::table)
        .filter(products::id.eq(&product_id))
        .select((Product::as_select(), categories::name.nullable()))
        .first(&mut conn)
        .await
        .optional()
        .map_err(ApiError::from)?
        .ok_or_else(|| ApiError::not_found("Product not found"))?;

    Ok(Json(ProductResponse::from(row)))
}

// ---------------------------------------------------------------------------
// POST /api/v1/products
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateProductRequest {
    pub brand: String,
    pub model: String,
    pub description: String,
    pub price: f64,
    pub stock: i32,
    pub category_id: String,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// `POST /api/v1/products` — Add a product to the catalog. Admin only.
#[utoipa::path(
    post,
    path = "/api/v1/products",
    tag = "Products",
    request_body = CreateProductRequest,
    responses(
        (status = 201, description = "Product created", body = ProductResponse),
        (status = 400, description = "Validation failed", body = ApiErrorBody),
        (status = 401, description = "Not authenticated", body = ApiErrorBody),
        (status = 403, description = "Not an administrator", body = ApiErrorBody),
    ),
)]
pub async fn create_product(
    State(state): State<AppState>,
    admin: AdminUser,
    Json(body): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<ProductResponse>), ApiError> {
    let brand = body.brand.trim().to_string();
    let model = body.model.trim().to_string();
    let description = body.description.trim().to_string();

    let errors = validate_product_fields(&brand, &model, &description, body.price, body.stock);
    if !errors.is_empty() {
        return Err(ApiError::validation(errors));
    }

    let mut conn = state.db.get().await?;

    // The category must exist; its name also feeds the response.
    let category = find_category(&mut conn, &body.category_id).await?;

    let new_product = NewProduct {
        id: storefront_common::id::prefixed_ulid(storefront_common::id::prefix::PRODUCT),
        brand,
        model,
        description,
        price: body.price,
        stock: body.stock,
        image_url: body
            .image_url
            .unwrap_or_else(|| DEFAULT_IMAGE_URL.to_string()),
        category_id: Some(body.category_id),
    };

    let product: Product = diesel::insert_into(products::table)
        .values(&new_product)
        .returning(products::all_columns)
        .get_result(&mut conn)
        .await
        .map_err(ApiError::from)?;

    tracing::info!(product_id = %product.id, admin = %admin.username, "product created");

    Ok((
        StatusCode::CREATED,
        Json(ProductResponse::from((product, Some(category.name)))),
    ))
}

// ---------------------------------------------------------------------------
// PUT /api/v1/products/{product_id}
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateProductRequest {
    pub brand: String,
    pub model: String,
    pub description: String,
    pub price: f64,
    pub stock: i32,
    pub category_id: String,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// `PUT /api/v1/products/{product_id}` — Replace a product's editable
/// fields. Admin only.
#[utoipa::path(
    put,
    path = "/api/v1/products/{product_id}",
    tag = "Products",
    request_body = UpdateProductRequest,
    responses(
        (status = 200, description = "Product updated", body = ProductResponse),
        (status = 400, description = "Validation failed", body = ApiErrorBody),
        (status = 401, description = "Not authenticated", body = ApiErrorBody),
        (status = 403, description = "Not an administrator", body = ApiErrorBody),
        (status = 404, description = "Unknown product", body = ApiErrorBody),
    ),
)]
pub async fn update_product(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(product_id): Path<String>,
    Json(body): Json<UpdateProductRequest>,
) -> Result<Json<ProductResponse>, ApiError> {
    let brand = body.brand.trim().to_string();
    let model = body.model.trim().to_string();
    let description = body.description.trim().to_string();

    let errors = validate_product_fields(&brand, &model, &description, body.price, body.stock);
    if !errors.is_empty() {
        return Err(ApiError::validation(errors));
    }

    let mut conn = state.db.get().await?;

    let category = find_category(&mut conn, &body.category_id).await?;

    let product: Product = diesel::update(products::table.find(&product_id))
        .set((
            products::brand.eq(brand),
            products::model.eq(model),
            products::description.eq(description),
            products::price.eq(body.price),
            products::stock.eq(body.stock),
            body.image_url
                .as_deref()
                .map(|u| products::image_url.eq(u.to_string())),
            products::category_id.eq(Some(body.category_id)),
            products::updated_at.eq(Utc::now()),
        ))
        .returning(products::all_columns)
        .get_result(&mut conn)
        .await
        .optional()
        .map_err(ApiError::from)?
        .ok_or_else(|| ApiError::not_found("Product not found"))?;

    tracing::info!(product_id = %product.id, admin = %admin.username, "product updated");

    Ok(Json(ProductResponse::from((product, Some(category.name)))))
}

// ---------------------------------------------------------------------------
// DELETE /api/v1/products/{product_id}
// ---------------------------------------------------------------------------

/// `DELETE /api/v1/products/{product_id}` — Remove a product. Admin only.
#[utoipa::path(
    delete,
    path = "/api/v1/products/{product_id}",
    tag = "Products",
    responses(
        (status = 204, description = "Product deleted"),
        (status = 401, description = "Not authenticated", body = ApiErrorBody),
        (status = 403, description = "Not an administrator", body = ApiErrorBody),
        (status = 404, description = "Unknown product", body = ApiErrorBody),
    ),
)]
pub async fn delete_product(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(product_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let mut conn = state.db.get().await?;

    let deleted = diesel::delete(products::table.find(&product_id))
        .execute(&mut conn)
        .await
        .map_err(ApiError::from)?;

    if deleted == 0 {
        return Err(ApiError::not_found("Product not found"));
    }

    tracing::info!(product_id = %product_id, admin = %admin.username, "product deleted");

    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// PUT /api/v1/products/{product_id}/image
// ---------------------------------------------------------------------------

/// `PUT /api/v1/products/{product_id}/image` — Replace a product's image.
/// Admin only.
///
/// Accepts a multipart `image` field, JPEG or PNG up to 2 MiB. The file
/// type is decided by content sniffing, not the client-supplied MIME type.
/// The previous upload (if any) is removed before the new file is stored.
#[utoipa::path(
    put,
    path = "/api/v1/products/{product_id}/image",
    tag = "Products",
    responses(
        (status = 200, description = "Image updated", body = ProductResponse),
        (status = 400, description = "Missing or invalid image", body = ApiErrorBody),
        (status = 401, description = "Not authenticated", body = ApiErrorBody),
        (status = 403, description = "Not an administrator", body = ApiErrorBody),
        (status = 404, description = "Unknown product", body = ApiErrorBody),
    ),
)]
pub async fn update_product_image(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(product_id): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<ProductResponse>, ApiError> {
    let mut conn = state.db.get().await?;

    let (product, category_name): (Product, Option<String>) = products::table
        .left_join(categories::table)
        .filter(products::id.eq(&product_id))
        .select((Product::as_select(), categories::name.nullable()))
        .first(&mut conn)
        .await
        .optional()
        .map_err(ApiError::from)?
        .ok_or_else(|| ApiError::not_found("Product not found"))?;

    let data = read_image_field(&mut multipart).await?;

    if data.len() > MAX_IMAGE_BYTES {
        return Err(ApiError::validation(vec![FieldError {
            field: "image".into(),
            message: "Image must be 2MB or smaller".into(),
        }]));
    }

    let extension = sniff_image_extension(&data).ok_or_else(|| {
        ApiError::validation(vec![FieldError {
            field: "image".into(),
            message: "Only JPEG and PNG images are accepted".into(),
        }])
    })?;

    let file_name = format!("{}.{}", product.id, extension);

    tokio::fs::create_dir_all(&state.config.upload_dir)
        .await
        .map_err(|e| {
            tracing::error!(?e, "failed to create upload directory");
            ApiError::internal("Failed to store image")
        })?;

    // Drop the previous upload, unless the product still carries the
    // placeholder. Extension changes leave no orphan this way.
    if product.image_url != DEFAULT_IMAGE_URL {
        if let Some(old_name) = product.image_url.rsplit('/').next() {
            if !old_name.is_empty() && old_name != file_name {
                let _ = tokio::fs::remove_file(state.config.upload_dir.join(old_name)).await;
            }
        }
    }

    tokio::fs::write(state.config.upload_dir.join(&file_name), &data)
        .await
        .map_err(|e| {
            tracing::error!(?e, "failed to write image file");
            ApiError::internal("Failed to store image")
        })?;

    let image_url = format!("{}{}", state.config.upload_url, file_name);

    let product: Product = diesel::update(products::table.find(&product.id))
        .set((
            products::image_url.eq(&image_url),
            products::updated_at.eq(Utc::now()),
        ))
        .returning(products::all_columns)
        .get_result(&mut conn)
        .await
        .map_err(ApiError::from)?;

    tracing::info!(product_id = %product.id, admin = %admin.username, "product image updated");

    Ok(Json(ProductResponse::from((product, category_name))))
}

/// Pull the bytes of the `image` field out of the multipart body.
async fn read_image_field(multipart: &mut Multipart) -> Result<Bytes, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::bad_request("Malformed multipart body"))?
    {
        if field.name() == Some("image") {
            return field
                .bytes()
                .await
                .map_err(|_| ApiError::bad_request("Failed to read image field"));
        }
    }
    Err(ApiError::bad_request("An image file field is required"))
}

/// Decide the stored file extension from the file's magic bytes.
fn sniff_image_extension(data: &[u8]) -> Option<&'static str> {
    if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("jpg")
    } else if data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
        Some("png")
    } else {
        None
    }
}

/// Load the referenced category, or fail with a field-level validation
/// error the same way the other form checks do.
async fn find_category(
    conn: &mut Object<AsyncPgConnection>,
    category_id: &str,
) -> Result<Category, ApiError> {
    categories::table
        .find(category_id)
        .select(Category::as_select())
        .first(conn)
        .await
        .optional()
        .map_err(ApiError::from)?
        .ok_or_else(|| {
            ApiError::validation(vec![FieldError {
                field: "category_id".into(),
                message: "Unknown category".into(),
            }])
        })
}

fn validate_product_fields(
    brand: &str,
    model: &str,
    description: &str,
    price: f64,
    stock: i32,
) -> Vec<FieldError> {
    let mut errors: Vec<FieldError> = Vec::new();

    if brand.is_empty() {
        errors.push(FieldError {
            field: "brand".into(),
            message: "Brand is required".into(),
        });
    }
    if model.is_empty() {
        errors.push(FieldError {
            field: "model".into(),
            message: "Model is required".into(),
        });
    }
    if description.is_empty() {
        errors.push(FieldError {
            field: "description".into(),
            message: "Description is required".into(),
        });
    }
    if !price.is_finite() || price <= 0.0 {
        errors.push(FieldError {
            field: "price".into(),
            message: "Price must be greater than zero".into(),
        });
    }
    if stock < 0 {
        errors.push(FieldError {
            field: "stock".into(),
            message: "Stock cannot be negative".into(),
        });
    }

    errors
}
