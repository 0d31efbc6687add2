/// Product catalogue and stock endpoints
///
/// # Endpoints
///
/// - `GET /v1/products` - List products with category and unit
/// - `POST /v1/products` - Create a product
/// - `GET /v1/products/all` - Id and name of every product
/// - `POST /v1/products/by-ids` - Products for a cart
/// - `GET /v1/products/low-stock` - Products at or below minimum stock
/// - `GET /v1/products/:id` - Get a product
/// - `PUT /v1/products/:id` - Update a product (creator or admin)
/// - `DELETE /v1/products/:id` - Delete a product (creator or admin)
/// - `PUT /v1/products/:id/stock` - Set the stock level
/// - `GET /v1/products/:id/stock-history` - Stock movements of a product

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    response::ApiResponse,
};
use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use duka_shared::{
    auth::{authorization::require_owner_or_admin, middleware::AuthContext},
    models::{
        product::{CreateProduct, Product, ProductListParams, ProductWithRefs, StockAdjustment, UpdateProduct},
        status::RecordStatus,
        stock_history::StockHistory,
        NamedOption,
    },
    pagination::Page,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateProductRequest {
    #[validate(length(min = 1, max = 64, message = "Code must be 1 to 64 characters"))]
    pub code: String,

    #[validate(length(min = 2, max = 200, message = "Name must be 2 to 200 characters"))]
    pub name: String,

    #[validate(length(max = 1000, message = "Description must be at most 1000 characters"))]
    pub description: Option<String>,

    pub category_id: Uuid,

    pub unit_id: Uuid,

    pub purchase_price: Decimal,

    pub selling_price: Decimal,

    #[validate(range(min = 1, message = "Available stock must be at least 1"))]
    pub available_stock: i32,

    #[validate(range(min = 0, message = "Minimum stock must not be negative"))]
    #[serde(default)]
    pub minimum_stock: i32,

    #[validate(length(max = 500, message = "Image URL must be at most 500 characters"))]
    pub image_url: Option<String>,

    pub status: Option<RecordStatus>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProductRequest {
    #[validate(length(min = 1, max = 64, message = "Code must be 1 to 64 characters"))]
    pub code: Option<String>,

    #[validate(length(min = 2, max = 200, message = "Name must be 2 to 200 characters"))]
    pub name: Option<String>,

    #[validate(length(max = 1000, message = "Description must be at most 1000 characters"))]
    pub description: Option<String>,

    pub category_id: Option<Uuid>,

    pub unit_id: Option<Uuid>,

    pub purchase_price: Option<Decimal>,

    pub selling_price: Option<Decimal>,

    #[validate(range(min = 0, message = "Available stock must not be negative"))]
    pub available_stock: Option<i32>,

    #[validate(range(min = 0, message = "Minimum stock must not be negative"))]
    pub minimum_stock: Option<i32>,

    #[validate(length(max = 500, message = "Image URL must be at most 500 characters"))]
    pub image_url: Option<String>,

    pub status: Option<RecordStatus>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ProductIdsRequest {
    #[validate(length(min = 1, message = "At least one product id is required"))]
    pub ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SetStockRequest {
    #[validate(range(min = 0, message = "Stock must not be negative"))]
    pub available_stock: i32,

    #[validate(length(min = 1, max = 100, message = "Reason must be 1 to 100 characters"))]
    pub reason: String,

    #[validate(length(max = 500, message = "Note must be at most 500 characters"))]
    pub note: Option<String>,
}

/// Prices are money: at least 1 and at most two decimal places
fn check_price(field: &str, price: Option<Decimal>) -> ApiResult<()> {
    match price {
        Some(p) if p < Decimal::ONE => Err(ApiError::invalid_field(field, "Price must be at least 1")),
        Some(p) if p.scale() > 2 && p != p.round_dp(2) => {
            Err(ApiError::invalid_field(field, "Price must have at most two decimal places"))
        }
        _ => Ok(()),
    }
}

async fn load(state: &AppState, id: Uuid) -> ApiResult<Product> {
    Product::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Product not found".to_string()))
}

pub async fn list_products(
    State(state): State<AppState>,
    Query(params): Query<ProductListParams>,
) -> ApiResult<ApiResponse<Page<ProductWithRefs>>> {
    let page = Product::list(&state.db, &params).await?;
    Ok(ApiResponse::ok("Products fetched", page))
}

pub async fn all_products(State(state): State<AppState>) -> ApiResult<ApiResponse<Vec<NamedOption>>> {
    let options = Product::options(&state.db).await?;
    Ok(ApiResponse::ok("Products fetched", options))
}

pub async fn products_by_ids(
    State(state): State<AppState>,
    Json(req): Json<ProductIdsRequest>,
) -> ApiResult<ApiResponse<Vec<ProductWithRefs>>> {
    req.validate()?;
    let products = Product::find_by_ids(&state.db, &req.ids).await?;
    Ok(ApiResponse::ok("Products fetched", products))
}

pub async fn low_stock_products(
    State(state): State<AppState>,
) -> ApiResult<ApiResponse<Vec<ProductWithRefs>>> {
    let products = Product::low_stock(&state.db).await?;
    Ok(ApiResponse::ok("Low stock products fetched", products))
}

pub async fn create_product(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateProductRequest>,
) -> ApiResult<ApiResponse<Product>> {
    req.validate()?;
    check_price("purchase_price", Some(req.purchase_price))?;
    check_price("selling_price", Some(req.selling_price))?;

    let product = Product::create(
        &state.db,
        CreateProduct {
            code: req.code,
            name: req.name,
            description: req.description,
            category_id: req.category_id,
            unit_id: req.unit_id,
            purchase_price: req.purchase_price,
            selling_price: req.selling_price,
            available_stock: req.available_stock,
            minimum_stock: req.minimum_stock,
            image_url: req.image_url,
            status: req.status.unwrap_or_default(),
            created_by: auth.user_id,
        },
    )
    .await?;

    Ok(ApiResponse::created("Product created successfully", product))
}

pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<ApiResponse<ProductWithRefs>> {
    let product = Product::find_with_refs(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Product not found".to_string()))?;

    Ok(ApiResponse::ok("Product fetched", product))
}

pub async fn update_product(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateProductRequest>,
) -> ApiResult<ApiResponse<Product>> {
    req.validate()?;
    check_price("purchase_price", req.purchase_price)?;
    check_price("selling_price", req.selling_price)?;

    let existing = load(&state, id).await?;
    require_owner_or_admin(&auth, existing.created_by)?;

    let updated = Product::update(
        &state.db,
        existing.id,
        UpdateProduct {
            code: req.code,
            name: req.name,
            description: req.description,
            category_id: req.category_id,
            unit_id: req.unit_id,
            purchase_price: req.purchase_price,
            selling_price: req.selling_price,
            available_stock: req.available_stock,
            minimum_stock: req.minimum_stock,
            image_url: req.image_url,
            status: req.status,
        },
        auth.user_id,
    )
    .await?;

    Ok(ApiResponse::ok("Product updated successfully", updated))
}

pub async fn delete_product(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<ApiResponse<()>> {
    let existing = load(&state, id).await?;
    require_owner_or_admin(&auth, existing.created_by)?;

    Product::delete(&state.db, &existing, auth.user_id).await?;

    tracing::info!(product_id = %id, deleted_by = %auth.user_id, "Product deleted");
    Ok(ApiResponse::message("Product deleted successfully"))
}

pub async fn set_stock(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<SetStockRequest>,
) -> ApiResult<ApiResponse<Product>> {
    req.validate()?;

    let adjustment = Product::set_stock(
        &state.db,
        id,
        req.available_stock,
        req.reason.trim(),
        req.note,
        auth.user_id,
    )
    .await?;

    Ok(match adjustment {
        StockAdjustment::Unchanged(product) => ApiResponse::ok("Stock level unchanged", product),
        StockAdjustment::Updated(product) => ApiResponse::ok("Stock updated successfully", product),
    })
}

pub async fn stock_history(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<ApiResponse<Vec<StockHistory>>> {
    load(&state, id).await?;
    let history = StockHistory::for_product(&state.db, id).await?;
    Ok(ApiResponse::ok("Stock history fetched", history))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_check_price() {
        assert!(check_price("selling_price", None).is_ok());
        assert!(check_price("selling_price", Some(Decimal::from(1))).is_ok());
        assert!(check_price("selling_price", Some(Decimal::from_str("99.50").unwrap())).is_ok());
        assert!(check_price("selling_price", Some(Decimal::from_str("0.99").unwrap())).is_err());
        assert!(check_price("selling_price", Some(Decimal::from_str("10.005").unwrap())).is_err());
    }

    #[test]
    fn test_set_stock_request_validation() {
        let ok = SetStockRequest {
            available_stock: 0,
            reason: "STOCK_TAKE".to_string(),
            note: None,
        };
        assert!(ok.validate().is_ok());

        let negative = SetStockRequest {
            available_stock: -1,
            reason: String::new(),
            note: None,
        };
        let errors = negative.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("available_stock"));
        assert!(errors.field_errors().contains_key("reason"));
    }
}
