/// Product category endpoints
///
/// # Endpoints
///
/// - `GET /v1/categories` - List categories
/// - `POST /v1/categories` - Create a category
/// - `GET /v1/categories/all` - Id and name of every category
/// - `GET /v1/categories/:id` - Get a category
/// - `PUT /v1/categories/:id` - Update a category (creator or admin)
/// - `DELETE /v1/categories/:id` - Delete a category (creator or admin)

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
        category::{Category, CategoryListParams, CreateCategory, UpdateCategory},
        status::RecordStatus,
        NamedOption,
    },
    pagination::Page,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::{Validate, ValidationError};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCategoryRequest {
    #[validate(custom(function = "category_name"))]
    pub name: String,

    #[validate(length(max = 500, message = "Description must be at most 500 characters"))]
    pub description: Option<String>,

    pub status: Option<RecordStatus>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCategoryRequest {
    #[validate(custom(function = "category_name"))]
    pub name: Option<String>,

    #[validate(length(max = 500, message = "Description must be at most 500 characters"))]
    pub description: Option<String>,

    pub status: Option<RecordStatus>,
}

fn category_name(name: &str) -> Result<(), ValidationError> {
    let length = name.trim().chars().count();
    if !(2..=100).contains(&length) {
        return Err(ValidationError::new("length").with_message("Name must be 2 to 100 characters".into()));
    }
    Ok(())
}

async fn load(state: &AppState, id: Uuid) -> ApiResult<Category> {
    Category::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Category not found".to_string()))
}

pub async fn list_categories(
    State(state): State<AppState>,
    Query(params): Query<CategoryListParams>,
) -> ApiResult<ApiResponse<Page<Category>>> {
    let page = Category::list(&state.db, &params).await?;
    Ok(ApiResponse::ok("Categories fetched", page))
}

pub async fn all_categories(State(state): State<AppState>) -> ApiResult<ApiResponse<Vec<NamedOption>>> {
    let options = Category::options(&state.db).await?;
    Ok(ApiResponse::ok("Categories fetched", options))
}

pub async fn create_category(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateCategoryRequest>,
) -> ApiResult<ApiResponse<Category>> {
    req.validate()?;

    let category = Category::create(
        &state.db,
        CreateCategory {
            name: req.name,
            description: req.description,
            status: req.status.unwrap_or_default(),
            created_by: auth.user_id,
        },
    )
    .await?;

    tracing::info!(category_id = %category.id, name = %category.name, "Category created");
    Ok(ApiResponse::created("Category created successfully", category))
}

pub async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<ApiResponse<Category>> {
    Ok(ApiResponse::ok("Category fetched", load(&state, id).await?))
}

pub async fn update_category(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateCategoryRequest>,
) -> ApiResult<ApiResponse<Category>> {
    req.validate()?;

    let existing = load(&state, id).await?;
    require_owner_or_admin(&auth, existing.created_by)?;

    let updated = Category::update(
        &state.db,
        &existing,
        UpdateCategory {
            name: req.name,
            description: req.description,
            status: req.status,
        },
        auth.user_id,
    )
    .await?;

    Ok(ApiResponse::ok("Category updated successfully", updated))
}

pub async fn delete_category(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<ApiResponse<()>> {
    let existing = load(&state, id).await?;
    require_owner_or_admin(&auth, existing.created_by)?;

    Category::delete(&state.db, &existing, auth.user_id).await?;

    tracing::info!(category_id = %id, deleted_by = %auth.user_id, "Category deleted");
    Ok(ApiResponse::message("Category deleted successfully"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_name_rules() {
        assert!(category_name("Cereals").is_ok());
        assert!(category_name("  x  ").is_err());
        assert!(category_name(&"a".repeat(101)).is_err());
    }
}
