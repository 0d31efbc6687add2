/// Unit of measure endpoints
///
/// # Endpoints
///
/// - `GET /v1/units` - List units
/// - `POST /v1/units` - Create a unit
/// - `GET /v1/units/all` - Id and name of every unit
/// - `GET /v1/units/:id` - Get a unit
/// - `PUT /v1/units/:id` - Update a unit (creator or admin)
/// - `DELETE /v1/units/:id` - Delete a unit (creator or admin)

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
        status::RecordStatus,
        unit::{CreateUnit, Unit, UnitListParams, UpdateUnit},
        NamedOption,
    },
    pagination::Page,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::{Validate, ValidationError};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateUnitRequest {
    #[validate(custom(function = "unit_name"))]
    pub name: String,

    #[validate(length(max = 10, message = "Acronym must be at most 10 characters"))]
    pub acronym: Option<String>,

    #[validate(length(max = 500, message = "Description must be at most 500 characters"))]
    pub description: Option<String>,

    pub status: Option<RecordStatus>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateUnitRequest {
    #[validate(custom(function = "unit_name"))]
    pub name: Option<String>,

    #[validate(length(max = 10, message = "Acronym must be at most 10 characters"))]
    pub acronym: Option<String>,

    #[validate(length(max = 500, message = "Description must be at most 500 characters"))]
    pub description: Option<String>,

    pub status: Option<RecordStatus>,
}

fn unit_name(name: &str) -> Result<(), ValidationError> {
    let length = name.trim().chars().count();
    if !(1..=100).contains(&length) {
        return Err(ValidationError::new("length").with_message("Name must be 1 to 100 characters".into()));
    }
    Ok(())
}

async fn load(state: &AppState, id: Uuid) -> ApiResult<Unit> {
    Unit::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Unit not found".to_string()))
}

pub async fn list_units(
    State(state): State<AppState>,
    Query(params): Query<UnitListParams>,
) -> ApiResult<ApiResponse<Page<Unit>>> {
    let page = Unit::list(&state.db, &params).await?;
    Ok(ApiResponse::ok("Units fetched", page))
}

pub async fn all_units(State(state): State<AppState>) -> ApiResult<ApiResponse<Vec<NamedOption>>> {
    let options = Unit::options(&state.db).await?;
    Ok(ApiResponse::ok("Units fetched", options))
}

pub async fn create_unit(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateUnitRequest>,
) -> ApiResult<ApiResponse<Unit>> {
    req.validate()?;

    let unit = Unit::create(
        &state.db,
        CreateUnit {
            name: req.name,
            acronym: req.acronym,
            description: req.description,
            status: req.status.unwrap_or_default(),
            created_by: auth.user_id,
        },
    )
    .await?;

    tracing::info!(unit_id = %unit.id, name = %unit.name, "Unit created");
    Ok(ApiResponse::created("Unit created successfully", unit))
}

pub async fn get_unit(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<ApiResponse<Unit>> {
    Ok(ApiResponse::ok("Unit fetched", load(&state, id).await?))
}

pub async fn update_unit(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateUnitRequest>,
) -> ApiResult<ApiResponse<Unit>> {
    req.validate()?;

    let existing = load(&state, id).await?;
    require_owner_or_admin(&auth, existing.created_by)?;

    let updated = Unit::update(
        &state.db,
        &existing,
        UpdateUnit {
            name: req.name,
            acronym: req.acronym,
            description: req.description,
            status: req.status,
        },
        auth.user_id,
    )
    .await?;

    Ok(ApiResponse::ok("Unit updated successfully", updated))
}

pub async fn delete_unit(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<ApiResponse<()>> {
    let existing = load(&state, id).await?;
    require_owner_or_admin(&auth, existing.created_by)?;

    Unit::delete(&state.db, &existing, auth.user_id).await?;

    tracing::info!(unit_id = %id, deleted_by = %auth.user_id, "Unit deleted");
    Ok(ApiResponse::message("Unit deleted successfully"))
}
