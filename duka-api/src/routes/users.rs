/// Staff account management
///
/// # Endpoints
///
/// - `GET /v1/users` - List users
/// - `POST /v1/users` - Add a user (admin)
/// - `GET /v1/users/count` - Number of users
/// - `GET /v1/users/lookup?email=` - User id for an email
/// - `GET /v1/users/:id` - Get a user
/// - `PUT /v1/users/:id` - Update a user (admin)
/// - `DELETE /v1/users/:id` - Delete a user (admin, not yourself)

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
    auth::{
        authorization::{forbid_self, require_admin},
        middleware::AuthContext,
        password,
    },
    models::{
        status::UserRole,
        user::{CreateUser, UpdateUser, User, UserListParams},
    },
    pagination::Page,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(length(min = 2, max = 50, message = "Name must be 2 to 50 characters"))]
    pub name: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    pub role: UserRole,

    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[validate(length(min = 2, max = 50, message = "Name must be 2 to 50 characters"))]
    pub name: Option<String>,

    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    pub role: Option<UserRole>,

    /// New password, hashed before storage
    pub password: Option<String>,

    pub banned: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct LookupQuery {
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct UserIdResponse {
    pub id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct CountResponse {
    pub count: i64,
}

fn hash_new_password(raw: &str) -> ApiResult<String> {
    password::validate_password_length(raw).map_err(|e| ApiError::invalid_field("password", e))?;
    Ok(password::hash_password(raw)?)
}

pub async fn list_users(
    State(state): State<AppState>,
    Query(params): Query<UserListParams>,
) -> ApiResult<ApiResponse<Page<User>>> {
    let page = User::list(&state.db, &params).await?;
    Ok(ApiResponse::ok("Users fetched", page))
}

pub async fn create_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateUserRequest>,
) -> ApiResult<ApiResponse<User>> {
    require_admin(&auth)?;
    req.validate()?;

    let password_hash = hash_new_password(&req.password)?;

    let user = User::create(
        &state.db,
        CreateUser {
            name: req.name.trim().to_string(),
            email: req.email.trim().to_string(),
            password_hash,
            role: req.role,
        },
    )
    .await?;

    tracing::info!(user_id = %user.id, created_by = %auth.user_id, "User added");
    Ok(ApiResponse::created("User created successfully", user))
}

pub async fn count_users(State(state): State<AppState>) -> ApiResult<ApiResponse<CountResponse>> {
    let count = User::count(&state.db).await?;
    Ok(ApiResponse::ok("User count fetched", CountResponse { count }))
}

pub async fn lookup_user(
    State(state): State<AppState>,
    Query(query): Query<LookupQuery>,
) -> ApiResult<ApiResponse<UserIdResponse>> {
    let id = User::id_by_email(&state.db, query.email.trim())
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(ApiResponse::ok("User found", UserIdResponse { id }))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<ApiResponse<User>> {
    let user = User::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(ApiResponse::ok("User fetched", user))
}

pub async fn update_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateUserRequest>,
) -> ApiResult<ApiResponse<User>> {
    require_admin(&auth)?;
    req.validate()?;

    let password_hash = match req.password.as_deref().filter(|p| !p.is_empty()) {
        Some(raw) => Some(hash_new_password(raw)?),
        None => None,
    };

    let user = User::update(
        &state.db,
        id,
        UpdateUser {
            name: req.name.map(|n| n.trim().to_string()),
            email: req.email.map(|e| e.trim().to_string()),
            role: req.role,
            password_hash,
            banned: req.banned,
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    tracing::info!(user_id = %user.id, updated_by = %auth.user_id, "User updated");
    Ok(ApiResponse::ok("User updated successfully", user))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<ApiResponse<()>> {
    require_admin(&auth)?;
    forbid_self(&auth, id)?;

    if !User::delete(&state.db, id).await? {
        return Err(ApiError::NotFound("User not found".to_string()));
    }

    tracing::info!(user_id = %id, deleted_by = %auth.user_id, "User deleted");
    Ok(ApiResponse::message("User deleted successfully"))
}
