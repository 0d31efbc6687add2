/// Authentication endpoints
///
/// # Endpoints
///
/// - `POST /v1/auth/register` - Register a user (first user becomes admin)
/// - `POST /v1/auth/login` - Login and get tokens
/// - `POST /v1/auth/refresh` - Exchange a refresh token for a new access token
/// - `GET /v1/auth/me` - Profile of the authenticated user

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    response::ApiResponse,
};
use axum::{extract::State, Extension, Json};
use duka_shared::{
    auth::{
        jwt::{self, TokenPair},
        middleware::AuthContext,
        password,
    },
    models::user::User,
};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// Register request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(custom(function = "trimmed_name"))]
    pub name: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 8, max = 128, message = "Password must be 8 to 128 characters"))]
    pub password: String,

    pub confirm_password: String,
}

fn trimmed_name(name: &str) -> Result<(), ValidationError> {
    let length = name.trim().chars().count();
    if !(2..=50).contains(&length) {
        return Err(ValidationError::new("length").with_message("Name must be 2 to 50 characters".into()));
    }
    Ok(())
}

impl RegisterRequest {
    fn check(&self) -> ApiResult<()> {
        self.validate()?;
        if self.password != self.confirm_password {
            return Err(ApiError::invalid_field("confirm_password", "Passwords do not match"));
        }
        Ok(())
    }
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
}

/// Refresh token request
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Refresh token response
#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    /// New access token (24h)
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// User plus a fresh token pair
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub user: User,

    #[serde(flatten)]
    pub tokens: TokenPair,
}

/// Register a new user
///
/// The first account ever created becomes `ADMIN`; later ones are
/// `CASHIER`.
///
/// # Errors
///
/// - `422 Unprocessable Entity`: Validation failed
/// - `409 Conflict`: Email already exists
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<ApiResponse<SessionResponse>> {
    req.check()?;

    let password_hash = password::hash_password(&req.password)?;
    let user = User::register(&state.db, req.name.trim().to_string(), req.email.trim().to_string(), password_hash).await?;

    let tokens = jwt::issue_token_pair(user.id, user.role, state.jwt_secret())?;

    tracing::info!(user_id = %user.id, role = user.role.as_str(), "User registered");

    Ok(ApiResponse::created(
        "User registered successfully",
        SessionResponse { user, tokens },
    ))
}

/// Login endpoint
///
/// Unknown email and wrong password share one message so the response
/// does not reveal which accounts exist.
///
/// # Errors
///
/// - `401 Unauthorized`: Invalid credentials
/// - `403 Forbidden`: User is banned
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<ApiResponse<SessionResponse>> {
    req.validate()?;

    let invalid = || ApiError::Unauthorized("Invalid email or password".to_string());

    let user = User::find_by_email(&state.db, req.email.trim())
        .await?
        .ok_or_else(invalid)?;

    if !password::verify_password(&req.password, &user.password_hash)? {
        tracing::warn!(user_id = %user.id, "Failed login attempt");
        return Err(invalid());
    }

    if user.banned {
        return Err(ApiError::Forbidden("This account has been banned".to_string()));
    }

    User::update_last_login(&state.db, user.id).await?;

    let tokens = jwt::issue_token_pair(user.id, user.role, state.jwt_secret())?;

    tracing::info!(user_id = %user.id, "User logged in");

    Ok(ApiResponse::ok("Login successful", SessionResponse { user, tokens }))
}

/// Token refresh endpoint
///
/// The role is re-read from the database so a demotion or ban takes effect
/// at the next refresh.
///
/// # Errors
///
/// - `401 Unauthorized`: Invalid or expired refresh token, or user gone
/// - `403 Forbidden`: User is banned
pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> ApiResult<ApiResponse<RefreshResponse>> {
    let claims = jwt::validate_refresh_token(&req.refresh_token, state.jwt_secret())?;

    let user = User::find_by_id(&state.db, claims.sub)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("User no longer exists".to_string()))?;

    if user.banned {
        return Err(ApiError::Forbidden("This account has been banned".to_string()));
    }

    let access = jwt::Claims::new(user.id, user.role, jwt::TokenType::Access);
    let access_token = jwt::create_token(&access, state.jwt_secret())?;

    Ok(ApiResponse::ok(
        "Token refreshed",
        RefreshResponse {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: jwt::TokenType::Access.default_expiration().num_seconds(),
        },
    ))
}

/// Profile of the caller
pub async fn me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<ApiResponse<User>> {
    let user = User::find_by_id(&state.db, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(ApiResponse::ok("Profile fetched", user))
}
