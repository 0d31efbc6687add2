/// Credit customer endpoints
///
/// # Endpoints
///
/// - `GET /v1/customers` - List customers
/// - `POST /v1/customers` - Create a customer
/// - `GET /v1/customers/:id` - Get a customer
/// - `PUT /v1/customers/:id` - Update a customer (creator or admin)
/// - `DELETE /v1/customers/:id` - Delete a customer (creator or admin)
/// - `POST /v1/customers/:id/credit-limit` - Set a new credit limit (admin)
/// - `GET /v1/customers/:id/credit-limits` - Credit limit history

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
        authorization::{require_admin, require_owner_or_admin},
        middleware::AuthContext,
    },
    models::{
        credit_limit::CreditLimit,
        customer::{CreateCustomer, Customer, CustomerListParams, UpdateCustomer},
        status::{CustomerStatus, RecordStatus},
    },
    pagination::Page,
    phone::parse_phone,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;
use validator::{Validate, ValidationError};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCustomerRequest {
    #[validate(custom(function = "customer_name"))]
    pub name: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    pub phone_number: String,

    #[validate(length(min = 4, max = 20, message = "National id must be 4 to 20 characters"))]
    pub national_id: String,

    #[validate(url(message = "Invalid image url"))]
    pub img_url: Option<String>,

    #[validate(length(max = 255, message = "Address must be at most 255 characters"))]
    pub address: Option<String>,

    pub status: Option<CustomerStatus>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCustomerRequest {
    #[validate(custom(function = "customer_name"))]
    pub name: Option<String>,

    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    pub phone_number: Option<String>,

    #[validate(length(min = 4, max = 20, message = "National id must be 4 to 20 characters"))]
    pub national_id: Option<String>,

    #[validate(url(message = "Invalid image url"))]
    pub img_url: Option<String>,

    #[validate(length(max = 255, message = "Address must be at most 255 characters"))]
    pub address: Option<String>,

    pub credit_status: Option<RecordStatus>,

    pub status: Option<CustomerStatus>,
}

#[derive(Debug, Deserialize)]
pub struct CreditLimitRequest {
    /// Zero removes the limit
    pub limit_amount: Decimal,
}

fn customer_name(name: &str) -> Result<(), ValidationError> {
    let length = name.trim().chars().count();
    if !(2..=100).contains(&length) {
        return Err(ValidationError::new("length").with_message("Name must be 2 to 100 characters".into()));
    }
    Ok(())
}

fn phone_for(state: &AppState, raw: &str) -> ApiResult<String> {
    parse_phone(raw, &state.config.shop.country_code)
        .ok_or_else(|| ApiError::invalid_field("phone_number", "Invalid phone number"))
}

async fn load(state: &AppState, id: Uuid) -> ApiResult<Customer> {
    Customer::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Customer not found".to_string()))
}

pub async fn list_customers(
    State(state): State<AppState>,
    Query(params): Query<CustomerListParams>,
) -> ApiResult<ApiResponse<Page<Customer>>> {
    let page = Customer::list(&state.db, &params).await?;
    Ok(ApiResponse::ok("Customers fetched", page))
}

pub async fn create_customer(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateCustomerRequest>,
) -> ApiResult<ApiResponse<Customer>> {
    req.validate()?;
    let phone_number = phone_for(&state, &req.phone_number)?;

    let customer = Customer::create(
        &state.db,
        CreateCustomer {
            name: req.name,
            email: req.email,
            phone_number,
            national_id: req.national_id,
            img_url: req.img_url,
            address: req.address,
            status: req.status.unwrap_or_default(),
            created_by: auth.user_id,
        },
    )
    .await?;

    tracing::info!(customer_id = %customer.id, "Customer created");
    Ok(ApiResponse::created("Customer created successfully", customer))
}

pub async fn get_customer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<ApiResponse<Customer>> {
    Ok(ApiResponse::ok("Customer fetched", load(&state, id).await?))
}

pub async fn update_customer(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateCustomerRequest>,
) -> ApiResult<ApiResponse<Customer>> {
    req.validate()?;

    let existing = load(&state, id).await?;
    require_owner_or_admin(&auth, existing.created_by)?;

    let phone_number = match req.phone_number.as_deref() {
        Some(raw) => Some(phone_for(&state, raw)?),
        None => None,
    };

    let updated = Customer::update(
        &state.db,
        &existing,
        UpdateCustomer {
            name: req.name,
            email: req.email,
            phone_number,
            national_id: req.national_id,
            img_url: req.img_url,
            address: req.address,
            credit_status: req.credit_status,
            status: req.status,
        },
        auth.user_id,
    )
    .await?;

    Ok(ApiResponse::ok("Customer updated successfully", updated))
}

pub async fn delete_customer(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<ApiResponse<()>> {
    let existing = load(&state, id).await?;
    require_owner_or_admin(&auth, existing.created_by)?;

    Customer::delete(&state.db, &existing, auth.user_id).await?;

    tracing::info!(customer_id = %id, deleted_by = %auth.user_id, "Customer deleted");
    Ok(ApiResponse::message("Customer deleted successfully"))
}

pub async fn set_credit_limit(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<CreditLimitRequest>,
) -> ApiResult<ApiResponse<CreditLimit>> {
    require_admin(&auth)?;

    if req.limit_amount < Decimal::ZERO {
        return Err(ApiError::invalid_field("limit_amount", "Credit limit cannot be negative"));
    }

    let limit = CreditLimit::set(&state.db, id, req.limit_amount.round_dp(2), auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Customer not found".to_string()))?;

    Ok(ApiResponse::created("Credit limit set successfully", limit))
}

pub async fn list_credit_limits(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<ApiResponse<Vec<CreditLimit>>> {
    load(&state, id).await?;
    let limits = CreditLimit::list_for_customer(&state.db, id).await?;
    Ok(ApiResponse::ok("Credit limits fetched", limits))
}
