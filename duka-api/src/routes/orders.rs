/// Order (invoice) endpoints
///
/// # Endpoints
///
/// - `POST /v1/orders` - Create a cash or credit order
/// - `GET /v1/orders` - List orders with cashier names
/// - `GET /v1/orders/:id` - Order with its line items
/// - `DELETE /v1/orders/:id` - Delete an order (admin)
/// - `POST /v1/orders/:id/repayments` - Record a credit repayment
/// - `GET /v1/orders/:id/repayments` - Repayments of an order

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    response::ApiResponse,
};
use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use duka_shared::{
    auth::{authorization::require_admin, middleware::AuthContext},
    models::{
        credit_repayment::{CreditRepayment, RecordRepayment},
        invoice::{CreateOrder, Invoice, InvoiceListParams, InvoiceSummary, InvoiceWithLines, OrderReceipt},
        status::{PaymentMethod, SaleType},
    },
    pagination::Page,
    pricing::LineRequest,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct OrderItemRequest {
    pub product_id: Uuid,

    #[validate(range(min = 1, message = "Quantity must be greater than zero"))]
    pub quantity: i32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateOrderRequest {
    pub sale_type: SaleType,

    #[validate(length(min = 1, message = "Order must contain at least one item"), nested)]
    pub items: Vec<OrderItemRequest>,

    pub paid_amount: Decimal,

    pub customer_phone_number: Option<String>,

    /// Required for credit sales
    pub credit_due_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RepaymentRequest {
    pub amount: Decimal,

    pub payment_method: PaymentMethod,

    #[validate(length(min = 1, max = 64, message = "Transaction code must be 1 to 64 characters"))]
    pub transaction_code: Option<String>,

    pub payment_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct RepaymentReceipt {
    pub repayment: CreditRepayment,
    pub invoice: Invoice,
}

pub async fn create_order(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateOrderRequest>,
) -> ApiResult<ApiResponse<OrderReceipt>> {
    req.validate()?;
    if req.paid_amount < Decimal::ZERO {
        return Err(ApiError::invalid_field("paid_amount", "Paid amount must not be negative"));
    }

    let receipt = Invoice::create_order(
        &state.db,
        CreateOrder {
            sale_type: req.sale_type,
            items: req
                .items
                .iter()
                .map(|item| LineRequest {
                    product_id: item.product_id,
                    quantity: item.quantity,
                })
                .collect(),
            paid_amount: req.paid_amount,
            customer_phone_number: req.customer_phone_number,
            credit_due_date: req.credit_due_date,
            cashier_id: auth.user_id,
            country_code: state.config.shop.country_code.clone(),
        },
    )
    .await?;

    Ok(ApiResponse::created("Order created successfully", receipt))
}

pub async fn list_orders(
    State(state): State<AppState>,
    Query(params): Query<InvoiceListParams>,
) -> ApiResult<ApiResponse<Page<InvoiceSummary>>> {
    let page = Invoice::list(&state.db, &params).await?;
    Ok(ApiResponse::ok("Orders fetched", page))
}

pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<ApiResponse<InvoiceWithLines>> {
    let order = Invoice::find_with_lines(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Order not found".to_string()))?;

    Ok(ApiResponse::ok("Order fetched", order))
}

pub async fn delete_order(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<ApiResponse<()>> {
    require_admin(&auth)?;

    if !Invoice::delete(&state.db, id, auth.user_id).await? {
        return Err(ApiError::NotFound("Order not found".to_string()));
    }

    tracing::info!(invoice_id = %id, deleted_by = %auth.user_id, "Order deleted");
    Ok(ApiResponse::message("Order deleted successfully"))
}

pub async fn record_repayment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<RepaymentRequest>,
) -> ApiResult<ApiResponse<RepaymentReceipt>> {
    req.validate()?;
    if req.amount <= Decimal::ZERO {
        return Err(ApiError::invalid_field("amount", "Amount must be greater than zero"));
    }

    let (repayment, invoice) = CreditRepayment::record(
        &state.db,
        RecordRepayment {
            invoice_id: id,
            amount: req.amount,
            payment_method: req.payment_method,
            transaction_code: req.transaction_code,
            payment_date: req.payment_date,
            added_by: auth.user_id,
        },
    )
    .await?;

    Ok(ApiResponse::created(
        "Repayment recorded successfully",
        RepaymentReceipt { repayment, invoice },
    ))
}

pub async fn list_repayments(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<ApiResponse<Vec<CreditRepayment>>> {
    if Invoice::find_by_id(&state.db, id).await?.is_none() {
        return Err(ApiError::NotFound("Order not found".to_string()));
    }

    let repayments = CreditRepayment::list_for_invoice(&state.db, id).await?;
    Ok(ApiResponse::ok("Repayments fetched", repayments))
}
