/// Shop expense endpoints
///
/// # Endpoints
///
/// - `GET /v1/expenses?from=&to=` - List expenses in a date range
/// - `POST /v1/expenses` - Record an expense
/// - `GET /v1/expenses/:id` - Get an expense
/// - `DELETE /v1/expenses/:id` - Delete an expense (creator or admin)

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    response::ApiResponse,
};
use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use duka_shared::{
    auth::{authorization::require_owner_or_admin, middleware::AuthContext},
    models::expense::{CreateExpense, Expense, ExpenseListParams},
    pagination::Page,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateExpenseRequest {
    #[validate(length(min = 2, max = 255, message = "Description must be 2 to 255 characters"))]
    pub description: String,

    pub amount: Decimal,

    pub expense_date: Option<DateTime<Utc>>,
}

impl CreateExpenseRequest {
    fn check(&self) -> ApiResult<()> {
        self.validate()?;
        if self.amount <= Decimal::ZERO {
            return Err(ApiError::invalid_field("amount", "Amount must be greater than zero"));
        }
        Ok(())
    }
}

async fn load(state: &AppState, id: Uuid) -> ApiResult<Expense> {
    Expense::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Expense not found".to_string()))
}

pub async fn list_expenses(
    State(state): State<AppState>,
    Query(params): Query<ExpenseListParams>,
) -> ApiResult<ApiResponse<Page<Expense>>> {
    if let (Some(from), Some(to)) = (params.from, params.to) {
        if from > to {
            return Err(ApiError::BadRequest("'from' must not be after 'to'".to_string()));
        }
    }

    let page = Expense::list(&state.db, &params).await?;
    Ok(ApiResponse::ok("Expenses fetched", page))
}

pub async fn create_expense(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateExpenseRequest>,
) -> ApiResult<ApiResponse<Expense>> {
    req.check()?;

    let expense = Expense::create(
        &state.db,
        CreateExpense {
            description: req.description.trim().to_string(),
            amount: req.amount.round_dp(2),
            expense_date: req.expense_date,
            created_by: auth.user_id,
        },
    )
    .await?;

    tracing::info!(expense_id = %expense.id, amount = %expense.amount, "Expense recorded");
    Ok(ApiResponse::created("Expense recorded successfully", expense))
}

pub async fn get_expense(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<ApiResponse<Expense>> {
    Ok(ApiResponse::ok("Expense fetched", load(&state, id).await?))
}

pub async fn delete_expense(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<ApiResponse<()>> {
    let existing = load(&state, id).await?;
    require_owner_or_admin(&auth, existing.created_by)?;

    Expense::delete(&state.db, &existing, auth.user_id).await?;

    tracing::info!(expense_id = %id, deleted_by = %auth.user_id, "Expense deleted");
    Ok(ApiResponse::message("Expense deleted successfully"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(amount: Decimal) -> CreateExpenseRequest {
        CreateExpenseRequest {
            description: "Shop rent".to_string(),
            amount,
            expense_date: None,
        }
    }

    #[test]
    fn test_expense_amount_must_be_positive() {
        assert!(request(Decimal::new(1500, 0)).check().is_ok());
        assert!(request(Decimal::ZERO).check().is_err());
        assert!(request(Decimal::new(-5, 0)).check().is_err());
    }
}
