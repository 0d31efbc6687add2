/// Error handling for the API server
///
/// This module provides a unified error type that maps to HTTP responses.
/// All handlers return `Result<T, ApiError>`, which converts to the
/// `{ "success": false, "error": ..., "message": ... }` envelope.
///
/// # Example
///
/// ```
/// use duka_api::error::{ApiError, ApiResult};
///
/// fn find(id: u32) -> ApiResult<u32> {
///     if id == 0 {
///         return Err(ApiError::NotFound("Product not found".to_string()));
///     }
///     Ok(id)
/// }
/// ```

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use duka_shared::{
    auth::{authorization::AuthzError, jwt::JwtError, middleware::AuthError, password::PasswordError},
    dashboard::DashboardError,
    models::{credit_repayment::RepaymentError, invoice::OrderError, product::StockError},
    pricing::PricingError,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";
const CHECK_VIOLATION: &str = "23514";

/// Unified API error type
#[derive(Debug)]
pub enum ApiError {
    /// Bad request (400)
    BadRequest(String),

    /// Unauthorized (401)
    Unauthorized(String),

    /// Forbidden (403)
    Forbidden(String),

    /// Not found (404)
    NotFound(String),

    /// Conflict (409), e.g. duplicate email or product code
    Conflict(String),

    /// Unprocessable entity (422) with field errors
    ValidationError(Vec<ValidationErrorDetail>),

    /// Internal server error (500)
    InternalError(String),

    /// Service unavailable (503)
    ServiceUnavailable(String),
}

/// Validation error detail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    /// Field that failed validation
    pub field: String,

    /// Error message
    pub message: String,
}

/// Error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Always false
    pub success: bool,

    /// Error code (e.g., "bad_request", "unauthorized")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<ValidationErrorDetail>>,
}

impl ApiError {
    /// Single-field validation failure
    pub fn invalid_field(field: &str, message: impl Into<String>) -> Self {
        ApiError::ValidationError(vec![ValidationErrorDetail {
            field: field.to_string(),
            message: message.into(),
        }])
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ApiError::ValidationError(errors) => {
                write!(f, "Validation failed: {} errors", errors.len())
            }
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
            ApiError::ServiceUnavailable(msg) => write!(f, "Service unavailable: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message, details) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg, None),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg, None),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg, None),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg, None),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg, None),
            ApiError::ValidationError(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "validation_error",
                "Request validation failed".to_string(),
                Some(errors),
            ),
            ApiError::InternalError(msg) => {
                // Log internal errors but don't expose details to clients
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
            ApiError::ServiceUnavailable(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, "service_unavailable", msg, None)
            }
        };

        let body = Json(ErrorResponse {
            success: false,
            error: error_code.to_string(),
            message,
            details,
        });

        (status, body).into_response()
    }
}

/// Convert validator errors to field-level details
///
/// Nested fields are reported with a dotted path, e.g. `items[0].quantity`.
impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        let mut errors = Vec::new();
        flatten_validation_errors("", &err, &mut errors);
        errors.sort_by(|a, b| a.field.cmp(&b.field));
        ApiError::ValidationError(errors)
    }
}

fn flatten_validation_errors(
    prefix: &str,
    err: &validator::ValidationErrors,
    out: &mut Vec<ValidationErrorDetail>,
) {
    use validator::ValidationErrorsKind;

    for (field, kind) in err.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{}.{}", prefix, field)
        };

        match kind {
            ValidationErrorsKind::Field(errors) => {
                out.extend(errors.iter().map(|error| ValidationErrorDetail {
                    field: path.clone(),
                    message: error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| "Validation failed".to_string()),
                }));
            }
            ValidationErrorsKind::Struct(inner) => flatten_validation_errors(&path, inner, out),
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    flatten_validation_errors(&format!("{}[{}]", path, index), inner, out);
                }
            }
        }
    }
}

/// Convert sqlx errors to API errors
impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ApiError::NotFound("Resource not found".to_string()),
            sqlx::Error::Database(db_err) => {
                let code = db_err.code();
                match code.as_deref() {
                    Some(UNIQUE_VIOLATION) => {
                        let constraint = db_err.constraint().unwrap_or_default();
                        if constraint.contains("email") {
                            ApiError::Conflict("Email already exists".to_string())
                        } else if constraint.contains("code") {
                            ApiError::Conflict("Product code already exists".to_string())
                        } else if constraint.contains("phone") {
                            ApiError::Conflict("Phone number already exists".to_string())
                        } else if constraint.contains("name") {
                            ApiError::Conflict("Name already exists".to_string())
                        } else {
                            ApiError::Conflict("Record already exists".to_string())
                        }
                    }
                    Some(FOREIGN_KEY_VIOLATION) => {
                        ApiError::BadRequest("Referenced record does not exist or is still in use".to_string())
                    }
                    Some(CHECK_VIOLATION) => ApiError::BadRequest("Value out of range".to_string()),
                    _ => ApiError::InternalError(format!("Database error: {}", db_err)),
                }
            }
            _ => ApiError::InternalError(format!("Database error: {}", err)),
        }
    }
}

/// Convert auth errors to API errors
impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingCredentials => ApiError::Unauthorized("Missing credentials".to_string()),
            AuthError::InvalidFormat(msg) => ApiError::BadRequest(msg),
            AuthError::InvalidToken(msg) => ApiError::Unauthorized(msg),
        }
    }
}

/// Convert authorization errors to API errors
impl From<AuthzError> for ApiError {
    fn from(err: AuthzError) -> Self {
        ApiError::Forbidden(err.to_string())
    }
}

/// Convert password errors to API errors
impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        ApiError::InternalError(format!("Password operation failed: {}", err))
    }
}

/// Convert JWT errors to API errors
impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::CreateError(msg) => ApiError::InternalError(msg),
            JwtError::Expired => ApiError::Unauthorized("Token expired".to_string()),
            JwtError::InvalidIssuer => ApiError::Unauthorized("Invalid token issuer".to_string()),
            _ => ApiError::Unauthorized(format!("Invalid token: {}", err)),
        }
    }
}

impl From<PricingError> for ApiError {
    fn from(err: PricingError) -> Self {
        match err {
            PricingError::ProductsNotFound(_) => ApiError::NotFound(err.to_string()),
            PricingError::SellingBelowPurchase { .. } => ApiError::invalid_field("selling_price", err.to_string()),
            PricingError::InvalidQuantity => ApiError::invalid_field("quantity", err.to_string()),
            _ => ApiError::BadRequest(err.to_string()),
        }
    }
}

impl From<OrderError> for ApiError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::Pricing(e) => e.into(),
            OrderError::Database(e) => e.into(),
            OrderError::EmptyOrder => ApiError::invalid_field("items", err.to_string()),
            OrderError::InvalidPhone | OrderError::MissingPhone => {
                ApiError::invalid_field("customer_phone_number", err.to_string())
            }
            OrderError::MissingDueDate | OrderError::DueDateInPast => {
                ApiError::invalid_field("credit_due_date", err.to_string())
            }
            OrderError::CreditLimitExceeded { .. } => ApiError::BadRequest(err.to_string()),
        }
    }
}

impl From<StockError> for ApiError {
    fn from(err: StockError) -> Self {
        match err {
            StockError::NotFound => ApiError::NotFound("Product not found".to_string()),
            StockError::NegativeStock => ApiError::invalid_field("available_stock", err.to_string()),
            StockError::Pricing(e) => e.into(),
            StockError::Database(e) => e.into(),
        }
    }
}

impl From<RepaymentError> for ApiError {
    fn from(err: RepaymentError) -> Self {
        match err {
            RepaymentError::InvoiceNotFound => ApiError::NotFound("Order not found".to_string()),
            RepaymentError::NotCreditSale => ApiError::BadRequest(err.to_string()),
            RepaymentError::Pricing(e) => e.into(),
            RepaymentError::Database(e) => e.into(),
        }
    }
}

impl From<DashboardError> for ApiError {
    fn from(err: DashboardError) -> Self {
        match err {
            DashboardError::Database(e) => e.into(),
            _ => ApiError::BadRequest(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use uuid::Uuid;

    fn status_of(err: ApiError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_error_display() {
        let err = ApiError::BadRequest("Invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: Invalid input");

        let err = ApiError::NotFound("User not found".to_string());
        assert_eq!(err.to_string(), "Not found: User not found");
    }

    #[test]
    fn test_validation_error() {
        let errors = vec![
            ValidationErrorDetail {
                field: "email".to_string(),
                message: "Invalid email format".to_string(),
            },
            ValidationErrorDetail {
                field: "password".to_string(),
                message: "Password too short".to_string(),
            },
        ];

        let err = ApiError::ValidationError(errors);
        assert_eq!(err.to_string(), "Validation failed: 2 errors");
    }

    #[test]
    fn test_domain_error_status_codes() {
        assert_eq!(
            status_of(PricingError::ProductsNotFound(vec![Uuid::new_v4()]).into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(
                PricingError::SellingBelowPurchase {
                    purchase: Decimal::from(10),
                    selling: Decimal::from(5),
                }
                .into()
            ),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(status_of(OrderError::MissingDueDate.into()), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            status_of(OrderError::Pricing(PricingError::CashNotPaid).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(status_of(StockError::NotFound.into()), StatusCode::NOT_FOUND);
        assert_eq!(status_of(RepaymentError::NotCreditSale.into()), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(AuthzError::AdminRequired.into()), StatusCode::FORBIDDEN);
        assert_eq!(status_of(sqlx::Error::RowNotFound.into()), StatusCode::NOT_FOUND);
        assert_eq!(status_of(JwtError::Expired.into()), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_internal_error_hides_details() {
        let response = ApiError::InternalError("connection refused".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
