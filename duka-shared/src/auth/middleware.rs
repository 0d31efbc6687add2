/// Request authentication
///
/// Turns a `Authorization: Bearer <jwt>` header into an [`AuthContext`]
/// that route handlers read from the request extensions.
///
/// # Example
///
/// ```no_run
/// use axum::{extract::Request, middleware::Next, response::Response};
/// use duka_shared::auth::middleware::{authenticate_bearer, AuthError};
///
/// async fn require_token(mut req: Request, next: Next) -> Result<Response, AuthError> {
///     let context = authenticate_bearer(req.headers(), "a-secret-that-is-at-least-32-bytes")?;
///     req.extensions_mut().insert(context);
///     Ok(next.run(req).await)
/// }
/// ```

use axum::{
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::jwt::{validate_access_token, Claims, JwtError};
use crate::models::status::UserRole;

/// Authenticated caller
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub role: UserRole,
}

impl AuthContext {
    pub fn from_claims(claims: &Claims) -> Self {
        Self {
            user_id: claims.sub,
            role: claims.role,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

#[derive(Debug)]
pub enum AuthError {
    MissingCredentials,

    InvalidFormat(String),

    InvalidToken(String),
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::MissingCredentials => write!(f, "Missing authorization header"),
            AuthError::InvalidFormat(msg) | AuthError::InvalidToken(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for AuthError {}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = match self {
            AuthError::InvalidFormat(_) => StatusCode::BAD_REQUEST,
            AuthError::MissingCredentials | AuthError::InvalidToken(_) => StatusCode::UNAUTHORIZED,
        };
        (status, self.to_string()).into_response()
    }
}

/// Validates the bearer access token in `headers`
pub fn authenticate_bearer(headers: &HeaderMap, secret: &str) -> Result<AuthContext, AuthError> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingCredentials)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AuthError::InvalidFormat("Expected Bearer token".to_string()))?;

    let claims = validate_access_token(token.trim(), secret).map_err(|e| match e {
        JwtError::Expired => AuthError::InvalidToken("Token expired".to_string()),
        JwtError::InvalidIssuer => AuthError::InvalidToken("Invalid issuer".to_string()),
        JwtError::WrongTokenType { .. } => AuthError::InvalidToken("Expected access token".to_string()),
        _ => AuthError::InvalidToken("Invalid token".to_string()),
    })?;

    Ok(AuthContext::from_claims(&claims))
}
