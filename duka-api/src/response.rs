/// Success envelope shared by all handlers
///
/// ```json
/// { "success": true, "message": "Product created", "data": { ... } }
/// ```

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,

    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,

    #[serde(skip)]
    status: Option<u16>,
}

impl<T> ApiResponse<T> {
    /// 200 with a payload
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
            status: None,
        }
    }

    /// 201 with the created record
    pub fn created(message: impl Into<String>, data: T) -> Self {
        Self {
            status: Some(StatusCode::CREATED.as_u16()),
            ..Self::ok(message, data)
        }
    }
}

impl ApiResponse<()> {
    /// 200 without a payload
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: None,
            status: None,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = self
            .status
            .and_then(|s| StatusCode::from_u16(s).ok())
            .unwrap_or(StatusCode::OK);
        (status, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_shape() {
        let body = serde_json::to_value(ApiResponse::ok("Fetched", vec![1, 2])).unwrap();
        assert_eq!(body["success"], true);
        assert_eq!(body["message"], "Fetched");
        assert_eq!(body["data"], serde_json::json!([1, 2]));

        let body = serde_json::to_value(ApiResponse::message("Deleted")).unwrap();
        assert!(body.get("data").is_none());
        assert!(body.get("status").is_none());
    }

    #[test]
    fn test_created_status() {
        assert_eq!(ApiResponse::created("Created", 1).into_response().status(), StatusCode::CREATED);
        assert_eq!(ApiResponse::ok("Fetched", 1).into_response().status(), StatusCode::OK);
    }
}
