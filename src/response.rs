use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Serialize)]
pub struct Meta {
    pub message: String,
    pub code: u16,
    pub status: String,
}

/// Uniform body of every API response: `{meta: {message, code, status}, data}`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T = Value> {
    pub meta: Meta,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(message: impl Into<String>, data: T) -> Self {
        Self::new(message, StatusCode::OK, "success", data)
    }

    pub fn error(message: impl Into<String>, code: StatusCode, data: T) -> Self {
        Self::new(message, code, "error", data)
    }

    fn new(message: impl Into<String>, code: StatusCode, status: &str, data: T) -> Self {
        Self {
            meta: Meta {
                message: message.into(),
                code: code.as_u16(),
                status: status.to_string(),
            },
            data,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.meta.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}
