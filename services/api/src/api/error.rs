//! API error type and helpers.
//!
//! # Purpose
//! Centralizes HTTP error construction. Client-facing errors carry empty
//! bodies; only the connectivity gate attaches a JSON payload.
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::Value;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: Option<Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self.body {
            Some(body) => (self.status, Json(body)).into_response(),
            None => self.status.into_response(),
        }
    }
}

pub fn bad_request() -> ApiError {
    ApiError {
        status: StatusCode::BAD_REQUEST,
        body: None,
    }
}

pub fn unauthorized() -> ApiError {
    ApiError {
        status: StatusCode::UNAUTHORIZED,
        body: None,
    }
}

pub fn not_found() -> ApiError {
    ApiError {
        status: StatusCode::NOT_FOUND,
        body: None,
    }
}

pub fn precondition_failed() -> ApiError {
    ApiError {
        status: StatusCode::PRECONDITION_FAILED,
        body: None,
    }
}

pub fn internal(context: &str, err: &dyn std::fmt::Display) -> ApiError {
    tracing::error!(error = %err, context = context, "handler failure");
    ApiError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        body: None,
    }
}
