use crate::db::store::StoreError;
use crate::payments::webhook::SignatureError;
use crate::payments::ProcessorError;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_derive::Serialize;
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

#[derive(Debug, Clone, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: &'static str,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("validation failed")]
    Validation(Vec<FieldError>),
    #[error("{0}")]
    BadRequest(String),
    #[error("charity not found")]
    CharityNotFound,
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Conflict(String),
    #[error("payment was not completed, status {0}")]
    PaymentFailed(String),
    #[error("subscription was not activated, status {0}")]
    SubscriptionFailed(String),
    #[error(transparent)]
    Processor(#[from] ProcessorError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Signature(#[from] SignatureError),
    #[error("server error")]
    Internal,
    #[error(transparent)]
    JsonExtractorRejection(#[from] JsonRejection),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Validation(errors) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "errors": errors }))).into_response()
            }
            ApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "message": message }))).into_response()
            }
            ApiError::CharityNotFound => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "Invalid charity" })),
            )
                .into_response(),
            ApiError::Unauthorized(message) => {
                (StatusCode::UNAUTHORIZED, Json(json!({ "message": message }))).into_response()
            }
            ApiError::Conflict(message) => {
                (StatusCode::CONFLICT, Json(json!({ "message": message }))).into_response()
            }
            ApiError::PaymentFailed(status) => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "Payment was not completed", "status": status })),
            )
                .into_response(),
            ApiError::SubscriptionFailed(status) => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "Subscription was not activated", "status": status })),
            )
                .into_response(),
            ApiError::Processor(ProcessorError::Declined(message)) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
            }
            ApiError::Processor(e) => {
                // rich detail stays server-side
                error!("payment processor error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "message": "An error occurred" })),
                )
                    .into_response()
            }
            ApiError::Store(e) => {
                error!("database error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "message": "Server error" })),
                )
                    .into_response()
            }
            ApiError::Signature(e) => {
                warn!("webhook signature rejected: {e}");
                (StatusCode::BAD_REQUEST, "Webhook Error: invalid signature").into_response()
            }
            ApiError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "message": "Server error" })),
            )
                .into_response(),
            ApiError::JsonExtractorRejection(rejection) => {
                let code = match &rejection {
                    JsonRejection::JsonDataError(_) => StatusCode::BAD_REQUEST,
                    JsonRejection::JsonSyntaxError(_) => StatusCode::BAD_REQUEST,
                    JsonRejection::MissingJsonContentType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
                    _ => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (code, Json(json!({ "message": rejection.to_string() }))).into_response()
            }
        }
    }
}
