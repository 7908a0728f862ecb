use std::collections::HashMap;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;

use crate::services::analyzer::AnalyzerError;
use crate::services::cache::CacheError;
use crate::services::news_source::NewsSourceError;
use crate::services::store::StoreError;

/// Crate-wide API error, mirrored on the error kinds in spec §7.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("validation failed")]
    Validation(HashMap<String, Vec<String>>),
    #[error("not found")]
    NotFound,
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("service unavailable: {0}")]
    Unavailable(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn validation_error(field: &str, message: impl Into<String>) -> Self {
        let mut issues = HashMap::new();
        issues.insert(field.to_string(), vec![message.into()]);
        ApiError::Validation(issues)
    }

    pub fn not_found() -> Self {
        ApiError::NotFound
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        ApiError::Unavailable(message.into())
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        ApiError::Internal(message.into())
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::internal_error(err.to_string())
    }
}

impl From<CacheError> for ApiError {
    fn from(err: CacheError) -> Self {
        ApiError::unavailable(err.to_string())
    }
}

impl From<NewsSourceError> for ApiError {
    fn from(err: NewsSourceError) -> Self {
        ApiError::unavailable(err.to_string())
    }
}

impl From<AnalyzerError> for ApiError {
    fn from(err: AnalyzerError) -> Self {
        ApiError::unavailable(err.to_string())
    }
}

#[derive(Serialize)]
struct ValidationBody {
    error: String,
    issues: HashMap<String, Vec<String>>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Validation(issues) => {
                let body = ValidationBody { error: "validation failed".to_string(), issues };
                (StatusCode::BAD_REQUEST, Json(body)).into_response()
            },
            ApiError::NotFound => {
                (StatusCode::NOT_FOUND, Json(json!({ "error": "not found" }))).into_response()
            },
            ApiError::Conflict(msg) => {
                (StatusCode::CONFLICT, Json(json!({ "error": msg }))).into_response()
            },
            ApiError::Unavailable(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, Json(json!({ "error": msg }))).into_response()
            },
            ApiError::Internal(msg) => {
                tracing::error!("internal error: {msg}");
                (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": msg }))).into_response()
            },
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
