//! Common error types for the generation gateway

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Maximum {max} parallel generations allowed, {available} slots available")]
    ParallelLimit { max: usize, available: usize },

    #[error("Not enough tokens. Required: {required}, Available: {available}")]
    InsufficientTokens { required: u64, available: u64 },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Reference upload failed: {0}")]
    UploadFailed(String),

    #[error("Asset rejected: {0}")]
    AssetRejected(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response format (OpenAI compatible)
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub message: String,
    pub r#type: String,
    pub code: Option<String>,
}

impl AppError {
    /// Admission errors are raised before any job exists.
    pub fn is_admission(&self) -> bool {
        matches!(
            self,
            AppError::ParallelLimit { .. }
                | AppError::InsufficientTokens { .. }
                | AppError::InvalidRequest(_)
                | AppError::ModelNotFound(_)
        )
    }

    fn classify(&self) -> (StatusCode, &'static str, Option<&'static str>) {
        match self {
            AppError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "server_error", None),
            AppError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "server_error", None),
            AppError::Json(_) => (StatusCode::BAD_REQUEST, "invalid_request_error", Some("invalid_json")),
            AppError::HttpClient(_) => (StatusCode::BAD_GATEWAY, "backend_error", None),
            AppError::ModelNotFound(_) => (StatusCode::NOT_FOUND, "not_found_error", Some("model_not_found")),
            AppError::JobNotFound(_) => (StatusCode::NOT_FOUND, "not_found_error", Some("job_not_found")),
            AppError::AuthenticationFailed(_) => (StatusCode::UNAUTHORIZED, "authentication_error", Some("invalid_api_key")),
            AppError::RateLimitExceeded => (StatusCode::TOO_MANY_REQUESTS, "rate_limit_error", Some("rate_limit_exceeded")),
            AppError::ParallelLimit { .. } => (StatusCode::TOO_MANY_REQUESTS, "admission_error", Some("max_parallel_jobs")),
            AppError::InsufficientTokens { .. } => (StatusCode::PAYMENT_REQUIRED, "admission_error", Some("insufficient_tokens")),
            AppError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "invalid_request_error", None),
            AppError::UploadFailed(_) => (StatusCode::BAD_GATEWAY, "upload_error", Some("reference_upload_failed")),
            AppError::AssetRejected(_) => (StatusCode::BAD_REQUEST, "upload_error", Some("asset_rejected")),
            AppError::Provider(_) => (StatusCode::BAD_GATEWAY, "backend_error", None),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "server_error", None),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, code) = self.classify();

        let body = Json(ErrorResponse {
            error: ErrorDetail {
                message: self.to_string(),
                r#type: error_type.to_string(),
                code: code.map(|c| c.to_string()),
            },
        });

        (status, body).into_response()
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;
