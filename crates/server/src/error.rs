//! API error types.

use axum::Json;
use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Status reported alongside `detection_failed`: the work was stored but
/// no report exists for it.
pub const STORED_WITHOUT_REPORT: &str = "stored_without_report";

/// API error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Work left behind by a partially completed submission.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub work_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<&'static str>,
}

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("work {0} not found")]
    WorkNotFound(i64),

    #[error("file for work {0} not found")]
    FileNotFound(i64),

    #[error("no report for work {0}")]
    ReportNotFound(i64),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("content store unavailable: {0}")]
    StorageUnavailable(String),

    #[error("work {work_id} stored but detection failed: {reason}")]
    DetectionFailed { work_id: i64, reason: String },

    #[error("upstream error: {0}")]
    Upstream(#[from] sleuth_client::ClientError),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("storage error: {0}")]
    Storage(#[from] sleuth_storage::StorageError),

    #[error("metadata error: {0}")]
    Metadata(#[from] sleuth_metadata::MetadataError),

    #[error("invalid input: {0}")]
    Core(#[from] sleuth_core::Error),
}

impl ApiError {
    /// Get the error code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::WorkNotFound(_) => "work_not_found",
            Self::FileNotFound(_) => "file_not_found",
            Self::ReportNotFound(_) => "report_not_found",
            Self::BadRequest(_) => "bad_request",
            Self::PayloadTooLarge(_) => "payload_too_large",
            Self::Unauthorized(_) => "unauthorized",
            Self::Conflict(_) => "conflict",
            Self::StorageUnavailable(_) => "storage_unavailable",
            Self::DetectionFailed { .. } => "detection_failed",
            Self::Upstream(_) => "upstream_unavailable",
            Self::Internal(_) => "internal_error",
            Self::Storage(_) => "storage_error",
            Self::Metadata(sleuth_metadata::MetadataError::AlreadyExists(_)) => "conflict",
            Self::Metadata(_) => "metadata_error",
            Self::Core(_) => "invalid_input",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::WorkNotFound(_) | Self::FileNotFound(_) | Self::ReportNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::StorageUnavailable(_) | Self::DetectionFailed { .. } | Self::Upstream(_) => {
                StatusCode::BAD_GATEWAY
            }
            Self::Internal(_) | Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Metadata(e) => match e {
                sleuth_metadata::MetadataError::AlreadyExists(_) => StatusCode::CONFLICT,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Core(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Classify a multipart read failure. Oversized bodies surface as 413.
    pub fn from_multipart(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Self::PayloadTooLarge(err.body_text())
        } else {
            Self::BadRequest(err.body_text())
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(code = self.code(), error = %self, "request failed");
        }
        let (work_id, work_status) = match &self {
            Self::DetectionFailed { work_id, .. } => (Some(*work_id), Some(STORED_WITHOUT_REPORT)),
            _ => (None, None),
        };
        let body = ErrorResponse {
            code: self.code().to_string(),
            message: self.to_string(),
            work_id,
            status: work_status,
        };
        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers.
pub type ApiResult<T> = std::result::Result<T, ApiError>;
