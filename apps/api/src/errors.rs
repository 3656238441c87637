use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::import::decoder::DecodeError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("File contains no data rows")]
    EmptyFile,

    #[error("Excel parse error: {0}")]
    ExcelParse(String),

    #[error("Missing required columns: {}", .0.join(", "))]
    MissingRequiredColumns(Vec<String>),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// Rejected by the record server. The message is shown verbatim.
    #[error("{0}")]
    Rejected(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Import failed: {0}")]
    ImportFailed(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<DecodeError> for AppError {
    fn from(err: DecodeError) -> Self {
        match err {
            DecodeError::UnsupportedFormat(what) => AppError::UnsupportedFormat(what),
            DecodeError::EmptyFile => AppError::EmptyFile,
            DecodeError::ExcelParse(msg) => AppError::ExcelParse(msg),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::UnsupportedFormat(_) => (
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                "UNSUPPORTED_FORMAT",
                format!("{self}. Please upload a CSV or Excel file (.csv, .xlsx, .xls)"),
            ),
            AppError::EmptyFile => (
                StatusCode::BAD_REQUEST,
                "EMPTY_FILE",
                "File must have a header row and at least one data row".to_string(),
            ),
            AppError::ExcelParse(msg) => {
                tracing::warn!("Excel parse error: {msg}");
                (
                    StatusCode::BAD_REQUEST,
                    "EXCEL_PARSE_ERROR",
                    "Error parsing Excel file. Please ensure it's a valid Excel file.".to_string(),
                )
            }
            AppError::MissingRequiredColumns(_) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "MISSING_REQUIRED_COLUMNS",
                self.to_string(),
            ),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Rejected(msg) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "REJECTED", msg.clone())
            }
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
            AppError::ImportFailed(msg) => {
                tracing::error!("Import failed: {msg}");
                (
                    StatusCode::BAD_GATEWAY,
                    "IMPORT_FAILED",
                    "Failed to add jobs. Please resubmit.".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
