// HTTP error taxonomy - every failure a handler can return, with its status
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::github::RepoError;
use crate::ingest::IngestError;

#[derive(Debug, Error)]
pub enum AppError {
    /// Client-correctable input: bad extension, bad URL, out-of-range field.
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    PayloadTooLarge(String),

    /// Input was accepted but could not be read, e.g. a corrupt archive.
    #[error("{0}")]
    Unprocessable(String),

    #[error("{0}")]
    Upstream(String),

    #[error("Failed to send feedback: {0}")]
    Notification(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            AppError::Notification(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "request rejected");
        }
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

impl From<IngestError> for AppError {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::UnsupportedType { .. } => AppError::Validation(err.to_string()),
            IngestError::CorruptArchive(_) => AppError::Unprocessable(err.to_string()),
            IngestError::Io(e) => AppError::Internal(e.into()),
        }
    }
}

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::InvalidUrl(_) | RepoError::InvalidBranch(_) | RepoError::InvalidDepth(_) => {
                AppError::Validation(err.to_string())
            }
            RepoError::Download(_) | RepoError::Status { .. } => AppError::Upstream(err.to_string()),
            RepoError::Archive(inner) => inner.into(),
        }
    }
}

impl From<axum::extract::multipart::MultipartError> for AppError {
    fn from(err: axum::extract::multipart::MultipartError) -> Self {
        rejected(err.status(), format!("Malformed upload: {}", err.body_text()))
    }
}

/// Extractor failures: body limit hits become 413, everything else 400.
/// The 413 detail is replaced with the configured limit by the size guard
/// in `server`.
fn rejected(status: StatusCode, message: String) -> AppError {
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge("Request too large.".to_string())
    } else {
        AppError::Validation(message)
    }
}

impl From<axum::extract::multipart::MultipartRejection> for AppError {
    fn from(rejection: axum::extract::multipart::MultipartRejection) -> Self {
        rejected(rejection.status(), rejection.body_text())
    }
}

impl From<axum::extract::rejection::JsonRejection> for AppError {
    fn from(rejection: axum::extract::rejection::JsonRejection) -> Self {
        rejected(rejection.status(), rejection.body_text())
    }
}
