//! Error taxonomy shared by both pipelines.
//!
//! | Variant | Status | Raised by |
//! |---|---|---|
//! | `Validation` | 400 | request parsing, upload limits, frame delay |
//! | `Fetch` | 500 | [`SourceFetcher`](crate::fetch::SourceFetcher) |
//! | `Decode` | 500 | unsupported or corrupt image bytes |
//! | `DimensionMismatch` | 400 | GIF frames outside the size tolerance |
//! | `Encoding` | 500 | encoder failure or an implausible GIF stream |
//! | `Internal` | 500 | worker panics, temp file I/O |
//!
//! Nothing in the crate retries; the first failure is returned as is.

use crate::fetch::FetchError;
use crate::imaging::BackendError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("{0}")]
    Validation(String),
    #[error("Failed to fetch source image: {0}")]
    Fetch(#[from] FetchError),
    #[error("Failed to decode image: {0}")]
    Decode(String),
    #[error(
        "Frame {index} is {width}x{height}, which differs from the smallest frame size \
         {min_width}x{min_height} by more than {tolerance_pct}%"
    )]
    DimensionMismatch {
        index: usize,
        width: u32,
        height: u32,
        min_width: u32,
        min_height: u32,
        tolerance_pct: u32,
    },
    #[error("Encoding failed: {0}")]
    Encoding(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PipelineError {
    pub fn validation(message: impl Into<String>) -> Self {
        PipelineError::Validation(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            PipelineError::Validation(_) | PipelineError::DimensionMismatch { .. } => {
                StatusCode::BAD_REQUEST
            }
            PipelineError::Fetch(_)
            | PipelineError::Decode(_)
            | PipelineError::Encoding(_)
            | PipelineError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable name used as the `error` field of JSON bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::Validation(_) => "validation_error",
            PipelineError::Fetch(_) => "fetch_error",
            PipelineError::Decode(_) => "decode_error",
            PipelineError::DimensionMismatch { .. } => "dimension_mismatch",
            PipelineError::Encoding(_) => "encoding_error",
            PipelineError::Internal(_) => "internal_error",
        }
    }
}

impl From<BackendError> for PipelineError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Decode(msg) => PipelineError::Decode(msg),
            BackendError::Encode(msg) => PipelineError::Encoding(msg),
            BackendError::Io(e) => PipelineError::Internal(e.to_string()),
            BackendError::ProcessingFailed(msg) => PipelineError::Internal(msg),
        }
    }
}

impl From<tokio::task::JoinError> for PipelineError {
    fn from(err: tokio::task::JoinError) -> Self {
        PipelineError::Internal(format!("image worker failed: {err}"))
    }
}

/// JSON body for failed requests: `{"error": ..., "message": ...}`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
}

impl IntoResponse for PipelineError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorBody {
            error: self.kind(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
