//! `GET /thumbnail` (and `HEAD`).

use axum::{
    extract::{Query, State, rejection::QueryRejection},
    http::{
        HeaderName, StatusCode,
        header::{CACHE_CONTROL, CONTENT_LENGTH, CONTENT_TYPE, ETAG},
    },
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use crate::error::PipelineError;
use crate::request::ThumbnailQuery;
use crate::server::state::AppState;

pub const X_CACHE: HeaderName = HeaderName::from_static("x-cache");

/// Results are keyed on every input, so they never change under a URL.
pub const IMMUTABLE_CACHE_CONTROL: &str = "public, max-age=31536000, immutable";

pub async fn thumbnail(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ThumbnailQuery>, QueryRejection>,
) -> Result<Response, PipelineError> {
    let Query(query) =
        query.map_err(|e| PipelineError::validation(format!("Invalid query string: {e}")))?;
    let request = query.validate(&state.config.thumbnail)?;
    let outcome = state.thumbnails.thumbnail(&request).await?;

    let headers = [
        (CONTENT_TYPE, outcome.content_type),
        (CONTENT_LENGTH, outcome.payload.len().to_string()),
        (CACHE_CONTROL, IMMUTABLE_CACHE_CONTROL.to_string()),
        (X_CACHE, outcome.cache.as_str().to_string()),
        (ETAG, outcome.etag),
    ];
    Ok((StatusCode::OK, headers, outcome.payload).into_response())
}
