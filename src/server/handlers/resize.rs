//! `POST /resize`: fetch, cover-fit to the configured box, return base64 JPEG.
//!
//! This endpoint predates the JSON error taxonomy; every failure is a `500`
//! with `{"errorMessage": ...}`.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::imaging::{OutputFormat, Quality};
use crate::request::TransformRequest;
use crate::server::state::AppState;

#[derive(Deserialize)]
pub struct ResizeRequest {
    pub image_url: String,
}

#[derive(Serialize)]
pub struct ResizeResponse {
    pub content: String,
    #[serde(rename = "dataURIBase64")]
    pub data_uri_base64: String,
}

#[derive(Serialize)]
pub struct ResizeError {
    #[serde(rename = "errorMessage")]
    pub error_message: String,
}

impl IntoResponse for ResizeError {
    fn into_response(self) -> Response {
        (StatusCode::INTERNAL_SERVER_ERROR, Json(self)).into_response()
    }
}

impl<E: std::fmt::Display> From<E> for ResizeError {
    fn from(err: E) -> Self {
        Self {
            error_message: err.to_string(),
        }
    }
}

pub async fn resize(
    State(state): State<Arc<AppState>>,
    body: Result<Json<ResizeRequest>, JsonRejection>,
) -> Result<Json<ResizeResponse>, ResizeError> {
    let Json(body) = body?;
    let target = &state.config.resize;
    let request = TransformRequest::new(
        body.image_url,
        target.width,
        target.height,
        Some(OutputFormat::Jpeg),
        Quality::new(target.quality),
    )?;
    let outcome = state.thumbnails.thumbnail(&request).await?;

    let content = STANDARD.encode(&outcome.payload);
    Ok(Json(ResizeResponse {
        data_uri_base64: format!("data:{};base64,{content}", outcome.content_type),
        content,
    }))
}
