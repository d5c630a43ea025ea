//! `POST /create-filtered-gif`.

use axum::{
    extract::{
        Multipart, State,
        multipart::MultipartRejection,
    },
    http::header::CONTENT_TYPE,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use crate::error::PipelineError;
use crate::server::state::AppState;
use crate::server::upload;

pub async fn create_filtered_gif(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, PipelineError> {
    let multipart = multipart.map_err(|e| {
        PipelineError::validation(format!("Expected a multipart/form-data body: {e}"))
    })?;
    let form = upload::receive(multipart).await?;
    let gif = state
        .gifs
        .create(form.images, form.frame_delay.as_deref())
        .await?;
    Ok(([(CONTENT_TYPE, gif.content_type)], gif.bytes).into_response())
}
