//! Health and cache observability handlers.

use axum::{Json, extract::State};
use serde::Serialize;
use std::sync::Arc;

use crate::cache::CacheStats;
use crate::server::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

pub async fn cache_stats(State(state): State<Arc<AppState>>) -> Json<CacheStats> {
    Json(state.thumbnails.cache().stats())
}
