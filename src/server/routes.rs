//! Route definitions.

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use super::handlers::{gif, health, resize, thumbnail};
use super::state::AppState;

/// Headroom for multipart boundaries and the `frameDelay` field.
const MULTIPART_OVERHEAD_BYTES: u64 = 1024 * 1024;

/// Create the service router.
///
/// `GET` routes also answer `HEAD`; any other method gets `405`.
pub fn create_router(state: Arc<AppState>) -> Router {
    let limits = &state.config.gif;
    let upload_limit = limits
        .max_frame_bytes
        .saturating_mul(limits.max_frames as u64)
        .saturating_add(MULTIPART_OVERHEAD_BYTES);
    let upload_limit = usize::try_from(upload_limit).unwrap_or(usize::MAX);

    Router::new()
        .route("/thumbnail", get(thumbnail::thumbnail))
        .route(
            "/create-filtered-gif",
            post(gif::create_filtered_gif).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/resize", post(resize::resize))
        .route("/health", get(health::health))
        .route("/cache/stats", get(health::cache_stats))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}
