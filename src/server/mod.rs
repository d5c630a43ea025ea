//! HTTP surface.
//!
//! | Route | Handler |
//! |---|---|
//! | `GET`/`HEAD /thumbnail` | [`handlers::thumbnail`] |
//! | `POST /create-filtered-gif` | [`handlers::gif`] |
//! | `POST /resize` | [`handlers::resize`] |
//! | `GET /health`, `GET /cache/stats` | [`handlers::health`] |

pub mod handlers;
pub mod routes;
pub mod state;
pub mod upload;

pub use routes::create_router;
pub use state::AppState;

use std::sync::Arc;
use tokio::net::TcpListener;

/// Serve until Ctrl-C, letting in-flight requests finish.
pub async fn serve(listener: TcpListener, state: AppState) -> std::io::Result<()> {
    let app = create_router(Arc::new(state));
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "could not listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
