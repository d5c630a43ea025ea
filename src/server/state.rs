//! Application state shared across handlers.

use crate::cache::CacheStore;
use crate::config::ServiceConfig;
use crate::coordinator::{GifRequestCoordinator, ThumbnailCoordinator};
use crate::fetch::{FetchError, HttpFetcher, SourceFetcher};
use crate::imaging::{ImageBackend, RustBackend};
use std::sync::Arc;

/// Everything a handler needs. Built once at startup and passed to the
/// router; there is no process-wide state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServiceConfig>,
    pub thumbnails: ThumbnailCoordinator,
    pub gifs: GifRequestCoordinator,
}

impl AppState {
    pub fn new(
        config: ServiceConfig,
        fetcher: Arc<dyn SourceFetcher>,
        backend: Arc<dyn ImageBackend>,
    ) -> Self {
        let cache = Arc::new(CacheStore::from_config(&config.cache));
        Self {
            thumbnails: ThumbnailCoordinator::new(cache, fetcher, Arc::clone(&backend)),
            gifs: GifRequestCoordinator::new(backend, config.gif.clone()),
            config: Arc::new(config),
        }
    }

    /// Production wiring: `reqwest` fetcher and the pure-Rust backend.
    pub fn from_config(config: ServiceConfig) -> Result<Self, FetchError> {
        let fetcher = HttpFetcher::new(&config.fetch)?;
        Ok(Self::new(
            config,
            Arc::new(fetcher),
            Arc::new(RustBackend::new()),
        ))
    }
}
