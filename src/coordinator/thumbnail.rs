use crate::cache::CacheStore;
use crate::error::PipelineError;
use crate::fetch::SourceFetcher;
use crate::imaging::{ImageBackend, create_thumbnail};
use crate::request::TransformRequest;
use bytes::Bytes;
use std::fmt;
use std::sync::Arc;

/// Whether a response came from the cache. Rendered as the `X-Cache` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
}

impl CacheStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
        }
    }
}

impl fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct ThumbnailOutcome {
    pub payload: Bytes,
    pub content_type: String,
    pub cache: CacheStatus,
    pub etag: String,
}

/// fetch → cache lookup → transform → cache store.
///
/// Concurrent misses for the same key are not coalesced; each one fetches
/// and transcodes on its own and the last `put` wins.
#[derive(Clone)]
pub struct ThumbnailCoordinator {
    cache: Arc<CacheStore>,
    fetcher: Arc<dyn SourceFetcher>,
    backend: Arc<dyn ImageBackend>,
}

impl ThumbnailCoordinator {
    pub fn new(
        cache: Arc<CacheStore>,
        fetcher: Arc<dyn SourceFetcher>,
        backend: Arc<dyn ImageBackend>,
    ) -> Self {
        Self {
            cache,
            fetcher,
            backend,
        }
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    pub async fn thumbnail(
        &self,
        request: &TransformRequest,
    ) -> Result<ThumbnailOutcome, PipelineError> {
        let key = request.cache_key();
        let etag = key.etag();

        if let Some(entry) = self.cache.get(&key) {
            tracing::debug!(key = %key, "cache hit");
            return Ok(ThumbnailOutcome {
                payload: entry.payload.clone(),
                content_type: entry.content_type.clone(),
                cache: CacheStatus::Hit,
                etag,
            });
        }

        let source = self.fetcher.fetch(request.source_url()).await?;

        let backend = Arc::clone(&self.backend);
        let job = request.clone();
        let encoded = tokio::task::spawn_blocking(move || {
            create_thumbnail(backend.as_ref(), &source, &job)
        })
        .await??;

        let payload = Bytes::from(encoded.bytes);
        if let Err(e) = self.cache.put(key.clone(), payload.clone(), encoded.content_type) {
            tracing::warn!(key = %key, error = %e, "result not cached");
        }
        tracing::info!(
            url = request.source_url(),
            width = request.width(),
            height = request.height(),
            format = %request.format(),
            bytes = payload.len(),
            "thumbnail generated"
        );

        Ok(ThumbnailOutcome {
            payload,
            content_type: encoded.content_type.to_string(),
            cache: CacheStatus::Miss,
            etag,
        })
    }
}
