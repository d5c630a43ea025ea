use crate::compose::GifComposer;
use crate::config::GifConfig;
use crate::error::PipelineError;
use crate::fetch::read_upload;
use crate::imaging::{EncodedImage, Frame, ImageBackend};
use crate::request::{GifAssemblyRequest, UploadSize, parse_frame_delay, validate_uploads};
use rayon::prelude::*;
use std::sync::Arc;
use tempfile::TempPath;

/// One uploaded file, spooled to disk by the HTTP layer.
///
/// The file is deleted when the value is dropped, so an abandoned request
/// still releases its inputs.
#[derive(Debug)]
pub struct UploadedFrame {
    pub file_name: Option<String>,
    pub path: TempPath,
    pub size: u64,
}

/// validate → read → decode → compose → clean up.
#[derive(Clone)]
pub struct GifRequestCoordinator {
    backend: Arc<dyn ImageBackend>,
    composer: GifComposer,
    limits: GifConfig,
}

impl GifRequestCoordinator {
    pub fn new(backend: Arc<dyn ImageBackend>, limits: GifConfig) -> Self {
        Self {
            backend,
            composer: GifComposer::from_config(&limits),
            limits,
        }
    }

    pub fn limits(&self) -> &GifConfig {
        &self.limits
    }

    /// Build an animated GIF from `uploads`, in order.
    ///
    /// Every temporary file is removed before this returns, whatever the outcome.
    pub async fn create(
        &self,
        uploads: Vec<UploadedFrame>,
        frame_delay: Option<&str>,
    ) -> Result<EncodedImage, PipelineError> {
        let result = self.assemble(&uploads, frame_delay).await;
        release(uploads);
        result
    }

    async fn assemble(
        &self,
        uploads: &[UploadedFrame],
        frame_delay: Option<&str>,
    ) -> Result<EncodedImage, PipelineError> {
        let sizes: Vec<UploadSize> = uploads
            .iter()
            .enumerate()
            .map(|(index, upload)| UploadSize {
                index,
                bytes: upload.size,
            })
            .collect();
        validate_uploads(&sizes, &self.limits)?;
        let delay = parse_frame_delay(frame_delay, self.limits.default_delay_ms)?;

        let mut sources = Vec::with_capacity(uploads.len());
        for (index, upload) in uploads.iter().enumerate() {
            let bytes = read_upload(&upload.path).await.map_err(|e| {
                PipelineError::Internal(format!("failed to read upload {index}: {e}"))
            })?;
            sources.push(bytes);
        }

        let backend = Arc::clone(&self.backend);
        let composer = self.composer;
        let gif = tokio::task::spawn_blocking(move || -> Result<EncodedImage, PipelineError> {
            let frames = sources
                .par_iter()
                .enumerate()
                .map(|(index, bytes)| first_frame(backend.as_ref(), index, bytes))
                .collect::<Result<Vec<_>, _>>()?;
            composer.compose(backend.as_ref(), GifAssemblyRequest::new(frames, delay)?)
        })
        .await??;

        tracing::info!(
            frames = uploads.len(),
            delay_ms = delay,
            bytes = gif.bytes.len(),
            "GIF assembled"
        );
        Ok(gif)
    }
}

/// Animated uploads contribute their first frame.
fn first_frame(backend: &dyn ImageBackend, index: usize, bytes: &[u8]) -> Result<Frame, PipelineError> {
    let decoded = backend
        .decode(bytes)
        .map_err(|e| PipelineError::Decode(format!("image {index}: {e}")))?;
    decoded
        .frames
        .into_iter()
        .next()
        .ok_or_else(|| PipelineError::Decode(format!("image {index} has no frames")))
}

fn release(uploads: Vec<UploadedFrame>) {
    for upload in uploads {
        let shown = upload.path.display().to_string();
        if let Err(e) = upload.path.close() {
            tracing::warn!(path = %shown, error = %e, "failed to remove upload");
        }
    }
}
