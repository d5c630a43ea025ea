//! Multipart intake for `/create-filtered-gif`.
//!
//! Each file in the `images` (or `images[]`) field is streamed into its own
//! temporary file. The `frameDelay` field is kept as raw text; validation
//! happens in the coordinator so that every rejection path also cleans up.

use axum::extract::Multipart;
use axum::extract::multipart::Field;
use tokio::io::AsyncWriteExt;

use crate::coordinator::UploadedFrame;
use crate::error::PipelineError;

pub const IMAGES_FIELD: &str = "images";
pub const IMAGES_ARRAY_FIELD: &str = "images[]";
pub const FRAME_DELAY_FIELD: &str = "frameDelay";

/// Parsed form. Dropping it deletes any spooled files.
#[derive(Debug, Default)]
pub struct GifForm {
    pub images: Vec<UploadedFrame>,
    pub frame_delay: Option<String>,
}

fn malformed(e: impl std::fmt::Display) -> PipelineError {
    PipelineError::validation(format!("Malformed multipart body: {e}"))
}

fn spool_error(e: std::io::Error) -> PipelineError {
    PipelineError::Internal(format!("failed to spool upload: {e}"))
}

pub async fn receive(mut multipart: Multipart) -> Result<GifForm, PipelineError> {
    let mut form = GifForm::default();
    while let Some(field) = multipart.next_field().await.map_err(malformed)? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some(IMAGES_FIELD) | Some(IMAGES_ARRAY_FIELD) => {
                let upload = spool(field).await?;
                tracing::debug!(
                    index = form.images.len(),
                    bytes = upload.size,
                    file_name = upload.file_name.as_deref().unwrap_or(""),
                    "received upload"
                );
                form.images.push(upload);
            }
            Some(FRAME_DELAY_FIELD) => {
                form.frame_delay = Some(field.text().await.map_err(malformed)?);
            }
            _ => {
                // Unknown fields are drained and ignored.
                field.bytes().await.map_err(malformed)?;
            }
        }
    }
    Ok(form)
}

/// Stream one field to a temporary file. Size limits are checked later so
/// the rejection can name the full size.
async fn spool(mut field: Field<'_>) -> Result<UploadedFrame, PipelineError> {
    let file_name = field.file_name().map(str::to_string);
    let (file, path) = tempfile::NamedTempFile::new()
        .map_err(spool_error)?
        .into_parts();
    let mut file = tokio::fs::File::from_std(file);

    let mut size = 0u64;
    while let Some(chunk) = field.chunk().await.map_err(malformed)? {
        size += chunk.len() as u64;
        file.write_all(&chunk).await.map_err(spool_error)?;
    }
    file.flush().await.map_err(spool_error)?;

    Ok(UploadedFrame {
        file_name,
        path,
        size,
    })
}
