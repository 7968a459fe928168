//! Upload handler.

use axum::extract::multipart::{Field, MultipartRejection};
use axum::extract::{Multipart, State};
use axum::Json;
use tracing::{info, warn};

use rdbg_models::UploadResponse;

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;

/// Multipart field carrying the video.
const FILE_FIELD: &str = "file";

/// Whether a part looks like a video we can analyse.
fn is_video(content_type: Option<&str>, file_name: &str) -> bool {
    content_type.is_some_and(|ct| ct.starts_with("video/"))
        || file_name.to_lowercase().ends_with(".mp4")
}

/// Drain a field into memory, failing as soon as it exceeds `max_bytes`.
async fn read_capped(field: &mut Field<'_>, max_bytes: usize) -> ApiResult<Vec<u8>> {
    let mut data = Vec::new();
    while let Some(chunk) = field.chunk().await? {
        if data.len() + chunk.len() > max_bytes {
            return Err(ApiError::file_too_large(max_bytes));
        }
        data.extend_from_slice(&chunk);
    }
    Ok(data)
}

/// Store an uploaded video and return its id.
///
/// Rejected uploads are never written to disk.
pub async fn upload(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<UploadResponse>> {
    let mut multipart = multipart?;

    while let Some(mut field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let original_name = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().map(str::to_string);

        if !is_video(content_type.as_deref(), &original_name) {
            metrics::record_upload("rejected", 0);
            return Err(ApiError::bad_request("File must be a video (MP4)"));
        }

        let data = match read_capped(&mut field, state.config.max_upload_bytes).await {
            Ok(data) => data,
            Err(e) => {
                metrics::record_upload("rejected", 0);
                warn!(file_name = %original_name, "Upload rejected: {}", e);
                return Err(e);
            }
        };

        let stored = state
            .uploads
            .store(&original_name, content_type.as_deref(), &data)
            .await?;
        metrics::record_upload("stored", stored.size_bytes);

        info!(
            file_id = %stored.file_id,
            original_name = %original_name,
            size_bytes = stored.size_bytes,
            "Upload stored"
        );

        return Ok(Json(UploadResponse {
            file_id: stored.file_id,
            file_name: stored.file_name,
            duration: 0.0,
        }));
    }

    metrics::record_upload("rejected", 0);
    Err(ApiError::bad_request("No file provided"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_video() {
        assert!(is_video(Some("video/quicktime"), "clip.mov"));
        assert!(is_video(None, "CLIP.MP4"));
        assert!(is_video(Some("application/octet-stream"), "clip.mp4"));
        assert!(!is_video(Some("image/png"), "photo.png"));
        assert!(!is_video(None, ""));
    }
}
