use axum::{
    Extension, Json,
    extract::{Multipart, State},
};
use std::sync::Arc;

use super::auth::{AuthUser, require_admin};
use super::types::UploadResponse;
use super::{ApiError, AppState};
use crate::constants::limits;

/// POST /upload
/// Admin-only variant: product imagery
pub async fn upload_product_image(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    require_admin(&user)?;

    let folder = state.cloudinary().product_folder().to_string();
    upload_to(&state, multipart, &folder).await
}

/// POST /upload/media
/// Any authenticated user: general gallery
pub async fn upload_media(
    State(state): State<Arc<AppState>>,
    Extension(_user): Extension<AuthUser>,
    multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let folder = state.cloudinary().media_folder().to_string();
    upload_to(&state, multipart, &folder).await
}

/// Pull the `file` part out of the form and hand its bytes to the CDN bridge.
/// The two endpoints differ only in the authorization predicate above.
async fn upload_to(
    state: &Arc<AppState>,
    mut multipart: Multipart,
    folder: &str,
) -> Result<Json<UploadResponse>, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::validation(format!("Malformed multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field
            .file_name()
            .unwrap_or("upload.bin")
            .to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();

        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::validation(format!("Failed to read file: {e}")))?;

        if bytes.is_empty() {
            return Err(ApiError::validation("Uploaded file is empty"));
        }
        if bytes.len() > limits::MAX_UPLOAD_BYTES {
            return Err(ApiError::validation("Uploaded file is too large"));
        }

        let url = state
            .cloudinary()
            .upload(&file_name, &content_type, bytes.to_vec(), folder)
            .await
            .map_err(|e| ApiError::cloudinary_error(e.to_string()))?;

        return Ok(Json(UploadResponse { url }));
    }

    Err(ApiError::validation("Missing `file` field"))
}
