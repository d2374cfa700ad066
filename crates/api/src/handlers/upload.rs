//! Handler for image uploads from form fields.

use axum::extract::{Multipart, State};
use axum::Json;
use oxadmin_core::upload::{public_url, safe_filename, sanitize_upload_dir};

use crate::error::{AppError, AppResult};
use crate::middleware::session::CurrentAdmin;
use crate::response::{UploadResponse, UploadedFile};
use crate::state::AppState;

/// POST /<prefix>/upload
///
/// Multipart form with a `file` part and an optional `upload_path` text part
/// naming a directory below the upload root. The file is stored under a
/// random name keeping its extension.
pub async fn upload(
    State(state): State<AppState>,
    admin: CurrentAdmin,
    mut multipart: Multipart,
) -> AppResult<Json<UploadResponse>> {
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut upload_path = String::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        match field.name().unwrap_or("") {
            "file" => {
                let filename = field.file_name().unwrap_or("").to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                file = Some((filename, data.to_vec()));
            }
            "upload_path" => {
                upload_path = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
            }
            _ => {}
        }
    }

    let (original_name, data) =
        file.ok_or_else(|| AppError::BadRequest("No file was uploaded".into()))?;
    if original_name.is_empty() || data.is_empty() {
        return Err(AppError::BadRequest("No file was uploaded".into()));
    }
    let saved_name = safe_filename(&original_name)?;

    let dir = sanitize_upload_dir(&upload_path);
    let target_dir = state.config.upload_root.join(&dir);
    tokio::fs::create_dir_all(&target_dir)
        .await
        .map_err(|e| AppError::InternalError(format!("Failed to create upload directory: {e}")))?;
    tokio::fs::write(target_dir.join(&saved_name), &data)
        .await
        .map_err(|e| AppError::InternalError(format!("Failed to store upload: {e}")))?;

    let url = public_url(&state.config.upload_url_prefix, &dir, &saved_name);
    tracing::info!(
        user_id = admin.user.id,
        %original_name,
        %url,
        size = data.len(),
        "File uploaded"
    );

    Ok(Json(UploadResponse {
        code: 200,
        success: true,
        message: "Upload succeeded".to_string(),
        data: UploadedFile {
            original_name,
            saved_name,
            url,
        },
    }))
}
