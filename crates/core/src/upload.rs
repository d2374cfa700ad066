//! Naming and placement rules for uploaded images.

use std::path::{Component, Path, PathBuf};

use crate::error::{CoreError, CoreResult};

pub const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif"];

/// Lowercased extension of `filename` when it is an allowed image type.
pub fn allowed_extension(filename: &str) -> Option<String> {
    let ext = Path::new(filename)
        .extension()?
        .to_str()?
        .to_ascii_lowercase();
    ALLOWED_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

/// Random storage name keeping the original (lowercased) extension.
pub fn safe_filename(original: &str) -> CoreResult<String> {
    let ext = allowed_extension(original).ok_or_else(|| {
        CoreError::Validation(format!(
            "unsupported file type '{original}' (allowed: {})",
            ALLOWED_EXTENSIONS.join(", ")
        ))
    })?;
    Ok(format!("{}.{ext}", uuid::Uuid::new_v4().simple()))
}

/// Keep only plain relative segments of a requested upload directory.
///
/// `..`, absolute roots and empty segments are dropped, so the result always
/// stays below the upload root.
pub fn sanitize_upload_dir(requested: &str) -> PathBuf {
    Path::new(requested.trim())
        .components()
        .filter_map(|component| match component {
            Component::Normal(segment) => segment.to_str(),
            _ => None,
        })
        .filter(|segment| {
            segment
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        })
        .collect()
}

/// Public URL of a stored file: `<url_prefix>/<dir>/<name>` with `/`
/// separators.
pub fn public_url(url_prefix: &str, dir: &Path, saved_name: &str) -> String {
    let mut url = url_prefix.trim_end_matches('/').to_string();
    for segment in dir.components().filter_map(|c| c.as_os_str().to_str()) {
        url.push('/');
        url.push_str(segment);
    }
    url.push('/');
    url.push_str(saved_name);
    url
}
