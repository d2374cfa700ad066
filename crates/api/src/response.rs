//! Shared response body types for the JSON endpoints.

use oxadmin_core::model_admin::SerializedRecord;
use serde::Serialize;

/// `{ "data": T }`, used by the per-field search endpoint.
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}

/// A row as the list script consumes it: formatted and raw strings.
#[derive(Debug, Clone, Serialize)]
pub struct RowPayload {
    pub display: SerializedRecord,
    pub data: SerializedRecord,
}

/// One page of rows plus the unpaginated total.
#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub total: i64,
    pub data: Vec<RowPayload>,
}

/// Outcome of a single-record action (edit, delete, language change).
#[derive(Debug, Serialize)]
pub struct ActionResponse {
    pub success: bool,
    pub message: String,
}

impl ActionResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BatchDeleteResponse {
    pub code: u16,
    pub success: bool,
    pub message: String,
    pub deleted: u64,
}

#[derive(Debug, Serialize)]
pub struct InlineDataResponse {
    pub success: bool,
    pub data: Vec<RowPayload>,
    pub total: usize,
}

/// A stored upload.
#[derive(Debug, Clone, Serialize)]
pub struct UploadedFile {
    pub original_name: String,
    pub saved_name: String,
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub code: u16,
    pub success: bool,
    pub message: String,
    pub data: UploadedFile,
}
