//! services/api/src/web/medical_records.rs
//!
//! Medical record endpoints. Create and update accept multipart forms so
//! scans and reports can ride along as attachments; stored files are
//! removed from disk when their rows go away.

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::web::middleware::CallerId;
use crate::web::state::AppState;
use household_core::domain::{FileAsset, MedicalRecord, RecordType};

const MAX_FILES_PER_RECORD: usize = 5;
const RECORDS_FOLDER: &str = "records";

#[derive(Serialize)]
pub struct RecordResponse {
    pub status: u16,
    pub record: MedicalRecord,
}

#[derive(Serialize)]
pub struct RecordsResponse {
    pub status: u16,
    pub records: Vec<MedicalRecord>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileQuery {
    pub profile_id: Option<Uuid>,
}

/// One uploaded part of a multipart form.
pub struct UploadedFile {
    pub original_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Collects a multipart form into text fields and file parts.
pub async fn collect_multipart(
    mut multipart: Multipart,
    max_files: usize,
) -> ApiResult<(HashMap<String, String>, Vec<UploadedFile>)> {
    let mut fields = HashMap::new();
    let mut files = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Malformed multipart request: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if let Some(file_name) = field.file_name() {
            if files.len() >= max_files {
                return Err(ApiError::bad_request(format!(
                    "At most {max_files} files are allowed per record."
                )));
            }
            let original_name = file_name.to_string();
            let mime_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::bad_request(format!("Failed to read file part: {e}")))?;
            files.push(UploadedFile {
                original_name,
                mime_type,
                bytes: bytes.to_vec(),
            });
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| ApiError::bad_request(format!("Failed to read field: {e}")))?;
            fields.insert(name, value);
        }
    }

    Ok((fields, files))
}

/// Tags arrive as a JSON array, a JSON-encoded string, or a comma list.
pub fn parse_string_list(raw: &str) -> Vec<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    if let Ok(serde_json::Value::Array(values)) = serde_json::from_str(trimmed) {
        return values
            .into_iter()
            .filter_map(|v| match v {
                serde_json::Value::String(s) => Some(s),
                other => Some(other.to_string()),
            })
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
    }
    trimmed
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_id_list(raw: &str) -> Vec<Uuid> {
    parse_string_list(raw)
        .iter()
        .filter_map(|s| Uuid::parse_str(s).ok())
        .collect()
}

async fn store_uploads(
    state: &AppState,
    record_id: Uuid,
    uploads: Vec<UploadedFile>,
) -> ApiResult<Vec<FileAsset>> {
    let mut assets = Vec::with_capacity(uploads.len());
    for upload in uploads {
        let url = state
            .files
            .save(RECORDS_FOLDER, &upload.original_name, &upload.bytes)
            .await?;
        assets.push(FileAsset {
            id: Uuid::new_v4(),
            record_id,
            url,
            mime_type: upload.mime_type,
            size_bytes: upload.bytes.len() as i64,
            original_name: upload.original_name,
        });
    }
    Ok(assets)
}

async fn discard_stored(state: &AppState, files: &[FileAsset]) {
    for file in files {
        if let Err(e) = state.files.remove(&file.url).await {
            warn!("failed to remove stored file {}: {e}", file.url);
        }
    }
}

//=========================================================================================
// Handlers
//=========================================================================================

pub async fn list_medical_records_handler(
    State(state): State<Arc<AppState>>,
    Extension(CallerId(user_id)): Extension<CallerId>,
    Query(query): Query<ProfileQuery>,
) -> ApiResult<impl IntoResponse> {
    let profile_id = query
        .profile_id
        .ok_or_else(|| ApiError::bad_request("profileId query parameter is required."))?;

    let profile = state
        .db
        .find_profile(user_id, Some(profile_id))
        .await?
        .ok_or_else(|| ApiError::not_found("Profile not found for current user."))?;

    let records = state.db.list_medical_records(profile.id).await?;
    Ok(Json(RecordsResponse { status: 200, records }))
}

pub async fn get_medical_record_handler(
    State(state): State<Arc<AppState>>,
    Extension(CallerId(user_id)): Extension<CallerId>,
    Path(record_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let record = state
        .db
        .find_medical_record(user_id, record_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Record not found."))?;
    Ok(Json(RecordResponse { status: 200, record }))
}

pub async fn create_medical_record_handler(
    State(state): State<Arc<AppState>>,
    Extension(CallerId(user_id)): Extension<CallerId>,
    multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    let (fields, uploads) = collect_multipart(multipart, MAX_FILES_PER_RECORD).await?;

    let profile_id = fields
        .get("profileId")
        .and_then(|v| Uuid::parse_str(v).ok());
    let title = fields.get("title").filter(|t| !t.trim().is_empty());
    let record_date = fields
        .get("recordDate")
        .and_then(|v| super::medicine_reminders::parse_reference_date(Some(v)));

    let (profile_id, title, record_date) = match (profile_id, title, record_date) {
        (Some(p), Some(t), Some(d)) => (p, t.clone(), d),
        _ => {
            return Err(ApiError::bad_request(
                "profileId, title and recordDate are required.",
            ))
        }
    };

    let profile = state
        .db
        .find_profile(user_id, Some(profile_id))
        .await?
        .ok_or_else(|| ApiError::not_found("Profile not found for current user."))?;

    let record_id = Uuid::new_v4();
    let files = store_uploads(&state, record_id, uploads).await?;

    let record = state
        .db
        .create_medical_record(MedicalRecord {
            id: record_id,
            profile_id: profile.id,
            title,
            record_type: fields
                .get("recordType")
                .map(|v| RecordType::from_input(v))
                .unwrap_or(RecordType::Other),
            record_date,
            provider_name: fields.get("providerName").cloned(),
            notes: fields.get("notes").cloned(),
            tags: fields
                .get("tags")
                .map(|v| parse_string_list(v))
                .unwrap_or_default(),
            created_at: state.clock.now(),
            files,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(RecordResponse { status: 201, record })))
}

pub async fn update_medical_record_handler(
    State(state): State<Arc<AppState>>,
    Extension(CallerId(user_id)): Extension<CallerId>,
    Path(record_id): Path<Uuid>,
    multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    let mut existing = state
        .db
        .find_medical_record(user_id, record_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Record not found."))?;

    let (fields, uploads) = collect_multipart(multipart, MAX_FILES_PER_RECORD).await?;

    if let Some(title) = fields.get("title") {
        existing.title = title.clone();
    }
    if let Some(record_type) = fields.get("recordType") {
        existing.record_type = RecordType::from_input(record_type);
    }
    if let Some(raw) = fields.get("recordDate") {
        if let Some(parsed) = super::medicine_reminders::parse_reference_date(Some(raw)) {
            existing.record_date = parsed;
        }
    }
    if let Some(provider) = fields.get("providerName") {
        existing.provider_name = Some(provider.clone());
    }
    if let Some(notes) = fields.get("notes") {
        existing.notes = Some(notes.clone());
    }
    if let Some(tags) = fields.get("tags") {
        existing.tags = parse_string_list(tags);
    }

    state.db.update_medical_record(existing).await?;

    if let Some(raw) = fields.get("filesToRemove") {
        let ids = parse_id_list(raw);
        if !ids.is_empty() {
            let removed = state.db.remove_record_files(record_id, &ids).await?;
            discard_stored(&state, &removed).await;
        }
    }

    if !uploads.is_empty() {
        let files = store_uploads(&state, record_id, uploads).await?;
        state.db.add_record_files(record_id, files).await?;
    }

    let record = state
        .db
        .find_medical_record(user_id, record_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Record not found."))?;

    Ok(Json(RecordResponse { status: 200, record }))
}

pub async fn delete_medical_record_handler(
    State(state): State<Arc<AppState>>,
    Extension(CallerId(user_id)): Extension<CallerId>,
    Path(record_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let record = state
        .db
        .find_medical_record(user_id, record_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Record not found."))?;

    let removed = state.db.delete_medical_record(record.id).await?;
    discard_stored(&state, &removed).await;

    Ok(Json(serde_json::json!({
        "status": 200,
        "message": "Record deleted successfully."
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_lists_accept_json_and_comma_forms() {
        assert_eq!(parse_string_list(r#"["lab","x-ray"]"#), vec!["lab", "x-ray"]);
        assert_eq!(parse_string_list("lab, x-ray , "), vec!["lab", "x-ray"]);
        assert!(parse_string_list("   ").is_empty());
    }
}
