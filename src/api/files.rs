use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, State},
    Json,
};
use serde::Serialize;

use filesearch_backend::config;
use filesearch_backend::models::{FileRecord, ProcessingStatus, UploadedFile};

use crate::state::AppState;

use super::ApiResponse;

/// A file record without its extracted text / 不含正文的文件记录
#[derive(Debug, Serialize)]
pub struct FileSummary {
    pub id: String,
    pub name: String,
    pub declared_type: String,
    pub size: i64,
    pub last_modified_at: String,
    pub uploaded_at: String,
    pub status: ProcessingStatus,
    pub error: Option<String>,
    pub content_length: usize,
}

impl From<&FileRecord> for FileSummary {
    fn from(record: &FileRecord) -> Self {
        Self {
            id: record.id.clone(),
            name: record.name.clone(),
            declared_type: record.declared_type.clone(),
            size: record.size,
            last_modified_at: record.last_modified_at.clone(),
            uploaded_at: record.uploaded_at.clone(),
            status: record.status,
            error: record.error.clone(),
            content_length: record.content.len(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub accepted: Vec<FileSummary>,
    pub rejected: Vec<UploadRejection>,
}

#[derive(Debug, Serialize)]
pub struct UploadRejection {
    pub name: String,
    pub reason: String,
}

/// POST /api/files/upload - 批量上传文档
///
/// Multipart form: any number of file fields. A text field named
/// `last_modified` sets the source modification time (RFC 3339) of the
/// file field that follows it. Files are accepted independently; the
/// response lists accepted records and rejected names side by side.
pub async fn upload_files(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Json<ApiResponse<UploadResponse>> {
    let max_size = config::config().upload.max_size_bytes;

    let mut uploads: Vec<UploadedFile> = Vec::new();
    let mut rejected: Vec<UploadRejection> = Vec::new();
    let mut pending_last_modified: Option<String> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return Json(ApiResponse::error(&format!("invalid multipart body: {}", e))),
        };

        let field_name = field.name().unwrap_or("").to_string();
        let file_name = field.file_name().map(|s| s.to_string());
        let content_type = field.content_type().map(|ct| ct.to_string());

        match file_name {
            Some(name) => {
                let declared_type = content_type.unwrap_or_else(|| {
                    mime_guess::from_path(&name)
                        .first_or_octet_stream()
                        .to_string()
                });

                let bytes = match field.bytes().await {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        rejected.push(UploadRejection {
                            name,
                            reason: format!("failed to read upload: {}", e),
                        });
                        pending_last_modified = None;
                        continue;
                    }
                };

                if bytes.len() > max_size {
                    rejected.push(UploadRejection {
                        name,
                        reason: format!("file exceeds the {} byte upload limit", max_size),
                    });
                    pending_last_modified = None;
                    continue;
                }

                uploads.push(UploadedFile {
                    name,
                    declared_type,
                    last_modified_at: pending_last_modified.take(),
                    bytes: bytes.to_vec(),
                });
            }
            None if field_name == "last_modified" => {
                pending_last_modified = field.text().await.ok();
            }
            None => {
                // unrelated form fields are ignored
                let _ = field.bytes().await;
            }
        }
    }

    if uploads.is_empty() && rejected.is_empty() {
        return Json(ApiResponse::error("no files in upload"));
    }

    let mut accepted = Vec::new();
    // results come back in input order, so names pair up positionally
    let names: Vec<String> = uploads.iter().map(|u| u.name.clone()).collect();
    for (name, result) in names.into_iter().zip(state.orchestrator.upload(uploads).await) {
        match result {
            Ok(record) => accepted.push(FileSummary::from(&record)),
            Err(e) => rejected.push(UploadRejection {
                name,
                reason: e.to_string(),
            }),
        }
    }

    Json(ApiResponse::success(UploadResponse { accepted, rejected }))
}

/// GET /api/files - 文件列表
pub async fn list_files(State(state): State<Arc<AppState>>) -> Json<ApiResponse<Vec<FileSummary>>> {
    let records = state.orchestrator.list_files().await;
    let summaries = records.iter().map(FileSummary::from).collect();
    Json(ApiResponse::success(summaries))
}

/// DELETE /api/files/:id - 删除文件
pub async fn delete_file(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Json<ApiResponse<bool>> {
    match state.orchestrator.delete_file(&id).await {
        Ok(existed) => Json(ApiResponse::success(existed)),
        Err(e) => Json(ApiResponse::error(&format!("failed to delete file: {}", e))),
    }
}
