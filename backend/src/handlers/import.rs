//! Bulk import handler

use axum::{
    body::to_bytes,
    extract::{FromRequest, Multipart, Query, Request, State},
    http::header,
    Json,
};
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::services::import::{ImportService, ImportSummary};
use crate::services::HistoryService;
use crate::AppState;

/// Largest accepted upload
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

const DEFAULT_FILE_NAME: &str = "import.csv";

#[derive(Debug, Deserialize)]
pub struct ImportQuery {
    pub file_name: Option<String>,
}

/// First `file` part of a multipart upload
async fn read_multipart(mut multipart: Multipart) -> AppResult<(Option<String>, String)> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidRequest(format!("Malformed upload: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().map(str::to_string);
        let content = field
            .text()
            .await
            .map_err(|e| AppError::InvalidRequest(format!("Could not read upload: {}", e)))?;
        return Ok((file_name, content));
    }
    Err(AppError::InvalidRequest(
        "Upload has no 'file' field".to_string(),
    ))
}

/// Import a CSV file sent as multipart `file` or as the raw request body
pub async fn import_references(
    State(state): State<AppState>,
    Query(query): Query<ImportQuery>,
    request: Request,
) -> AppResult<Json<ImportSummary>> {
    let is_multipart = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("multipart/form-data"));

    let (uploaded_name, content) = if is_multipart {
        let multipart = Multipart::from_request(request, &state)
            .await
            .map_err(|e| AppError::InvalidRequest(e.body_text()))?;
        read_multipart(multipart).await?
    } else {
        let bytes = to_bytes(request.into_body(), MAX_UPLOAD_BYTES)
            .await
            .map_err(|e| AppError::InvalidRequest(format!("Could not read body: {}", e)))?;
        let content = String::from_utf8(bytes.to_vec())
            .map_err(|_| AppError::InvalidRequest("File is not valid UTF-8 text".to_string()))?;
        (None, content)
    };

    let file_name = query
        .file_name
        .or(uploaded_name)
        .unwrap_or_else(|| DEFAULT_FILE_NAME.to_string());

    let service = ImportService::new(
        state.store.clone(),
        state.live.clone(),
        HistoryService::new(state.history.clone()),
    );
    let summary = service.import(&file_name, &content).await?;
    Ok(Json(summary))
}
