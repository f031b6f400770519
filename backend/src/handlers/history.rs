//! Import/export history handler

use axum::{extract::State, Json};
use shared::models::ImportRecord;

use crate::error::AppResult;
use crate::services::HistoryService;
use crate::AppState;

/// Most recent imports and exports
pub async fn list_history(State(state): State<AppState>) -> AppResult<Json<Vec<ImportRecord>>> {
    let service = HistoryService::new(state.history.clone());
    let records = service.recent(state.config.listing.history_limit).await?;
    Ok(Json(records))
}
