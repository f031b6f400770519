//! CSV export handler

use axum::{
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
};
use shared::dates::today;
use shared::views::ListingQuery;

use crate::error::AppResult;
use crate::services::{ExportService, HistoryService};
use crate::AppState;

/// Download the filtered, sorted table as CSV (all pages)
pub async fn export_references(
    State(state): State<AppState>,
    Query(query): Query<ListingQuery>,
) -> AppResult<Response> {
    let service = ExportService::new(
        state.live.clone(),
        HistoryService::new(state.history.clone()),
        state.config.schedule.policy(),
    );
    let file = service.export(&query, today()).await?;

    let disposition = format!("attachment; filename=\"{}\"", file.file_name);
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        file.content,
    )
        .into_response())
}
