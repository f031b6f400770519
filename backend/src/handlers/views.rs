//! Gantt, calendar and card view handlers

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::Datelike;
use serde::Deserialize;
use shared::dates::today;
use shared::types::{PaginatedResponse, Pagination};
use shared::views::{GanttChart, GanttMode, MonthGrid, ReferenceCard};

use crate::error::AppResult;
use crate::services::ViewService;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct GanttQuery {
    #[serde(default)]
    pub mode: GanttMode,
}

#[derive(Debug, Deserialize)]
pub struct CalendarQuery {
    pub year: Option<i32>,
    pub month: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct CardQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

fn service(state: &AppState) -> ViewService {
    ViewService::new(state.live.clone(), state.config.schedule.policy())
}

/// Gantt chart of every scheduled reference
pub async fn gantt_view(
    State(state): State<AppState>,
    Query(query): Query<GanttQuery>,
) -> AppResult<Json<GanttChart>> {
    let chart = service(&state).gantt(query.mode, today()).await;
    Ok(Json(chart))
}

/// Month grid of launches, defaulting to the current month
pub async fn calendar_view(
    State(state): State<AppState>,
    Query(query): Query<CalendarQuery>,
) -> AppResult<Json<MonthGrid>> {
    let today = today();
    let grid = service(&state)
        .calendar(
            query.year.unwrap_or_else(|| today.year()),
            query.month.unwrap_or_else(|| today.month()),
            today,
        )
        .await?;
    Ok(Json(grid))
}

/// Cards ordered by launch date
pub async fn card_view(
    State(state): State<AppState>,
    Query(query): Query<CardQuery>,
) -> AppResult<Json<PaginatedResponse<ReferenceCard>>> {
    let pagination = Pagination {
        page: query.page.unwrap_or(1),
        per_page: query
            .per_page
            .unwrap_or(state.config.listing.page_size)
            .clamp(1, 100),
    };
    let cards = service(&state).cards(pagination, today()).await;
    Ok(Json(cards))
}
