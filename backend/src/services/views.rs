//! Read-only projections over the live reference set

use chrono::NaiveDate;
use shared::schedule::UnlockPolicy;
use shared::types::{PaginatedResponse, Pagination};
use shared::views::{
    card_page, gantt_projection, month_grid, GanttChart, GanttMode, MonthGrid, ReferenceCard,
};

use crate::error::{AppError, AppResult};
use crate::services::LiveReferences;

/// Builds the Gantt, calendar and card views for one request
#[derive(Clone)]
pub struct ViewService {
    live: LiveReferences,
    policy: UnlockPolicy,
}

impl ViewService {
    pub fn new(live: LiveReferences, policy: UnlockPolicy) -> Self {
        Self { live, policy }
    }

    pub async fn gantt(&self, mode: GanttMode, today: NaiveDate) -> GanttChart {
        let references = self.live.snapshot().await;
        gantt_projection(&references, mode, today, self.policy)
    }

    pub async fn calendar(&self, year: i32, month: u32, today: NaiveDate) -> AppResult<MonthGrid> {
        let references = self.live.snapshot().await;
        month_grid(year, month, &references, today).ok_or_else(|| AppError::Validation {
            field: "month".to_string(),
            message: format!("{}-{} is not a valid month", year, month),
            message_es: format!("{}-{} no es un mes válido", year, month),
        })
    }

    pub async fn cards(
        &self,
        pagination: Pagination,
        today: NaiveDate,
    ) -> PaginatedResponse<ReferenceCard> {
        let references = self.live.snapshot().await;
        card_page(&references, pagination, today, self.policy)
    }
}
