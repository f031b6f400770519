//! CSV export of the filtered table

use chrono::NaiveDate;
use shared::export::{export_file_name, export_rows, EXPORT_HEADERS};
use shared::models::NewImportRecord;
use shared::schedule::UnlockPolicy;
use shared::views::{filter_and_sort, ListingQuery};

use crate::error::{AppError, AppResult};
use crate::services::{HistoryService, LiveReferences};

/// Export service producing importer-compatible CSV
#[derive(Clone)]
pub struct ExportService {
    live: LiveReferences,
    history: HistoryService,
    policy: UnlockPolicy,
}

/// A rendered export file
#[derive(Debug)]
pub struct ExportFile {
    pub file_name: String,
    pub rows: usize,
    pub content: String,
}

impl ExportService {
    pub fn new(live: LiveReferences, history: HistoryService, policy: UnlockPolicy) -> Self {
        Self {
            live,
            history,
            policy,
        }
    }

    /// Every row matching `query`, in table order, unpaginated
    pub async fn export(&self, query: &ListingQuery, today: NaiveDate) -> AppResult<ExportFile> {
        let references = self.live.snapshot().await;
        let rows = export_rows(&filter_and_sort(&references, query, today, self.policy));

        // Header row written by hand so an empty export still has one
        let mut wtr = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(vec![]);
        wtr.write_record(EXPORT_HEADERS)
            .map_err(|e| AppError::Internal(format!("CSV serialization error: {}", e)))?;
        for row in &rows {
            wtr.serialize(row)
                .map_err(|e| AppError::Internal(format!("CSV serialization error: {}", e)))?;
        }
        let content = String::from_utf8(
            wtr.into_inner()
                .map_err(|e| AppError::Internal(format!("CSV writer error: {}", e)))?,
        )
        .map_err(|e| AppError::Internal(format!("UTF-8 conversion error: {}", e)))?;

        let file_name = export_file_name(today);
        tracing::info!("Exported {} references to {}", rows.len(), file_name);
        self.history
            .record(NewImportRecord::success(file_name.as_str(), rows.len()))
            .await;

        Ok(ExportFile {
            file_name,
            rows: rows.len(),
            content,
        })
    }
}
