//! Import/export history

use std::sync::Arc;

use shared::models::{ImportRecord, NewImportRecord};

use crate::error::AppResult;
use crate::store::ImportHistoryStore;

#[derive(Clone)]
pub struct HistoryService {
    history: Arc<dyn ImportHistoryStore>,
}

impl HistoryService {
    pub fn new(history: Arc<dyn ImportHistoryStore>) -> Self {
        Self { history }
    }

    /// Most recent entries first
    pub async fn recent(&self, limit: i64) -> AppResult<Vec<ImportRecord>> {
        Ok(self.history.recent(limit).await?)
    }

    /// Append an entry. A failed write is logged and otherwise ignored so it
    /// never masks the outcome of the operation being recorded.
    pub async fn record(&self, entry: NewImportRecord) {
        let file_name = entry.file_name.clone();
        if let Err(e) = self.history.append(entry).await {
            tracing::warn!("Could not record history for {}: {}", file_name, e);
        }
    }
}
