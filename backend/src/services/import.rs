//! Bulk import from delimited text
//!
//! The whole file is validated before anything is written; one bad row
//! rejects the file. Every attempt lands in the import history.

use std::sync::Arc;

use serde::Serialize;
use shared::import::{validate_import, HeaderMap, ImportField, ImportRow};
use shared::models::{ChangeEvent, NewImportRecord, Reference};
use shared::validation::check_new_reference;

use crate::error::{AppError, AppResult};
use crate::services::{HistoryService, LiveReferences};
use crate::store::ReferenceStore;

/// Import service for CSV uploads
#[derive(Clone)]
pub struct ImportService {
    store: Arc<dyn ReferenceStore>,
    live: LiveReferences,
    history: HistoryService,
}

/// Result of a successful import
#[derive(Debug, Serialize)]
pub struct ImportSummary {
    pub file_name: String,
    pub imported: usize,
    pub references: Vec<Reference>,
}

/// Pick `;` when the header line uses it more than `,`
fn sniff_delimiter(content: &str) -> u8 {
    let header = content.lines().next().unwrap_or_default();
    let semicolons = header.matches(';').count();
    let commas = header.matches(',').count();
    if semicolons > commas {
        b';'
    } else {
        b','
    }
}

/// Read a CSV document into import rows.
///
/// Row numbers are the line each record starts on, counting the header as 1.
pub fn parse_csv(content: &str) -> AppResult<Vec<ImportRow>> {
    let content = content.trim_start_matches('\u{feff}');
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(sniff_delimiter(content))
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| AppError::InvalidRequest(format!("Could not read header row: {}", e)))?
        .clone();
    let map = HeaderMap::from_headers(headers.iter())?;

    let mut rows = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record.map_err(|e| {
            let line = e.position().map_or(index as u64 + 2, |p| p.line());
            AppError::InvalidRequest(format!("Could not read row {}: {}", line, e))
        })?;
        let row_number = record
            .position()
            .and_then(|p| usize::try_from(p.line()).ok())
            .unwrap_or(index + 2);
        rows.push(map.row(row_number, record.iter()));
    }
    Ok(rows)
}

impl ImportService {
    pub fn new(store: Arc<dyn ReferenceStore>, live: LiveReferences, history: HistoryService) -> Self {
        Self {
            store,
            live,
            history,
        }
    }

    /// Import `content` as `file_name`, all rows or none
    pub async fn import(&self, file_name: &str, content: &str) -> AppResult<ImportSummary> {
        let outcome = self.import_rows(content).await;

        match &outcome {
            Ok(created) => {
                tracing::info!("Imported {} references from {}", created.len(), file_name);
                self.history
                    .record(NewImportRecord::success(file_name, created.len()))
                    .await;
            }
            Err(e) => {
                tracing::warn!("Import of {} rejected: {}", file_name, e);
                self.history
                    .record(NewImportRecord::failure(file_name, e.to_string()))
                    .await;
            }
        }

        let references = outcome?;
        Ok(ImportSummary {
            file_name: file_name.to_string(),
            imported: references.len(),
            references,
        })
    }

    async fn import_rows(&self, content: &str) -> AppResult<Vec<Reference>> {
        let rows = parse_csv(content)?;

        let candidates: Vec<String> = rows
            .iter()
            .filter_map(|row| row.get(ImportField::Referencia))
            .map(str::to_string)
            .collect();
        let existing = self.store.existing_referencias(&candidates).await?;

        let accepted = validate_import(&rows, &existing)?;
        if accepted.is_empty() {
            return Err(AppError::InvalidRequest("The file has no data rows".to_string()));
        }
        for input in &accepted {
            check_new_reference(input).map_err(|(field, msg)| {
                AppError::invalid_field(field, &format!("{} ({})", msg, input.referencia))
            })?;
        }

        let created = self.store.create_many(accepted).await?;
        for reference in &created {
            self.live.apply(ChangeEvent::insert(reference.clone())).await;
        }
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::import::ImportIssue;

    #[test]
    fn test_sniff_delimiter() {
        assert_eq!(sniff_delimiter("referencia;curva;cantidad\nA;S-M-L;18"), b';');
        assert_eq!(sniff_delimiter("referencia,curva\nA,S-M-L"), b',');
        assert_eq!(sniff_delimiter(""), b',');
    }

    #[test]
    fn test_parse_csv_numbers_rows_after_header() {
        let rows = parse_csv("\u{feff}Referencia;Curva;Cantidad\nA1;S-M-L;18\n;;\nA2;S-M-L-XL;20\n")
            .unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].row_number, 2);
        assert_eq!(rows[0].get(ImportField::Curva), Some("S-M-L"));
        assert!(rows[1].is_blank());
        assert_eq!(rows[2].get(ImportField::Referencia), Some("A2"));
    }

    #[test]
    fn test_parse_csv_row_numbers_follow_blank_lines() {
        let rows = parse_csv("referencia,curva,cantidad\nA,S-M-L,18\n\nB,BAD,18\n").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].row_number, 2);
        assert_eq!(rows[1].row_number, 4);

        let err = validate_import(&rows, &Default::default()).unwrap_err();
        assert_eq!(
            err.issues,
            vec![ImportIssue::InvalidCurva {
                row: 4,
                value: "BAD".to_string()
            }]
        );
    }

    #[test]
    fn test_parse_csv_requires_referencia_and_curva() {
        assert!(matches!(
            parse_csv("codigo,cantidad\nA,1\n"),
            Err(AppError::ImportRejected(_))
        ));
    }
}
