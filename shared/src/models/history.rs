//! Import/export history models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One append-only entry per import or export operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportRecord {
    pub id: Uuid,
    pub file_name: String,
    pub records_count: i32,
    pub status: ImportStatus,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Outcome of an import or export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportStatus {
    Success,
    Error,
}

impl ImportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportStatus::Success => "success",
            ImportStatus::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "success" => Some(ImportStatus::Success),
            "error" => Some(ImportStatus::Error),
            _ => None,
        }
    }
}

/// A history entry before the store assigns identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewImportRecord {
    pub file_name: String,
    pub records_count: i32,
    pub status: ImportStatus,
    pub error_message: Option<String>,
}

impl NewImportRecord {
    pub fn success(file_name: impl Into<String>, records_count: usize) -> Self {
        Self {
            file_name: file_name.into(),
            records_count: i32::try_from(records_count).unwrap_or(i32::MAX),
            status: ImportStatus::Success,
            error_message: None,
        }
    }

    pub fn failure(file_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            records_count: 0,
            status: ImportStatus::Error,
            error_message: Some(message.into()),
        }
    }
}
