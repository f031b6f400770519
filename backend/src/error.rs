//! Error handling for the GanttFlow server
//!
//! Provides consistent error responses in English and Spanish

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use shared::import::{ImportError, ImportIssue};
use thiserror::Error;

use crate::store::StoreError;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Validation errors
    #[error("Validation error: {message}")]
    Validation {
        field: String,
        message: String,
        message_es: String,
    },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    // Import errors
    #[error("{0}")]
    ImportRejected(#[from] ImportError),

    // Store errors
    #[error("Storage error: {0}")]
    StorageError(String),

    // Database errors
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// Field-level validation failure
    pub fn invalid_field(field: &str, message: &str) -> Self {
        AppError::Validation {
            field: field.to_string(),
            message: message.to_string(),
            message_es: format!("Dato inválido en {}: {}", field, message),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateReferencia(referencia) => {
                AppError::DuplicateEntry(format!("referencia '{}'", referencia))
            }
            StoreError::NotFound(id) => AppError::NotFound(format!("Reference {}", id)),
            StoreError::Database(e) => AppError::DatabaseError(e),
            other => AppError::StorageError(other.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let field = errors
            .field_errors()
            .keys()
            .next()
            .map(|f| f.to_string())
            .unwrap_or_default();
        AppError::Validation {
            message: errors.to_string(),
            message_es: format!("Dato inválido en {}", field),
            field,
        }
    }
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message_en: String,
    pub message_es: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// Per-row problems for a rejected import
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issues: Option<Vec<ImportIssue>>,
}

impl ErrorDetail {
    fn new(code: &str, message_en: String, message_es: String) -> Self {
        Self {
            code: code.to_string(),
            message_en,
            message_es,
            field: None,
            issues: None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_detail) = match &self {
            AppError::Validation {
                field,
                message,
                message_es,
            } => (
                StatusCode::BAD_REQUEST,
                ErrorDetail {
                    field: Some(field.clone()),
                    ..ErrorDetail::new("VALIDATION_ERROR", message.clone(), message_es.clone())
                },
            ),
            AppError::InvalidRequest(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorDetail::new(
                    "INVALID_REQUEST",
                    msg.clone(),
                    format!("Solicitud inválida: {}", msg),
                ),
            ),
            AppError::DuplicateEntry(what) => (
                StatusCode::CONFLICT,
                ErrorDetail {
                    field: Some("referencia".to_string()),
                    ..ErrorDetail::new(
                        "DUPLICATE_ENTRY",
                        format!("A record with this {} already exists", what),
                        format!("Ya existe un registro con {}", what),
                    )
                },
            ),
            AppError::NotFound(resource) => (
                StatusCode::NOT_FOUND,
                ErrorDetail::new(
                    "NOT_FOUND",
                    format!("{} not found", resource),
                    format!("No se encontró {}", resource),
                ),
            ),
            AppError::ImportRejected(err) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorDetail {
                    issues: Some(err.issues.clone()),
                    ..ErrorDetail::new(
                        "IMPORT_REJECTED",
                        err.to_string(),
                        format!(
                            "Importación rechazada: {} problema(s) encontrados, no se guardó ninguna fila",
                            err.issues.len()
                        ),
                    )
                },
            ),
            AppError::StorageError(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorDetail::new(
                    "STORAGE_ERROR",
                    format!("Storage error: {}", msg),
                    format!("Error de almacenamiento: {}", msg),
                ),
            ),
            AppError::DatabaseError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::new(
                    "DATABASE_ERROR",
                    "A database error occurred".to_string(),
                    "Ocurrió un error en la base de datos".to_string(),
                ),
            ),
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::new(
                    "INTERNAL_ERROR",
                    msg.clone(),
                    "Error interno del servidor".to_string(),
                ),
            ),
        };

        // Log the error for debugging
        tracing::error!("Error: {:?}", self);

        (status, Json(ErrorResponse { error: error_detail })).into_response()
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;
