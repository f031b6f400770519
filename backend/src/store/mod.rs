//! Persistence seam for references and import history
//!
//! Two implementations: [`PgStore`] on PostgreSQL with `LISTEN/NOTIFY`
//! change events, and [`MemoryStore`] for tests and local runs.

mod memory;
mod postgres;

use std::collections::HashSet;

use async_trait::async_trait;
use shared::models::{
    ChangeEvent, ImportRecord, NewImportRecord, NewReference, Reference, ReferencePatch,
};
use thiserror::Error;
use tokio::sync::broadcast;
use uuid::Uuid;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Errors raised by a store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("referencia '{0}' already exists")]
    DuplicateReferencia(String),

    #[error("reference {0} not found")]
    NotFound(Uuid),

    #[error("stored row is invalid: {0}")]
    Corrupt(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// What a store subscription delivers
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    Change(ChangeEvent),
    /// Notifications may have been lost; subscribers should reload
    Gap,
}

/// CRUD plus a change-notification subscription for references
#[async_trait]
pub trait ReferenceStore: Send + Sync {
    /// All references, newest first
    async fn list(&self) -> StoreResult<Vec<Reference>>;

    async fn get(&self, id: Uuid) -> StoreResult<Option<Reference>>;

    async fn create(&self, input: NewReference) -> StoreResult<Reference>;

    /// Insert every row or none of them
    async fn create_many(&self, inputs: Vec<NewReference>) -> StoreResult<Vec<Reference>>;

    async fn update(&self, id: Uuid, patch: ReferencePatch) -> StoreResult<Reference>;

    async fn delete(&self, id: Uuid) -> StoreResult<()>;

    /// The subset of `candidates` already used as a referencia
    async fn existing_referencias(&self, candidates: &[String]) -> StoreResult<HashSet<String>>;

    /// Connectivity check
    async fn ping(&self) -> StoreResult<()>;

    /// Change events for every committed write. Delivery is at least once.
    fn subscribe(&self) -> broadcast::Receiver<StoreEvent>;
}

/// Append-only import/export log
#[async_trait]
pub trait ImportHistoryStore: Send + Sync {
    async fn append(&self, record: NewImportRecord) -> StoreResult<ImportRecord>;

    /// Most recent entries first
    async fn recent(&self, limit: i64) -> StoreResult<Vec<ImportRecord>>;
}
