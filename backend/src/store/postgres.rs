//! PostgreSQL store
//!
//! Writes go through plain SQL; change events come from a trigger that
//! `NOTIFY`s on `reference_changes` with `{op, id}`. The listener re-reads the
//! row for inserts and updates so payloads stay small.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use shared::models::{
    ChangeEvent, ChangeOp, ImportRecord, ImportStatus, NewImportRecord, NewReference, Reference,
    ReferencePatch,
};
use sqlx::postgres::PgListener;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::{ImportHistoryStore, ReferenceStore, StoreError, StoreEvent, StoreResult};

/// Channel the change trigger notifies on
pub const CHANGE_CHANNEL: &str = "reference_changes";

const REFERENCE_COLUMNS: &str = "id, referencia, curva, cantidad, cantidad_colores, distribucion, \
     color, ubicacion, ingreso_a_bodega, lanzamiento_capsula, imagen_url, created_at, updated_at";

/// Store backed by a Postgres pool
#[derive(Clone)]
pub struct PgStore {
    db: PgPool,
    events: broadcast::Sender<StoreEvent>,
}

/// Row shape of `inventory_references`
#[derive(Debug, FromRow)]
struct ReferenceRow {
    id: Uuid,
    referencia: String,
    curva: String,
    cantidad: i32,
    cantidad_colores: Option<String>,
    distribucion: Option<String>,
    color: Option<String>,
    ubicacion: Option<String>,
    ingreso_a_bodega: Option<NaiveDate>,
    lanzamiento_capsula: Option<NaiveDate>,
    imagen_url: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ReferenceRow> for Reference {
    type Error = StoreError;

    fn try_from(row: ReferenceRow) -> Result<Self, Self::Error> {
        let curva = row
            .curva
            .parse()
            .map_err(|e| StoreError::Corrupt(format!("{}: {}", row.referencia, e)))?;
        let cantidad_colores = row
            .cantidad_colores
            .as_deref()
            .map(str::parse)
            .transpose()
            .map_err(|e| StoreError::Corrupt(format!("{}: {}", row.referencia, e)))?;

        Ok(Reference {
            id: row.id,
            referencia: row.referencia,
            curva,
            cantidad: row.cantidad,
            cantidad_colores,
            distribucion: row.distribucion,
            color: row.color,
            ubicacion: row.ubicacion,
            ingreso_a_bodega: row.ingreso_a_bodega,
            lanzamiento_capsula: row.lanzamiento_capsula,
            imagen_url: row.imagen_url,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct ImportRecordRow {
    id: Uuid,
    file_name: String,
    records_count: i32,
    status: String,
    error_message: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<ImportRecordRow> for ImportRecord {
    type Error = StoreError;

    fn try_from(row: ImportRecordRow) -> Result<Self, Self::Error> {
        let status = ImportStatus::parse(&row.status)
            .ok_or_else(|| StoreError::Corrupt(format!("unknown import status '{}'", row.status)))?;
        Ok(ImportRecord {
            id: row.id,
            file_name: row.file_name,
            records_count: row.records_count,
            status,
            error_message: row.error_message,
            created_at: row.created_at,
        })
    }
}

/// Body of a `reference_changes` notification
#[derive(Debug, Deserialize)]
struct ChangeNotice {
    op: ChangeOp,
    id: Uuid,
}

fn unique_violation(err: sqlx::Error, referencia: &str) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::DuplicateReferencia(referencia.to_string())
        }
        _ => StoreError::Database(err),
    }
}

impl PgStore {
    pub fn new(db: PgPool, channel_capacity: usize) -> Self {
        let (events, _) = broadcast::channel(channel_capacity.max(1));
        Self { db, events }
    }

    /// Start forwarding `reference_changes` notifications to subscribers.
    ///
    /// The listener reconnects on its own after a dropped connection.
    /// Notifications sent while disconnected are lost, so subscribers get a
    /// [`StoreEvent::Gap`].
    pub async fn spawn_listener(&self) -> Result<JoinHandle<()>, sqlx::Error> {
        let mut listener = PgListener::connect_with(&self.db).await?;
        listener.listen(CHANGE_CHANNEL).await?;
        tracing::info!("Listening for changes on '{}'", CHANGE_CHANNEL);

        let store = self.clone();
        Ok(tokio::spawn(async move {
            loop {
                match listener.try_recv().await {
                    Ok(Some(notification)) => store.forward(notification.payload()).await,
                    Ok(None) => {
                        tracing::warn!("Change listener connection lost, reconnecting");
                        store.signal_gap();
                    }
                    Err(e) => {
                        tracing::error!("Change listener failed: {}", e);
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                }
            }
        }))
    }

    async fn forward(&self, payload: &str) {
        let notice: ChangeNotice = match serde_json::from_str(payload) {
            Ok(notice) => notice,
            Err(e) => {
                tracing::warn!("Ignoring malformed change notice {:?}: {}", payload, e);
                return;
            }
        };

        let event = match notice.op {
            ChangeOp::Delete => ChangeEvent::delete(notice.id),
            op => match self.get(notice.id).await {
                Ok(Some(record)) => ChangeEvent {
                    op,
                    id: notice.id,
                    record: Some(record),
                },
                // Deleted again before we could read it; the delete notice follows
                Ok(None) => return,
                Err(e) => {
                    tracing::warn!("Could not load changed reference {}: {}", notice.id, e);
                    self.signal_gap();
                    return;
                }
            },
        };
        let _ = self.events.send(StoreEvent::Change(event));
    }

    fn signal_gap(&self) {
        let _ = self.events.send(StoreEvent::Gap);
    }

    async fn insert(
        tx: &mut Transaction<'_, Postgres>,
        reference: &Reference,
    ) -> StoreResult<Reference> {
        let row = sqlx::query_as::<_, ReferenceRow>(&format!(
            r#"
            INSERT INTO inventory_references ({REFERENCE_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING {REFERENCE_COLUMNS}
            "#
        ))
        .bind(reference.id)
        .bind(&reference.referencia)
        .bind(reference.curva.as_str())
        .bind(reference.cantidad)
        .bind(reference.cantidad_colores.map(|c| c.as_str()))
        .bind(&reference.distribucion)
        .bind(&reference.color)
        .bind(&reference.ubicacion)
        .bind(reference.ingreso_a_bodega)
        .bind(reference.lanzamiento_capsula)
        .bind(&reference.imagen_url)
        .bind(reference.created_at)
        .bind(reference.updated_at)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| unique_violation(e, &reference.referencia))?;

        row.try_into()
    }
}

#[async_trait]
impl ReferenceStore for PgStore {
    async fn list(&self) -> StoreResult<Vec<Reference>> {
        let rows = sqlx::query_as::<_, ReferenceRow>(&format!(
            "SELECT {REFERENCE_COLUMNS} FROM inventory_references \
             ORDER BY created_at DESC, referencia ASC"
        ))
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(Reference::try_from).collect()
    }

    async fn get(&self, id: Uuid) -> StoreResult<Option<Reference>> {
        let row = sqlx::query_as::<_, ReferenceRow>(&format!(
            "SELECT {REFERENCE_COLUMNS} FROM inventory_references WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        row.map(Reference::try_from).transpose()
    }

    async fn create(&self, input: NewReference) -> StoreResult<Reference> {
        let reference = Reference::from_new(input, Uuid::new_v4(), Utc::now());
        let mut tx = self.db.begin().await?;
        let created = Self::insert(&mut tx, &reference).await?;
        tx.commit().await?;
        Ok(created)
    }

    async fn create_many(&self, inputs: Vec<NewReference>) -> StoreResult<Vec<Reference>> {
        let now = Utc::now();
        let mut tx = self.db.begin().await?;
        let mut created = Vec::with_capacity(inputs.len());
        for input in inputs {
            let reference = Reference::from_new(input, Uuid::new_v4(), now);
            // Dropping the transaction on error rolls the whole batch back
            created.push(Self::insert(&mut tx, &reference).await?);
        }
        tx.commit().await?;
        Ok(created)
    }

    async fn update(&self, id: Uuid, patch: ReferencePatch) -> StoreResult<Reference> {
        let mut tx = self.db.begin().await?;

        let current = sqlx::query_as::<_, ReferenceRow>(&format!(
            "SELECT {REFERENCE_COLUMNS} FROM inventory_references WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(StoreError::NotFound(id))?;

        let mut updated = Reference::try_from(current)?;
        updated.apply_patch(&patch, Utc::now());

        let row = sqlx::query_as::<_, ReferenceRow>(&format!(
            r#"
            UPDATE inventory_references
            SET referencia = $2, curva = $3, cantidad = $4, cantidad_colores = $5,
                distribucion = $6, color = $7, ubicacion = $8, ingreso_a_bodega = $9,
                lanzamiento_capsula = $10, imagen_url = $11, updated_at = $12
            WHERE id = $1
            RETURNING {REFERENCE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&updated.referencia)
        .bind(updated.curva.as_str())
        .bind(updated.cantidad)
        .bind(updated.cantidad_colores.map(|c| c.as_str()))
        .bind(&updated.distribucion)
        .bind(&updated.color)
        .bind(&updated.ubicacion)
        .bind(updated.ingreso_a_bodega)
        .bind(updated.lanzamiento_capsula)
        .bind(&updated.imagen_url)
        .bind(updated.updated_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| unique_violation(e, &updated.referencia))?;

        tx.commit().await?;
        row.try_into()
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM inventory_references WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }

    async fn existing_referencias(&self, candidates: &[String]) -> StoreResult<HashSet<String>> {
        if candidates.is_empty() {
            return Ok(HashSet::new());
        }
        let found = sqlx::query_scalar::<_, String>(
            "SELECT referencia FROM inventory_references WHERE referencia = ANY($1)",
        )
        .bind(candidates)
        .fetch_all(&self.db)
        .await?;

        Ok(found.into_iter().collect())
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.db).await?;
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }
}

#[async_trait]
impl ImportHistoryStore for PgStore {
    async fn append(&self, record: NewImportRecord) -> StoreResult<ImportRecord> {
        let row = sqlx::query_as::<_, ImportRecordRow>(
            r#"
            INSERT INTO import_history (id, file_name, records_count, status, error_message)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, file_name, records_count, status, error_message, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&record.file_name)
        .bind(record.records_count)
        .bind(record.status.as_str())
        .bind(&record.error_message)
        .fetch_one(&self.db)
        .await?;

        row.try_into()
    }

    async fn recent(&self, limit: i64) -> StoreResult<Vec<ImportRecord>> {
        let rows = sqlx::query_as::<_, ImportRecordRow>(
            r#"
            SELECT id, file_name, records_count, status, error_message, created_at
            FROM import_history
            ORDER BY created_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit.max(0))
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(ImportRecord::try_from).collect()
    }
}
