//! Process-local store

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::Utc;
use shared::models::{
    ChangeEvent, ImportRecord, NewImportRecord, NewReference, Reference, ReferencePatch,
};
use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

use super::{ImportHistoryStore, ReferenceStore, StoreError, StoreEvent, StoreResult};

/// Keeps everything in memory and publishes a change event per write
pub struct MemoryStore {
    references: RwLock<HashMap<Uuid, Reference>>,
    history: RwLock<Vec<ImportRecord>>,
    events: broadcast::Sender<StoreEvent>,
}

impl MemoryStore {
    pub fn new(channel_capacity: usize) -> Self {
        let (events, _) = broadcast::channel(channel_capacity.max(1));
        Self {
            references: RwLock::new(HashMap::new()),
            history: RwLock::new(Vec::new()),
            events,
        }
    }

    fn publish(&self, event: ChangeEvent) {
        // No subscribers is fine
        let _ = self.events.send(StoreEvent::Change(event));
    }

    fn check_unique(
        references: &HashMap<Uuid, Reference>,
        referencia: &str,
        except: Option<Uuid>,
    ) -> StoreResult<()> {
        let taken = references
            .values()
            .any(|r| r.referencia == referencia && Some(r.id) != except);
        if taken {
            return Err(StoreError::DuplicateReferencia(referencia.to_string()));
        }
        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl ReferenceStore for MemoryStore {
    async fn list(&self) -> StoreResult<Vec<Reference>> {
        let references = self.references.read().await;
        let mut all: Vec<Reference> = references.values().cloned().collect();
        all.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.referencia.cmp(&b.referencia))
        });
        Ok(all)
    }

    async fn get(&self, id: Uuid) -> StoreResult<Option<Reference>> {
        Ok(self.references.read().await.get(&id).cloned())
    }

    async fn create(&self, input: NewReference) -> StoreResult<Reference> {
        let mut references = self.references.write().await;
        let reference = Reference::from_new(input, Uuid::new_v4(), Utc::now());
        Self::check_unique(&references, &reference.referencia, None)?;
        references.insert(reference.id, reference.clone());
        drop(references);

        self.publish(ChangeEvent::insert(reference.clone()));
        Ok(reference)
    }

    async fn create_many(&self, inputs: Vec<NewReference>) -> StoreResult<Vec<Reference>> {
        let mut references = self.references.write().await;
        let now = Utc::now();
        let created: Vec<Reference> = inputs
            .into_iter()
            .map(|input| Reference::from_new(input, Uuid::new_v4(), now))
            .collect();

        let mut batch = HashSet::new();
        for reference in &created {
            Self::check_unique(&references, &reference.referencia, None)?;
            if !batch.insert(reference.referencia.as_str()) {
                return Err(StoreError::DuplicateReferencia(reference.referencia.clone()));
            }
        }
        for reference in &created {
            references.insert(reference.id, reference.clone());
        }
        drop(references);

        for reference in &created {
            self.publish(ChangeEvent::insert(reference.clone()));
        }
        Ok(created)
    }

    async fn update(&self, id: Uuid, patch: ReferencePatch) -> StoreResult<Reference> {
        let mut references = self.references.write().await;
        let mut updated = references.get(&id).cloned().ok_or(StoreError::NotFound(id))?;
        updated.apply_patch(&patch, Utc::now());
        Self::check_unique(&references, &updated.referencia, Some(id))?;
        references.insert(id, updated.clone());
        drop(references);

        self.publish(ChangeEvent::update(updated.clone()));
        Ok(updated)
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        let removed = self.references.write().await.remove(&id);
        if removed.is_none() {
            return Err(StoreError::NotFound(id));
        }
        self.publish(ChangeEvent::delete(id));
        Ok(())
    }

    async fn existing_referencias(&self, candidates: &[String]) -> StoreResult<HashSet<String>> {
        let wanted: HashSet<&str> = candidates.iter().map(String::as_str).collect();
        Ok(self
            .references
            .read()
            .await
            .values()
            .filter(|r| wanted.contains(r.referencia.as_str()))
            .map(|r| r.referencia.clone())
            .collect())
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }
}

#[async_trait]
impl ImportHistoryStore for MemoryStore {
    async fn append(&self, record: NewImportRecord) -> StoreResult<ImportRecord> {
        let entry = ImportRecord {
            id: Uuid::new_v4(),
            file_name: record.file_name,
            records_count: record.records_count,
            status: record.status,
            error_message: record.error_message,
            created_at: Utc::now(),
        };
        self.history.write().await.push(entry.clone());
        Ok(entry)
    }

    async fn recent(&self, limit: i64) -> StoreResult<Vec<ImportRecord>> {
        let limit = usize::try_from(limit).unwrap_or(0);
        Ok(self
            .history
            .read()
            .await
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::{ChangeOp, Curva};

    fn input(code: &str) -> NewReference {
        NewReference {
            referencia: code.to_string(),
            curva: Curva::SToL,
            cantidad: 18,
            cantidad_colores: None,
            distribucion: None,
            color: None,
            ubicacion: None,
            ingreso_a_bodega: None,
            lanzamiento_capsula: None,
            imagen_url: None,
        }
    }

    #[tokio::test]
    async fn test_create_publishes_insert() {
        let store = MemoryStore::default();
        let mut rx = store.subscribe();
        let created = store.create(input("A")).await.unwrap();
        let StoreEvent::Change(event) = rx.recv().await.unwrap() else {
            panic!("expected a change event");
        };
        assert_eq!(event.op, ChangeOp::Insert);
        assert_eq!(event.id, created.id);
    }

    #[tokio::test]
    async fn test_duplicate_referencia_rejected() {
        let store = MemoryStore::default();
        store.create(input("A")).await.unwrap();
        assert!(matches!(
            store.create(input("A")).await,
            Err(StoreError::DuplicateReferencia(_))
        ));
    }

    #[tokio::test]
    async fn test_create_many_is_all_or_nothing() {
        let store = MemoryStore::default();
        store.create(input("TAKEN")).await.unwrap();
        let result = store
            .create_many(vec![input("NEW"), input("TAKEN")])
            .await;
        assert!(result.is_err());
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_history_recent_newest_first() {
        let store = MemoryStore::default();
        store.append(NewImportRecord::success("a.csv", 1)).await.unwrap();
        store.append(NewImportRecord::failure("b.csv", "bad")).await.unwrap();
        let recent = store.recent(1).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].file_name, "b.csv");
    }
}
