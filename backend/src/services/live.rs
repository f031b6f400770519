//! Live reference collection
//!
//! Folds the store's change events into a [`WorkingSet`] so reads never hit
//! the store, and re-publishes every effective change for SSE clients. A
//! lagged or gapped subscription triggers a full reload; if that reload
//! fails the set keeps its last known state.

use std::sync::Arc;

use serde::Serialize;
use shared::models::{ChangeEvent, Reference};
use shared::working_set::{Applied, WorkingSet};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::store::{ReferenceStore, StoreEvent, StoreResult};

/// What SSE subscribers receive
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LiveEvent {
    Change(ChangeEvent),
    /// The set was reloaded from the store
    Resynced { count: usize },
}

impl LiveEvent {
    /// SSE event name
    pub fn name(&self) -> &'static str {
        match self {
            LiveEvent::Change(_) => "change",
            LiveEvent::Resynced { .. } => "resynced",
        }
    }
}

#[derive(Clone)]
pub struct LiveReferences {
    set: Arc<RwLock<WorkingSet>>,
    store: Arc<dyn ReferenceStore>,
    changes: broadcast::Sender<LiveEvent>,
}

impl LiveReferences {
    fn new(store: Arc<dyn ReferenceStore>, channel_capacity: usize) -> Self {
        let (changes, _) = broadcast::channel(channel_capacity.max(1));
        Self {
            set: Arc::new(RwLock::new(WorkingSet::new())),
            store,
            changes,
        }
    }

    /// Load the initial snapshot and spawn the fold task
    pub async fn start(
        store: Arc<dyn ReferenceStore>,
        channel_capacity: usize,
    ) -> StoreResult<(Self, JoinHandle<()>)> {
        let live = Self::new(store, channel_capacity);
        // Subscribe first so nothing committed during the initial load is missed
        let events = live.store.subscribe();
        live.refresh().await?;

        let task = tokio::spawn(live.clone().run(events));
        Ok((live, task))
    }

    /// Reload everything from the store.
    ///
    /// Returns `false` when a later reload superseded this one.
    pub async fn refresh(&self) -> StoreResult<bool> {
        let ticket = self.set.write().await.begin_refresh();
        let snapshot = self.store.list().await?;

        let mut set = self.set.write().await;
        let merged = set.finish_refresh(ticket, snapshot);
        let count = set.len();
        drop(set);

        if merged {
            tracing::debug!("Working set reloaded with {} references", count);
            let _ = self.changes.send(LiveEvent::Resynced { count });
        } else {
            tracing::debug!("Discarding superseded working set reload");
        }
        Ok(merged)
    }

    /// Fold one change. Safe to call with events the store will also deliver.
    pub async fn apply(&self, event: ChangeEvent) -> Applied {
        let applied = self.set.write().await.apply(event.clone());
        if applied == Applied::Changed {
            let _ = self.changes.send(LiveEvent::Change(event));
        }
        applied
    }

    /// Current references, newest first
    pub async fn snapshot(&self) -> Vec<Reference> {
        self.set.read().await.snapshot()
    }

    pub async fn get(&self, id: Uuid) -> Option<Reference> {
        self.set.read().await.get(&id).cloned()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LiveEvent> {
        self.changes.subscribe()
    }

    async fn run(self, mut events: broadcast::Receiver<StoreEvent>) {
        loop {
            match events.recv().await {
                Ok(StoreEvent::Change(event)) => {
                    self.apply(event).await;
                }
                Ok(StoreEvent::Gap) => {
                    tracing::warn!("Store reported missed notifications, reloading");
                    self.resync().await;
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("Fell {} change events behind, reloading", skipped);
                    self.resync().await;
                }
                Err(RecvError::Closed) => {
                    tracing::info!("Store change feed closed");
                    break;
                }
            }
        }
    }

    async fn resync(&self) {
        if let Err(e) = self.refresh().await {
            tracing::error!("Reload failed, keeping last known references: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use shared::models::{Curva, NewReference};
    use std::time::Duration;

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
    async fn test_start_loads_existing_references() {
        let store = Arc::new(MemoryStore::default());
        store.create(input("A")).await.unwrap();
        let (live, _task) = LiveReferences::start(store, 16).await.unwrap();
        assert_eq!(live.snapshot().await.len(), 1);
    }

    #[tokio::test]
    async fn test_store_writes_reach_subscribers() {
        let store = Arc::new(MemoryStore::default());
        let (live, _task) = LiveReferences::start(store.clone(), 16).await.unwrap();
        let mut rx = live.subscribe();

        let created = store.create(input("B")).await.unwrap();
        let event = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.name(), "change");
        assert_eq!(live.get(created.id).await.unwrap().referencia, "B");
    }

    #[tokio::test]
    async fn test_own_write_applied_twice_is_ignored() {
        let store = Arc::new(MemoryStore::default());
        let (live, _task) = LiveReferences::start(store.clone(), 16).await.unwrap();

        let created = store.create(input("C")).await.unwrap();
        live.apply(ChangeEvent::insert(created.clone())).await;
        assert_eq!(
            live.apply(ChangeEvent::insert(created)).await,
            Applied::Ignored
        );
        assert_eq!(live.snapshot().await.len(), 1);
    }

    #[tokio::test]
    async fn test_lag_triggers_reload() {
        let store = Arc::new(MemoryStore::new(1));
        let (live, _task) = LiveReferences::start(store.clone(), 64).await.unwrap();
        let mut rx = live.subscribe();

        store
            .create_many(vec![input("D1"), input("D2"), input("D3")])
            .await
            .unwrap();

        // Whether the fold saw every event or lagged and reloaded, it converges
        for _ in 0..50 {
            if live.snapshot().await.len() == 3 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(live.snapshot().await.len(), 3);
        assert!(rx.try_recv().is_ok());
    }
}
