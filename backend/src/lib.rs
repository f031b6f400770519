//! GanttFlow - Backend Server
//!
//! Tracks inventory references from warehouse intake through capsule
//! launch to unlock, and serves the table, Gantt, calendar and card views
//! over a live copy of the data.

use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod services;
pub mod store;

pub use config::Config;

use services::LiveReferences;
use store::{ImportHistoryStore, MemoryStore, ReferenceStore, StoreResult};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ReferenceStore>,
    pub history: Arc<dyn ImportHistoryStore>,
    pub live: LiveReferences,
    pub config: Arc<Config>,
}

impl AppState {
    /// Load the working set from `store` and start following its changes
    pub async fn start<S>(store: Arc<S>, config: Config) -> StoreResult<Self>
    where
        S: ReferenceStore + ImportHistoryStore + 'static,
    {
        let (live, _fold) =
            LiveReferences::start(store.clone(), config.events.channel_capacity).await?;
        Ok(Self {
            store: store.clone(),
            history: store,
            live,
            config: Arc::new(config),
        })
    }

    /// Empty in-memory state
    pub async fn in_memory(config: Config) -> StoreResult<Self> {
        let store = Arc::new(MemoryStore::new(config.events.channel_capacity));
        Self::start(store, config).await
    }
}

/// Create the application router with all routes and middleware
pub fn create_app(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Root endpoint
async fn root() -> &'static str {
    "GanttFlow API v1.0"
}
