//! Route definitions for GanttFlow

use axum::{
    routing::{get, post},
    Router,
};

use crate::{handlers, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Reference management
        .nest("/references", reference_routes())
        // Derived views
        .nest("/views", view_routes())
        // Distribution table
        .route("/distribution", get(handlers::lookup_distribution))
        // Bulk import/export
        .route("/import", post(handlers::import_references))
        .route("/export", get(handlers::export_references))
        .route("/history", get(handlers::list_history))
}

/// Reference routes
fn reference_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_references).post(handlers::create_reference),
        )
        .route("/events", get(handlers::reference_events))
        .route(
            "/:id",
            get(handlers::get_reference)
                .put(handlers::update_reference)
                .delete(handlers::delete_reference),
        )
}

/// View routes
fn view_routes() -> Router<AppState> {
    Router::new()
        .route("/gantt", get(handlers::gantt_view))
        .route("/calendar", get(handlers::calendar_view))
        .route("/cards", get(handlers::card_view))
}
