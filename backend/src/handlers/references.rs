//! HTTP handlers for reference endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use shared::dates::today;
use shared::models::{Reference, ReferencePatch};
use shared::views::{Listing, ListingQuery};
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::reference::{CreateReferenceRequest, ReferenceService};
use crate::AppState;

/// Create body: the reference fields plus the launch date it is scheduled for
#[derive(Debug, Deserialize)]
pub struct CreateReferenceBody {
    #[serde(default)]
    pub launch_date: Option<NaiveDate>,
    #[serde(flatten)]
    pub reference: CreateReferenceRequest,
}

fn service(state: &AppState) -> ReferenceService {
    ReferenceService::new(state.store.clone(), state.live.clone())
}

/// List references with filters, sorting and pagination
pub async fn list_references(
    State(state): State<AppState>,
    Query(query): Query<ListingQuery>,
) -> AppResult<Json<Listing>> {
    let listing = service(&state)
        .list(
            &query,
            today(),
            state.config.schedule.policy(),
            state.config.listing.page_size,
        )
        .await;
    Ok(Json(listing))
}

/// Create a reference
pub async fn create_reference(
    State(state): State<AppState>,
    Json(body): Json<CreateReferenceBody>,
) -> AppResult<(StatusCode, Json<Reference>)> {
    let created = service(&state)
        .create(body.reference, body.launch_date)
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Get a reference by ID
pub async fn get_reference(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Reference>> {
    let reference = service(&state).get(id).await?;
    Ok(Json(reference))
}

/// Update a reference
pub async fn update_reference(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(patch): Json<ReferencePatch>,
) -> AppResult<Json<Reference>> {
    let updated = service(&state).update(id, patch).await?;
    Ok(Json(updated))
}

/// Delete a reference
pub async fn delete_reference(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    service(&state).delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
