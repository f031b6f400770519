//! Reference CRUD service

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use shared::distribution::{combine_colors, QuantityFields};
use shared::models::{ChangeEvent, ColorCount, Curva, NewReference, Reference, ReferencePatch};
use shared::schedule::UnlockPolicy;
use shared::validation::{check_new_reference, check_patched_reference};
use shared::views::{listing, Listing, ListingQuery};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::LiveReferences;
use crate::store::ReferenceStore;

/// Reference service for creating, editing and listing references
#[derive(Clone)]
pub struct ReferenceService {
    store: Arc<dyn ReferenceStore>,
    live: LiveReferences,
}

/// Input for creating a reference.
///
/// The launch date is passed separately to [`ReferenceService::create`].
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateReferenceRequest {
    #[validate(length(min = 1, max = 100))]
    pub referencia: String,
    pub curva: Curva,
    /// Required unless the curva / color pair has a table entry
    #[serde(default)]
    #[validate(range(min = 1))]
    pub cantidad: Option<i32>,
    #[serde(default)]
    pub cantidad_colores: Option<ColorCount>,
    #[serde(default)]
    pub distribucion: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    /// Only used with two colors
    #[serde(default)]
    pub second_color: Option<String>,
    #[serde(default)]
    pub ubicacion: Option<String>,
    #[serde(default)]
    pub ingreso_a_bodega: Option<NaiveDate>,
    #[serde(default)]
    pub imagen_url: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn to_count(cantidad: Option<i32>) -> Option<u32> {
    cantidad.and_then(|c| u32::try_from(c).ok())
}

impl ReferenceService {
    pub fn new(store: Arc<dyn ReferenceStore>, live: LiveReferences) -> Self {
        Self { store, live }
    }

    /// Create a reference launching on `launch_date`
    pub async fn create(
        &self,
        request: CreateReferenceRequest,
        launch_date: Option<NaiveDate>,
    ) -> AppResult<Reference> {
        request.validate()?;

        let mut quantity =
            QuantityFields::manual(to_count(request.cantidad), non_blank(request.distribucion));
        quantity.on_selection_changed(Some(request.curva), request.cantidad_colores);

        let cantidad = quantity.cantidad.ok_or_else(|| {
            AppError::invalid_field(
                "cantidad",
                "Cantidad is required when the curva has no distribution entry",
            )
        })?;
        let cantidad = i32::try_from(cantidad)
            .map_err(|_| AppError::invalid_field("cantidad", "Cantidad is too large"))?;

        let input = NewReference {
            referencia: request.referencia.trim().to_string(),
            curva: request.curva,
            cantidad,
            cantidad_colores: request.cantidad_colores,
            distribucion: quantity.distribucion,
            color: combine_colors(
                request.cantidad_colores,
                request.color.as_deref(),
                request.second_color.as_deref(),
            ),
            ubicacion: non_blank(request.ubicacion),
            ingreso_a_bodega: request.ingreso_a_bodega,
            lanzamiento_capsula: launch_date,
            imagen_url: non_blank(request.imagen_url),
        };
        check_new_reference(&input).map_err(|(field, msg)| AppError::invalid_field(field, msg))?;

        let created = self.store.create(input).await?;
        self.live.apply(ChangeEvent::insert(created.clone())).await;

        tracing::info!("Created reference {} ({})", created.referencia, created.id);
        Ok(created)
    }

    pub async fn get(&self, id: Uuid) -> AppResult<Reference> {
        if let Some(reference) = self.live.get(id).await {
            return Ok(reference);
        }
        self.store
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Reference {}", id)))
    }

    /// Apply a partial update.
    ///
    /// While the resulting curva / color pair has a table entry, quantity
    /// and distribution come from the table and typed values are dropped.
    pub async fn update(&self, id: Uuid, mut patch: ReferencePatch) -> AppResult<Reference> {
        patch.validate()?;
        if patch.is_empty() {
            return Err(AppError::InvalidRequest("No fields to update".to_string()));
        }

        let current = self.get(id).await?;

        let curva = patch.curva.unwrap_or(current.curva);
        let colors = patch.cantidad_colores.unwrap_or(current.cantidad_colores);
        let mut quantity = QuantityFields::manual(
            to_count(Some(current.cantidad)),
            current.distribucion.clone(),
        );
        quantity.on_selection_changed(Some(curva), colors);
        if let Some(cantidad) = patch.cantidad {
            if !quantity.set_manual_cantidad(to_count(Some(cantidad))) {
                tracing::debug!("Ignoring typed cantidad for {}: derived from {}", id, curva);
            }
        }
        if let Some(distribucion) = patch.distribucion.clone() {
            if !quantity.set_manual_distribucion(distribucion) {
                tracing::debug!("Ignoring typed distribucion for {}: derived from {}", id, curva);
            }
        }
        if quantity.auto_calculated {
            patch.cantidad = quantity.cantidad.and_then(|c| i32::try_from(c).ok());
            patch.distribucion = Some(quantity.distribucion);
        }

        let mut preview = current;
        preview.apply_patch(&patch, Utc::now());
        check_patched_reference(&preview)
            .map_err(|(field, msg)| AppError::invalid_field(field, msg))?;

        let updated = self.store.update(id, patch).await?;
        self.live.apply(ChangeEvent::update(updated.clone())).await;

        tracing::info!("Updated reference {} ({})", updated.referencia, updated.id);
        Ok(updated)
    }

    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        self.store.delete(id).await?;
        self.live.apply(ChangeEvent::delete(id)).await;

        tracing::info!("Deleted reference {}", id);
        Ok(())
    }

    /// One filtered, sorted page of the table
    pub async fn list(
        &self,
        query: &ListingQuery,
        today: NaiveDate,
        policy: UnlockPolicy,
        page_size: u32,
    ) -> Listing {
        let references = self.live.snapshot().await;
        listing(&references, query, today, policy, page_size)
    }
}
