//! Reference service tests
//!
//! Create, update and delete through the services against the in-memory
//! store, checking that the live working set follows every write.

use chrono::Duration;
use ganttflow_backend::error::AppError;
use ganttflow_backend::services::reference::{CreateReferenceRequest, ReferenceService};
use ganttflow_backend::{AppState, Config};
use shared::dates::today;
use shared::models::{ColorCount, Curva, ReferencePatch};
use shared::schedule::{Phase, UnlockPolicy};
use shared::views::{ListingQuery, StatusFilter};

fn request(code: &str, curva: Curva) -> CreateReferenceRequest {
    CreateReferenceRequest {
        referencia: code.to_string(),
        curva,
        cantidad: None,
        cantidad_colores: None,
        distribucion: None,
        color: None,
        second_color: None,
        ubicacion: None,
        ingreso_a_bodega: None,
        imagen_url: None,
    }
}

async fn service() -> (AppState, ReferenceService) {
    let state = AppState::in_memory(Config::in_memory()).await.unwrap();
    let service = ReferenceService::new(state.store.clone(), state.live.clone());
    (state, service)
}

// ============================================================================
// Create
// ============================================================================

#[cfg(test)]
mod create_tests {
    use super::*;

    #[tokio::test]
    async fn test_create_derives_quantity_from_table() {
        let (state, service) = service().await;
        let mut input = request("REF-001", Curva::XsToXl);
        input.cantidad_colores = Some(ColorCount::Two);
        input.color = Some("Negro".to_string());
        input.second_color = Some("Blanco".to_string());

        let created = service.create(input, None).await.unwrap();
        assert_eq!(created.cantidad, 20);
        assert_eq!(created.distribucion.as_deref(), Some("2-4-8-4-2"));
        assert_eq!(created.color.as_deref(), Some("Negro, Blanco"));
        assert!(state.live.get(created.id).await.is_some());
    }

    #[tokio::test]
    async fn test_create_uses_explicit_launch_date() {
        let (_, service) = service().await;
        let launch = today() + Duration::days(10);
        let mut input = request("REF-002", Curva::XsToL);
        input.cantidad = Some(12);

        let created = service.create(input, Some(launch)).await.unwrap();
        assert_eq!(created.lanzamiento_capsula, Some(launch));
        assert_eq!(created.cantidad, 12);
    }

    #[tokio::test]
    async fn test_create_without_quantity_or_table_entry_fails() {
        let (_, service) = service().await;
        let result = service.create(request("REF-003", Curva::XsToL), None).await;
        assert!(matches!(result, Err(AppError::Validation { ref field, .. }) if field == "cantidad"));
    }

    #[tokio::test]
    async fn test_duplicate_referencia_is_conflict() {
        let (_, service) = service().await;
        let mut input = request("DUP", Curva::SToL);
        input.cantidad_colores = Some(ColorCount::One);
        service.create(input.clone(), None).await.unwrap();

        let result = service.create(input, None).await;
        assert!(matches!(result, Err(AppError::DuplicateEntry(_))));
    }

    #[tokio::test]
    async fn test_blank_referencia_rejected() {
        let (_, service) = service().await;
        let mut input = request("   ", Curva::SToL);
        input.cantidad = Some(5);
        assert!(service.create(input, None).await.is_err());
    }
}

// ============================================================================
// Update and delete
// ============================================================================

#[cfg(test)]
mod update_tests {
    use super::*;

    #[tokio::test]
    async fn test_changing_curva_rederives_quantity() {
        let (_, service) = service().await;
        let mut input = request("REF-010", Curva::SToL);
        input.cantidad_colores = Some(ColorCount::One);
        let created = service.create(input, None).await.unwrap();
        assert_eq!(created.cantidad, 18);

        let patch = ReferencePatch {
            cantidad_colores: Some(Some(ColorCount::Two)),
            ..Default::default()
        };
        let updated = service.update(created.id, patch).await.unwrap();
        assert_eq!(updated.cantidad, 20);
        assert_eq!(updated.distribucion.as_deref(), Some("6-8-6"));
    }

    #[tokio::test]
    async fn test_typed_quantity_ignored_while_table_applies() {
        let (state, service) = service().await;
        let mut input = request("REF-014", Curva::SToL);
        input.cantidad_colores = Some(ColorCount::One);
        let created = service.create(input, None).await.unwrap();

        let patch = ReferencePatch {
            cantidad: Some(5),
            distribucion: Some(Some("1-1".to_string())),
            ..Default::default()
        };
        let updated = service.update(created.id, patch).await.unwrap();
        assert_eq!(updated.curva, Curva::SToL);
        assert_eq!(updated.cantidad, 18);
        assert_eq!(updated.distribucion.as_deref(), Some("6-6-6"));
        assert_eq!(state.live.get(created.id).await.unwrap().cantidad, 18);
    }

    #[tokio::test]
    async fn test_typed_quantity_kept_without_table_entry() {
        let (_, service) = service().await;
        let mut input = request("REF-015", Curva::XsToL);
        input.cantidad = Some(40);
        let created = service.create(input, None).await.unwrap();

        let patch = ReferencePatch {
            cantidad: Some(12),
            ..Default::default()
        };
        let updated = service.update(created.id, patch).await.unwrap();
        assert_eq!(updated.cantidad, 12);
    }

    #[tokio::test]
    async fn test_clear_launch_date() {
        let (state, service) = service().await;
        let mut input = request("REF-011", Curva::SToL);
        input.cantidad = Some(7);
        let created = service
            .create(input, Some(today() - Duration::days(3)))
            .await
            .unwrap();

        let patch = ReferencePatch {
            lanzamiento_capsula: Some(None),
            ..Default::default()
        };
        service.update(created.id, patch).await.unwrap();
        let live = state.live.get(created.id).await.unwrap();
        assert_eq!(live.lanzamiento_capsula, None);
        assert!(live.updated_at >= created.updated_at);
    }

    #[tokio::test]
    async fn test_empty_patch_rejected() {
        let (_, service) = service().await;
        let mut input = request("REF-012", Curva::SToL);
        input.cantidad = Some(7);
        let created = service.create(input, None).await.unwrap();
        let result = service.update(created.id, ReferencePatch::default()).await;
        assert!(matches!(result, Err(AppError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_delete_removes_from_live_set() {
        let (state, service) = service().await;
        let mut input = request("REF-013", Curva::SToL);
        input.cantidad = Some(7);
        let created = service.create(input, None).await.unwrap();

        service.delete(created.id).await.unwrap();
        assert!(state.live.get(created.id).await.is_none());
        assert!(matches!(
            service.get(created.id).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            service.delete(created.id).await,
            Err(AppError::NotFound(_))
        ));
    }
}

// ============================================================================
// Listing
// ============================================================================

#[cfg(test)]
mod listing_tests {
    use super::*;

    #[tokio::test]
    async fn test_list_filters_unlocked() {
        let (_, service) = service().await;
        let now = today();
        let policy = UnlockPolicy::new(21);

        let mut old = request("OLD", Curva::SToL);
        old.cantidad = Some(5);
        service
            .create(old, Some(now - Duration::days(40)))
            .await
            .unwrap();

        let mut fresh = request("FRESH", Curva::SToL);
        fresh.cantidad = Some(5);
        service
            .create(fresh, Some(now + Duration::days(2)))
            .await
            .unwrap();

        let query = ListingQuery {
            status: StatusFilter::Unlocked,
            ..Default::default()
        };
        let listing = service.list(&query, now, policy, 15).await;
        assert_eq!(listing.rows.len(), 1);
        assert_eq!(listing.rows[0].reference.referencia, "OLD");
        assert_eq!(listing.rows[0].status.phase, Phase::Unlocked);
        assert_eq!(listing.meta.total_items, 1);
    }
}
