//! Card gallery projection

use serde::{Deserialize, Serialize};

use crate::dates::CalendarDate;
use crate::models::Reference;
use crate::schedule::{evaluate, LifecycleStatus, UnlockPolicy};
use crate::types::{PaginatedResponse, Pagination, PaginationMeta};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceCard {
    #[serde(flatten)]
    pub reference: Reference,
    pub curva_label: String,
    pub fecha_desbloqueo: Option<CalendarDate>,
    pub status: LifecycleStatus,
    pub estado: String,
}

/// All cards ordered by launch date, references without one last
pub fn card_projection(
    references: &[Reference],
    today: CalendarDate,
    policy: UnlockPolicy,
) -> Vec<ReferenceCard> {
    let mut cards: Vec<ReferenceCard> = references
        .iter()
        .map(|reference| {
            let evaluation = evaluate(reference, today, policy);
            ReferenceCard {
                curva_label: reference.curva.display_label().to_string(),
                fecha_desbloqueo: evaluation.unlock_date(),
                estado: evaluation.status.label(),
                status: evaluation.status,
                reference: reference.clone(),
            }
        })
        .collect();

    cards.sort_by(|a, b| {
        let (la, lb) = (a.reference.lanzamiento_capsula, b.reference.lanzamiento_capsula);
        la.is_none()
            .cmp(&lb.is_none())
            .then_with(|| la.cmp(&lb))
            .then_with(|| a.reference.referencia.cmp(&b.reference.referencia))
    });
    cards
}

/// One page of cards
pub fn card_page(
    references: &[Reference],
    pagination: Pagination,
    today: CalendarDate,
    policy: UnlockPolicy,
) -> PaginatedResponse<ReferenceCard> {
    let cards = card_projection(references, today, policy);
    let meta = PaginationMeta::new(pagination, cards.len() as u64);
    let bounds = meta.bounds();
    PaginatedResponse {
        data: cards
            .into_iter()
            .skip(bounds.start)
            .take(bounds.len())
            .collect(),
        pagination: meta,
    }
}
