//! Table listing: search, filters, sorting and pagination

use std::cmp::Ordering;

use chrono::Datelike;
use serde::{Deserialize, Serialize};

use crate::dates::{format_short_es, CalendarDate};
use crate::models::Reference;
use crate::schedule::{evaluate, LifecycleStatus, Phase, UnlockPolicy};
use crate::types::{Pagination, PaginationMeta, SortDirection, DEFAULT_PAGE_SIZE};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    All,
    Unlocked,
    /// Anything not yet unlocked, including references without a schedule
    Locked,
}

impl StatusFilter {
    fn matches(&self, phase: Phase) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Unlocked => phase.is_unlocked(),
            StatusFilter::Locked => !phase.is_unlocked(),
        }
    }
}

/// Bucket on days left until unlock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DayRange {
    #[default]
    #[serde(rename = "all")]
    All,
    #[serde(rename = "1-7")]
    OneToSeven,
    #[serde(rename = "8-15")]
    EightToFifteen,
    #[serde(rename = "16-30")]
    SixteenToThirty,
}

impl DayRange {
    /// Inclusive bounds, `None` for `All`
    pub fn bounds(&self) -> Option<(i64, i64)> {
        match self {
            DayRange::All => None,
            DayRange::OneToSeven => Some((1, 7)),
            DayRange::EightToFifteen => Some((8, 15)),
            DayRange::SixteenToThirty => Some((16, 30)),
        }
    }

    fn matches(&self, days_left: Option<i64>) -> bool {
        match (self.bounds(), days_left) {
            (None, _) => true,
            (Some((lo, hi)), Some(days)) => lo <= days && days <= hi,
            (Some(_), None) => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    #[default]
    Referencia,
    Curva,
    Cantidad,
    Color,
    Ubicacion,
    IngresoABodega,
    LanzamientoCapsula,
    FechaDesbloqueo,
    DiasRestantes,
    Estado,
    CreatedAt,
}

/// Everything the table controls select
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingQuery {
    pub search: Option<String>,
    pub status: StatusFilter,
    /// 1..=12, matched against the unlock date
    pub unlock_month: Option<u32>,
    pub day_range: DayRange,
    pub sort_field: SortField,
    pub direction: SortDirection,
    pub page: Option<u32>,
}

impl ListingQuery {
    /// Sort by `field`, flipping direction if it is already the sort column
    pub fn toggle_sort(&mut self, field: SortField) {
        if self.sort_field == field {
            self.direction = self.direction.toggled();
        } else {
            self.sort_field = field;
            self.direction = SortDirection::Asc;
        }
    }
}

/// A reference with its derived schedule columns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingRow {
    #[serde(flatten)]
    pub reference: Reference,
    pub fecha_desbloqueo: Option<CalendarDate>,
    pub dias_restantes: Option<i64>,
    pub status: LifecycleStatus,
    pub estado: String,
    /// Launch and unlock dates as the table shows them (`d/m/yyyy`)
    #[serde(default)]
    pub lanzamiento_label: Option<String>,
    #[serde(default)]
    pub desbloqueo_label: Option<String>,
}

impl ListingRow {
    pub fn evaluate(reference: Reference, today: CalendarDate, policy: UnlockPolicy) -> Self {
        let evaluation = evaluate(&reference, today, policy);
        let unlock = evaluation.unlock_date();
        Self {
            lanzamiento_label: reference.lanzamiento_capsula.map(format_short_es),
            desbloqueo_label: unlock.map(format_short_es),
            fecha_desbloqueo: unlock,
            dias_restantes: evaluation.days_until_unlock(today),
            estado: evaluation.status.label(),
            status: evaluation.status,
            reference,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub rows: Vec<ListingRow>,
    pub meta: PaginationMeta,
}

fn row_matches(row: &ListingRow, query: &ListingQuery, needle: Option<&str>) -> bool {
    if let Some(needle) = needle {
        if !row.reference.referencia.to_lowercase().contains(needle) {
            return false;
        }
    }
    if !query.status.matches(row.status.phase) {
        return false;
    }
    if let Some(month) = query.unlock_month {
        if row.fecha_desbloqueo.map(|d| d.month()) != Some(month) {
            return false;
        }
    }
    query.day_range.matches(row.dias_restantes)
}

fn compare_text(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

fn compare_opt_text(a: Option<&str>, b: Option<&str>) -> Ordering {
    compare_text(a.unwrap_or(""), b.unwrap_or(""))
}

fn phase_rank(phase: Phase) -> u8 {
    match phase {
        Phase::NoSchedule => 0,
        Phase::PendingLaunch => 1,
        Phase::PendingIntake => 2,
        Phase::CountingDown => 3,
        Phase::Unlocked => 4,
    }
}

fn compare_by(field: SortField, a: &ListingRow, b: &ListingRow) -> Ordering {
    let (ra, rb) = (&a.reference, &b.reference);
    match field {
        SortField::Referencia => compare_text(&ra.referencia, &rb.referencia),
        SortField::Curva => ra.curva.as_str().cmp(rb.curva.as_str()),
        SortField::Cantidad => ra.cantidad.cmp(&rb.cantidad),
        SortField::Color => compare_opt_text(ra.color.as_deref(), rb.color.as_deref()),
        SortField::Ubicacion => compare_opt_text(ra.ubicacion.as_deref(), rb.ubicacion.as_deref()),
        SortField::IngresoABodega => ra.ingreso_a_bodega.cmp(&rb.ingreso_a_bodega),
        SortField::LanzamientoCapsula => ra.lanzamiento_capsula.cmp(&rb.lanzamiento_capsula),
        SortField::FechaDesbloqueo => a.fecha_desbloqueo.cmp(&b.fecha_desbloqueo),
        SortField::DiasRestantes => a.dias_restantes.cmp(&b.dias_restantes),
        SortField::Estado => (phase_rank(a.status.phase), a.status.days)
            .cmp(&(phase_rank(b.status.phase), b.status.days)),
        SortField::CreatedAt => ra.created_at.cmp(&rb.created_at),
    }
}

/// Filter and sort without paginating. Export uses this directly.
pub fn filter_and_sort(
    references: &[Reference],
    query: &ListingQuery,
    today: CalendarDate,
    policy: UnlockPolicy,
) -> Vec<ListingRow> {
    let needle = query
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase);

    let mut rows: Vec<ListingRow> = references
        .iter()
        .map(|r| ListingRow::evaluate(r.clone(), today, policy))
        .filter(|row| row_matches(row, query, needle.as_deref()))
        .collect();

    rows.sort_by(|a, b| {
        let primary = compare_by(query.sort_field, a, b);
        let primary = match query.direction {
            SortDirection::Asc => primary,
            SortDirection::Desc => primary.reverse(),
        };
        primary
            .then_with(|| a.reference.referencia.cmp(&b.reference.referencia))
            .then_with(|| a.reference.id.cmp(&b.reference.id))
    });
    rows
}

/// One page of the table
pub fn listing(
    references: &[Reference],
    query: &ListingQuery,
    today: CalendarDate,
    policy: UnlockPolicy,
    page_size: u32,
) -> Listing {
    let rows = filter_and_sort(references, query, today, policy);
    let meta = PaginationMeta::new(
        Pagination {
            page: query.page.unwrap_or(1),
            per_page: if page_size == 0 { DEFAULT_PAGE_SIZE } else { page_size },
        },
        rows.len() as u64,
    );
    let rows = rows
        .into_iter()
        .skip(meta.bounds().start)
        .take(meta.bounds().len())
        .collect();
    Listing { rows, meta }
}

/// An entry in the pagination control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "page", rename_all = "lowercase")]
pub enum PageItem {
    Page(u32),
    Ellipsis,
}

/// Pages to show: first, last and current ± 1, with an ellipsis at ± 2.
///
/// Empty when there is only one page.
pub fn page_window(current: u32, total: u32) -> Vec<PageItem> {
    if total <= 1 {
        return Vec::new();
    }
    let current = current.clamp(1, total);
    (1..=total)
        .filter_map(|page| {
            if page == 1 || page == total || page.abs_diff(current) <= 1 {
                Some(PageItem::Page(page))
            } else if page.abs_diff(current) == 2 {
                Some(PageItem::Ellipsis)
            } else {
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::views::test_support::{reference_with, ymd};

    fn policy() -> UnlockPolicy {
        UnlockPolicy::new(21)
    }

    #[test]
    fn test_search_is_case_insensitive_substring() {
        let refs = vec![
            reference_with("ABC-100", None, None),
            reference_with("xyz-200", None, None),
        ];
        let query = ListingQuery {
            search: Some("  abc ".to_string()),
            ..Default::default()
        };
        let rows = filter_and_sort(&refs, &query, ymd(2024, 3, 1), policy());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].reference.referencia, "ABC-100");
    }

    #[test]
    fn test_status_filter_locked_includes_unscheduled() {
        let refs = vec![
            reference_with("OLD", None, Some(ymd(2024, 1, 1))),
            reference_with("NEW", None, Some(ymd(2024, 3, 1))),
            reference_with("NONE", None, None),
        ];
        let today = ymd(2024, 3, 5);
        let locked = ListingQuery {
            status: StatusFilter::Locked,
            ..Default::default()
        };
        let codes: Vec<_> = filter_and_sort(&refs, &locked, today, policy())
            .into_iter()
            .map(|r| r.reference.referencia)
            .collect();
        assert_eq!(codes, vec!["NEW", "NONE"]);

        let unlocked = ListingQuery {
            status: StatusFilter::Unlocked,
            ..Default::default()
        };
        assert_eq!(filter_and_sort(&refs, &unlocked, today, policy()).len(), 1);
    }

    #[test]
    fn test_day_range_excludes_rows_without_schedule() {
        let refs = vec![
            // unlocks 2024-03-22, 17 days after today
            reference_with("A", None, Some(ymd(2024, 3, 1))),
            // unlocks 2024-03-11, 6 days after today
            reference_with("B", None, Some(ymd(2024, 2, 19))),
            reference_with("NONE", None, None),
        ];
        let today = ymd(2024, 3, 5);
        let query = ListingQuery {
            day_range: DayRange::OneToSeven,
            ..Default::default()
        };
        let rows = filter_and_sort(&refs, &query, today, policy());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].reference.referencia, "B");

        let query = ListingQuery {
            day_range: DayRange::SixteenToThirty,
            ..Default::default()
        };
        assert_eq!(filter_and_sort(&refs, &query, today, policy())[0].reference.referencia, "A");
    }

    #[test]
    fn test_rows_carry_short_date_labels() {
        let refs = vec![
            reference_with("A", None, Some(ymd(2024, 3, 1))),
            reference_with("B", None, None),
        ];
        let rows = filter_and_sort(&refs, &ListingQuery::default(), ymd(2024, 3, 1), policy());
        assert_eq!(rows[0].lanzamiento_label.as_deref(), Some("1/3/2024"));
        assert_eq!(rows[0].desbloqueo_label.as_deref(), Some("22/3/2024"));
        assert_eq!(rows[1].lanzamiento_label, None);
        assert_eq!(rows[1].desbloqueo_label, None);
    }

    #[test]
    fn test_unlock_month_filter() {
        let refs = vec![
            reference_with("MARCH", None, Some(ymd(2024, 3, 1))),
            reference_with("APRIL", None, Some(ymd(2024, 3, 20))),
        ];
        let query = ListingQuery {
            unlock_month: Some(4),
            ..Default::default()
        };
        let rows = filter_and_sort(&refs, &query, ymd(2024, 3, 1), policy());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].reference.referencia, "APRIL");
    }

    #[test]
    fn test_sort_numeric_and_missing_values() {
        let mut a = reference_with("A", None, Some(ymd(2024, 3, 1)));
        a.cantidad = 100;
        let mut b = reference_with("B", None, None);
        b.cantidad = 9;
        let refs = vec![a, b];
        let today = ymd(2024, 3, 1);

        let mut query = ListingQuery::default();
        query.toggle_sort(SortField::Cantidad);
        let codes: Vec<_> = filter_and_sort(&refs, &query, today, policy())
            .into_iter()
            .map(|r| r.reference.referencia)
            .collect();
        assert_eq!(codes, vec!["B", "A"]);

        query.toggle_sort(SortField::FechaDesbloqueo);
        assert_eq!(query.direction, SortDirection::Asc);
        let first = &filter_and_sort(&refs, &query, today, policy())[0];
        assert_eq!(first.reference.referencia, "B");

        query.toggle_sort(SortField::FechaDesbloqueo);
        assert_eq!(query.direction, SortDirection::Desc);
        let first = &filter_and_sort(&refs, &query, today, policy())[0];
        assert_eq!(first.reference.referencia, "A");
    }

    #[test]
    fn test_listing_pages_of_fifteen() {
        let refs: Vec<_> = (0..20)
            .map(|i| reference_with(&format!("R{:02}", i), None, None))
            .collect();
        let query = ListingQuery {
            page: Some(2),
            ..Default::default()
        };
        let page = listing(&refs, &query, ymd(2024, 3, 1), policy(), DEFAULT_PAGE_SIZE);
        assert_eq!(page.meta.total_pages, 2);
        assert_eq!(page.rows.len(), 5);
        assert_eq!(page.rows[0].reference.referencia, "R15");
    }

    #[test]
    fn test_page_window() {
        assert!(page_window(1, 1).is_empty());
        assert_eq!(
            page_window(5, 10),
            vec![
                PageItem::Page(1),
                PageItem::Ellipsis,
                PageItem::Page(4),
                PageItem::Page(5),
                PageItem::Page(6),
                PageItem::Ellipsis,
                PageItem::Page(10),
            ]
        );
        assert_eq!(
            page_window(1, 4),
            vec![
                PageItem::Page(1),
                PageItem::Page(2),
                PageItem::Ellipsis,
                PageItem::Page(4),
            ]
        );
    }

    #[test]
    fn test_query_deserializes_from_params() {
        let query: ListingQuery = serde_json::from_str(
            r#"{"status":"locked","day_range":"8-15","sort_field":"dias_restantes","direction":"desc"}"#,
        )
        .unwrap();
        assert_eq!(query.status, StatusFilter::Locked);
        assert_eq!(query.day_range, DayRange::EightToFifteen);
        assert_eq!(query.sort_field, SortField::DiasRestantes);
        assert_eq!(query.direction, SortDirection::Desc);
    }
}
