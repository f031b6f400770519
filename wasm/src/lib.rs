//! WebAssembly module for GanttFlow
//!
//! Provides client-side computation for:
//! - Unlock dates and lifecycle status
//! - Distribution table lookups
//! - Date normalization
//! - Gantt and table projections over a list of references
//!
//! Dates cross the boundary as `YYYY-MM-DD` strings, structured results as JSON.
//! Passing an empty `today` uses the browser clock.

use serde::Serialize;
use shared::dates::{format_iso, parse_calendar_date, CalendarDate};
use shared::distribution::lookup;
use shared::schedule::{classify, derive_base_and_unlock, UnlockPolicy};
use shared::views::{gantt_projection, listing, GanttMode, ListingQuery};
use wasm_bindgen::prelude::*;

// Re-export shared types for use in JavaScript
pub use shared::models::*;
pub use shared::types::*;

/// Initialize the WASM module
#[wasm_bindgen(start)]
pub fn init() {
    web_sys::console::debug_1(&JsValue::from_str("ganttflow-wasm loaded"));
}

fn parse_day(value: &str, what: &str) -> Result<CalendarDate, JsValue> {
    parse_calendar_date(value)
        .ok_or_else(|| JsValue::from_str(&format!("Invalid {}: {}", what, value)))
}

/// An empty `today` means the browser's local calendar day
fn resolve_today(value: &str) -> Result<CalendarDate, JsValue> {
    if value.trim().is_empty() {
        return parse_day(&browser_today(), "today");
    }
    parse_day(value, "today")
}

fn to_json<T: Serialize>(value: &T) -> Result<String, JsValue> {
    serde_json::to_string(value)
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

#[derive(Serialize)]
struct StatusReport {
    base: Option<String>,
    unlock: Option<String>,
    phase: String,
    days: Option<i64>,
    label: String,
}

/// The browser's local calendar day as `YYYY-MM-DD`
#[wasm_bindgen]
pub fn browser_today() -> String {
    let now = js_sys::Date::new_0();
    format!(
        "{:04}-{:02}-{:02}",
        now.get_full_year(),
        now.get_month() + 1,
        now.get_date()
    )
}

/// Normalize a stored date (ISO, ISO with time, or spreadsheet serial) to `YYYY-MM-DD`
#[wasm_bindgen]
pub fn normalize_date(input: &str) -> Option<String> {
    parse_calendar_date(input).map(format_iso)
}

/// Unlock date for the given intake and launch dates
#[wasm_bindgen]
pub fn unlock_date(
    intake: Option<String>,
    launch: Option<String>,
    offset_days: u32,
) -> Option<String> {
    let intake = intake.as_deref().and_then(parse_calendar_date);
    let launch = launch.as_deref().and_then(parse_calendar_date);
    derive_base_and_unlock(intake, launch, offset_days).map(|s| format_iso(s.unlock))
}

/// Lifecycle status as JSON: `{base, unlock, phase, days, label}`
#[wasm_bindgen]
pub fn lifecycle_status(
    intake: Option<String>,
    launch: Option<String>,
    today: &str,
    offset_days: u32,
) -> Result<String, JsValue> {
    let today = resolve_today(today)?;
    let schedule = derive_base_and_unlock(
        intake.as_deref().and_then(parse_calendar_date),
        launch.as_deref().and_then(parse_calendar_date),
        offset_days,
    );
    let status = classify(today, schedule.as_ref());

    to_json(&StatusReport {
        base: schedule.map(|s| format_iso(s.base)),
        unlock: schedule.map(|s| format_iso(s.unlock)),
        phase: status.phase.as_str().to_string(),
        days: status.days,
        label: status.label(),
    })
}

/// Distribution table entry as JSON `{distribution, total}`, or `None` on a miss
#[wasm_bindgen]
pub fn lookup_distribution(
    curva: &str,
    cantidad_colores: &str,
) -> Result<Option<String>, JsValue> {
    let (Ok(curva), Ok(colors)) = (
        curva.parse::<Curva>(),
        cantidad_colores.parse::<ColorCount>(),
    ) else {
        return Ok(None);
    };
    lookup(curva, colors).map(|entry| to_json(&entry)).transpose()
}

/// Gantt chart for a JSON array of references
#[wasm_bindgen]
pub fn gantt_chart(
    references_json: &str,
    mode: &str,
    today: &str,
    offset_days: u32,
) -> Result<String, JsValue> {
    let references: Vec<Reference> = serde_json::from_str(references_json)
        .map_err(|e| JsValue::from_str(&format!("Invalid references JSON: {}", e)))?;
    let mode = if mode.trim().is_empty() {
        GanttMode::default()
    } else {
        mode.parse::<GanttMode>().map_err(|e| JsValue::from_str(&e.to_string()))?
    };
    let today = resolve_today(today)?;

    to_json(&gantt_projection(
        &references,
        mode,
        today,
        UnlockPolicy::new(offset_days),
    ))
}

/// One table page for a JSON array of references and a JSON listing query
#[wasm_bindgen]
pub fn listing_page(
    references_json: &str,
    query_json: &str,
    today: &str,
    offset_days: u32,
    page_size: u32,
) -> Result<String, JsValue> {
    let references: Vec<Reference> = serde_json::from_str(references_json)
        .map_err(|e| JsValue::from_str(&format!("Invalid references JSON: {}", e)))?;
    let query: ListingQuery = serde_json::from_str(query_json)
        .map_err(|e| JsValue::from_str(&format!("Invalid query JSON: {}", e)))?;
    let today = resolve_today(today)?;

    to_json(&listing(
        &references,
        &query,
        today,
        UnlockPolicy::new(offset_days),
        page_size,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_date() {
        assert_eq!(normalize_date("2024-03-01T10:00:00Z").as_deref(), Some("2024-03-01"));
        assert_eq!(normalize_date("45352").as_deref(), Some("2024-03-01"));
        assert_eq!(normalize_date("mañana"), None);
    }

    #[test]
    fn test_unlock_date_uses_later_intake() {
        let unlock = unlock_date(
            Some("2024-01-10".to_string()),
            Some("2024-01-05".to_string()),
            14,
        );
        assert_eq!(unlock.as_deref(), Some("2024-01-24"));
        assert_eq!(unlock_date(Some("2024-01-10".to_string()), None, 14), None);
    }

    #[test]
    fn test_lifecycle_status_counting_down() {
        let json = lifecycle_status(None, Some("2024-03-01".to_string()), "2024-03-15", 21).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["unlock"], "2024-03-22");
        assert_eq!(value["days"], 7);
        assert_eq!(value["label"], "7 días restantes");
    }

    #[test]
    fn test_lookup_distribution() {
        let hit = lookup_distribution("S-M-L", "2 colores").unwrap().unwrap();
        assert!(hit.contains("6-8-6"));
        assert_eq!(lookup_distribution("XS-S-M-L", "1").unwrap(), None);
        assert_eq!(lookup_distribution("nope", "1").unwrap(), None);
    }

    #[test]
    fn test_listing_page_accepts_empty_query() {
        let json = listing_page("[]", "{}", "2024-03-15", 21, 15).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["meta"]["total_pages"], 1);
    }
}
