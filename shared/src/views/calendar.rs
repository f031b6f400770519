//! Launch calendar

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::dates::CalendarDate;
use crate::models::Reference;

const MONTH_NAMES_ES: [&str; 12] = [
    "enero",
    "febrero",
    "marzo",
    "abril",
    "mayo",
    "junio",
    "julio",
    "agosto",
    "septiembre",
    "octubre",
    "noviembre",
    "diciembre",
];

pub const WEEKDAY_LABELS_ES: [&str; 7] = ["Dom", "Lun", "Mar", "Mié", "Jue", "Vie", "Sáb"];

/// Spanish month name, `None` outside 1..=12
pub fn month_name_es(month: u32) -> Option<&'static str> {
    MONTH_NAMES_ES.get(month.checked_sub(1)? as usize).copied()
}

/// Group references by exact launch date. References without one are left out.
pub fn calendar_buckets(references: &[Reference]) -> BTreeMap<CalendarDate, Vec<&Reference>> {
    let mut buckets: BTreeMap<CalendarDate, Vec<&Reference>> = BTreeMap::new();
    for reference in references {
        if let Some(launch) = reference.lanzamiento_capsula {
            buckets.entry(launch).or_default().push(reference);
        }
    }
    for day in buckets.values_mut() {
        day.sort_by(|a, b| a.referencia.cmp(&b.referencia));
    }
    buckets
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayCell {
    pub date: CalendarDate,
    pub is_today: bool,
    pub references: Vec<Reference>,
}

/// One month laid out Sunday-first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthGrid {
    pub year: i32,
    pub month: u32,
    pub label: String,
    /// Empty cells before the 1st
    pub leading_blanks: u32,
    pub days: Vec<DayCell>,
    /// References with a launch date anywhere, not just this month
    pub total_scheduled: usize,
}

/// Lay out `year`/`month`. Returns `None` for an invalid month.
pub fn month_grid(
    year: i32,
    month: u32,
    references: &[Reference],
    today: CalendarDate,
) -> Option<MonthGrid> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let (next_year, next_month) = shift_month(year, month, 1);
    let next_first = NaiveDate::from_ymd_opt(next_year, next_month, 1)?;

    let buckets = calendar_buckets(references);
    let total_scheduled = buckets.values().map(Vec::len).sum();

    let days = first
        .iter_days()
        .take_while(|d| *d < next_first)
        .map(|date| DayCell {
            date,
            is_today: date == today,
            references: buckets
                .get(&date)
                .map(|refs| refs.iter().map(|r| (*r).clone()).collect())
                .unwrap_or_default(),
        })
        .collect();

    Some(MonthGrid {
        year,
        month,
        label: format!("{} {}", month_name_es(month)?, year),
        leading_blanks: first.weekday().num_days_from_sunday(),
        days,
        total_scheduled,
    })
}

/// Move `delta` months forward (or back), rolling the year
pub fn shift_month(year: i32, month: u32, delta: i32) -> (i32, u32) {
    let index = year * 12 + (month as i32 - 1) + delta;
    (index.div_euclid(12), index.rem_euclid(12) as u32 + 1)
}
