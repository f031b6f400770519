//! Gantt timeline projection

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::dates::{add_days, days_between, CalendarDate};
use crate::models::Reference;
use crate::schedule::{evaluate, LifecycleStatus, UnlockPolicy};
use crate::types::DateRange;

/// Padding added on both sides of the bars
const AXIS_PADDING_DAYS: i64 = 2;
/// Axis length when there is nothing to draw
const EMPTY_AXIS_DAYS: i64 = 30;

/// Which pair of dates a bar spans
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GanttMode {
    /// Warehouse intake to capsule launch
    #[default]
    IntakeToLaunch,
    /// Countdown anchor to unlock
    BaseToUnlock,
}

impl GanttMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            GanttMode::IntakeToLaunch => "intake-to-launch",
            GanttMode::BaseToUnlock => "base-to-unlock",
        }
    }

}

impl std::str::FromStr for GanttMode {
    type Err = UnknownGanttMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "intake-to-launch" => Ok(GanttMode::IntakeToLaunch),
            "base-to-unlock" => Ok(GanttMode::BaseToUnlock),
            other => Err(UnknownGanttMode(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown gantt mode '{0}', expected intake-to-launch or base-to-unlock")]
pub struct UnknownGanttMode(pub String);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GanttBar {
    pub id: Uuid,
    pub label: String,
    pub start: CalendarDate,
    pub end: CalendarDate,
    pub progress_percent: u8,
    pub status: LifecycleStatus,
    /// Offset of `start` along the axis, 0..=100
    pub left_percent: f64,
    pub width_percent: f64,
}

/// The day range the chart is drawn over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineAxis {
    pub range: DateRange,
}

impl TimelineAxis {
    /// Span the bars with two days of padding, or the next 30 days when empty
    pub fn spanning(
        spans: impl IntoIterator<Item = (CalendarDate, CalendarDate)>,
        today: CalendarDate,
    ) -> Self {
        let bounds = spans.into_iter().fold(None, |acc: Option<(NaiveDate, NaiveDate)>, (s, e)| {
            Some(match acc {
                Some((lo, hi)) => (lo.min(s), hi.max(e)),
                None => (s, e),
            })
        });
        let range = match bounds {
            Some((lo, hi)) => DateRange::new(
                add_days(lo, -AXIS_PADDING_DAYS),
                add_days(hi, AXIS_PADDING_DAYS),
            ),
            None => DateRange::new(today, add_days(today, EMPTY_AXIS_DAYS - 1)),
        };
        Self { range }
    }

    /// Percent offset of `date` from the axis start
    pub fn position(&self, date: CalendarDate) -> f64 {
        let total = days_between(self.range.start, self.range.end);
        if total <= 0 {
            return 0.0;
        }
        days_between(self.range.start, date) as f64 / total as f64 * 100.0
    }

    /// Label days: every `max(1, len / 5)`-th day plus the last one
    pub fn ticks(&self) -> Vec<CalendarDate> {
        let days: Vec<CalendarDate> = self.range.days().collect();
        let step = (days.len() / 5).max(1);
        let last = days.len().saturating_sub(1);
        days.iter()
            .enumerate()
            .filter(|(i, _)| i % step == 0 || *i == last)
            .map(|(_, d)| *d)
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GanttChart {
    pub mode: GanttMode,
    pub bars: Vec<GanttBar>,
    pub axis: TimelineAxis,
    pub ticks: Vec<CalendarDate>,
}

/// Share of the window elapsed by `today`, rounded and clamped to 0..=100.
///
/// A zero-length window has no progress to show.
pub fn progress_percent(start: CalendarDate, end: CalendarDate, today: CalendarDate) -> u8 {
    let window = days_between(start, end);
    if window <= 0 {
        return 0;
    }
    let elapsed = days_between(start, today) as f64;
    (elapsed / window as f64 * 100.0).clamp(0.0, 100.0).round() as u8
}

fn bar_span(
    reference: &Reference,
    mode: GanttMode,
    today: CalendarDate,
    policy: UnlockPolicy,
) -> Option<(CalendarDate, CalendarDate, LifecycleStatus)> {
    let evaluation = evaluate(reference, today, policy);
    let (start, end) = match mode {
        GanttMode::IntakeToLaunch => {
            let intake = reference.ingreso_a_bodega?;
            let launch = reference.lanzamiento_capsula?;
            (intake.min(launch), intake.max(launch))
        }
        GanttMode::BaseToUnlock => {
            let schedule = evaluation.schedule?;
            (schedule.base, schedule.unlock)
        }
    };
    Some((start, end, evaluation.status))
}

/// Build the chart for every reference that has the dates `mode` needs
pub fn gantt_projection(
    references: &[Reference],
    mode: GanttMode,
    today: CalendarDate,
    policy: UnlockPolicy,
) -> GanttChart {
    let spans: Vec<_> = references
        .iter()
        .filter_map(|r| bar_span(r, mode, today, policy).map(|span| (r, span)))
        .collect();

    let axis = TimelineAxis::spanning(spans.iter().map(|(_, (s, e, _))| (*s, *e)), today);

    let bars = spans
        .into_iter()
        .map(|(reference, (start, end, status))| {
            let left = axis.position(start);
            GanttBar {
                id: reference.id,
                label: reference.referencia.clone(),
                start,
                end,
                progress_percent: progress_percent(start, end, today),
                status,
                left_percent: left,
                width_percent: axis.position(end) - left,
            }
        })
        .collect();

    GanttChart {
        mode,
        bars,
        ticks: axis.ticks(),
        axis,
    }
}
