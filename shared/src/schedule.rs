//! Unlock scheduling and lifecycle classification
//!
//! A reference's schedule is anchored on its launch date, or on its warehouse
//! intake date when goods arrive after the planned launch. The unlock date is
//! that anchor plus a fixed holding offset. Every view (table, cards,
//! calendar, Gantt, export) goes through [`evaluate`] so they agree on the
//! same dates and phase for the same day.

use serde::{Deserialize, Serialize};

use crate::dates::{add_days, days_between, CalendarDate};
use crate::models::Reference;

/// Default holding period between base date and unlock
pub const DEFAULT_UNLOCK_OFFSET_DAYS: u32 = 21;

/// The single unlock-offset policy shared by all views
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnlockPolicy {
    pub offset_days: u32,
}

impl UnlockPolicy {
    pub fn new(offset_days: u32) -> Self {
        Self { offset_days }
    }
}

impl Default for UnlockPolicy {
    fn default() -> Self {
        Self {
            offset_days: DEFAULT_UNLOCK_OFFSET_DAYS,
        }
    }
}

/// Dates derived from a reference's launch and intake
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    pub launch: CalendarDate,
    /// Countdown anchor: the later of intake and launch
    pub base: CalendarDate,
    pub unlock: CalendarDate,
}

impl Schedule {
    /// Holding period length in days
    pub fn offset_days(&self) -> i64 {
        days_between(self.base, self.unlock)
    }
}

/// Derive the countdown anchor and unlock date.
///
/// Returns `None` without a launch date. The intake date only moves the
/// anchor when it is strictly later than the launch.
pub fn derive_base_and_unlock(
    intake: Option<CalendarDate>,
    launch: Option<CalendarDate>,
    offset_days: u32,
) -> Option<Schedule> {
    let launch = launch?;
    let base = match intake {
        Some(intake) if intake > launch => intake,
        _ => launch,
    };
    Some(Schedule {
        launch,
        base,
        unlock: add_days(base, i64::from(offset_days)),
    })
}

/// Lifecycle phase of a reference on a given day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    /// No launch date recorded
    NoSchedule,
    /// Launch is still ahead
    PendingLaunch,
    /// Launched, but goods have not reached the warehouse yet
    PendingIntake,
    /// Holding period running
    CountingDown,
    Unlocked,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::NoSchedule => "no-schedule",
            Phase::PendingLaunch => "pending-launch",
            Phase::PendingIntake => "pending-intake",
            Phase::CountingDown => "counting-down",
            Phase::Unlocked => "unlocked",
        }
    }

    pub fn is_unlocked(&self) -> bool {
        matches!(self, Phase::Unlocked)
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Phase plus the day count that goes with it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleStatus {
    pub phase: Phase,
    /// Days until launch, until intake, or remaining in the countdown;
    /// `Some(0)` once unlocked and `None` without a schedule.
    pub days: Option<i64>,
}

impl LifecycleStatus {
    /// Human-readable label used by the table and export
    pub fn label(&self) -> String {
        let days = self.days.unwrap_or_default();
        match self.phase {
            Phase::NoSchedule => "Sin fecha de lanzamiento".to_string(),
            Phase::PendingLaunch => format!("{} días para lanzar", days),
            Phase::PendingIntake => format!("{} días para ingreso", days),
            Phase::CountingDown => format!("{} días restantes", days),
            Phase::Unlocked => "Desbloqueado".to_string(),
        }
    }
}

/// Classify a schedule against `today`.
///
/// Pure: the result depends only on the arguments.
pub fn classify(today: CalendarDate, schedule: Option<&Schedule>) -> LifecycleStatus {
    let Some(schedule) = schedule else {
        return LifecycleStatus {
            phase: Phase::NoSchedule,
            days: None,
        };
    };

    if today < schedule.launch {
        return LifecycleStatus {
            phase: Phase::PendingLaunch,
            days: Some(days_between(today, schedule.launch)),
        };
    }

    if today < schedule.base {
        return LifecycleStatus {
            phase: Phase::PendingIntake,
            days: Some(days_between(today, schedule.base)),
        };
    }

    let elapsed = days_between(schedule.base, today);
    let offset = schedule.offset_days();
    if elapsed < offset {
        LifecycleStatus {
            phase: Phase::CountingDown,
            days: Some(offset - elapsed),
        }
    } else {
        LifecycleStatus {
            phase: Phase::Unlocked,
            days: Some(0),
        }
    }
}

/// Days from `today` until unlock, floored at zero
pub fn days_until_unlock(today: CalendarDate, schedule: &Schedule) -> i64 {
    days_between(today, schedule.unlock).max(0)
}

/// Schedule and status of one reference on one day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evaluation {
    pub schedule: Option<Schedule>,
    pub status: LifecycleStatus,
}

impl Evaluation {
    pub fn unlock_date(&self) -> Option<CalendarDate> {
        self.schedule.map(|s| s.unlock)
    }

    pub fn days_until_unlock(&self, today: CalendarDate) -> Option<i64> {
        self.schedule.as_ref().map(|s| days_until_unlock(today, s))
    }
}

/// Derive and classify a reference in one step
pub fn evaluate(reference: &Reference, today: CalendarDate, policy: UnlockPolicy) -> Evaluation {
    let schedule = derive_base_and_unlock(
        reference.ingreso_a_bodega,
        reference.lanzamiento_capsula,
        policy.offset_days,
    );
    Evaluation {
        schedule,
        status: classify(today, schedule.as_ref()),
    }
}
