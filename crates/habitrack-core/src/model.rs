//! Shared data types: activities, weekday plans, and derived view models.

use chrono::{NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

/// Seven-bit weekday mask, bit 0 = Monday through bit 6 = Sunday.
///
/// An activity's plan declares which weekdays it is expected on. Only
/// planned weekdays count toward streaks and window statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanMask(pub u8);

impl PlanMask {
    /// Every weekday planned.
    pub const FULL_WEEK: PlanMask = PlanMask(0x7f);

    pub fn contains(self, weekday: Weekday) -> bool {
        (self.0 >> weekday.num_days_from_monday()) & 1 == 1
    }

    #[must_use]
    pub fn with_day(self, weekday: Weekday, planned: bool) -> PlanMask {
        let bit = 1u8 << weekday.num_days_from_monday();
        if planned {
            PlanMask(self.0 | bit)
        } else {
            PlanMask(self.0 & !bit)
        }
    }

    pub fn is_empty(self) -> bool {
        self.0 & 0x7f == 0
    }

    /// Number of planned weekdays (0..=7).
    pub fn planned_days(self) -> u32 {
        (self.0 & 0x7f).count_ones()
    }
}

impl Default for PlanMask {
    fn default() -> Self {
        Self::FULL_WEEK
    }
}

/// A trackable habit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    /// Stable identifier, assigned at creation, never reused.
    pub id: i64,
    pub name: String,
    /// Required activities participate in streak computation.
    pub required: bool,
    /// Weekdays the activity is planned for.
    pub plan: PlanMask,
    /// Total-order key; unique among active activities.
    pub rank: i64,
    /// Soft-delete flag; inactive activities keep their history.
    pub active: bool,
}

/// One cell of the week grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayCell {
    pub date: NaiveDate,
    /// Whether the activity's plan covers this weekday.
    pub planned: bool,
    pub done: bool,
}

/// One activity row of the week grid, Monday through Sunday.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekRow {
    pub activity_id: i64,
    pub name: String,
    pub required: bool,
    pub days: [DayCell; 7],
}

/// Read model for one ISO week of completions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekView {
    /// Monday of the week.
    pub week_start: NaiveDate,
    pub rows: Vec<WeekRow>,
}

/// Planned/done counts for one activity over the 7- and 30-day windows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityWindowStats {
    pub activity_id: i64,
    pub name: String,
    pub planned7: u32,
    pub done7: u32,
    pub percent7: u32,
    pub planned30: u32,
    pub done30: u32,
    pub percent30: u32,
}

/// Derived statistics for a reference date. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    /// Consecutive satisfied days walking back from the reference date.
    pub streak: u32,
    /// Share of the last 7 days with at least one completion.
    pub ratio7: f64,
    /// Share of the last 30 days with at least one completion.
    pub ratio30: f64,
    pub per_activity: Vec<ActivityWindowStats>,
    /// Weekday with the most completions in the 30-day window.
    pub strongest_weekday: Option<StrongestWeekday>,
}

impl StatsSnapshot {
    /// Snapshot for an empty activity list: zero streak, zero ratios.
    pub fn empty() -> Self {
        Self {
            streak: 0,
            ratio7: 0.0,
            ratio30: 0.0,
            per_activity: Vec::new(),
            strongest_weekday: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrongestWeekday {
    pub weekday: Weekday,
    pub completions: u32,
}

/// Done/planned totals for one week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekProgress {
    pub week_start: NaiveDate,
    pub done: u32,
    pub planned: u32,
    /// Rounded percentage, 0 when nothing is planned.
    pub percent: u32,
}
