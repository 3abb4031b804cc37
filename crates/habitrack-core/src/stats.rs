//! Derived statistics: streaks, rolling completion ratios, and
//! per-activity window counts.
//!
//! Everything here is recomputed from the ledger on every call. There
//! is no incremental cache to drift when the user retroactively edits
//! a past day.

use std::collections::HashMap;

use chrono::{Datelike, Days, NaiveDate, Weekday};

use crate::error::Result;
use crate::ledger::{validate_date, week_start_of};
use crate::model::{
    Activity, ActivityWindowStats, StatsSnapshot, StrongestWeekday, WeekProgress,
};
use crate::storage::HabitDb;

/// Upper bound on the streak walk, matching ten years of daily marks.
pub const STREAK_SCAN_CAP_DAYS: u64 = 3650;

const WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

type MarkMap = HashMap<(i64, NaiveDate), bool>;

/// Compute the full statistics snapshot for `reference`.
///
/// Only ledger contents up to and including `reference` are read, so
/// marks on later dates can never change the result.
///
/// # Errors
/// Rejects reference dates outside the accepted calendar range.
pub fn compute_stats(db: &HabitDb, reference: NaiveDate) -> Result<StatsSnapshot> {
    validate_date(reference)?;
    let activities = db.list_activities(false)?;
    if activities.is_empty() {
        return Ok(StatsSnapshot::empty());
    }

    let scan_start = reference - Days::new(STREAK_SCAN_CAP_DAYS - 1);
    let marks = db.marks_in_range(scan_start, reference)?;

    let (per_activity, weekday_done) = window_stats(&activities, &marks, reference);
    let strongest_weekday = weekday_done
        .iter()
        .enumerate()
        .max_by_key(|&(_, count)| *count)
        .filter(|&(_, count)| *count > 0)
        .map(|(idx, &completions)| StrongestWeekday {
            weekday: WEEKDAYS[idx],
            completions,
        });

    Ok(StatsSnapshot {
        streak: streak(&activities, &marks, reference),
        ratio7: window_ratio(&activities, &marks, reference, 7),
        ratio30: window_ratio(&activities, &marks, reference, 30),
        per_activity,
        strongest_weekday,
    })
}

/// Done/planned totals for the ISO week containing `date`.
///
/// # Errors
/// Rejects dates outside the accepted calendar range.
pub fn week_progress(db: &HabitDb, date: NaiveDate) -> Result<WeekProgress> {
    validate_date(date)?;
    let week_start = week_start_of(date);
    let activities = db.list_activities(false)?;
    let marks = db.marks_in_range(week_start, week_start + Days::new(6))?;

    let mut planned = 0u32;
    let mut done = 0u32;
    for activity in &activities {
        for i in 0..7u64 {
            let day = week_start + Days::new(i);
            if !activity.plan.contains(day.weekday()) {
                continue;
            }
            planned += 1;
            if marks.get(&(activity.id, day)) == Some(&true) {
                done += 1;
            }
        }
    }

    Ok(WeekProgress {
        week_start,
        done,
        planned,
        percent: percent(done, planned),
    })
}

/// Consecutive satisfied days walking back from `reference`.
///
/// A day is satisfied when every required activity planned for its
/// weekday is marked done; a day with no required activity planned is
/// vacuously satisfied. With no required activity at all the streak
/// is defined as 0.
fn streak(activities: &[Activity], marks: &MarkMap, reference: NaiveDate) -> u32 {
    if !activities.iter().any(|a| a.required) {
        return 0;
    }

    let mut count = 0u32;
    let mut day = reference;
    while u64::from(count) < STREAK_SCAN_CAP_DAYS {
        if !day_satisfied(activities, marks, day) {
            break;
        }
        count += 1;
        day = day - Days::new(1);
    }
    count
}

fn day_satisfied(activities: &[Activity], marks: &MarkMap, day: NaiveDate) -> bool {
    activities
        .iter()
        .filter(|a| a.required && a.plan.contains(day.weekday()))
        .all(|a| marks.get(&(a.id, day)) == Some(&true))
}

/// Share of the trailing `len` days with at least one completion by
/// any active activity.
fn window_ratio(activities: &[Activity], marks: &MarkMap, reference: NaiveDate, len: u64) -> f64 {
    let days_with_completion = (0..len)
        .filter(|&i| {
            let day = reference - Days::new(i);
            activities
                .iter()
                .any(|a| marks.get(&(a.id, day)) == Some(&true))
        })
        .count();
    days_with_completion as f64 / len as f64
}

fn window_stats(
    activities: &[Activity],
    marks: &MarkMap,
    reference: NaiveDate,
) -> (Vec<ActivityWindowStats>, [u32; 7]) {
    let mut weekday_done = [0u32; 7];
    let mut per_activity = Vec::with_capacity(activities.len());

    for activity in activities {
        let mut stats = ActivityWindowStats {
            activity_id: activity.id,
            name: activity.name.clone(),
            planned7: 0,
            done7: 0,
            percent7: 0,
            planned30: 0,
            done30: 0,
            percent30: 0,
        };
        for i in 0..30u64 {
            let day = reference - Days::new(i);
            if !activity.plan.contains(day.weekday()) {
                continue;
            }
            let done = marks.get(&(activity.id, day)) == Some(&true);
            stats.planned30 += 1;
            if i < 7 {
                stats.planned7 += 1;
            }
            if done {
                stats.done30 += 1;
                weekday_done[day.weekday().num_days_from_monday() as usize] += 1;
                if i < 7 {
                    stats.done7 += 1;
                }
            }
        }
        stats.percent7 = percent(stats.done7, stats.planned7);
        stats.percent30 = percent(stats.done30, stats.planned30);
        per_activity.push(stats);
    }

    (per_activity, weekday_done)
}

fn percent(done: u32, planned: u32) -> u32 {
    if planned == 0 {
        return 0;
    }
    ((f64::from(done) / f64::from(planned)) * 100.0).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PlanMask;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn empty_activity_list_yields_zeroes() {
        let db = HabitDb::open_memory().unwrap();
        let snapshot = compute_stats(&db, day("2024-01-04")).unwrap();
        assert_eq!(snapshot.streak, 0);
        assert_eq!(snapshot.ratio7, 0.0);
        assert_eq!(snapshot.ratio30, 0.0);
        assert!(snapshot.per_activity.is_empty());
    }

    #[test]
    fn no_required_activity_means_zero_streak() {
        let db = HabitDb::open_memory().unwrap();
        let a = db.create_activity("Read", false).unwrap();
        db.upsert_mark(a.id, day("2024-01-03"), true).unwrap();
        db.upsert_mark(a.id, day("2024-01-04"), true).unwrap();

        let snapshot = compute_stats(&db, day("2024-01-04")).unwrap();
        assert_eq!(snapshot.streak, 0);
        // The optional completions still feed the ratios.
        assert!(snapshot.ratio7 > 0.0);
    }

    #[test]
    fn run_read_scenario_matches_expected_streaks() {
        let db = HabitDb::open_memory().unwrap();
        let run = db.create_activity("Run", true).unwrap();
        db.create_activity("Read", false).unwrap();
        for d in ["2024-01-01", "2024-01-02", "2024-01-03"] {
            db.upsert_mark(run.id, day(d), true).unwrap();
        }

        assert_eq!(compute_stats(&db, day("2024-01-04")).unwrap().streak, 0);
        assert_eq!(compute_stats(&db, day("2024-01-03")).unwrap().streak, 3);
    }

    #[test]
    fn unplanned_weekdays_are_vacuously_satisfied() {
        let db = HabitDb::open_memory().unwrap();
        let a = db.create_activity("Gym", true).unwrap();
        // Planned Monday and Wednesday only.
        db.set_plan(
            a.id,
            PlanMask(0)
                .with_day(Weekday::Mon, true)
                .with_day(Weekday::Wed, true),
        )
        .unwrap();
        // 2024-01-01 Mon done, 2024-01-03 Wed done; Tue/Thu unplanned.
        db.upsert_mark(a.id, day("2024-01-01"), true).unwrap();
        db.upsert_mark(a.id, day("2024-01-03"), true).unwrap();

        // Unplanned days are satisfied, so the walk runs Jan 4 back
        // through Dec 28 and breaks at Wed Dec 27 (planned, not done).
        let snapshot = compute_stats(&db, day("2024-01-04")).unwrap();
        assert_eq!(snapshot.streak, 8);
    }

    #[test]
    fn ratios_count_days_not_marks() {
        let db = HabitDb::open_memory().unwrap();
        let a = db.create_activity("Run", true).unwrap();
        let b = db.create_activity("Read", false).unwrap();
        // Two completions on the same day count once.
        db.upsert_mark(a.id, day("2024-01-04"), true).unwrap();
        db.upsert_mark(b.id, day("2024-01-04"), true).unwrap();
        db.upsert_mark(a.id, day("2024-01-02"), true).unwrap();

        let snapshot = compute_stats(&db, day("2024-01-04")).unwrap();
        assert!((snapshot.ratio7 - 2.0 / 7.0).abs() < f64::EPSILON);
        assert!((snapshot.ratio30 - 2.0 / 30.0).abs() < f64::EPSILON);
    }

    #[test]
    fn out_of_bounds_reference_dates_are_rejected() {
        let db = HabitDb::open_memory().unwrap();
        db.create_activity("Run", true).unwrap();

        // The calendar floor must yield an error, never a panic from
        // the trailing-window subtraction.
        assert!(compute_stats(&db, NaiveDate::MIN + Days::new(10)).is_err());
        assert!(compute_stats(&db, day("1999-12-31")).is_err());
        assert!(compute_stats(&db, day("2101-01-01")).is_err());
        assert!(compute_stats(&db, day("2000-01-01")).is_ok());

        assert!(week_progress(&db, day("1999-12-31")).is_err());
        assert!(week_progress(&db, day("2000-01-03")).is_ok());
    }

    #[test]
    fn compute_stats_is_deterministic() {
        let db = HabitDb::open_memory().unwrap();
        let a = db.create_activity("Run", true).unwrap();
        db.upsert_mark(a.id, day("2024-01-04"), true).unwrap();

        let first = compute_stats(&db, day("2024-01-04")).unwrap();
        let second = compute_stats(&db, day("2024-01-04")).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn marks_after_reference_are_invisible() {
        let db = HabitDb::open_memory().unwrap();
        let a = db.create_activity("Run", true).unwrap();
        db.upsert_mark(a.id, day("2024-01-03"), true).unwrap();

        let before = compute_stats(&db, day("2024-01-03")).unwrap();
        db.upsert_mark(a.id, day("2024-01-05"), true).unwrap();
        let after = compute_stats(&db, day("2024-01-03")).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn per_activity_counts_follow_the_plan() {
        let db = HabitDb::open_memory().unwrap();
        let a = db.create_activity("Gym", true).unwrap();
        db.set_plan(a.id, PlanMask(0).with_day(Weekday::Mon, true))
            .unwrap();
        // Mondays in the 30-day window ending 2024-01-28 (a Sunday):
        // Jan 1, 8, 15, 22. Mark two of them.
        db.upsert_mark(a.id, day("2024-01-08"), true).unwrap();
        db.upsert_mark(a.id, day("2024-01-22"), true).unwrap();

        let snapshot = compute_stats(&db, day("2024-01-28")).unwrap();
        let gym = &snapshot.per_activity[0];
        assert_eq!(gym.planned30, 4);
        assert_eq!(gym.done30, 2);
        assert_eq!(gym.percent30, 50);
        assert_eq!(gym.planned7, 1);
        assert_eq!(gym.done7, 1);
        assert_eq!(
            snapshot.strongest_weekday,
            Some(StrongestWeekday {
                weekday: Weekday::Mon,
                completions: 2
            })
        );
    }

    #[test]
    fn week_progress_counts_planned_cells() {
        let db = HabitDb::open_memory().unwrap();
        let a = db.create_activity("Run", true).unwrap();
        let b = db.create_activity("Gym", false).unwrap();
        db.set_plan(b.id, PlanMask(0).with_day(Weekday::Mon, true))
            .unwrap();
        db.upsert_mark(a.id, day("2024-01-01"), true).unwrap();
        db.upsert_mark(b.id, day("2024-01-01"), true).unwrap();

        let progress = week_progress(&db, day("2024-01-03")).unwrap();
        assert_eq!(progress.week_start, day("2024-01-01"));
        assert_eq!(progress.planned, 8);
        assert_eq!(progress.done, 2);
        assert_eq!(progress.percent, 25);
    }
}
