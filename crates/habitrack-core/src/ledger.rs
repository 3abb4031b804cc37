//! Completion ledger: per-day marks and week-windowed views.
//!
//! Weeks are fixed Monday through Sunday (ISO), independent of locale.

use chrono::{Datelike, Days, NaiveDate};

use crate::error::{Result, ValidationError};
use crate::model::{DayCell, WeekRow, WeekView};
use crate::storage::HabitDb;

/// Earliest accepted mark date.
pub const MIN_MARK_DATE: NaiveDate = match NaiveDate::from_ymd_opt(2000, 1, 1) {
    Some(d) => d,
    None => panic!("valid constant date"),
};
/// Latest accepted mark date.
pub const MAX_MARK_DATE: NaiveDate = match NaiveDate::from_ymd_opt(2100, 12, 31) {
    Some(d) => d,
    None => panic!("valid constant date"),
};

/// Monday of the ISO week containing `date`.
pub fn week_start_of(date: NaiveDate) -> NaiveDate {
    date - Days::new(u64::from(date.weekday().num_days_from_monday()))
}

/// Flip the mark for `(activity_id, date)`. Returns the new state.
///
/// # Errors
/// Rejects dates outside the accepted calendar range and unknown ids.
pub fn toggle(db: &HabitDb, activity_id: i64, date: NaiveDate) -> Result<bool> {
    validate_date(date)?;
    db.toggle_mark(activity_id, date)
}

/// Set the mark for every active activity planned on `date`'s weekday.
///
/// # Errors
/// Rejects dates outside the accepted calendar range.
pub fn set_day(db: &HabitDb, date: NaiveDate, done: bool) -> Result<u32> {
    validate_date(date)?;
    let activities = db.list_activities(false)?;
    let weekday = date.weekday();
    db.with_tx(|tx| {
        let mut touched = 0;
        for activity in activities.iter().filter(|a| a.plan.contains(weekday)) {
            tx.execute(
                "INSERT INTO completions (activity_id, day, done)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(activity_id, day) DO UPDATE SET done = excluded.done",
                rusqlite::params![
                    activity.id,
                    date.format("%Y-%m-%d").to_string(),
                    done as i64
                ],
            )
            .map_err(crate::error::StorageError::from)?;
            touched += 1;
        }
        Ok(touched)
    })
}

/// Week grid for the ISO week containing `date`: exactly seven cells
/// per active activity, Monday first, marks outside the week ignored.
///
/// # Errors
/// Rejects dates outside the accepted calendar range.
pub fn week_view(db: &HabitDb, date: NaiveDate) -> Result<WeekView> {
    validate_date(date)?;
    let week_start = week_start_of(date);
    let week_end = week_start + Days::new(6);
    let activities = db.list_activities(false)?;
    let marks = db.marks_in_range(week_start, week_end)?;

    let rows = activities
        .into_iter()
        .map(|activity| {
            let days = std::array::from_fn(|i| {
                let date = week_start + Days::new(i as u64);
                DayCell {
                    date,
                    planned: activity.plan.contains(date.weekday()),
                    done: marks
                        .get(&(activity.id, date))
                        .copied()
                        .unwrap_or(false),
                }
            });
            WeekRow {
                activity_id: activity.id,
                name: activity.name,
                required: activity.required,
                days,
            }
        })
        .collect();

    Ok(WeekView { week_start, rows })
}

/// Reject dates outside `MIN_MARK_DATE..=MAX_MARK_DATE`. Applied to
/// mark writes and to query reference dates alike, so the bounded
/// windows derived from them stay inside the calendar.
pub(crate) fn validate_date(date: NaiveDate) -> Result<()> {
    if date < MIN_MARK_DATE || date > MAX_MARK_DATE {
        return Err(ValidationError::DateOutOfBounds {
            date,
            min: MIN_MARK_DATE,
            max: MAX_MARK_DATE,
        }
        .into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;
    use proptest::prelude::*;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn week_start_is_always_monday() {
        // 2024-01-01 is a Monday.
        assert_eq!(week_start_of(day("2024-01-01")), day("2024-01-01"));
        assert_eq!(week_start_of(day("2024-01-04")), day("2024-01-01"));
        assert_eq!(week_start_of(day("2024-01-07")), day("2024-01-01"));
        assert_eq!(week_start_of(day("2024-01-08")), day("2024-01-08"));
    }

    #[test]
    fn week_view_has_exactly_seven_cells_per_activity() {
        let db = HabitDb::open_memory().unwrap();
        let a = db.create_activity("Run", true).unwrap();
        db.create_activity("Read", false).unwrap();
        // Marks inside and outside the requested week.
        db.upsert_mark(a.id, day("2024-01-02"), true).unwrap();
        db.upsert_mark(a.id, day("2023-12-31"), true).unwrap();
        db.upsert_mark(a.id, day("2024-01-08"), true).unwrap();

        let view = week_view(&db, day("2024-01-01")).unwrap();
        assert_eq!(view.week_start, day("2024-01-01"));
        assert_eq!(view.rows.len(), 2);
        for row in &view.rows {
            assert_eq!(row.days.len(), 7);
            assert_eq!(row.days[0].date, day("2024-01-01"));
            assert_eq!(row.days[6].date, day("2024-01-07"));
        }
        let run = &view.rows[0];
        assert!(run.days[1].done);
        assert_eq!(run.days.iter().filter(|c| c.done).count(), 1);
    }

    #[test]
    fn week_view_normalizes_any_day_to_its_monday() {
        let db = HabitDb::open_memory().unwrap();
        db.create_activity("Run", true).unwrap();
        let from_thursday = week_view(&db, day("2024-01-04")).unwrap();
        assert_eq!(from_thursday.week_start, day("2024-01-01"));
    }

    #[test]
    fn unplanned_days_render_as_unplanned() {
        let db = HabitDb::open_memory().unwrap();
        let a = db.create_activity("Gym", true).unwrap();
        let plan = crate::model::PlanMask(0)
            .with_day(Weekday::Mon, true)
            .with_day(Weekday::Thu, true);
        db.set_plan(a.id, plan).unwrap();

        let view = week_view(&db, day("2024-01-01")).unwrap();
        let days = &view.rows[0].days;
        assert!(days[0].planned);
        assert!(!days[1].planned);
        assert!(days[3].planned);
        assert!(!days[6].planned);
    }

    #[test]
    fn out_of_bounds_dates_are_rejected() {
        let db = HabitDb::open_memory().unwrap();
        let a = db.create_activity("Run", true).unwrap();
        assert!(toggle(&db, a.id, day("1999-12-31")).is_err());
        assert!(toggle(&db, a.id, day("2101-01-01")).is_err());
        assert!(toggle(&db, a.id, day("2000-01-01")).is_ok());
    }

    #[test]
    fn week_view_rejects_out_of_bounds_dates() {
        let db = HabitDb::open_memory().unwrap();
        db.create_activity("Run", true).unwrap();
        assert!(week_view(&db, day("1999-12-31")).is_err());
        // Dates near the calendar floor must error, never abort.
        assert!(week_view(&db, NaiveDate::MIN + Days::new(2)).is_err());
        assert!(week_view(&db, day("2000-01-03")).is_ok());
    }

    #[test]
    fn set_day_marks_only_planned_activities() {
        let db = HabitDb::open_memory().unwrap();
        let a = db.create_activity("Run", true).unwrap();
        let b = db.create_activity("Gym", false).unwrap();
        // Gym is not planned on Mondays.
        db.set_plan(b.id, crate::model::PlanMask(0).with_day(Weekday::Thu, true))
            .unwrap();

        let touched = set_day(&db, day("2024-01-01"), true).unwrap();
        assert_eq!(touched, 1);
        assert!(db.get_mark(a.id, day("2024-01-01")).unwrap());
        assert!(!db.get_mark(b.id, day("2024-01-01")).unwrap());
    }

    proptest! {
        /// Toggle parity law: after n toggles the mark is done iff n is odd.
        #[test]
        fn toggle_parity(toggles in 0usize..12) {
            let db = HabitDb::open_memory().unwrap();
            let a = db.create_activity("Run", true).unwrap();
            let d = day("2024-01-01");
            let mut last = false;
            for _ in 0..toggles {
                last = toggle(&db, a.id, d).unwrap();
            }
            prop_assert_eq!(db.get_mark(a.id, d).unwrap(), toggles % 2 == 1);
            if toggles > 0 {
                prop_assert_eq!(last, toggles % 2 == 1);
            }
        }
    }
}
