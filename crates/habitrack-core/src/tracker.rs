//! Query façade: the single entry point for the presentation layer.
//!
//! `Tracker` is a stateless composition layer over the storage engine
//! and the derivation modules. Every mutation runs inside its own
//! transaction; nothing is held open across calls, and every returned
//! value is a plain read-only view model.

use chrono::NaiveDate;

use crate::error::Result;
use crate::model::{Activity, PlanMask, StatsSnapshot, WeekProgress, WeekView};
use crate::storage::HabitDb;
use crate::{ledger, stats};

/// Application façade over one open database.
pub struct Tracker {
    db: HabitDb,
}

impl Tracker {
    pub fn new(db: HabitDb) -> Self {
        Self { db }
    }

    /// Open the default on-disk database.
    ///
    /// # Errors
    /// See [`HabitDb::open_default`].
    pub fn open_default() -> Result<Self> {
        Ok(Self::new(HabitDb::open_default()?))
    }

    /// Underlying storage handle, for maintenance commands.
    pub fn db(&self) -> &HabitDb {
        &self.db
    }

    // === Queries ===

    pub fn list_activities(&self, include_inactive: bool) -> Result<Vec<Activity>> {
        self.db.list_activities(include_inactive)
    }

    /// Week grid for the ISO week containing `date`.
    pub fn week_view(&self, date: NaiveDate) -> Result<WeekView> {
        ledger::week_view(&self.db, date)
    }

    /// Statistics snapshot for `reference`, recomputed on every call.
    pub fn stats(&self, reference: NaiveDate) -> Result<StatsSnapshot> {
        stats::compute_stats(&self.db, reference)
    }

    pub fn week_progress(&self, date: NaiveDate) -> Result<WeekProgress> {
        stats::week_progress(&self.db, date)
    }

    // === Mutations ===

    pub fn create_activity(&self, name: &str, required: bool) -> Result<Activity> {
        self.db.create_activity(name, required)
    }

    pub fn rename_activity(&self, id: i64, name: &str) -> Result<()> {
        self.db.rename_activity(id, name)
    }

    pub fn set_required(&self, id: i64, required: bool) -> Result<()> {
        self.db.set_required(id, required)
    }

    pub fn set_plan(&self, id: i64, plan: PlanMask) -> Result<()> {
        self.db.set_plan(id, plan)
    }

    pub fn deactivate_activity(&self, id: i64) -> Result<()> {
        self.db.deactivate_activity(id)
    }

    /// Flip one day's mark; returns the new state.
    pub fn toggle_day(&self, id: i64, date: NaiveDate) -> Result<bool> {
        ledger::toggle(&self.db, id, date)
    }

    /// Mark or clear every planned activity on `date`. Returns the
    /// number of activities touched.
    pub fn set_day(&self, date: NaiveDate, done: bool) -> Result<u32> {
        ledger::set_day(&self.db, date, done)
    }

    /// Move an activity to a 1-based position in the active order;
    /// returns the refreshed order.
    pub fn reorder(&self, id: i64, position: usize) -> Result<Vec<Activity>> {
        self.db.reorder(id, position)
    }

    /// Delete all activities and history. Explicit full reset only.
    pub fn clear_all(&self) -> Result<()> {
        self.db.clear_all()
    }
}

/// Case-insensitive substring filter over activity names. Pure
/// client-side helper for search boxes; holds no state.
pub fn filter_by_name(activities: &[Activity], query: &str) -> Vec<Activity> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return activities.to_vec();
    }
    activities
        .iter()
        .filter(|a| a.name.to_lowercase().contains(&query))
        .cloned()
        .collect()
}
