//! SQLite-based storage for activities and completion marks.
//!
//! A single `HabitDb` owns the connection. Opening runs the corruption
//! recovery machine, takes a backup snapshot before pending schema
//! migrations, and then migrates. Multi-step mutations run inside a
//! scoped transaction that commits on success and rolls back on any
//! error path.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use tracing::debug;

use super::backup;
use super::migrations;
use super::recovery::{self, IntegrityProbe, RecoveryReport, RecoveryState, SqliteIntegrityProbe};
use super::{data_dir, Config};
use crate::error::{Result, StorageError, ValidationError};
use crate::model::{Activity, PlanMask};
use crate::order;

const DB_FILE: &str = "habitrack.db";

/// SQLite database holding activities and completion marks.
#[derive(Debug)]
pub struct HabitDb {
    conn: Connection,
    path: Option<PathBuf>,
    recovery: RecoveryReport,
    retention: usize,
}

impl HabitDb {
    /// Open or create the database at `path` with default probe and
    /// backup retention.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened, migration fails,
    /// or the file is corrupt with no valid backup to restore from.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(path.as_ref(), &SqliteIntegrityProbe, backup::DEFAULT_RETENTION)
    }

    /// Open the database at `<data_dir>/habitrack.db`, with backup
    /// retention taken from the saved configuration.
    ///
    /// # Errors
    /// See [`HabitDb::open`].
    pub fn open_default() -> Result<Self> {
        let path = data_dir()?.join(DB_FILE);
        let retention = Config::load_or_default().storage.backup_retention;
        Self::open_with(&path, &SqliteIntegrityProbe, retention)
    }

    /// Open with an explicit integrity probe and retention count.
    ///
    /// # Errors
    /// See [`HabitDb::open`].
    pub fn open_with(
        path: &Path,
        probe: &dyn IntegrityProbe,
        retention: usize,
    ) -> Result<Self> {
        let report = recovery::run(path, probe)?;
        if report.state() == RecoveryState::Failed {
            return Err(StorageError::Unrecoverable {
                path: path.to_path_buf(),
            }
            .into());
        }

        let existed = path.exists();
        let conn = Connection::open(path).map_err(|source| StorageError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        configure(&conn)?;

        // Snapshot before migrations touch an existing file.
        if existed && migrations::schema_version(&conn) < migrations::LATEST_VERSION {
            backup::snapshot(path, retention)?;
        }

        base_schema(&conn)?;
        migrations::migrate(&conn)
            .map_err(|e| StorageError::MigrationFailed(e.to_string()))?;

        Ok(Self {
            conn,
            path: Some(path.to_path_buf()),
            recovery: report,
            retention,
        })
    }

    /// Open an in-memory database (tests and dry runs).
    ///
    /// # Errors
    /// Returns an error if schema creation fails.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(StorageError::from)?;
        configure(&conn)?;
        base_schema(&conn)?;
        migrations::migrate(&conn)
            .map_err(|e| StorageError::MigrationFailed(e.to_string()))?;
        Ok(Self {
            conn,
            path: None,
            recovery: RecoveryReport {
                transitions: vec![RecoveryState::Healthy],
                restored_from: None,
                quarantined: None,
            },
            retention: backup::DEFAULT_RETENTION,
        })
    }

    /// What the recovery machine did while opening this handle.
    pub fn recovery_report(&self) -> &RecoveryReport {
        &self.recovery
    }

    /// Path of the primary file; `None` for in-memory databases.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Take a backup snapshot of the primary file now.
    ///
    /// # Errors
    /// Fails for in-memory databases or when the copy fails.
    pub fn backup_now(&self) -> Result<PathBuf> {
        let path = self.path.as_deref().ok_or_else(|| StorageError::BackupFailed {
            path: PathBuf::from(":memory:"),
            message: "in-memory database has no file to back up".into(),
        })?;
        // Flush the WAL so the copied file is self-contained.
        self.conn
            .query_row("PRAGMA wal_checkpoint(TRUNCATE)", [], |_| Ok(()))
            .map_err(StorageError::from)?;
        backup::snapshot(path, self.retention)
    }

    /// Run `f` inside a scoped write transaction. Commits when `f`
    /// returns `Ok`; any error rolls everything back.
    pub fn with_tx<T>(
        &self,
        f: impl FnOnce(&Transaction<'_>) -> Result<T>,
    ) -> Result<T> {
        let tx = self.conn.unchecked_transaction().map_err(StorageError::from)?;
        let out = f(&tx)?;
        tx.commit().map_err(StorageError::from)?;
        Ok(out)
    }

    // === Activities ===

    /// Activities ordered by rank ascending, active first.
    pub fn list_activities(&self, include_inactive: bool) -> Result<Vec<Activity>> {
        let sql = if include_inactive {
            "SELECT id, name, required, plan_mask, rank, active
             FROM activities ORDER BY active DESC, rank ASC"
        } else {
            "SELECT id, name, required, plan_mask, rank, active
             FROM activities WHERE active = 1 ORDER BY rank ASC"
        };
        let mut stmt = self.conn.prepare(sql).map_err(StorageError::from)?;
        let rows = stmt
            .query_map([], activity_from_row)
            .map_err(StorageError::from)?;
        let mut activities = Vec::new();
        for row in rows {
            activities.push(row.map_err(StorageError::from)?);
        }
        Ok(activities)
    }

    /// Look up one activity by id.
    pub fn get_activity(&self, id: i64) -> Result<Option<Activity>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, name, required, plan_mask, rank, active
                 FROM activities WHERE id = ?1",
            )
            .map_err(StorageError::from)?;
        stmt.query_row(params![id], activity_from_row)
            .optional()
            .map_err(|e| StorageError::from(e).into())
    }

    /// Create an activity at the end of the order.
    ///
    /// # Errors
    /// Rejects empty and duplicate names.
    pub fn create_activity(&self, name: &str, required: bool) -> Result<Activity> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        let name = name.to_string();
        self.with_tx(|tx| {
            let max_rank: Option<i64> = tx
                .query_row("SELECT MAX(rank) FROM activities", [], |row| row.get(0))
                .map_err(StorageError::from)?;
            let rank = order::next_rank(max_rank);
            let inserted = tx.execute(
                "INSERT INTO activities (name, required, rank, created_at, active, plan_mask)
                 VALUES (?1, ?2, ?3, ?4, 1, ?5)",
                params![
                    name,
                    required as i64,
                    rank,
                    Utc::now().to_rfc3339(),
                    i64::from(PlanMask::FULL_WEEK.0)
                ],
            );
            match inserted {
                Ok(_) => {}
                Err(e) if is_unique_violation(&e) => {
                    return Err(ValidationError::DuplicateName(name.clone()).into())
                }
                Err(e) => return Err(StorageError::from(e).into()),
            }
            let id = tx.last_insert_rowid();
            debug!(id, name = %name, required, "activity created");
            Ok(Activity {
                id,
                name: name.clone(),
                required,
                plan: PlanMask::FULL_WEEK,
                rank,
                active: true,
            })
        })
    }

    /// Rename an activity.
    ///
    /// # Errors
    /// Rejects empty and duplicate names; unknown ids yield `NotFound`.
    pub fn rename_activity(&self, id: i64, new_name: &str) -> Result<()> {
        let new_name = new_name.trim();
        if new_name.is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        let changed = self.conn.execute(
            "UPDATE activities SET name = ?1 WHERE id = ?2",
            params![new_name, id],
        );
        match changed {
            Ok(0) => Err(crate::error::CoreError::NotFound(id)),
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => {
                Err(ValidationError::DuplicateName(new_name.to_string()).into())
            }
            Err(e) => Err(StorageError::from(e).into()),
        }
    }

    pub fn set_required(&self, id: i64, required: bool) -> Result<()> {
        self.update_flag("UPDATE activities SET required = ?1 WHERE id = ?2", id, required as i64)
    }

    pub fn set_plan(&self, id: i64, plan: PlanMask) -> Result<()> {
        self.update_flag(
            "UPDATE activities SET plan_mask = ?1 WHERE id = ?2",
            id,
            i64::from(plan.0),
        )
    }

    /// Soft delete: hide from the week view, keep history and freeze
    /// the rank.
    pub fn deactivate_activity(&self, id: i64) -> Result<()> {
        let changed = self
            .conn
            .execute("UPDATE activities SET active = 0 WHERE id = ?1", params![id])
            .map_err(StorageError::from)?;
        if changed == 0 {
            return Err(crate::error::CoreError::NotFound(id));
        }
        Ok(())
    }

    fn update_flag(&self, sql: &str, id: i64, value: i64) -> Result<()> {
        let changed = self
            .conn
            .execute(sql, params![value, id])
            .map_err(StorageError::from)?;
        if changed == 0 {
            return Err(crate::error::CoreError::NotFound(id));
        }
        Ok(())
    }

    /// Move an activity to `position` (1-based) within the active
    /// order, shifting only the contiguous range in between. Returns
    /// the refreshed active list.
    pub fn reorder(&self, activity_id: i64, position: usize) -> Result<Vec<Activity>> {
        self.with_tx(|tx| {
            let ordered = active_ranks(tx)?;
            let assignments = order::plan_reorder(&ordered, activity_id, position)?;
            for (id, rank) in &assignments {
                tx.execute(
                    "UPDATE activities SET rank = ?1 WHERE id = ?2",
                    params![rank, id],
                )
                .map_err(StorageError::from)?;
            }
            debug!(activity_id, position, moved = assignments.len(), "activities reordered");
            Ok(())
        })?;
        self.list_activities(false)
    }

    // === Completion marks ===

    /// Last-write-wins upsert of one mark.
    pub fn upsert_mark(&self, activity_id: i64, date: NaiveDate, done: bool) -> Result<()> {
        self.with_tx(|tx| {
            ensure_activity(tx, activity_id)?;
            tx.execute(
                "INSERT INTO completions (activity_id, day, done)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(activity_id, day) DO UPDATE SET done = excluded.done",
                params![activity_id, fmt_day(date), done as i64],
            )
            .map_err(StorageError::from)?;
            Ok(())
        })
    }

    /// Flip the mark for `(activity_id, date)`, creating it on first
    /// touch. Returns the new state.
    pub fn toggle_mark(&self, activity_id: i64, date: NaiveDate) -> Result<bool> {
        self.with_tx(|tx| {
            ensure_activity(tx, activity_id)?;
            let current: Option<i64> = tx
                .query_row(
                    "SELECT done FROM completions WHERE activity_id = ?1 AND day = ?2",
                    params![activity_id, fmt_day(date)],
                    |row| row.get(0),
                )
                .optional()
                .map_err(StorageError::from)?;
            let new_state = !matches!(current, Some(1));
            tx.execute(
                "INSERT INTO completions (activity_id, day, done)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(activity_id, day) DO UPDATE SET done = excluded.done",
                params![activity_id, fmt_day(date), new_state as i64],
            )
            .map_err(StorageError::from)?;
            debug!(activity_id, date = %date, done = new_state, "mark toggled");
            Ok(new_state)
        })
    }

    /// Current mark state, `false` when no record exists.
    pub fn get_mark(&self, activity_id: i64, date: NaiveDate) -> Result<bool> {
        let done: Option<i64> = self
            .conn
            .query_row(
                "SELECT done FROM completions WHERE activity_id = ?1 AND day = ?2",
                params![activity_id, fmt_day(date)],
                |row| row.get(0),
            )
            .optional()
            .map_err(StorageError::from)?;
        Ok(matches!(done, Some(1)))
    }

    /// All marks in `start..=end` keyed by `(activity_id, date)`.
    pub fn marks_in_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<HashMap<(i64, NaiveDate), bool>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT activity_id, day, done FROM completions
                 WHERE day >= ?1 AND day <= ?2",
            )
            .map_err(StorageError::from)?;
        let rows = stmt
            .query_map(params![fmt_day(start), fmt_day(end)], |row| {
                let id: i64 = row.get(0)?;
                let day: String = row.get(1)?;
                let done: i64 = row.get(2)?;
                Ok((id, day, done))
            })
            .map_err(StorageError::from)?;

        let mut map = HashMap::new();
        for row in rows {
            let (id, day, done) = row.map_err(StorageError::from)?;
            map.insert((id, parse_day(&day)?), done == 1);
        }
        Ok(map)
    }

    /// Delete every activity and mark. Destructive, used by the
    /// explicit full-reset command only.
    pub fn clear_all(&self) -> Result<()> {
        self.with_tx(|tx| {
            tx.execute("DELETE FROM completions", [])
                .map_err(StorageError::from)?;
            tx.execute("DELETE FROM activities", [])
                .map_err(StorageError::from)?;
            Ok(())
        })
    }
}

fn configure(conn: &Connection) -> Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")
        .map_err(StorageError::from)?;
    // journal_mode returns a row; query instead of execute.
    let _mode: String = conn
        .query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))
        .map_err(StorageError::from)?;
    conn.execute_batch("PRAGMA synchronous = NORMAL;")
        .map_err(StorageError::from)?;
    Ok(())
}

fn base_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS activities (
            id         INTEGER PRIMARY KEY AUTOINCREMENT,
            name       TEXT NOT NULL UNIQUE,
            required   INTEGER NOT NULL DEFAULT 0 CHECK (required IN (0, 1)),
            rank       INTEGER NOT NULL,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS completions (
            activity_id INTEGER NOT NULL,
            day         TEXT NOT NULL,
            done        INTEGER NOT NULL CHECK (done IN (0, 1)),
            PRIMARY KEY (activity_id, day),
            FOREIGN KEY (activity_id) REFERENCES activities(id)
        );

        CREATE INDEX IF NOT EXISTS idx_completions_day ON completions(day);",
    )
    .map_err(StorageError::from)?;
    Ok(())
}

fn activity_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Activity> {
    let plan: i64 = row.get(3)?;
    Ok(Activity {
        id: row.get(0)?,
        name: row.get(1)?,
        required: row.get::<_, i64>(2)? == 1,
        plan: PlanMask(plan as u8),
        rank: row.get(4)?,
        active: row.get::<_, i64>(5)? == 1,
    })
}

fn ensure_activity(conn: &Connection, id: i64) -> Result<()> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM activities WHERE id = ?1",
            params![id],
            |row| row.get(0),
        )
        .optional()
        .map_err(StorageError::from)?;
    if found.is_none() {
        return Err(crate::error::CoreError::NotFound(id));
    }
    Ok(())
}

fn active_ranks(conn: &Connection) -> Result<Vec<(i64, i64)>> {
    let mut stmt = conn
        .prepare("SELECT id, rank FROM activities WHERE active = 1 ORDER BY rank ASC")
        .map_err(StorageError::from)?;
    let rows = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
        .map_err(StorageError::from)?;
    let mut ordered = Vec::new();
    for row in rows {
        ordered.push(row.map_err(StorageError::from)?);
    }
    Ok(ordered)
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

fn fmt_day(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn parse_day(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| StorageError::QueryFailed(format!("bad day column '{s}': {e}")).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn create_assigns_increasing_ranks() {
        let db = HabitDb::open_memory().unwrap();
        let a = db.create_activity("Run", true).unwrap();
        let b = db.create_activity("Read", false).unwrap();
        assert_eq!(a.rank, 1);
        assert_eq!(b.rank, 2);
        assert!(a.id != b.id);
    }

    #[test]
    fn duplicate_name_is_rejected() {
        let db = HabitDb::open_memory().unwrap();
        db.create_activity("Run", true).unwrap();
        let err = db.create_activity("Run", false).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::DuplicateName(_))
        ));
        // The failed insert must not burn a rank.
        let next = db.create_activity("Read", false).unwrap();
        assert_eq!(next.rank, 2);
    }

    #[test]
    fn empty_name_is_rejected() {
        let db = HabitDb::open_memory().unwrap();
        let err = db.create_activity("   ", false).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::EmptyName)
        ));
    }

    #[test]
    fn toggle_flips_and_persists() {
        let db = HabitDb::open_memory().unwrap();
        let a = db.create_activity("Run", true).unwrap();
        let d = day("2024-01-01");
        assert!(db.toggle_mark(a.id, d).unwrap());
        assert!(db.get_mark(a.id, d).unwrap());
        assert!(!db.toggle_mark(a.id, d).unwrap());
        assert!(!db.get_mark(a.id, d).unwrap());
    }

    #[test]
    fn mark_on_unknown_activity_is_not_found() {
        let db = HabitDb::open_memory().unwrap();
        let err = db.toggle_mark(99, day("2024-01-01")).unwrap_err();
        assert!(matches!(err, CoreError::NotFound(99)));
    }

    #[test]
    fn deactivated_activity_keeps_marks() {
        let db = HabitDb::open_memory().unwrap();
        let a = db.create_activity("Run", true).unwrap();
        let d = day("2024-01-01");
        db.upsert_mark(a.id, d, true).unwrap();
        db.deactivate_activity(a.id).unwrap();

        assert!(db.list_activities(false).unwrap().is_empty());
        let all = db.list_activities(true).unwrap();
        assert_eq!(all.len(), 1);
        assert!(!all[0].active);
        assert_eq!(all[0].rank, a.rank);
        assert!(db.get_mark(a.id, d).unwrap());
    }

    #[test]
    fn deactivate_unknown_id_is_not_found() {
        let db = HabitDb::open_memory().unwrap();
        let a = db.create_activity("Run", true).unwrap();
        let err = db.deactivate_activity(a.id + 1).unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)));
        // The known id still deactivates normally.
        db.deactivate_activity(a.id).unwrap();
        assert!(db.list_activities(false).unwrap().is_empty());
    }

    #[test]
    fn marks_in_range_is_window_bounded() {
        let db = HabitDb::open_memory().unwrap();
        let a = db.create_activity("Run", true).unwrap();
        db.upsert_mark(a.id, day("2024-01-01"), true).unwrap();
        db.upsert_mark(a.id, day("2024-01-08"), true).unwrap();

        let map = db
            .marks_in_range(day("2024-01-01"), day("2024-01-07"))
            .unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(&(a.id, day("2024-01-01"))), Some(&true));
    }

    #[test]
    fn failed_transaction_rolls_back() {
        let db = HabitDb::open_memory().unwrap();
        let a = db.create_activity("Run", true).unwrap();
        let d = day("2024-01-01");
        let result: Result<()> = db.with_tx(|tx| {
            tx.execute(
                "INSERT INTO completions (activity_id, day, done) VALUES (?1, ?2, 1)
                 ON CONFLICT(activity_id, day) DO UPDATE SET done = excluded.done",
                params![a.id, fmt_day(d)],
            )
            .map_err(StorageError::from)?;
            Err(CoreError::NotFound(0))
        });
        assert!(result.is_err());
        assert!(!db.get_mark(a.id, d).unwrap());
    }

    #[test]
    fn clear_all_empties_both_tables() {
        let db = HabitDb::open_memory().unwrap();
        let a = db.create_activity("Run", true).unwrap();
        db.upsert_mark(a.id, day("2024-01-01"), true).unwrap();
        db.clear_all().unwrap();
        assert!(db.list_activities(true).unwrap().is_empty());
        assert!(db
            .marks_in_range(day("2024-01-01"), day("2024-01-01"))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn rename_validates_and_updates() {
        let db = HabitDb::open_memory().unwrap();
        let a = db.create_activity("Run", true).unwrap();
        db.create_activity("Read", false).unwrap();

        db.rename_activity(a.id, "Jog").unwrap();
        assert_eq!(db.get_activity(a.id).unwrap().unwrap().name, "Jog");

        let err = db.rename_activity(a.id, "Read").unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::DuplicateName(_))
        ));
        let err = db.rename_activity(12345, "X").unwrap_err();
        assert!(matches!(err, CoreError::NotFound(12345)));
    }
}
