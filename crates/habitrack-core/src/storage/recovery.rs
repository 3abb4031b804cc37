//! Corruption detection and auto-recovery for the primary database.
//!
//! Recovery is an explicit state machine rather than ad hoc retries:
//!
//! ```text
//! HEALTHY -> SUSPECTED   integrity probe fails on the primary file
//! SUSPECTED -> RESTORING corrupt file quarantined, backups scanned
//! RESTORING -> HEALTHY   a valid backup was copied into place
//! RESTORING -> FAILED    no backup passes the probe
//! ```
//!
//! The integrity probe is a trait so tests can inject a failing probe
//! instead of corrupting real files. The corrupt original is renamed
//! aside (`<stem>_corrupt_<timestamp>.db`), never deleted.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use rusqlite::Connection;
use serde::Serialize;
use tracing::{info, warn};

use super::backup;
use crate::error::Result;

/// States of the corruption-recovery machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryState {
    Healthy,
    Suspected,
    Restoring,
    Failed,
}

/// Outcome of one recovery pass, kept by the database handle for
/// diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct RecoveryReport {
    /// Every state entered, in order, starting with `Healthy`.
    pub transitions: Vec<RecoveryState>,
    /// Backup the primary was restored from, if any.
    pub restored_from: Option<PathBuf>,
    /// Where the corrupt original was renamed to, if any.
    pub quarantined: Option<PathBuf>,
}

impl RecoveryReport {
    fn healthy() -> Self {
        Self {
            transitions: vec![RecoveryState::Healthy],
            restored_from: None,
            quarantined: None,
        }
    }

    fn enter(&mut self, state: RecoveryState) {
        self.transitions.push(state);
    }

    /// Final state of the pass.
    pub fn state(&self) -> RecoveryState {
        self.transitions
            .last()
            .copied()
            .unwrap_or(RecoveryState::Healthy)
    }
}

/// Structural integrity check for a database file.
pub trait IntegrityProbe {
    /// True when the file at `path` is structurally sound.
    fn check(&self, path: &Path) -> bool;
}

/// Default probe: open the file and run `PRAGMA integrity_check`.
pub struct SqliteIntegrityProbe;

impl IntegrityProbe for SqliteIntegrityProbe {
    fn check(&self, path: &Path) -> bool {
        let Ok(conn) = Connection::open(path) else {
            return false;
        };
        conn.query_row("PRAGMA integrity_check", [], |row| row.get::<_, String>(0))
            .map(|verdict| verdict == "ok")
            .unwrap_or(false)
    }
}

/// Run the recovery machine against `primary` before it is opened.
///
/// A missing file is healthy (fresh database). On corruption the
/// primary is quarantined and the newest valid backup restored; the
/// report carries the full transition history so callers can inspect
/// what happened. A `Failed` final state leaves no primary file in
/// place and the caller must refuse to open.
///
/// # Errors
/// Returns an error only for filesystem failures; a corrupt database
/// with no valid backup is reported through the `Failed` state.
pub fn run(primary: &Path, probe: &dyn IntegrityProbe) -> Result<RecoveryReport> {
    let mut report = RecoveryReport::healthy();

    if !primary.exists() || probe.check(primary) {
        return Ok(report);
    }

    report.enter(RecoveryState::Suspected);
    warn!(db = %primary.display(), "database failed integrity check");

    let quarantine = quarantine_path(primary);
    fs::rename(primary, &quarantine)?;
    // WAL sidecars belong to the quarantined file; a restored backup
    // must never meet another database's journal.
    for suffix in ["-wal", "-shm"] {
        let sidecar = sidecar_path(primary, suffix);
        if sidecar.exists() {
            fs::rename(&sidecar, sidecar_path(&quarantine, suffix))?;
        }
    }
    warn!(quarantine = %quarantine.display(), "corrupt database quarantined");
    report.quarantined = Some(quarantine);

    report.enter(RecoveryState::Restoring);
    for candidate in backup::list_backups(primary)? {
        if !probe.check(&candidate) {
            warn!(backup = %candidate.display(), "skipping invalid backup");
            continue;
        }
        fs::copy(&candidate, primary)?;
        if probe.check(primary) {
            info!(backup = %candidate.display(), "database restored from backup");
            report.restored_from = Some(candidate);
            report.enter(RecoveryState::Healthy);
            return Ok(report);
        }
        // The copy itself failed verification; clear it and try older.
        fs::remove_file(primary)?;
    }

    report.enter(RecoveryState::Failed);
    warn!(db = %primary.display(), "no valid backup found, recovery failed");
    Ok(report)
}

/// `habitrack.db` + `-wal` = `habitrack.db-wal`, SQLite's naming.
fn sidecar_path(db_file: &Path, suffix: &str) -> PathBuf {
    let name = db_file
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    db_file.with_file_name(format!("{name}{suffix}"))
}

fn quarantine_path(primary: &Path) -> PathBuf {
    let stem = primary
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "habitrack".to_string());
    let ts = Local::now().format("%Y%m%d_%H%M%S");
    primary.with_file_name(format!("{stem}_corrupt_{ts}.db"))
}
