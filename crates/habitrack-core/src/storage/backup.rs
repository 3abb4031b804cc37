//! Timestamped backup snapshots of the primary database file.
//!
//! Backups live alongside the primary as `<stem>_<timestamp>.db.bak`
//! and rotate with a fixed retention count, oldest evicted first. The
//! timestamp format sorts lexicographically, so file names double as
//! the rotation order.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::{debug, info};

use crate::error::{CoreError, Result, StorageError};

/// Default number of backup snapshots kept per database.
pub const DEFAULT_RETENTION: usize = 5;

const BACKUP_SUFFIX: &str = ".db.bak";
const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Copy the primary file to a fresh timestamped sibling and prune old
/// snapshots down to `retention`.
///
/// # Errors
/// Returns an error if the primary cannot be copied or pruning fails.
pub fn snapshot(primary: &Path, retention: usize) -> Result<PathBuf> {
    let stem = file_stem(primary)?;
    let ts = Local::now().format(TIMESTAMP_FORMAT);
    let name = format!("{stem}_{ts}{BACKUP_SUFFIX}");
    let target = primary.with_file_name(name);

    fs::copy(primary, &target).map_err(|e| StorageError::BackupFailed {
        path: primary.to_path_buf(),
        message: e.to_string(),
    })?;
    info!(backup = %target.display(), "database snapshot taken");

    prune(primary, retention)?;
    Ok(target)
}

/// List existing backups of `primary`, newest first.
///
/// # Errors
/// Returns an error if the parent directory cannot be read.
pub fn list_backups(primary: &Path) -> Result<Vec<PathBuf>> {
    let stem = file_stem(primary)?;
    let prefix = format!("{stem}_");
    let dir = primary.parent().unwrap_or_else(|| Path::new("."));

    let mut found = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with(&prefix) && name.ends_with(BACKUP_SUFFIX) {
            found.push(entry.path());
        }
    }
    // Newest first: timestamps sort lexicographically.
    found.sort();
    found.reverse();
    Ok(found)
}

fn prune(primary: &Path, retention: usize) -> Result<()> {
    let backups = list_backups(primary)?;
    for stale in backups.iter().skip(retention.max(1)) {
        debug!(backup = %stale.display(), "evicting stale backup");
        fs::remove_file(stale)?;
    }
    Ok(())
}

fn file_stem(primary: &Path) -> Result<String> {
    primary
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .ok_or_else(|| {
            CoreError::Storage(StorageError::BackupFailed {
                path: primary.to_path_buf(),
                message: "primary path has no file name".into(),
            })
        })
}
