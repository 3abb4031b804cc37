pub mod backup;
mod config;
pub mod database;
pub mod migrations;
pub mod recovery;

pub use config::Config;
pub use database::HabitDb;
pub use recovery::{IntegrityProbe, RecoveryReport, RecoveryState, SqliteIntegrityProbe};

use std::path::PathBuf;

use crate::error::Result;

/// Returns `~/.config/habitrack[-dev]/` based on HABITRACK_ENV.
///
/// Set HABITRACK_ENV=dev to use a separate development data directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> Result<PathBuf> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("HABITRACK_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("habitrack-dev")
    } else {
        base_dir.join("habitrack")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
