//! Core error types for habitrack-core.
//!
//! This module defines the error hierarchy using thiserror. Validation
//! problems, storage failures, and unknown-activity lookups are kept as
//! separate types so callers can react to each class differently.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for habitrack-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Storage-related errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Operation referenced an unknown activity
    #[error("No such activity: {0}")]
    NotFound(i64),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Storage-specific errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Failed to open the database file
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed (the enclosing transaction is rolled back)
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// Backup snapshot could not be taken
    #[error("Backup failed for {path}: {message}")]
    BackupFailed { path: PathBuf, message: String },

    /// Corruption recovery exhausted every backup candidate
    #[error("Database at {path} is corrupt and no valid backup exists")]
    Unrecoverable { path: PathBuf },

    /// Database is locked
    #[error("Database is locked")]
    Locked,
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),
}

/// Validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Activity name is empty after trimming
    #[error("Activity name must not be empty")]
    EmptyName,

    /// Activity name already taken
    #[error("An activity named '{0}' already exists")]
    DuplicateName(String),

    /// Completion mark date outside the accepted calendar range
    #[error("Date {date} is outside the accepted range {min}..={max}")]
    DateOutOfBounds {
        date: chrono::NaiveDate,
        min: chrono::NaiveDate,
        max: chrono::NaiveDate,
    },

    /// Reorder target position outside the active list
    #[error("Position {position} is out of range for {len} active activities")]
    PositionOutOfRange { position: usize, len: usize },
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(inner, _msg) => {
                if inner.code == rusqlite::ErrorCode::DatabaseLocked {
                    StorageError::Locked
                } else {
                    StorageError::QueryFailed(err.to_string())
                }
            }
            _ => StorageError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Storage(err.into())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
