//! # Habitrack Core Library
//!
//! This library provides the core business logic for the Habitrack habit
//! tracker. It implements a CLI-first philosophy where all operations are
//! available via a standalone CLI binary, with any GUI being a thin layer
//! over the same core library.
//!
//! ## Architecture
//!
//! - **Storage**: SQLite-based activity and completion persistence with
//!   corruption auto-recovery and rotating backups, plus TOML-based
//!   configuration
//! - **Ordering**: rank-based manual ordering of the active activity list
//! - **Ledger**: per-day completion marks and Monday-based week views
//! - **Stats**: streaks and trailing-window ratios derived on demand
//!
//! ## Key Components
//!
//! - [`Tracker`]: Application façade over one open database
//! - [`HabitDb`]: Activity and completion persistence
//! - [`Config`]: Application configuration management

pub mod error;
pub mod ledger;
pub mod model;
pub mod order;
pub mod stats;
pub mod storage;
pub mod tracker;

pub use error::{ConfigError, CoreError, Result, StorageError, ValidationError};
pub use model::{
    Activity, ActivityWindowStats, DayCell, PlanMask, StatsSnapshot, StrongestWeekday,
    WeekProgress, WeekRow, WeekView,
};
pub use storage::{Config, HabitDb, IntegrityProbe, RecoveryReport, RecoveryState};
pub use tracker::Tracker;
