pub mod activity;
pub mod config;
pub mod db;
pub mod mark;
pub mod stats;
pub mod week;
