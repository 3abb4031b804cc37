//! Completion mark commands for CLI.

use chrono::{Local, NaiveDate};
use clap::Subcommand;
use habitrack_core::Tracker;

#[derive(Subcommand)]
pub enum MarkAction {
    /// Flip one activity's mark for a day
    Toggle {
        /// Activity ID
        id: i64,
        /// Day to mark, defaults to today (YYYY-MM-DD)
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Mark or clear every planned activity for a day
    Day {
        /// Day to set, defaults to today (YYYY-MM-DD)
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Clear the marks instead of setting them
        #[arg(long)]
        clear: bool,
    },
}

pub fn run(action: MarkAction) -> Result<(), Box<dyn std::error::Error>> {
    let t = Tracker::open_default()?;

    match action {
        MarkAction::Toggle { id, date } => {
            let date = date.unwrap_or_else(|| Local::now().date_naive());
            let done = t.toggle_day(id, date)?;
            println!("{date} activity {id}: {}", if done { "done" } else { "not done" });
        }
        MarkAction::Day { date, clear } => {
            let date = date.unwrap_or_else(|| Local::now().date_naive());
            let touched = t.set_day(date, !clear)?;
            println!(
                "{date}: {} {touched} planned activities",
                if clear { "cleared" } else { "marked" }
            );
        }
    }
    Ok(())
}
