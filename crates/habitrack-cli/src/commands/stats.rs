//! Statistics commands for CLI.

use chrono::{Local, NaiveDate};
use clap::Subcommand;
use habitrack_core::Tracker;

#[derive(Subcommand)]
pub enum StatsAction {
    /// Streak, window ratios and per-activity counts
    Show {
        /// Reference date, defaults to today (YYYY-MM-DD)
        #[arg(long)]
        date: Option<NaiveDate>,
    },
}

pub fn run(action: StatsAction) -> Result<(), Box<dyn std::error::Error>> {
    let t = Tracker::open_default()?;

    match action {
        StatsAction::Show { date } => {
            let reference = date.unwrap_or_else(|| Local::now().date_naive());
            let snapshot = t.stats(reference)?;
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        }
    }
    Ok(())
}
