//! Week view commands for CLI.

use chrono::{Local, NaiveDate};
use clap::Subcommand;
use habitrack_core::Tracker;

#[derive(Subcommand)]
pub enum WeekAction {
    /// Show the week grid for the week containing a date
    Show {
        /// Any day of the week, defaults to today (YYYY-MM-DD)
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Show done/planned totals for the week containing a date
    Progress {
        /// Any day of the week, defaults to today (YYYY-MM-DD)
        #[arg(long)]
        date: Option<NaiveDate>,
    },
}

pub fn run(action: WeekAction) -> Result<(), Box<dyn std::error::Error>> {
    let t = Tracker::open_default()?;

    match action {
        WeekAction::Show { date } => {
            let date = date.unwrap_or_else(|| Local::now().date_naive());
            let view = t.week_view(date)?;
            println!("{}", serde_json::to_string_pretty(&view)?);
        }
        WeekAction::Progress { date } => {
            let date = date.unwrap_or_else(|| Local::now().date_naive());
            let progress = t.week_progress(date)?;
            println!("{}", serde_json::to_string_pretty(&progress)?);
        }
    }
    Ok(())
}
