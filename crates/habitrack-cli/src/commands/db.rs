//! Database maintenance commands for CLI.

use clap::Subcommand;
use habitrack_core::Tracker;

#[derive(Subcommand)]
pub enum DbAction {
    /// Print the path of the primary database file
    Path,
    /// Open the database and report what the recovery machine did
    Check,
    /// Take a backup snapshot now
    Backup,
    /// Delete every activity and mark
    Reset {
        /// Confirm the reset
        #[arg(long)]
        yes: bool,
    },
}

pub fn run(action: DbAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        DbAction::Path => {
            let t = Tracker::open_default()?;
            match t.db().path() {
                Some(path) => println!("{}", path.display()),
                None => println!(":memory:"),
            }
        }
        DbAction::Check => {
            let t = Tracker::open_default()?;
            let report = t.db().recovery_report();
            println!("{}", serde_json::to_string_pretty(report)?);
        }
        DbAction::Backup => {
            let t = Tracker::open_default()?;
            let path = t.db().backup_now()?;
            println!("Backup written: {}", path.display());
        }
        DbAction::Reset { yes } => {
            if !yes {
                eprintln!("refusing to reset without --yes");
                std::process::exit(1);
            }
            let t = Tracker::open_default()?;
            t.clear_all()?;
            println!("database reset");
        }
    }
    Ok(())
}
