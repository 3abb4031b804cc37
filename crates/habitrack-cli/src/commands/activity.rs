//! Activity management commands for CLI.

use chrono::Weekday;
use clap::Subcommand;
use habitrack_core::{tracker, PlanMask, Tracker};

#[derive(Subcommand)]
pub enum ActivityAction {
    /// Create a new activity at the end of the list
    Add {
        /// Activity name
        name: String,
        /// Count this activity toward the daily streak
        #[arg(long)]
        required: bool,
    },
    /// List activities in manual order
    List {
        /// Include deactivated activities
        #[arg(long)]
        all: bool,
        /// Case-insensitive name filter
        #[arg(long)]
        filter: Option<String>,
    },
    /// Rename an activity
    Rename {
        /// Activity ID
        id: i64,
        /// New name
        name: String,
    },
    /// Mark an activity as required
    Require {
        /// Activity ID
        id: i64,
    },
    /// Mark an activity as optional
    Optional {
        /// Activity ID
        id: i64,
    },
    /// Set the weekly plan, e.g. "mon,wed,fri", "all" or "none"
    Plan {
        /// Activity ID
        id: i64,
        /// Comma-separated weekdays
        days: String,
    },
    /// Move an activity to a 1-based position in the list
    Move {
        /// Activity ID
        id: i64,
        /// Target position, 1 is the top
        position: usize,
    },
    /// Hide an activity, keeping its history
    Deactivate {
        /// Activity ID
        id: i64,
    },
}

pub fn run(action: ActivityAction) -> Result<(), Box<dyn std::error::Error>> {
    let t = Tracker::open_default()?;

    match action {
        ActivityAction::Add { name, required } => {
            let activity = t.create_activity(&name, required)?;
            println!("Activity created: {}", activity.id);
            println!("{}", serde_json::to_string_pretty(&activity)?);
        }
        ActivityAction::List { all, filter } => {
            let activities = t.list_activities(all)?;
            let activities = match filter {
                Some(q) => tracker::filter_by_name(&activities, &q),
                None => activities,
            };
            println!("{}", serde_json::to_string_pretty(&activities)?);
        }
        ActivityAction::Rename { id, name } => {
            t.rename_activity(id, &name)?;
            println!("Activity renamed: {id}");
        }
        ActivityAction::Require { id } => {
            t.set_required(id, true)?;
            println!("Activity marked required: {id}");
        }
        ActivityAction::Optional { id } => {
            t.set_required(id, false)?;
            println!("Activity marked optional: {id}");
        }
        ActivityAction::Plan { id, days } => {
            let plan = parse_plan(&days)?;
            t.set_plan(id, plan)?;
            println!("Plan updated: {id}");
        }
        ActivityAction::Move { id, position } => {
            let order = t.reorder(id, position)?;
            println!("{}", serde_json::to_string_pretty(&order)?);
        }
        ActivityAction::Deactivate { id } => {
            t.deactivate_activity(id)?;
            println!("Activity deactivated: {id}");
        }
    }
    Ok(())
}

fn parse_plan(spec: &str) -> Result<PlanMask, String> {
    match spec.trim().to_lowercase().as_str() {
        "all" => return Ok(PlanMask::FULL_WEEK),
        "none" => return Ok(PlanMask(0)),
        _ => {}
    }
    let mut plan = PlanMask(0);
    for part in spec.split(',') {
        let day = match part.trim().to_lowercase().as_str() {
            "mon" | "monday" => Weekday::Mon,
            "tue" | "tuesday" => Weekday::Tue,
            "wed" | "wednesday" => Weekday::Wed,
            "thu" | "thursday" => Weekday::Thu,
            "fri" | "friday" => Weekday::Fri,
            "sat" | "saturday" => Weekday::Sat,
            "sun" | "sunday" => Weekday::Sun,
            other => return Err(format!("unknown weekday: {other}")),
        };
        plan = plan.with_day(day, true);
    }
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_plan_accepts_names_and_keywords() {
        assert_eq!(parse_plan("all").unwrap(), PlanMask::FULL_WEEK);
        assert_eq!(parse_plan("none").unwrap(), PlanMask(0));
        let plan = parse_plan("mon, wed,FRI").unwrap();
        assert!(plan.contains(Weekday::Mon));
        assert!(plan.contains(Weekday::Wed));
        assert!(plan.contains(Weekday::Fri));
        assert!(!plan.contains(Weekday::Tue));
        assert!(parse_plan("mon,funday").is_err());
    }
}
