use std::fmt::Write as _;

use futdb_warehouse::calendar::Calendar;
use futdb_warehouse::Warehouse;

use crate::cli::DryRunArgs;
use crate::error::CliError;
use crate::output::CommandOutput;

pub fn sync(warehouse: &Warehouse, args: &DryRunArgs) -> Result<CommandOutput, CliError> {
    let report = Calendar::new(warehouse).sync(args.dry_run)?;

    let verb = if report.dry_run { "would add" } else { "added" };
    let mut text = format!("{verb} {} trading days", report.new_days);
    if let (Some(first), Some(last)) = (report.first_new_day, report.last_new_day) {
        let _ = write!(text, " ({first} .. {last})");
    }
    let _ = write!(text, "; calendar holds {} days", report.total_days);

    Ok(CommandOutput::new(serde_json::to_value(&report)?, text))
}

pub fn prune(warehouse: &Warehouse, args: &DryRunArgs) -> Result<CommandOutput, CliError> {
    let report = Calendar::new(warehouse).prune(args.dry_run)?;

    let verb = if report.dry_run { "would remove" } else { "removed" };
    let mut text = format!("{verb} {} orphaned calendar days", report.removed_days.len());
    for day in &report.removed_days {
        let _ = write!(text, "\n  {day}");
    }
    let _ = write!(text, "\ncalendar holds {} days", report.total_days);

    Ok(CommandOutput::new(serde_json::to_value(&report)?, text))
}
