use std::fmt::Write as _;

use futdb_core::{CanonicalConfig, MappingDiff};
use futdb_warehouse::canonical::{diff_against_db, sync_canonical};
use futdb_warehouse::Warehouse;

use crate::cli::DryRunArgs;
use crate::error::CliError;
use crate::output::CommandOutput;

pub fn run(
    warehouse: &Warehouse,
    config: &CanonicalConfig,
    args: &DryRunArgs,
) -> Result<CommandOutput, CliError> {
    if args.dry_run {
        let diff = diff_against_db(warehouse.connection(), config)?;
        let mut text = describe_diff(&diff);
        text.push_str("\ndry run: nothing written");
        let data = serde_json::json!({ "dry_run": true, "diff": diff });
        return Ok(CommandOutput::new(data, text));
    }

    let report = sync_canonical(warehouse, config)?;
    let mut text = describe_diff(&report.diff_before);
    let _ = write!(
        text,
        "\nwrote {} roots, removed {}",
        report.roots_written, report.roots_removed
    );
    Ok(CommandOutput::new(serde_json::to_value(&report)?, text))
}

fn describe_diff(diff: &MappingDiff) -> String {
    if diff.is_clean() {
        return String::from("database mapping matches config");
    }
    let mut text = format!("{} differences between config and database", diff.drift_count());
    for root in &diff.missing_in_db {
        let _ = write!(text, "\n  missing in db: {root}");
    }
    for root in &diff.extra_in_db {
        let _ = write!(text, "\n  extra in db: {root}");
    }
    for mismatch in &diff.mismatches {
        let _ = write!(
            text,
            "\n  {} {}: config={} db={}",
            mismatch.root, mismatch.field, mismatch.expected, mismatch.actual
        );
    }
    text
}
