use futdb_warehouse::health::{write_health_report, HealthOptions};
use futdb_warehouse::Warehouse;

use crate::cli::HealthReportArgs;
use crate::error::CliError;
use crate::output::CommandOutput;

pub fn run(warehouse: &Warehouse, args: &HealthReportArgs) -> Result<CommandOutput, CliError> {
    let options = HealthOptions {
        start: args.start,
        end: args.end,
        window_days: args.window_days,
    };
    let data = write_health_report(warehouse, &options, &args.out)?;

    let text = format!(
        "wrote {}: {} roots over {} days ({} .. {}), {:.1}% root-day coverage",
        args.out.display(),
        data.roots.len(),
        data.days.len(),
        data.window.start,
        data.window.end,
        data.overall_coverage_pct
    );
    let json = serde_json::json!({
        "out": args.out.display().to_string(),
        "window": data.window,
        "days": data.days.len(),
        "expected_roots_per_day": data.expected_roots_per_day,
        "overall_coverage_pct": data.overall_coverage_pct,
        "roots": data.roots,
    });
    Ok(CommandOutput::new(json, text))
}
