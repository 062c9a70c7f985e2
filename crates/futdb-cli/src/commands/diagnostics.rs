use futdb_core::CanonicalConfig;
use futdb_warehouse::diagnostics::{write_json_report, Diagnostics, DiagnosticsOptions};
use futdb_warehouse::WarehouseConfig;
use tracing::info;

use crate::cli::RunDiagnosticsArgs;
use crate::error::CliError;
use crate::output::CommandOutput;

pub fn run(
    warehouse_config: &WarehouseConfig,
    config: CanonicalConfig,
    args: &RunDiagnosticsArgs,
) -> Result<CommandOutput, CliError> {
    let options = DiagnosticsOptions {
        start: args.start,
        end: args.end,
        window_days: args.window_days,
    };
    let report = Diagnostics::new(config, options).run_at(warehouse_config)?;

    if let Some(path) = &args.json_out {
        write_json_report(&report, path)?;
        info!(path = %path.display(), "wrote diagnostics report");
    }

    let exit_code = report.exit_code();
    Ok(CommandOutput::new(serde_json::to_value(&report)?, report.render_text())
        .with_exit_code(exit_code))
}
