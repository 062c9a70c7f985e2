mod calendar;
mod canonical;
mod diagnostics;
mod health;
mod rolls;
mod symbols;

use futdb_core::{CanonicalConfig, YearResolution};
use futdb_warehouse::{Warehouse, WarehouseConfig};
use tracing::debug;

use crate::cli::{Cli, Command};
use crate::error::CliError;
use crate::output::CommandOutput;

pub fn run(cli: &Cli) -> Result<CommandOutput, CliError> {
    match &cli.command {
        Command::SyncCalendar(args) => calendar::sync(&open_warehouse(cli, args.dry_run)?, args),
        Command::PruneCalendar(args) => calendar::prune(&open_warehouse(cli, args.dry_run)?, args),
        Command::DetectRolls(args) => rolls::run(&open_warehouse(cli, args.summary)?, args),
        Command::SyncCanonical(args) => {
            let config = load_config(cli)?;
            canonical::run(&open_warehouse(cli, args.dry_run)?, &config, args)
        }
        Command::RunDiagnostics(args) => {
            diagnostics::run(&warehouse_config(cli), load_config(cli)?, args)
        }
        Command::RenderHealthReport(args) => health::run(&open_warehouse(cli, true)?, args),
        Command::ParseSymbol(args) => Ok(symbols::run(args, year_resolution(cli))?),
    }
}

fn warehouse_config(cli: &Cli) -> WarehouseConfig {
    let config = WarehouseConfig::default();
    match &cli.db_path {
        Some(path) => config.with_db_path(path.clone()),
        None => config,
    }
}

/// Read-only handles never create or migrate the database.
fn open_warehouse(cli: &Cli, read_only: bool) -> Result<Warehouse, CliError> {
    let config = warehouse_config(cli);
    debug!(db_path = %config.db_path.display(), read_only, "opening warehouse");
    let warehouse = if read_only {
        Warehouse::open_read_only(&config)?
    } else {
        Warehouse::open(&config)?
    };
    Ok(warehouse)
}

fn load_config(cli: &Cli) -> Result<CanonicalConfig, CliError> {
    Ok(CanonicalConfig::load(&cli.config)?)
}

fn year_resolution(cli: &Cli) -> YearResolution {
    cli.reference_year
        .map_or_else(YearResolution::current, YearResolution::for_reference_year)
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    const CONFIG: &str = "[roots.ES]\ncontract_series = \"ES_FRONT_CALENDAR_2D\"\n";

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("futdb").chain(args.iter().copied())).expect("args")
    }

    #[test]
    fn diagnostics_exit_code_follows_the_report() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = dir.path().join("canonical_series.toml");
        std::fs::write(&config, CONFIG).expect("config");
        let db = dir.path().join("market.duckdb");
        let json_out = dir.path().join("out").join("diagnostics.json");
        let (config, db, json_out) = (
            config.to_string_lossy().into_owned(),
            db.to_string_lossy().into_owned(),
            json_out.to_string_lossy().into_owned(),
        );

        let synced = run(&cli(&["--db-path", &db, "--config", &config, "sync-canonical"]))
            .expect("sync-canonical");
        assert_eq!(synced.exit_code, 0);
        assert_eq!(synced.data["roots_written"], 1);

        let report = run(&cli(&[
            "--db-path",
            &db,
            "--config",
            &config,
            "run-diagnostics",
            "--json-out",
            &json_out,
        ]))
        .expect("run-diagnostics");
        assert_eq!(report.exit_code, 0);
        assert_eq!(report.data["summary"]["overall_status"], "PASS");
        assert!(std::path::Path::new(&json_out).exists());

        let missing = dir.path().join("absent.duckdb").to_string_lossy().into_owned();
        let report = run(&cli(&["--db-path", &missing, "--config", &config, "run-diagnostics"]))
            .expect("run-diagnostics");
        assert_eq!(report.exit_code, 2);
    }

    #[test]
    fn dry_runs_need_an_existing_database() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = dir.path().join("absent.duckdb").to_string_lossy().into_owned();
        let err = run(&cli(&["--db-path", &db, "sync-calendar", "--dry-run"]))
            .err()
            .expect("missing database");
        assert_eq!(err.exit_code(), 1);
        assert!(!dir.path().join("absent.duckdb").exists());
    }
}
