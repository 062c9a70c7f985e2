//! CLI argument definitions for futdb.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `sync-calendar` | Add observed trading dates to `dim_session` |
//! | `prune-calendar` | Remove calendar days no longer backed by bars |
//! | `detect-rolls` | Recompute roll events for a root or every series |
//! | `sync-canonical` | Mirror the canonical mapping config into the database |
//! | `run-diagnostics` | Post-ingest checks with CI exit codes |
//! | `render-health-report` | Static HTML/SVG coverage report |
//! | `parse-symbol` | Parse outright or continuous symbols |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--db-path` | `$FUTDB_DB_PATH` or `$FUTDB_HOME/market.duckdb` | Database file |
//! | `--config` | `configs/canonical_series.toml` | Canonical mapping config |
//! | `--format` | `text` | Output format (text, json) |
//! | `--pretty` | `false` | Pretty-print JSON output |
//! | `--reference-year` | current UTC year | Decade anchor for single-digit years |
//!
//! # Exit Codes
//!
//! `0` success (diagnostics: pass or warnings), `2` diagnostics hard
//! failure, `1` any error that stopped the tool.

use std::path::PathBuf;

use clap::{ArgGroup, Args, Parser, Subcommand, ValueEnum};
use futdb_core::{RollStrategy, TradingDate};

#[derive(Debug, Parser)]
#[command(
    name = "futdb",
    author,
    version,
    about = "Futures market data warehouse: calendar, rolls, canonical series and diagnostics"
)]
pub struct Cli {
    /// Path to the DuckDB database file.
    #[arg(long, global = true)]
    pub db_path: Option<PathBuf>,

    /// Canonical series mapping (TOML).
    #[arg(long, global = true, default_value = "configs/canonical_series.toml")]
    pub config: PathBuf,

    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Year whose decade single-digit symbol years resolve into (e.g. `H6`).
    #[arg(long, global = true)]
    pub reference_year: Option<i32>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable console output.
    Text,
    /// Single JSON document.
    Json,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Add every observed trading date missing from the calendar.
    ///
    ///   futdb sync-calendar --dry-run
    SyncCalendar(DryRunArgs),

    /// Remove calendar days that no daily bar backs any more.
    PruneCalendar(DryRunArgs),

    /// Recompute roll events from stored daily bars.
    ///
    ///   futdb detect-rolls --root ES
    ///   futdb detect-rolls --all
    ///   futdb detect-rolls --all --summary
    DetectRolls(DetectRollsArgs),

    /// Write the canonical mapping config into `dim_canonical_series`.
    SyncCanonical(DryRunArgs),

    /// Run post-ingest diagnostics. Exits 2 when a hard check fails.
    ///
    ///   futdb run-diagnostics --window-days 30 --json-out out/diagnostics.json
    ///   futdb run-diagnostics --start 2025-01-01 --end 2025-01-31
    RunDiagnostics(RunDiagnosticsArgs),

    /// Render the canonical coverage health report.
    ///
    ///   futdb render-health-report --out out/health.html
    RenderHealthReport(HealthReportArgs),

    /// Parse outright futures symbols such as `ESH6` or `SR3Z25`, or
    /// provider continuous symbols such as `ES.c.0`.
    ///
    ///   futdb parse-symbol ESH6 6BM25
    ///   futdb parse-symbol ES.c.0 --roll-strategy calendar-2d
    ParseSymbol(ParseSymbolArgs),
}

#[derive(Debug, Args)]
pub struct DryRunArgs {
    /// Report what would change without writing.
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
}

#[derive(Debug, Args)]
#[command(group(ArgGroup::new("target").required(true).args(["root", "all"])))]
pub struct DetectRollsArgs {
    /// Product root, e.g. `ES`.
    #[arg(long)]
    pub root: Option<String>,

    /// Every series with stored bars.
    #[arg(long, default_value_t = false)]
    pub all: bool,

    /// Report stored roll counts and latest roll dates without recomputing.
    #[arg(long, default_value_t = false)]
    pub summary: bool,
}

#[derive(Debug, Args)]
pub struct RunDiagnosticsArgs {
    /// Window start (YYYY-MM-DD).
    #[arg(long, value_parser = TradingDate::parse, conflicts_with = "window_days")]
    pub start: Option<TradingDate>,

    /// Window end (YYYY-MM-DD); defaults to the latest canonical trading date.
    #[arg(long, value_parser = TradingDate::parse)]
    pub end: Option<TradingDate>,

    /// Window length in calendar days, ending at `--end`.
    #[arg(long, default_value_t = 14)]
    pub window_days: u32,

    /// Also write the report as JSON to this path.
    #[arg(long)]
    pub json_out: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct HealthReportArgs {
    #[arg(long, value_parser = TradingDate::parse, conflicts_with = "window_days")]
    pub start: Option<TradingDate>,

    #[arg(long, value_parser = TradingDate::parse)]
    pub end: Option<TradingDate>,

    #[arg(long, default_value_t = 365)]
    pub window_days: u32,

    /// Output HTML file.
    #[arg(long)]
    pub out: PathBuf,
}

#[derive(Debug, Args)]
pub struct ParseSymbolArgs {
    #[arg(required = true, num_args = 1..)]
    pub symbols: Vec<String>,

    /// Roll rule continuous symbols bind to; defaults to the family their
    /// roll code names.
    #[arg(long, value_parser = RollStrategy::parse)]
    pub roll_strategy: Option<RollStrategy>,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn detect_rolls_requires_a_target() {
        assert!(Cli::try_parse_from(["futdb", "detect-rolls"]).is_err());
        assert!(Cli::try_parse_from(["futdb", "detect-rolls", "--root", "ES", "--all"]).is_err());
        assert!(Cli::try_parse_from(["futdb", "detect-rolls", "--all"]).is_ok());
        assert!(Cli::try_parse_from(["futdb", "detect-rolls", "--summary"]).is_err());
        let cli = Cli::try_parse_from(["futdb", "detect-rolls", "--root", "ES", "--summary"])
            .expect("parse");
        let Command::DetectRolls(args) = cli.command else {
            panic!("wrong command");
        };
        assert!(args.summary);
    }

    #[test]
    fn diagnostics_window_arguments_parse() {
        let cli = Cli::try_parse_from([
            "futdb",
            "--format",
            "json",
            "run-diagnostics",
            "--start",
            "2025-01-01",
            "--end",
            "2025-01-31",
        ])
        .expect("parse");
        let Command::RunDiagnostics(args) = cli.command else {
            panic!("wrong command");
        };
        assert_eq!(args.start.map(|d| d.to_string()).as_deref(), Some("2025-01-01"));
        assert_eq!(args.window_days, 14);
        assert_eq!(cli.format, OutputFormat::Json);

        assert!(Cli::try_parse_from(["futdb", "run-diagnostics", "--end", "2025-13-01"]).is_err());
        assert!(Cli::try_parse_from([
            "futdb",
            "run-diagnostics",
            "--start",
            "2025-01-01",
            "--window-days",
            "7"
        ])
        .is_err());
    }
}
