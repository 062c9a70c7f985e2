//! Post-ingest diagnostics.
//!
//! A flat list of independent checks runs against one database handle. A
//! check that finds a missing prerequisite reports SKIP; one that errors or
//! panics becomes an ERROR result and the run continues.

pub mod checks;
mod context;

use std::fs;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;

use futdb_core::{
    CanonicalConfig, CheckCategory, CheckDescriptor, CheckResult, DateWindow, DiagnosticsReport,
    ReportMeta, Severity, TradingDate,
};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub use context::CheckContext;

use crate::{Warehouse, WarehouseConfig, WarehouseError};

pub const DEFAULT_WINDOW_DAYS: u32 = 14;

/// One diagnostic. Implementations must not write to the database.
pub trait Check {
    fn descriptor(&self) -> CheckDescriptor;
    fn run(&self, ctx: &CheckContext<'_>) -> Result<CheckResult, WarehouseError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiagnosticsOptions {
    pub start: Option<TradingDate>,
    pub end: Option<TradingDate>,
    /// Window length when `start` is not given.
    pub window_days: u32,
}

impl Default for DiagnosticsOptions {
    fn default() -> Self {
        Self {
            start: None,
            end: None,
            window_days: DEFAULT_WINDOW_DAYS,
        }
    }
}

pub struct Diagnostics {
    config: CanonicalConfig,
    options: DiagnosticsOptions,
    catalog: Vec<Box<dyn Check>>,
}

impl Diagnostics {
    pub fn new(config: CanonicalConfig, options: DiagnosticsOptions) -> Self {
        Self {
            config,
            options,
            catalog: checks::standard_catalog(),
        }
    }

    /// Replace the check list, e.g. to add site-specific checks.
    #[must_use]
    pub fn with_catalog(mut self, catalog: Vec<Box<dyn Check>>) -> Self {
        self.catalog = catalog;
        self
    }

    /// Open the database read-only and run. A missing file yields a report
    /// with a single hard failure rather than an error.
    pub fn run_at(&self, warehouse_config: &WarehouseConfig) -> Result<DiagnosticsReport, WarehouseError> {
        let db_path = &warehouse_config.db_path;
        if !db_path.exists() {
            return Ok(missing_database_report(db_path));
        }
        let warehouse = Warehouse::open_read_only(warehouse_config)?;
        self.run(&warehouse)
    }

    /// An unusable window argument is an error. A window that cannot be
    /// read from the database leaves the window checks to SKIP.
    pub fn run(&self, warehouse: &Warehouse) -> Result<DiagnosticsReport, WarehouseError> {
        let window = match self.resolve_window(warehouse) {
            Ok(window) => window,
            Err(error @ WarehouseError::InvalidWindow(_)) => return Err(error),
            Err(error) => {
                warn!(%error, "latest canonical date unavailable; window checks will skip");
                None
            }
        };
        let ctx = CheckContext {
            warehouse,
            config: &self.config,
            window,
        };

        let mut results = Vec::with_capacity(self.catalog.len() + 1);
        results.push(db_exists_descriptor().pass(format!("opened {}", warehouse.db_label())));
        for check in &self.catalog {
            let result = run_isolated(check.as_ref(), &ctx);
            debug!(
                check_id = %result.check_id,
                status = %result.status,
                severity = %result.severity,
                "check finished"
            );
            results.push(result);
        }

        let report = DiagnosticsReport::new(
            report_meta(warehouse.db_label(), window),
            results,
        );
        info!(
            overall = %report.summary.overall_status,
            hard_failures = report.summary.hard_failures,
            warnings = report.summary.warnings,
            total = report.summary.total_checks,
            "diagnostics finished"
        );
        Ok(report)
    }

    /// Explicit bounds win. Otherwise the window is `window_days` calendar
    /// days ending at the latest canonical trading date, never today.
    pub fn resolve_window(&self, warehouse: &Warehouse) -> Result<Option<DateWindow>, WarehouseError> {
        let end = match self.options.end {
            Some(end) => Some(end),
            None => latest_canonical_date(warehouse, &self.config)?,
        };
        let Some(end) = end else {
            return Ok(None);
        };
        let window = match self.options.start {
            Some(start) => DateWindow::new(start, end),
            None => DateWindow::ending_at(end, self.options.window_days),
        };
        window
            .map(Some)
            .map_err(|error| WarehouseError::InvalidWindow(error.to_string()))
    }
}

fn latest_canonical_date(
    warehouse: &Warehouse,
    config: &CanonicalConfig,
) -> Result<Option<TradingDate>, WarehouseError> {
    let lookup = CheckContext {
        warehouse,
        config,
        window: None,
    };
    if !lookup.canonical_view_usable()? {
        return Ok(None);
    }
    lookup.optional_date(
        "SELECT CAST(MAX(trading_date) AS VARCHAR) FROM v_canonical_continuous_bar_daily",
        &[],
    )
}

fn run_isolated(check: &dyn Check, ctx: &CheckContext<'_>) -> CheckResult {
    let descriptor = check.descriptor();
    match catch_unwind(AssertUnwindSafe(|| check.run(ctx))) {
        Ok(Ok(result)) => result,
        Ok(Err(error)) => descriptor.error(error.to_string()),
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|text| (*text).to_owned())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| String::from("check panicked"));
            descriptor.error(format!("panic: {message}"))
        }
    }
}

fn db_exists_descriptor() -> CheckDescriptor {
    CheckDescriptor::new(
        "env.db_exists",
        "DuckDB database exists",
        CheckCategory::Structural,
        Severity::Hard,
    )
}

pub fn missing_database_report(db_path: &Path) -> DiagnosticsReport {
    let label = db_path.display().to_string();
    let result = db_exists_descriptor()
        .fail(format!("Database not found at {label}"))
        .with_metric("db_path", label.clone());
    DiagnosticsReport::new(report_meta(label, None), vec![result])
}

fn report_meta(db_path: String, window: Option<DateWindow>) -> ReportMeta {
    let now = OffsetDateTime::now_utc();
    let now = now.replace_nanosecond(0).unwrap_or(now);
    ReportMeta {
        run_id: Uuid::new_v4().to_string(),
        generated_at_utc: now.format(&Rfc3339).unwrap_or_else(|_| now.to_string()),
        db_path,
        window_start: window.map(|window| window.start),
        window_end: window.map(|window| window.end),
    }
}

/// Write the report as pretty JSON, creating parent directories.
pub fn write_json_report(report: &DiagnosticsReport, path: &Path) -> Result<(), WarehouseError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, serde_json::to_string_pretty(report)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use futdb_core::Status;

    struct Panicking;

    impl Check for Panicking {
        fn descriptor(&self) -> CheckDescriptor {
            CheckDescriptor::new("test.panics", "Panics", CheckCategory::Structural, Severity::Warn)
        }

        fn run(&self, _ctx: &CheckContext<'_>) -> Result<CheckResult, WarehouseError> {
            panic!("boom");
        }
    }

    struct Failing;

    impl Check for Failing {
        fn descriptor(&self) -> CheckDescriptor {
            CheckDescriptor::new("test.errors", "Errors", CheckCategory::Structural, Severity::Hard)
        }

        fn run(&self, ctx: &CheckContext<'_>) -> Result<CheckResult, WarehouseError> {
            ctx.count("SELECT COUNT(*) FROM no_such_table", &[])?;
            Ok(self.descriptor().pass("unreachable"))
        }
    }

    #[test]
    fn panics_and_errors_are_isolated_per_check() {
        let warehouse = Warehouse::open_in_memory().expect("warehouse");
        let diagnostics = Diagnostics::new(CanonicalConfig::default(), DiagnosticsOptions::default())
            .with_catalog(vec![Box::new(Panicking), Box::new(Failing)]);

        let report = diagnostics.run(&warehouse).expect("report");
        let statuses: Vec<(&str, Status, Severity)> = report
            .checks
            .iter()
            .map(|check| (check.check_id.as_str(), check.status, check.severity))
            .collect();
        assert_eq!(
            statuses,
            [
                ("env.db_exists", Status::Pass, Severity::Hard),
                ("test.panics", Status::Error, Severity::Warn),
                ("test.errors", Status::Error, Severity::Hard),
            ]
        );
        assert_eq!(report.summary.hard_failures, 1);
        assert_eq!(report.summary.warnings, 1);
        assert_eq!(report.summary.errors, 2);
        assert_eq!(report.exit_code(), 2);
    }

    #[test]
    fn missing_database_is_a_hard_failure() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = WarehouseConfig::default().with_db_path(dir.path().join("nope.duckdb"));
        let report = Diagnostics::new(CanonicalConfig::default(), DiagnosticsOptions::default())
            .run_at(&config)
            .expect("report");
        assert_eq!(report.checks.len(), 1);
        assert_eq!(report.checks[0].check_id, "env.db_exists");
        assert_eq!(report.exit_code(), 2);
        assert!(!config.db_path.exists());
    }

    #[test]
    fn empty_database_has_no_window() {
        let warehouse = Warehouse::open_in_memory().expect("warehouse");
        let diagnostics = Diagnostics::new(CanonicalConfig::default(), DiagnosticsOptions::default());
        assert_eq!(diagnostics.resolve_window(&warehouse).expect("window"), None);
    }

    #[test]
    fn inverted_explicit_window_is_rejected() {
        let warehouse = Warehouse::open_in_memory().expect("warehouse");
        let options = DiagnosticsOptions {
            start: TradingDate::parse("2025-02-01").ok(),
            end: TradingDate::parse("2025-01-01").ok(),
            window_days: DEFAULT_WINDOW_DAYS,
        };
        let err = Diagnostics::new(CanonicalConfig::default(), options)
            .resolve_window(&warehouse)
            .expect_err("must fail");
        assert!(matches!(err, WarehouseError::InvalidWindow(_)));
    }
}
