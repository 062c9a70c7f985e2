//! Check results, report aggregation and exit-code policy.

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter, Write as _};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::TradingDate;

/// Exit code when at least one hard check failed or errored.
pub const EXIT_HARD_FAILURE: u8 = 2;

const RULE_WIDTH: usize = 88;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Pass,
    Warn,
    Fail,
    Skip,
    Error,
}

impl Status {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pass => "PASS",
            Self::Warn => "WARN",
            Self::Fail => "FAIL",
            Self::Skip => "SKIP",
            Self::Error => "ERROR",
        }
    }

    const fn is_failure(self) -> bool {
        matches!(self, Self::Fail | Self::Error)
    }
}

impl Display for Status {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Hard,
    Warn,
    Info,
}

impl Severity {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Hard => "HARD",
            Self::Warn => "WARN",
            Self::Info => "INFO",
        }
    }
}

impl Display for Severity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure family a check belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckCategory {
    Structural,
    Configuration,
    DataIntegrity,
    CalendarState,
    Coverage,
}

/// Identity of one check, fixed before it runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckDescriptor {
    pub check_id: String,
    pub name: String,
    pub category: CheckCategory,
    pub severity: Severity,
}

impl CheckDescriptor {
    pub fn new(
        check_id: impl Into<String>,
        name: impl Into<String>,
        category: CheckCategory,
        severity: Severity,
    ) -> Self {
        Self {
            check_id: check_id.into(),
            name: name.into(),
            category,
            severity,
        }
    }

    pub fn result(&self, status: Status, message: impl Into<String>) -> CheckResult {
        CheckResult {
            check_id: self.check_id.clone(),
            name: self.name.clone(),
            category: self.category,
            status,
            severity: self.severity,
            message: message.into(),
            metrics: BTreeMap::new(),
        }
    }

    pub fn pass(&self, message: impl Into<String>) -> CheckResult {
        self.result(Status::Pass, message)
    }

    pub fn warn(&self, message: impl Into<String>) -> CheckResult {
        self.result(Status::Warn, message)
    }

    pub fn fail(&self, message: impl Into<String>) -> CheckResult {
        self.result(Status::Fail, message)
    }

    pub fn skip(&self, message: impl Into<String>) -> CheckResult {
        self.result(Status::Skip, message)
    }

    pub fn error(&self, message: impl Into<String>) -> CheckResult {
        self.result(Status::Error, message)
    }

    /// PASS with `ok_message` when `violations` is zero, otherwise FAIL.
    pub fn from_violations(
        &self,
        violations: i64,
        ok_message: &str,
        fail_message: impl FnOnce(i64) -> String,
    ) -> CheckResult {
        if violations == 0 {
            self.pass(ok_message)
        } else {
            self.fail(fail_message(violations))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    pub check_id: String,
    pub name: String,
    pub category: CheckCategory,
    pub status: Status,
    pub severity: Severity,
    pub message: String,
    #[serde(default)]
    pub metrics: BTreeMap<String, Value>,
}

impl CheckResult {
    pub fn with_metric(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.metrics.insert(key.to_owned(), value.into());
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn is_hard_failure(&self) -> bool {
        self.status.is_failure() && self.severity == Severity::Hard
    }

    pub fn is_warning(&self) -> bool {
        self.status == Status::Warn || (self.status.is_failure() && self.severity == Severity::Warn)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub overall_status: Status,
    pub hard_failures: usize,
    pub warnings: usize,
    pub errors: usize,
    pub skipped: usize,
    pub passed: usize,
    pub total_checks: usize,
}

impl Summary {
    /// FAIL if any hard check failed or errored, else WARN if any warning
    /// exists, else PASS. Check order is irrelevant.
    pub fn aggregate(checks: &[CheckResult]) -> Self {
        let hard_failures = checks.iter().filter(|c| c.is_hard_failure()).count();
        let warnings = checks.iter().filter(|c| c.is_warning()).count();
        let overall_status = if hard_failures > 0 {
            Status::Fail
        } else if warnings > 0 {
            Status::Warn
        } else {
            Status::Pass
        };

        Self {
            overall_status,
            hard_failures,
            warnings,
            errors: count_status(checks, Status::Error),
            skipped: count_status(checks, Status::Skip),
            passed: count_status(checks, Status::Pass),
            total_checks: checks.len(),
        }
    }

    pub const fn exit_code(&self) -> u8 {
        if self.hard_failures > 0 {
            EXIT_HARD_FAILURE
        } else {
            0
        }
    }
}

fn count_status(checks: &[CheckResult], status: Status) -> usize {
    checks.iter().filter(|check| check.status == status).count()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportMeta {
    pub run_id: String,
    pub generated_at_utc: String,
    pub db_path: String,
    pub window_start: Option<TradingDate>,
    pub window_end: Option<TradingDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticsReport {
    pub meta: ReportMeta,
    pub summary: Summary,
    pub checks: Vec<CheckResult>,
}

impl DiagnosticsReport {
    pub fn new(meta: ReportMeta, checks: Vec<CheckResult>) -> Self {
        Self {
            meta,
            summary: Summary::aggregate(&checks),
            checks,
        }
    }

    pub const fn exit_code(&self) -> u8 {
        self.summary.exit_code()
    }

    pub fn render_text(&self) -> String {
        let heavy = "=".repeat(RULE_WIDTH);
        let light = "-".repeat(RULE_WIDTH);
        let summary = &self.summary;
        let mut out = String::new();

        let _ = writeln!(out, "{heavy}\nPOST-INGEST DIAGNOSTICS\n{heavy}");
        let _ = writeln!(out, "Database: {}", self.meta.db_path);
        if let (Some(start), Some(end)) = (self.meta.window_start, self.meta.window_end) {
            let _ = writeln!(out, "Window:   {start} .. {end} (calendar timeline)");
        }
        let _ = writeln!(out, "Status:   {}", summary.overall_status);
        let _ = writeln!(
            out,
            "Checks:   {} passed, {} warnings, {} hard failures, {} errors, {} skipped",
            summary.passed, summary.warnings, summary.hard_failures, summary.errors, summary.skipped
        );
        let _ = writeln!(out, "{light}");
        for check in &self.checks {
            let _ = writeln!(
                out,
                "[{}] ({}) {} - {}",
                check.status, check.severity, check.name, check.message
            );
        }
        let _ = writeln!(out, "{light}");
        let verdict = if summary.hard_failures > 0 {
            "Result: HARD FAILURES present (exit code 2)."
        } else if summary.warnings > 0 {
            "Result: warnings only (exit code 0)."
        } else {
            "Result: all checks passed (exit code 0)."
        };
        let _ = writeln!(out, "{verdict}\n{heavy}");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(id: &str, severity: Severity, status: Status) -> CheckResult {
        CheckDescriptor::new(id, id, CheckCategory::DataIntegrity, severity).result(status, "msg")
    }

    #[test]
    fn any_hard_failure_or_error_fails_the_run() {
        for status in [Status::Fail, Status::Error] {
            let checks = vec![
                check("a", Severity::Hard, Status::Pass),
                check("b", Severity::Hard, status),
                check("c", Severity::Warn, Status::Warn),
            ];
            let summary = Summary::aggregate(&checks);
            assert_eq!(summary.overall_status, Status::Fail);
            assert_eq!(summary.hard_failures, 1);
            assert_eq!(summary.exit_code(), 2);
        }
    }

    #[test]
    fn warn_severity_failures_only_warn() {
        let checks = vec![
            check("a", Severity::Hard, Status::Pass),
            check("b", Severity::Warn, Status::Fail),
            check("c", Severity::Info, Status::Skip),
        ];
        let summary = Summary::aggregate(&checks);
        assert_eq!(summary.overall_status, Status::Warn);
        assert_eq!(summary.warnings, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.exit_code(), 0);
    }

    #[test]
    fn all_pass_and_skip_is_pass() {
        let checks = vec![
            check("a", Severity::Hard, Status::Pass),
            check("b", Severity::Info, Status::Skip),
        ];
        let summary = Summary::aggregate(&checks);
        assert_eq!(summary.overall_status, Status::Pass);
        assert_eq!(summary.exit_code(), 0);
        assert_eq!(Summary::aggregate(&[]).overall_status, Status::Pass);
    }

    #[test]
    fn aggregation_ignores_order() {
        let mut checks = vec![
            check("a", Severity::Warn, Status::Warn),
            check("b", Severity::Hard, Status::Error),
            check("c", Severity::Hard, Status::Pass),
        ];
        let forward = Summary::aggregate(&checks);
        checks.reverse();
        assert_eq!(Summary::aggregate(&checks), forward);
    }

    #[test]
    fn serializes_status_and_category_tokens() {
        let value = serde_json::to_value(check("x", Severity::Hard, Status::Fail)).expect("json");
        assert_eq!(value["status"], "FAIL");
        assert_eq!(value["severity"], "HARD");
        assert_eq!(value["category"], "data_integrity");
    }

    #[test]
    fn console_rendering_lists_every_check() {
        let report = DiagnosticsReport::new(
            ReportMeta {
                run_id: String::from("run"),
                generated_at_utc: String::from("2025-01-07T00:00:00Z"),
                db_path: String::from("/tmp/market.duckdb"),
                window_start: TradingDate::parse("2025-01-01").ok(),
                window_end: TradingDate::parse("2025-01-14").ok(),
            },
            vec![
                check("a", Severity::Hard, Status::Pass),
                check("b", Severity::Warn, Status::Warn),
            ],
        );
        let text = report.render_text();
        assert!(text.contains("POST-INGEST DIAGNOSTICS"));
        assert!(text.contains("Window:   2025-01-01 .. 2025-01-14"));
        assert!(text.contains("[PASS] (HARD) a - msg"));
        assert!(text.contains("[WARN] (WARN) b - msg"));
        assert!(text.contains("Result: warnings only (exit code 0)."));
    }
}
