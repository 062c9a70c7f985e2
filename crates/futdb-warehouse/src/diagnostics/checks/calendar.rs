use futdb_core::{CheckCategory, CheckDescriptor, CheckResult, Severity};
use serde_json::Value;

use crate::calendar::Calendar;
use crate::diagnostics::{Check, CheckContext};
use crate::WarehouseError;

const REQUIRED: [&str; 2] = ["dim_session", "g_continuous_bar_daily"];
const REMEDIATION: &str = "run `futdb sync-calendar`";

/// Bars exist, so the calendar must not be empty.
pub struct SessionPopulated;

impl Check for SessionPopulated {
    fn descriptor(&self) -> CheckDescriptor {
        CheckDescriptor::new(
            "calendar.dim_session.populated",
            "dim_session populated (data-derived calendar)",
            CheckCategory::CalendarState,
            Severity::Hard,
        )
    }

    fn run(&self, ctx: &CheckContext<'_>) -> Result<CheckResult, WarehouseError> {
        let descriptor = self.descriptor();
        if !ctx.tables_exist(&REQUIRED)? {
            return Ok(descriptor.skip("required tables missing"));
        }

        let sessions = Calendar::new(ctx.warehouse).day_count()?;
        let bars = ctx.count("SELECT COUNT(*) FROM g_continuous_bar_daily", &[])?;
        let result = if bars > 0 && sessions == 0 {
            descriptor.fail(format!("dim_session is empty; {REMEDIATION}"))
        } else {
            descriptor.pass("ok")
        };
        Ok(result
            .with_metric("dim_session_rows", sessions)
            .with_metric("g_continuous_bar_daily_rows", bars))
    }
}

/// The calendar reaches the latest observed trading date.
pub struct SessionFresh;

impl Check for SessionFresh {
    fn descriptor(&self) -> CheckDescriptor {
        CheckDescriptor::new(
            "calendar.dim_session.fresh",
            "dim_session includes latest daily bar date",
            CheckCategory::CalendarState,
            Severity::Hard,
        )
    }

    fn run(&self, ctx: &CheckContext<'_>) -> Result<CheckResult, WarehouseError> {
        let descriptor = self.descriptor();
        if !ctx.tables_exist(&REQUIRED)? {
            return Ok(descriptor.skip("required tables missing"));
        }

        let calendar = Calendar::new(ctx.warehouse);
        let Some(observed_max) = calendar.max_observed_date()? else {
            return Ok(descriptor.skip("no daily bars yet"));
        };
        let calendar_max = calendar.max_date()?;
        let stale = calendar_max.map_or(true, |max| max < observed_max);

        let result = if stale {
            descriptor.fail(format!("dim_session is behind g_continuous_bar_daily; {REMEDIATION}"))
        } else {
            descriptor.pass("ok")
        };
        Ok(result
            .with_metric(
                "dim_session_max_trade_date",
                calendar_max.map_or(Value::Null, |date| Value::String(date.to_string())),
            )
            .with_metric(
                "g_continuous_bar_daily_max_trading_date",
                observed_max.to_string(),
            ))
    }
}
