use std::collections::BTreeMap;

use ::duckdb::ToSql;
use futdb_core::{CheckCategory, CheckDescriptor, CheckResult, Severity};
use serde_json::json;

use crate::calendar::Calendar;
use crate::canonical::load_db_mappings;
use crate::diagnostics::{Check, CheckContext};
use crate::WarehouseError;

/// Non-optional roots have a canonical row on every calendar day of the
/// window. The calendar is the only source of expected days.
pub struct CalendarCoverage;

impl Check for CalendarCoverage {
    fn descriptor(&self) -> CheckDescriptor {
        CheckDescriptor::new(
            "coverage.calendar.canonical_roots",
            "Canonical roots cover every calendar day in window",
            CheckCategory::Coverage,
            Severity::Warn,
        )
    }

    fn run(&self, ctx: &CheckContext<'_>) -> Result<CheckResult, WarehouseError> {
        let descriptor = self.descriptor();
        let Some(window) = ctx.window else {
            return Ok(descriptor.skip("no window: canonical view has no data"));
        };
        if !ctx.canonical_view_usable()? || !ctx.table_exists("dim_session")? {
            return Ok(descriptor.skip("canonical view, its base tables or dim_session missing"));
        }

        let calendar = Calendar::new(ctx.warehouse);
        let expected = match calendar.expected_days(window) {
            Ok(days) => days,
            Err(WarehouseError::CalendarState(reason)) => {
                return Ok(descriptor.skip(format!("calendar not usable: {reason}")));
            }
            Err(error) => return Err(error),
        };
        if expected.is_empty() {
            return Ok(descriptor.skip("calendar has no trading days in window"));
        }

        let start = window.start.to_string();
        let end = window.end.to_string();
        let mut gaps = BTreeMap::new();
        for mapping in load_db_mappings(ctx.warehouse.connection())? {
            if mapping.optional {
                continue;
            }
            let params: [&dyn ToSql; 3] = [&mapping.root, &start, &end];
            let present = ctx.count(
                "SELECT COUNT(DISTINCT v.trading_date) FROM v_canonical_continuous_bar_daily v \
                 JOIN dim_session s ON s.trade_date = v.trading_date \
                 WHERE v.root = ? AND v.trading_date BETWEEN CAST(? AS DATE) AND CAST(? AS DATE)",
                params.as_slice(),
            )?;
            let expected_count = i64::try_from(expected.len()).unwrap_or(i64::MAX);
            let missing = expected_count - present;
            if missing > 0 {
                gaps.insert(mapping.root, missing);
            }
        }

        let result = if gaps.is_empty() {
            descriptor.pass("ok")
        } else {
            descriptor
                .warn(format!(
                    "{} non-optional roots miss calendar days in the window",
                    gaps.len()
                ))
                .with_metric("missing_days_by_root", json!(gaps))
        };
        Ok(result.with_metric("expected_days", expected.len()))
    }
}
