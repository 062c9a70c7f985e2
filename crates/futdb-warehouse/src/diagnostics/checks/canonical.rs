use std::collections::BTreeMap;

use ::duckdb::{params, ToSql};
use futdb_core::{CheckCategory, CheckDescriptor, CheckResult, Severity};
use serde_json::{json, Value};

use crate::canonical::{diff_against_db, load_db_mappings};
use crate::diagnostics::{Check, CheckContext};
use crate::WarehouseError;

const CANONICAL_TABLE: &str = "dim_canonical_series";

/// Config and `dim_canonical_series` agree row for row. Any drift is hard.
pub struct MappingInSync;

impl Check for MappingInSync {
    fn descriptor(&self) -> CheckDescriptor {
        CheckDescriptor::new(
            "canonical.mapping.sync",
            "Canonical mapping matches config",
            CheckCategory::Configuration,
            Severity::Hard,
        )
    }

    fn run(&self, ctx: &CheckContext<'_>) -> Result<CheckResult, WarehouseError> {
        let descriptor = self.descriptor();
        if !ctx.table_exists(CANONICAL_TABLE)? {
            return Ok(descriptor.skip("dim_canonical_series missing"));
        }

        let diff = diff_against_db(ctx.warehouse.connection(), ctx.config)?;
        if diff.is_clean() {
            let mut result = descriptor.pass("ok");
            if !diff.description_drift.is_empty() {
                result.message = format!(
                    "ok ({} description differences, informational)",
                    diff.description_drift.len()
                );
                result = result.with_metric("description_drift", json!(diff.description_drift));
            }
            return Ok(result);
        }

        Ok(descriptor
            .fail(format!(
                "dim_canonical_series does not match config ({} differences); run `futdb sync-canonical`",
                diff.drift_count()
            ))
            .with_metric("missing_in_db", json!(diff.missing_in_db))
            .with_metric("extra_in_db", json!(diff.extra_in_db))
            .with_metric("mismatches", json!(diff.mismatches)))
    }
}

/// The canonical view yields at most one row per `(root, trading_date)`.
pub struct UniqueRootDate;

impl Check for UniqueRootDate {
    fn descriptor(&self) -> CheckDescriptor {
        CheckDescriptor::new(
            "canonical.view.unique_root_date",
            "Canonical daily view: unique (root, trading_date)",
            CheckCategory::DataIntegrity,
            Severity::Hard,
        )
    }

    fn run(&self, ctx: &CheckContext<'_>) -> Result<CheckResult, WarehouseError> {
        let descriptor = self.descriptor();
        if !ctx.canonical_view_usable()? {
            return Ok(descriptor.skip("canonical view or its base tables missing"));
        }
        let groups = ctx.count(
            "SELECT COUNT(*) FROM ( \
                 SELECT root, trading_date FROM v_canonical_continuous_bar_daily \
                 GROUP BY root, trading_date HAVING COUNT(*) > 1 \
             )",
            &[],
        )?;
        Ok(descriptor
            .from_violations(groups, "ok", |n| format!("{n} duplicate root-date groups"))
            .with_metric("duplicate_groups", groups))
    }
}

/// Every non-optional root has at least one canonical row in the window.
///
/// Provider lag is normal, so this only warns.
pub struct PresenceInWindow;

impl Check for PresenceInWindow {
    fn descriptor(&self) -> CheckDescriptor {
        CheckDescriptor::new(
            "canonical.view.presence_recent_window",
            "Canonical daily view: non-optional roots present in window",
            CheckCategory::Coverage,
            Severity::Warn,
        )
    }

    fn run(&self, ctx: &CheckContext<'_>) -> Result<CheckResult, WarehouseError> {
        let descriptor = self.descriptor();
        let Some(window) = ctx.window else {
            return Ok(descriptor.skip("no window: canonical view has no data"));
        };
        if !ctx.canonical_view_usable()? {
            return Ok(descriptor.skip("canonical view or its base tables missing"));
        }

        let start = window.start.to_string();
        let end = window.end.to_string();
        let mut missing = Vec::new();
        let mut last_seen = BTreeMap::new();
        for mapping in load_db_mappings(ctx.warehouse.connection())? {
            let last = ctx.optional_date(
                "SELECT CAST(MAX(trading_date) AS VARCHAR) \
                 FROM v_canonical_continuous_bar_daily WHERE root = ?",
                params![mapping.root],
            )?;
            last_seen.insert(
                mapping.root.clone(),
                last.map_or(Value::Null, |date| Value::String(date.to_string())),
            );

            let params: [&dyn ToSql; 3] = [&mapping.root, &start, &end];
            let rows = ctx.count(
                "SELECT COUNT(*) FROM v_canonical_continuous_bar_daily \
                 WHERE root = ? AND trading_date BETWEEN CAST(? AS DATE) AND CAST(? AS DATE)",
                params.as_slice(),
            )?;
            if !mapping.optional && rows == 0 {
                missing.push(mapping.root);
            }
        }

        let result = if missing.is_empty() {
            descriptor.pass("ok")
        } else {
            descriptor
                .warn(format!(
                    "{} non-optional roots have no rows in the window: {}",
                    missing.len(),
                    missing.join(", ")
                ))
                .with_metric("missing_non_optional_roots", json!(missing))
                .with_metric("per_root_last_trading_date", json!(last_seen))
        };
        Ok(result
            .with_metric("window_start", start)
            .with_metric("window_end", end))
    }
}
