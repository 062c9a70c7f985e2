//! Canonical coverage health report.
//!
//! Gathering only reads; [`render_html`] turns the gathered aggregates into a
//! self-contained HTML page with inline SVG charts.

mod render;

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use ::duckdb::ToSql;
use futdb_core::{DateWindow, TradingDate};
use serde::Serialize;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::info;

pub use render::{escape_html, render_html};

use crate::calendar::Calendar;
use crate::canonical::load_db_mappings;
use crate::views::CANONICAL_DAILY_VIEW;
use crate::{query_optional_date, Warehouse, WarehouseError};

pub const DEFAULT_HEALTH_WINDOW_DAYS: u32 = 365;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthOptions {
    pub start: Option<TradingDate>,
    pub end: Option<TradingDate>,
    pub window_days: u32,
}

impl Default for HealthOptions {
    fn default() -> Self {
        Self {
            start: None,
            end: None,
            window_days: DEFAULT_HEALTH_WINDOW_DAYS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RootCoverage {
    pub root: String,
    pub contract_series: String,
    pub optional: bool,
    pub present_days: usize,
    pub missing_days: usize,
    pub coverage_pct: f64,
    /// Full-history range, not clipped to the window.
    pub first_date: Option<TradingDate>,
    pub last_date: Option<TradingDate>,
    #[serde(skip)]
    pub present: BTreeSet<TradingDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthData {
    pub window: DateWindow,
    /// Day axis: calendar days in the window plus any canonical dates the
    /// calendar has not caught up with.
    pub days: Vec<TradingDate>,
    /// Sorted worst coverage first.
    pub roots: Vec<RootCoverage>,
    pub bars_per_day: Vec<(TradingDate, i64)>,
    pub expected_roots_per_day: usize,
    /// Present root-days over all root-days.
    pub overall_coverage_pct: f64,
}

pub fn coverage_pct(present: usize, expected: usize) -> f64 {
    if expected == 0 {
        return 0.0;
    }
    present as f64 * 100.0 / expected as f64
}

/// Collect per-root presence and bar counts for the resolved window.
pub fn gather(warehouse: &Warehouse, options: &HealthOptions) -> Result<HealthData, WarehouseError> {
    let connection = warehouse.connection();
    let end = match options.end {
        Some(end) => end,
        None => query_optional_date(
            connection,
            "SELECT CAST(MAX(trading_date) AS VARCHAR) FROM v_canonical_continuous_bar_daily",
            &[],
        )?
        .ok_or_else(|| {
            WarehouseError::InvalidWindow(format!(
                "{CANONICAL_DAILY_VIEW} is empty; pass an explicit end date"
            ))
        })?,
    };
    let window = match options.start {
        Some(start) => DateWindow::new(start, end),
        None => DateWindow::ending_at(end, options.window_days),
    }
    .map_err(|error| WarehouseError::InvalidWindow(error.to_string()))?;

    let start = window.start.to_string();
    let end = window.end.to_string();
    let bounds: [&dyn ToSql; 2] = [&start, &end];

    let mut presence: BTreeMap<String, BTreeSet<TradingDate>> = BTreeMap::new();
    let mut bars_per_day: BTreeMap<TradingDate, i64> = BTreeMap::new();
    {
        let mut statement = connection.prepare(
            "SELECT root, CAST(trading_date AS VARCHAR) FROM v_canonical_continuous_bar_daily \
             WHERE trading_date BETWEEN CAST(? AS DATE) AND CAST(? AS DATE)",
        )?;
        let mut rows = statement.query(bounds.as_slice())?;
        while let Some(row) = rows.next()? {
            let root: String = row.get(0)?;
            let day = TradingDate::parse(&row.get::<_, String>(1)?)?;
            presence.entry(root).or_default().insert(day);
            *bars_per_day.entry(day).or_insert(0) += 1;
        }
    }

    let mut ranges: BTreeMap<String, (TradingDate, TradingDate)> = BTreeMap::new();
    {
        let mut statement = connection.prepare(
            "SELECT root, CAST(MIN(trading_date) AS VARCHAR), CAST(MAX(trading_date) AS VARCHAR) \
             FROM v_canonical_continuous_bar_daily GROUP BY root",
        )?;
        let mut rows = statement.query([])?;
        while let Some(row) = rows.next()? {
            let root: String = row.get(0)?;
            let first = TradingDate::parse(&row.get::<_, String>(1)?)?;
            let last = TradingDate::parse(&row.get::<_, String>(2)?)?;
            ranges.insert(root, (first, last));
        }
    }

    let mut axis: BTreeSet<TradingDate> = Calendar::new(warehouse)
        .trading_days(window)?
        .into_iter()
        .collect();
    axis.extend(bars_per_day.keys().copied());
    let days: Vec<TradingDate> = axis.into_iter().collect();

    let mappings = load_db_mappings(connection)?;
    let expected_roots_per_day = mappings.iter().filter(|mapping| !mapping.optional).count();
    let mut roots: Vec<RootCoverage> = mappings
        .into_iter()
        .map(|mapping| {
            let present = presence.remove(&mapping.root).unwrap_or_default();
            let range = ranges.get(&mapping.root).copied();
            RootCoverage {
                present_days: present.len(),
                missing_days: days.len().saturating_sub(present.len()),
                coverage_pct: coverage_pct(present.len(), days.len()),
                first_date: range.map(|(first, _)| first),
                last_date: range.map(|(_, last)| last),
                root: mapping.root,
                contract_series: mapping.contract_series,
                optional: mapping.optional,
                present,
            }
        })
        .collect();
    roots.sort_by(|a, b| {
        a.coverage_pct
            .total_cmp(&b.coverage_pct)
            .then_with(|| b.missing_days.cmp(&a.missing_days))
            .then_with(|| a.root.cmp(&b.root))
    });

    let present_cells: usize = roots.iter().map(|root| root.present_days).sum();
    let overall_coverage_pct = coverage_pct(present_cells, roots.len() * days.len());

    Ok(HealthData {
        window,
        days,
        roots,
        bars_per_day: bars_per_day.into_iter().collect(),
        expected_roots_per_day,
        overall_coverage_pct,
    })
}

/// Gather, render and write the report to `path`.
pub fn write_health_report(
    warehouse: &Warehouse,
    options: &HealthOptions,
    path: &Path,
) -> Result<HealthData, WarehouseError> {
    let data = gather(warehouse, options)?;
    let now = OffsetDateTime::now_utc();
    let now = now.replace_nanosecond(0).unwrap_or(now);
    let generated_at = now.format(&Rfc3339).unwrap_or_else(|_| now.to_string());
    let html = render_html(&data, &warehouse.db_label(), &generated_at);

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, html)?;
    info!(
        path = %path.display(),
        roots = data.roots.len(),
        days = data.days.len(),
        coverage_pct = data.overall_coverage_pct,
        "wrote health report"
    );
    Ok(data)
}
