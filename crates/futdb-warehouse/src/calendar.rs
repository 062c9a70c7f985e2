//! Data-derived trading calendar (`dim_session`).
//!
//! A trading day is any date on which at least one daily bar was ingested.
//! No exchange schedule is assumed and `is_holiday` is never set. Sync only
//! adds days; removing days that lost their backing bars is the separate,
//! explicit [`Calendar::prune`].

use ::duckdb::ToSql;
use futdb_core::{CalendarDay, DateWindow, TradingDate};
use serde::Serialize;
use tracing::{debug, info};

use crate::{query_dates, query_optional_date, Warehouse, WarehouseError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalendarSyncReport {
    pub dry_run: bool,
    /// Days inserted, or that would be inserted on a dry run.
    pub new_days: usize,
    pub first_new_day: Option<TradingDate>,
    pub last_new_day: Option<TradingDate>,
    pub total_days: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalendarPruneReport {
    pub dry_run: bool,
    pub removed_days: Vec<TradingDate>,
    pub total_days: i64,
}

pub struct Calendar<'a> {
    warehouse: &'a Warehouse,
}

impl<'a> Calendar<'a> {
    pub fn new(warehouse: &'a Warehouse) -> Self {
        Self { warehouse }
    }

    /// Observed trading dates not yet in the calendar, ascending.
    pub fn pending_days(&self) -> Result<Vec<TradingDate>, WarehouseError> {
        let mut days = query_dates(
            self.warehouse.connection(),
            "SELECT DISTINCT CAST(b.trading_date AS VARCHAR) \
             FROM g_continuous_bar_daily b \
             LEFT JOIN dim_session s ON s.trade_date = b.trading_date \
             WHERE s.trade_date IS NULL",
            &[],
        )?;
        days.sort_unstable();
        Ok(days)
    }

    /// Add every observed trading date missing from the calendar.
    ///
    /// Running it twice in a row inserts nothing the second time.
    pub fn sync(&self, dry_run: bool) -> Result<CalendarSyncReport, WarehouseError> {
        let pending = self.pending_days()?;

        if !dry_run && !pending.is_empty() {
            self.warehouse.in_transaction(|connection| {
                for day in pending.iter().copied().map(CalendarDay::from_date) {
                    let trade_date = day.trade_date.to_string();
                    let params: [&dyn ToSql; 5] = [
                        &trade_date,
                        &day.week,
                        &day.month,
                        &day.quarter,
                        &day.is_holiday,
                    ];
                    connection.execute(
                        "INSERT INTO dim_session (trade_date, week, month, quarter, is_holiday) \
                         VALUES (CAST(? AS DATE), ?, ?, ?, ?)",
                        params.as_slice(),
                    )?;
                }
                Ok(())
            })?;
        }

        let report = CalendarSyncReport {
            dry_run,
            new_days: pending.len(),
            first_new_day: pending.first().copied(),
            last_new_day: pending.last().copied(),
            total_days: self.day_count()?,
        };
        info!(
            dry_run,
            new_days = report.new_days,
            total_days = report.total_days,
            "calendar sync"
        );
        Ok(report)
    }

    /// Calendar days no longer backed by any daily bar, ascending.
    pub fn orphan_days(&self) -> Result<Vec<TradingDate>, WarehouseError> {
        let mut days = query_dates(
            self.warehouse.connection(),
            "SELECT CAST(s.trade_date AS VARCHAR) \
             FROM dim_session s \
             WHERE NOT EXISTS ( \
                 SELECT 1 FROM g_continuous_bar_daily b WHERE b.trading_date = s.trade_date \
             )",
            &[],
        )?;
        days.sort_unstable();
        Ok(days)
    }

    /// Remove orphaned calendar days. Never called by [`Calendar::sync`].
    pub fn prune(&self, dry_run: bool) -> Result<CalendarPruneReport, WarehouseError> {
        let orphans = self.orphan_days()?;

        if !dry_run && !orphans.is_empty() {
            self.warehouse.in_transaction(|connection| {
                for day in &orphans {
                    let trade_date = day.to_string();
                    connection.execute(
                        "DELETE FROM dim_session WHERE trade_date = CAST(? AS DATE)",
                        [&trade_date as &dyn ToSql].as_slice(),
                    )?;
                }
                Ok(())
            })?;
        }

        let report = CalendarPruneReport {
            dry_run,
            removed_days: orphans,
            total_days: self.day_count()?,
        };
        info!(
            dry_run,
            removed_days = report.removed_days.len(),
            "calendar prune"
        );
        Ok(report)
    }

    /// Calendar days within `window`, ascending.
    pub fn trading_days(&self, window: DateWindow) -> Result<Vec<TradingDate>, WarehouseError> {
        let start = window.start.to_string();
        let end = window.end.to_string();
        let params: [&dyn ToSql; 2] = [&start, &end];
        let mut days = query_dates(
            self.warehouse.connection(),
            "SELECT CAST(trade_date AS VARCHAR) FROM dim_session \
             WHERE trade_date BETWEEN CAST(? AS DATE) AND CAST(? AS DATE)",
            params.as_slice(),
        )?;
        days.sort_unstable();
        Ok(days)
    }

    pub fn day_count(&self) -> Result<i64, WarehouseError> {
        let count = self.warehouse.connection().query_row(
            "SELECT COUNT(*) FROM dim_session",
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    pub fn max_date(&self) -> Result<Option<TradingDate>, WarehouseError> {
        query_optional_date(
            self.warehouse.connection(),
            "SELECT CAST(MAX(trade_date) AS VARCHAR) FROM dim_session",
            &[],
        )
    }

    /// Latest trading date across all daily bars.
    pub fn max_observed_date(&self) -> Result<Option<TradingDate>, WarehouseError> {
        query_optional_date(
            self.warehouse.connection(),
            "SELECT CAST(MAX(trading_date) AS VARCHAR) FROM g_continuous_bar_daily",
            &[],
        )
    }

    /// Expected trading days in `window`, refusing to answer from an empty
    /// or stale calendar.
    pub fn expected_days(&self, window: DateWindow) -> Result<Vec<TradingDate>, WarehouseError> {
        let Some(calendar_max) = self.max_date()? else {
            return Err(WarehouseError::CalendarState(String::from(
                "dim_session is empty",
            )));
        };
        if let Some(observed_max) = self.max_observed_date()? {
            if calendar_max < observed_max {
                return Err(WarehouseError::CalendarState(format!(
                    "dim_session ends at {calendar_max} but bars reach {observed_max}"
                )));
            }
        }
        let days = self.trading_days(window)?;
        debug!(start = %window.start, end = %window.end, days = days.len(), "expected days");
        Ok(days)
    }
}
