//! Behavior-driven tests for the data-derived trading calendar
//!
//! The calendar is the set of dates with ingested bars. These tests cover
//! the superset property, the sync fixed point and explicit pruning.

use std::collections::BTreeSet;

use futdb_core::{DailyBar, DateWindow, TradingDate};
use futdb_warehouse::calendar::Calendar;
use futdb_warehouse::Warehouse;

fn date(value: &str) -> TradingDate {
    TradingDate::parse(value).expect("date")
}

fn bar(series: &str, day: &str) -> DailyBar {
    DailyBar {
        trading_date: date(day),
        contract_series: series.to_string(),
        underlying_instrument_id: Some(1),
        open: 10.0,
        high: 11.0,
        low: 9.0,
        close: 10.5,
        volume: 5,
    }
}

fn observed_dates(warehouse: &Warehouse) -> BTreeSet<String> {
    let mut statement = warehouse
        .connection()
        .prepare("SELECT DISTINCT CAST(trading_date AS VARCHAR) FROM g_continuous_bar_daily")
        .expect("prepare");
    let rows = statement
        .query_map([], |row| row.get::<_, String>(0))
        .expect("query");
    rows.collect::<Result<_, _>>().expect("rows")
}

// =============================================================================
// Calendar: Sync
// =============================================================================

#[test]
fn when_calendar_syncs_every_observed_trading_date_is_present() {
    // Given: Bars on scattered dates across two series, including a weekend
    let warehouse = Warehouse::open_in_memory().expect("warehouse");
    warehouse
        .ingest_daily_bars(&[
            bar("ES_FRONT_CALENDAR_2D", "2025-01-02"),
            bar("ES_FRONT_CALENDAR_2D", "2025-01-03"),
            bar("SR3_FRONT_CALENDAR", "2025-01-03"),
            bar("SR3_FRONT_CALENDAR", "2025-01-04"),
        ])
        .expect("ingest");

    // When: The calendar syncs
    let calendar = Calendar::new(&warehouse);
    let report = calendar.sync(false).expect("sync");

    // Then: Every observed date is a calendar day, weekend included
    assert_eq!(report.new_days, 3);
    assert_eq!(report.total_days, 3);
    let window = DateWindow::new(date("2025-01-01"), date("2025-01-31")).expect("window");
    let days: BTreeSet<String> = calendar
        .trading_days(window)
        .expect("days")
        .into_iter()
        .map(|day| day.to_string())
        .collect();
    assert!(days.is_superset(&observed_dates(&warehouse)));
}

#[test]
fn when_calendar_syncs_twice_the_second_run_adds_nothing() {
    // Given: A synced calendar
    let warehouse = Warehouse::open_in_memory().expect("warehouse");
    warehouse
        .ingest_daily_bars(&[bar("ES_FRONT_CALENDAR_2D", "2025-01-02")])
        .expect("ingest");
    let calendar = Calendar::new(&warehouse);
    calendar.sync(false).expect("first sync");

    // When: Sync runs again with no new bars
    let report = calendar.sync(false).expect("second sync");

    // Then: Fixed point reached
    assert_eq!(report.new_days, 0);
    assert_eq!(report.first_new_day, None);
    assert_eq!(report.total_days, 1);
}

#[test]
fn when_new_bars_arrive_only_their_dates_are_appended() {
    // Given: A synced calendar
    let warehouse = Warehouse::open_in_memory().expect("warehouse");
    warehouse
        .ingest_daily_bars(&[bar("ES_FRONT_CALENDAR_2D", "2025-01-02")])
        .expect("ingest");
    let calendar = Calendar::new(&warehouse);
    calendar.sync(false).expect("sync");

    // When: A later day is ingested and sync reruns
    warehouse
        .ingest_daily_bars(&[bar("ES_FRONT_CALENDAR_2D", "2025-01-06")])
        .expect("ingest");
    let report = calendar.sync(false).expect("sync");

    // Then: Only the new day is added and it becomes the calendar max
    assert_eq!(report.new_days, 1);
    assert_eq!(report.first_new_day, Some(date("2025-01-06")));
    assert_eq!(calendar.max_date().expect("max"), Some(date("2025-01-06")));
}

#[test]
fn when_synced_day_rows_carry_period_columns_and_no_holiday_flag() {
    let warehouse = Warehouse::open_in_memory().expect("warehouse");
    warehouse
        .ingest_daily_bars(&[bar("ES_FRONT_CALENDAR_2D", "2025-08-15")])
        .expect("ingest");
    Calendar::new(&warehouse).sync(false).expect("sync");

    let (week, month, quarter, is_holiday): (i64, i64, i64, bool) = warehouse
        .connection()
        .query_row(
            "SELECT CAST(week AS BIGINT), CAST(month AS BIGINT), CAST(quarter AS BIGINT), is_holiday \
             FROM dim_session",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
        )
        .expect("row");
    assert_eq!((week, month, quarter, is_holiday), (33, 8, 3, false));
}

// =============================================================================
// Calendar: Prune
// =============================================================================

#[test]
fn when_bars_are_removed_sync_keeps_the_day_but_prune_removes_it() {
    // Given: A synced calendar whose 2025-01-03 bars were deleted upstream
    let warehouse = Warehouse::open_in_memory().expect("warehouse");
    warehouse
        .ingest_daily_bars(&[
            bar("ES_FRONT_CALENDAR_2D", "2025-01-02"),
            bar("ES_FRONT_CALENDAR_2D", "2025-01-03"),
        ])
        .expect("ingest");
    let calendar = Calendar::new(&warehouse);
    calendar.sync(false).expect("sync");
    warehouse
        .connection()
        .execute(
            "DELETE FROM g_continuous_bar_daily WHERE trading_date = DATE '2025-01-03'",
            [],
        )
        .expect("delete");

    // When: Sync runs, then a dry-run prune, then a real prune
    assert_eq!(calendar.sync(false).expect("sync").total_days, 2);
    let dry = calendar.prune(true).expect("dry prune");
    let pruned = calendar.prune(false).expect("prune");

    // Then: Only the explicit prune retracts the orphaned day
    assert_eq!(dry.removed_days, vec![date("2025-01-03")]);
    assert_eq!(dry.total_days, 2);
    assert_eq!(pruned.removed_days, vec![date("2025-01-03")]);
    assert_eq!(pruned.total_days, 1);
    assert!(calendar.orphan_days().expect("orphans").is_empty());
}
