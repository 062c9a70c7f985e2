//! Behavior-driven tests for roll detection
//!
//! These tests verify that roll events follow stored daily bars: one event
//! per change of underlying contract, recomputed in full on every run.

use futdb_core::{DailyBar, Instrument, TradingDate};
use futdb_warehouse::rolls::RollDetector;
use futdb_warehouse::{Warehouse, WarehouseConfig};
use tempfile::tempdir;

const ES_FRONT: &str = "ES_FRONT_CALENDAR_2D";

fn date(value: &str) -> TradingDate {
    TradingDate::parse(value).expect("date")
}

fn bar(series: &str, day: &str, instrument_id: i64) -> DailyBar {
    DailyBar {
        trading_date: date(day),
        contract_series: series.to_string(),
        underlying_instrument_id: Some(instrument_id),
        open: 100.0,
        high: 101.0,
        low: 99.0,
        close: 100.5,
        volume: 1_000,
    }
}

fn open_temp_warehouse(dir: &std::path::Path) -> Warehouse {
    Warehouse::open(&WarehouseConfig {
        futdb_home: dir.to_path_buf(),
        db_path: dir.join("market.duckdb"),
    })
    .expect("warehouse open")
}

// =============================================================================
// Roll Detection: Event Generation
// =============================================================================

#[test]
fn when_front_series_switches_contract_exactly_one_roll_is_stored() {
    // Given: ES front bars where the underlying changes once
    let temp = tempdir().expect("tempdir");
    let warehouse = open_temp_warehouse(temp.path());
    warehouse
        .ingest_daily_bars(&[
            bar(ES_FRONT, "2025-01-02", 100),
            bar(ES_FRONT, "2025-01-03", 100),
            bar(ES_FRONT, "2025-01-06", 200),
        ])
        .expect("ingest");

    // When: Rolls are detected for the series
    let detector = RollDetector::new(&warehouse);
    let summary = detector.detect_series(ES_FRONT).expect("detect");

    // Then: One roll on the first day of the new contract
    assert_eq!(summary.rank, 0);
    assert_eq!(summary.roll_count, 1);
    let events = detector.stored_events(ES_FRONT).expect("events");
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].roll_date, date("2025-01-06"));
    assert_eq!(events[0].old_instrument_id, 100);
    assert_eq!(events[0].new_instrument_id, 200);
}

#[test]
fn when_rolls_are_detected_twice_the_stored_set_is_identical() {
    // Given: A series with two rolls
    let warehouse = Warehouse::open_in_memory().expect("warehouse");
    warehouse
        .ingest_daily_bars(&[
            bar(ES_FRONT, "2025-03-10", 1),
            bar(ES_FRONT, "2025-03-11", 2),
            bar(ES_FRONT, "2025-06-16", 2),
            bar(ES_FRONT, "2025-06-17", 3),
        ])
        .expect("ingest");
    let detector = RollDetector::new(&warehouse);

    // When: Detection runs twice on unchanged data
    detector.detect_series(ES_FRONT).expect("first run");
    let first = detector.stored_events(ES_FRONT).expect("events");
    detector.detect_series(ES_FRONT).expect("second run");
    let second = detector.stored_events(ES_FRONT).expect("events");

    // Then: Nothing is duplicated or lost
    assert_eq!(first.len(), 2);
    assert_eq!(first, second);
}

#[test]
fn when_instrument_metadata_exists_rolls_carry_symbols_and_expiries() {
    // Given: Registered instruments behind the bars
    let warehouse = Warehouse::open_in_memory().expect("warehouse");
    warehouse
        .register_instruments(&[
            Instrument::new(100, "ESH5", "ES", Some(date("2025-03-21"))).expect("instrument"),
            Instrument::new(200, "ESM5", "ES", Some(date("2025-06-20"))).expect("instrument"),
        ])
        .expect("register");
    warehouse
        .ingest_daily_bars(&[bar(ES_FRONT, "2025-03-18", 100), bar(ES_FRONT, "2025-03-19", 200)])
        .expect("ingest");

    // When: Rolls are detected
    let detector = RollDetector::new(&warehouse);
    detector.detect_series(ES_FRONT).expect("detect");

    // Then: The event is enriched from dim_instrument
    let events = detector.stored_events(ES_FRONT).expect("events");
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].old_native_symbol.as_deref(), Some("ESH5"));
    assert_eq!(events[0].new_native_symbol.as_deref(), Some("ESM5"));
    assert_eq!(events[0].old_expiry, Some(date("2025-03-21")));
    assert_eq!(events[0].new_expiry, Some(date("2025-06-20")));
}

#[test]
fn when_bars_change_a_rerun_replaces_stale_events() {
    // Given: A detected roll
    let warehouse = Warehouse::open_in_memory().expect("warehouse");
    warehouse
        .ingest_daily_bars(&[bar(ES_FRONT, "2025-01-02", 100), bar(ES_FRONT, "2025-01-03", 200)])
        .expect("ingest");
    let detector = RollDetector::new(&warehouse);
    detector.detect_series(ES_FRONT).expect("detect");

    // When: The second bar is corrected to the same contract and detection reruns
    warehouse
        .ingest_daily_bars(&[bar(ES_FRONT, "2025-01-03", 100)])
        .expect("re-ingest");
    let summary = detector.detect_series(ES_FRONT).expect("detect");

    // Then: The stale roll is gone
    assert_eq!(summary.roll_count, 0);
    assert!(detector.stored_events(ES_FRONT).expect("events").is_empty());
}

// =============================================================================
// Roll Detection: Scope
// =============================================================================

#[test]
fn when_detecting_by_root_only_that_roots_series_are_processed() {
    // Given: Bars for two roots, including a rank-1 series
    let warehouse = Warehouse::open_in_memory().expect("warehouse");
    warehouse
        .ingest_daily_bars(&[
            bar(ES_FRONT, "2025-01-02", 1),
            bar(ES_FRONT, "2025-01-03", 2),
            bar("ES_RANK_1_CALENDAR_2D", "2025-01-02", 2),
            bar("ES_RANK_1_CALENDAR_2D", "2025-01-03", 3),
            bar("SR3_FRONT_CALENDAR", "2025-01-02", 7),
            bar("SR3_FRONT_CALENDAR", "2025-01-03", 8),
        ])
        .expect("ingest");

    // When: Rolls are detected for ES only
    let detector = RollDetector::new(&warehouse);
    let summaries = detector.detect_root("es").expect("detect");

    // Then: Both ES series are processed with their own rank and SR3 is untouched
    let processed: Vec<(&str, u32)> = summaries
        .iter()
        .map(|summary| (summary.contract_series.as_str(), summary.rank))
        .collect();
    assert_eq!(processed, [(ES_FRONT, 0), ("ES_RANK_1_CALENDAR_2D", 1)]);
    assert!(detector
        .stored_events("SR3_FRONT_CALENDAR")
        .expect("events")
        .is_empty());

    // And: --all picks up the rest
    assert_eq!(detector.detect_all().expect("detect all").len(), 3);
}
