//! Roll detection over one series' daily history.

use std::collections::HashMap;

use serde::Serialize;

use crate::{Instrument, RollEvent, SeriesObservation, TradingDate};

/// Find every change of underlying instrument in `history`.
///
/// Observations are ordered by trading date before the scan, so insertion
/// order never matters. When one date appears twice the first occurrence in
/// the input wins. Gaps between dates are not rolls.
pub fn detect_rolls(
    contract_series: &str,
    rank: u32,
    history: &[SeriesObservation],
) -> Vec<RollEvent> {
    let mut ordered = history.to_vec();
    ordered.sort_by_key(|observation| observation.trading_date);
    ordered.dedup_by_key(|observation| observation.trading_date);

    ordered
        .windows(2)
        .filter(|pair| pair[0].instrument_id != pair[1].instrument_id)
        .map(|pair| RollEvent {
            contract_series: contract_series.to_owned(),
            rank,
            roll_date: pair[1].trading_date,
            old_instrument_id: pair[0].instrument_id,
            new_instrument_id: pair[1].instrument_id,
            old_native_symbol: None,
            new_native_symbol: None,
            old_expiry: None,
            new_expiry: None,
        })
        .collect()
}

/// Attach native symbols and expiries where metadata is known. Missing
/// instruments leave the fields empty.
pub fn enrich_rolls(events: &mut [RollEvent], instruments: &HashMap<i64, Instrument>) {
    for event in events {
        if let Some(old) = instruments.get(&event.old_instrument_id) {
            event.old_native_symbol = Some(old.native_symbol.clone());
            event.old_expiry = old.expiry_date;
        }
        if let Some(new) = instruments.get(&event.new_instrument_id) {
            event.new_native_symbol = Some(new.native_symbol.clone());
            event.new_expiry = new.expiry_date;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RollSummary {
    pub contract_series: String,
    pub rank: u32,
    pub roll_count: usize,
    pub first_roll: Option<TradingDate>,
    pub last_roll: Option<TradingDate>,
}

impl RollSummary {
    pub fn from_events(contract_series: &str, rank: u32, events: &[RollEvent]) -> Self {
        Self {
            contract_series: contract_series.to_owned(),
            rank,
            roll_count: events.len(),
            first_roll: events.iter().map(|event| event.roll_date).min(),
            last_roll: events.iter().map(|event| event.roll_date).max(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(date: &str, instrument_id: i64) -> SeriesObservation {
        SeriesObservation {
            trading_date: TradingDate::parse(date).expect("date"),
            instrument_id,
        }
    }

    #[test]
    fn emits_one_event_per_instrument_change() {
        let history = [
            obs("2025-01-02", 100),
            obs("2025-01-03", 100),
            obs("2025-01-06", 200),
        ];
        let events = detect_rolls("ES_FRONT_CALENDAR_2D", 0, &history);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].roll_date.to_string(), "2025-01-06");
        assert_eq!(events[0].old_instrument_id, 100);
        assert_eq!(events[0].new_instrument_id, 200);
    }

    #[test]
    fn sorts_by_date_not_input_order() {
        let history = [
            obs("2025-01-06", 200),
            obs("2025-01-02", 100),
            obs("2025-01-03", 100),
        ];
        assert_eq!(detect_rolls("X", 0, &history).len(), 1);
    }

    #[test]
    fn short_histories_and_gaps_yield_nothing() {
        assert!(detect_rolls("X", 0, &[]).is_empty());
        assert!(detect_rolls("X", 0, &[obs("2025-01-02", 1)]).is_empty());
        let gapped = [obs("2025-01-02", 1), obs("2025-02-20", 1)];
        assert!(detect_rolls("X", 0, &gapped).is_empty());
    }

    #[test]
    fn round_trip_back_to_old_contract_counts_twice() {
        let history = [
            obs("2025-01-02", 1),
            obs("2025-01-03", 2),
            obs("2025-01-06", 1),
        ];
        assert_eq!(detect_rolls("X", 0, &history).len(), 2);
    }

    #[test]
    fn enrichment_is_best_effort() {
        let history = [obs("2025-03-10", 100), obs("2025-03-11", 200)];
        let mut events = detect_rolls("ES_FRONT_CALENDAR_2D", 0, &history);
        let mut instruments = HashMap::new();
        instruments.insert(
            200,
            Instrument::new(
                200,
                "ESM5",
                "ES",
                Some(TradingDate::parse("2025-06-18").expect("date")),
            )
            .expect("instrument"),
        );
        enrich_rolls(&mut events, &instruments);
        assert_eq!(events[0].old_native_symbol, None);
        assert_eq!(events[0].new_native_symbol.as_deref(), Some("ESM5"));
        assert_eq!(
            events[0].new_expiry.map(|d| d.to_string()),
            Some(String::from("2025-06-18"))
        );
    }

    #[test]
    fn summary_reports_first_and_last_roll() {
        let history = [
            obs("2025-01-02", 1),
            obs("2025-03-14", 2),
            obs("2025-06-13", 3),
        ];
        let events = detect_rolls("X", 0, &history);
        let summary = RollSummary::from_events("X", 0, &events);
        assert_eq!(summary.roll_count, 2);
        assert_eq!(summary.first_roll.map(|d| d.to_string()).as_deref(), Some("2025-03-14"));
        assert_eq!(summary.last_roll.map(|d| d.to_string()).as_deref(), Some("2025-06-13"));
    }
}
