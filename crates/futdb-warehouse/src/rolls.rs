//! Roll event store (`dim_roll_event`).
//!
//! Events are regenerated per series from the stored bars and written as a
//! full replace: a back-dated correction can move earlier roll dates, so
//! appending would leave stale rows behind.

use std::collections::{BTreeSet, HashMap};

use ::duckdb::{params, ToSql};
use futdb_core::{
    detect_rolls, enrich_rolls, parse_series_rank, ContractSeries, Instrument, RollEvent,
    RollSummary, SeriesObservation, TradingDate,
};
use tracing::{info, warn};

use crate::{Warehouse, WarehouseError};

pub struct RollDetector<'a> {
    warehouse: &'a Warehouse,
}

impl<'a> RollDetector<'a> {
    pub fn new(warehouse: &'a Warehouse) -> Self {
        Self { warehouse }
    }

    /// Distinct contract series present in the daily bars, sorted.
    pub fn all_series(&self) -> Result<Vec<String>, WarehouseError> {
        let mut statement = self
            .warehouse
            .connection()
            .prepare("SELECT DISTINCT contract_series FROM g_continuous_bar_daily")?;
        let mut rows = statement.query([])?;
        let mut series = BTreeSet::new();
        while let Some(row) = rows.next()? {
            series.insert(row.get::<_, String>(0)?);
        }
        Ok(series.into_iter().collect())
    }

    pub fn series_for_root(&self, root: &str) -> Result<Vec<String>, WarehouseError> {
        let root = root.trim().to_ascii_uppercase();
        Ok(self
            .all_series()?
            .into_iter()
            .filter(|series| series_root(series) == root)
            .collect())
    }

    /// Registered rank, falling back to the rank token in the id.
    pub fn rank_of(&self, contract_series: &str) -> Result<Option<u32>, WarehouseError> {
        let mut statement = self.warehouse.connection().prepare(
            "SELECT CAST(rank AS BIGINT) FROM dim_contract_series WHERE contract_series = ?",
        )?;
        let mut rows = statement.query(params![contract_series])?;
        if let Some(row) = rows.next()? {
            return stored_rank("dim_contract_series", contract_series, row.get(0)?).map(Some);
        }
        Ok(parse_series_rank(contract_series))
    }

    /// Dated underlying ids for one series. Bars without an underlying id
    /// carry no roll information and are skipped.
    pub fn load_history(&self, contract_series: &str) -> Result<Vec<SeriesObservation>, WarehouseError> {
        let mut statement = self.warehouse.connection().prepare(
            "SELECT CAST(trading_date AS VARCHAR), underlying_instrument_id \
             FROM g_continuous_bar_daily \
             WHERE contract_series = ? AND underlying_instrument_id IS NOT NULL \
             ORDER BY trading_date",
        )?;
        let mut rows = statement.query(params![contract_series])?;
        let mut history = Vec::new();
        while let Some(row) = rows.next()? {
            let trading_date: String = row.get(0)?;
            history.push(SeriesObservation {
                trading_date: TradingDate::parse(&trading_date)?,
                instrument_id: row.get(1)?,
            });
        }
        Ok(history)
    }

    fn load_instruments(&self, contract_series: &str) -> Result<HashMap<i64, Instrument>, WarehouseError> {
        let mut statement = self.warehouse.connection().prepare(
            "SELECT instrument_id, native_symbol, root, CAST(month AS BIGINT), \
                    CAST(year AS BIGINT), CAST(expiry_date AS VARCHAR) \
             FROM dim_instrument \
             WHERE instrument_id IN ( \
                 SELECT DISTINCT underlying_instrument_id FROM g_continuous_bar_daily \
                 WHERE contract_series = ? \
             )",
        )?;
        let mut rows = statement.query(params![contract_series])?;
        let mut instruments = HashMap::new();
        while let Some(row) = rows.next()? {
            let instrument_id: i64 = row.get(0)?;
            let month: Option<i64> = row.get(3)?;
            let year: Option<i64> = row.get(4)?;
            let expiry: Option<String> = row.get(5)?;
            instruments.insert(
                instrument_id,
                Instrument {
                    instrument_id,
                    native_symbol: row.get(1)?,
                    root: row.get(2)?,
                    month: month.and_then(|value| u8::try_from(value).ok()),
                    year: year.and_then(|value| i32::try_from(value).ok()),
                    expiry_date: expiry.as_deref().map(TradingDate::parse).transpose()?,
                },
            );
        }
        Ok(instruments)
    }

    /// Recompute and store the rolls of one series.
    pub fn detect_series(&self, contract_series: &str) -> Result<RollSummary, WarehouseError> {
        let rank = self.rank_of(contract_series)?.unwrap_or_else(|| {
            warn!(contract_series, "no rank registered or encoded; storing as rank 0");
            0
        });
        let history = self.load_history(contract_series)?;
        let mut events = detect_rolls(contract_series, rank, &history);
        enrich_rolls(&mut events, &self.load_instruments(contract_series)?);

        self.warehouse.in_transaction(|connection| {
            connection.execute(
                "DELETE FROM dim_roll_event WHERE contract_series = ?",
                params![contract_series],
            )?;
            for event in &events {
                let roll_date = event.roll_date.to_string();
                let old_expiry = event.old_expiry.map(|date| date.to_string());
                let new_expiry = event.new_expiry.map(|date| date.to_string());
                let params: [&dyn ToSql; 9] = [
                    &event.contract_series,
                    &event.rank,
                    &roll_date,
                    &event.old_instrument_id,
                    &event.new_instrument_id,
                    &event.old_native_symbol,
                    &event.new_native_symbol,
                    &old_expiry,
                    &new_expiry,
                ];
                connection.execute(
                    "INSERT INTO dim_roll_event \
                     (contract_series, rank, roll_date, old_instrument_id, new_instrument_id, \
                      old_native_symbol, new_native_symbol, old_expiry_date, new_expiry_date) \
                     VALUES (?, ?, CAST(? AS DATE), ?, ?, ?, ?, CAST(? AS DATE), CAST(? AS DATE))",
                    params.as_slice(),
                )?;
            }
            Ok(())
        })?;

        let summary = RollSummary::from_events(contract_series, rank, &events);
        info!(
            contract_series,
            rank,
            observations = history.len(),
            rolls = summary.roll_count,
            "detected rolls"
        );
        Ok(summary)
    }

    pub fn detect_root(&self, root: &str) -> Result<Vec<RollSummary>, WarehouseError> {
        self.series_for_root(root)?
            .iter()
            .map(|series| self.detect_series(series))
            .collect()
    }

    pub fn detect_all(&self) -> Result<Vec<RollSummary>, WarehouseError> {
        self.all_series()?
            .iter()
            .map(|series| self.detect_series(series))
            .collect()
    }

    /// Stored events for one series ordered by roll date.
    pub fn stored_events(&self, contract_series: &str) -> Result<Vec<RollEvent>, WarehouseError> {
        let mut statement = self.warehouse.connection().prepare(
            "SELECT contract_series, CAST(rank AS BIGINT), CAST(roll_date AS VARCHAR), \
                    old_instrument_id, new_instrument_id, old_native_symbol, new_native_symbol, \
                    CAST(old_expiry_date AS VARCHAR), CAST(new_expiry_date AS VARCHAR) \
             FROM dim_roll_event \
             WHERE contract_series = ? \
             ORDER BY roll_date",
        )?;
        let mut rows = statement.query(params![contract_series])?;
        let mut events = Vec::new();
        while let Some(row) = rows.next()? {
            let rank: i64 = row.get(1)?;
            let roll_date: String = row.get(2)?;
            let old_expiry: Option<String> = row.get(7)?;
            let new_expiry: Option<String> = row.get(8)?;
            events.push(RollEvent {
                contract_series: row.get(0)?,
                rank: stored_rank("dim_roll_event", contract_series, rank)?,
                roll_date: TradingDate::parse(&roll_date)?,
                old_instrument_id: row.get(3)?,
                new_instrument_id: row.get(4)?,
                old_native_symbol: row.get(5)?,
                new_native_symbol: row.get(6)?,
                old_expiry: old_expiry.as_deref().map(TradingDate::parse).transpose()?,
                new_expiry: new_expiry.as_deref().map(TradingDate::parse).transpose()?,
            });
        }
        Ok(events)
    }

    /// Counts and first/last roll dates from the stored events, without
    /// recomputing anything.
    pub fn stored_summary(&self, contract_series: &str) -> Result<RollSummary, WarehouseError> {
        let events = self.stored_events(contract_series)?;
        let rank = match events.first() {
            Some(event) => event.rank,
            None => self.rank_of(contract_series)?.unwrap_or_default(),
        };
        Ok(RollSummary::from_events(contract_series, rank, &events))
    }

    pub fn summarize_root(&self, root: &str) -> Result<Vec<RollSummary>, WarehouseError> {
        self.series_for_root(root)?
            .iter()
            .map(|series| self.stored_summary(series))
            .collect()
    }

    pub fn summarize_all(&self) -> Result<Vec<RollSummary>, WarehouseError> {
        self.all_series()?
            .iter()
            .map(|series| self.stored_summary(series))
            .collect()
    }
}

fn stored_rank(table: &'static str, contract_series: &str, rank: i64) -> Result<u32, WarehouseError> {
    u32::try_from(rank).map_err(|_| WarehouseError::CorruptRow {
        table,
        detail: format!("{contract_series} has rank {rank}"),
    })
}

fn series_root(contract_series: &str) -> String {
    ContractSeries::parse(contract_series).map_or_else(
        |_| {
            contract_series
                .split('_')
                .next()
                .unwrap_or(contract_series)
                .to_ascii_uppercase()
        },
        |series| series.root,
    )
}
