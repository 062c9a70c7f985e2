use serde::{Deserialize, Serialize};

use crate::domain::series::normalize_root;
use crate::{TradingDate, ValidationError};

/// One expiring contract. Immutable once registered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instrument {
    pub instrument_id: i64,
    pub native_symbol: String,
    pub root: String,
    pub month: Option<u8>,
    pub year: Option<i32>,
    pub expiry_date: Option<TradingDate>,
}

impl Instrument {
    pub fn new(
        instrument_id: i64,
        native_symbol: impl Into<String>,
        root: &str,
        expiry_date: Option<TradingDate>,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            instrument_id,
            native_symbol: native_symbol.into(),
            root: normalize_root(root)?,
            month: expiry_date.map(TradingDate::month),
            year: expiry_date.map(TradingDate::year),
            expiry_date,
        })
    }
}

/// Daily OHLCV for one continuous series on one trading date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyBar {
    pub trading_date: TradingDate,
    pub contract_series: String,
    pub underlying_instrument_id: Option<i64>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

/// Which underlying contract backed a series on a given day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesObservation {
    pub trading_date: TradingDate,
    pub instrument_id: i64,
}

/// A change of underlying contract within one series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollEvent {
    pub contract_series: String,
    pub rank: u32,
    pub roll_date: TradingDate,
    pub old_instrument_id: i64,
    pub new_instrument_id: i64,
    pub old_native_symbol: Option<String>,
    pub new_native_symbol: Option<String>,
    pub old_expiry: Option<TradingDate>,
    pub new_expiry: Option<TradingDate>,
}

/// A date observed to carry bar activity. `is_holiday` is always false: the
/// calendar only records presence of data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarDay {
    pub trade_date: TradingDate,
    pub week: u8,
    pub month: u8,
    pub quarter: u8,
    pub is_holiday: bool,
}

impl CalendarDay {
    pub fn from_date(trade_date: TradingDate) -> Self {
        Self {
            trade_date,
            week: trade_date.iso_week(),
            month: trade_date.month(),
            quarter: trade_date.quarter(),
            is_holiday: false,
        }
    }
}
