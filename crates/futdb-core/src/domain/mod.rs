//! # Domain Models
//!
//! Futures market-data types shared by the warehouse and the CLI.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`TradingDate`] | Calendar date with observed activity |
//! | [`DateWindow`] | Inclusive date range for windowed checks |
//! | [`FuturesSymbol`] | Parsed outright symbol (`ESH6`, `SR3Z25`) |
//! | [`ContractSeries`] | Continuous series id and its parts |
//! | [`RollStrategy`] | Closed set of roll rules |
//! | [`Instrument`] | One expiring contract |
//! | [`DailyBar`] | Daily OHLCV per series |
//! | [`RollEvent`] | Change of underlying within a series |
//! | [`CalendarDay`] | Data-derived trading calendar row |

mod date;
mod models;
pub(crate) mod series;
mod symbol;

pub use date::{DateWindow, TradingDate};
pub use models::{CalendarDay, DailyBar, Instrument, RollEvent, SeriesObservation};
pub use series::{make_series_id, parse_series_rank, ContinuousSymbol, ContractSeries, RollStrategy};
pub use symbol::{imm_expiry, month_from_code, FuturesSymbol, YearResolution, MONTH_CODES};
