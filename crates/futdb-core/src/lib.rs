//! # Futdb Core
//!
//! Domain logic for a futures market-data warehouse.
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`domain`] | Dates, symbols, contract series, bars, rolls, calendar days |
//! | [`rolls`] | Roll detection and enrichment over one series' history |
//! | [`canonical`] | Canonical series config and reconciliation diff |
//! | [`diagnostics`] | Check results, aggregation and exit-code policy |
//! | [`error`] | Core error types |
//!
//! Nothing here touches the database; the warehouse crate feeds these
//! functions with rows it reads and persists what they return.

pub mod canonical;
pub mod diagnostics;
pub mod domain;
pub mod error;
pub mod rolls;

pub use canonical::{reconcile, CanonicalConfig, CanonicalMapping, FieldMismatch, MappingDiff};
pub use diagnostics::{
    CheckCategory, CheckDescriptor, CheckResult, DiagnosticsReport, ReportMeta, Severity, Status,
    Summary, EXIT_HARD_FAILURE,
};
pub use domain::{
    imm_expiry, make_series_id, month_from_code, parse_series_rank, CalendarDay,
    ContinuousSymbol, ContractSeries, DailyBar, DateWindow, FuturesSymbol, Instrument, RollEvent,
    RollStrategy, SeriesObservation, TradingDate, YearResolution, MONTH_CODES,
};
pub use error::{ConfigError, ValidationError};
pub use rolls::{detect_rolls, enrich_rolls, RollSummary};
