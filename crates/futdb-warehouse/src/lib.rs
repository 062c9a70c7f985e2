//! # Futdb Warehouse
//!
//! DuckDB storage for futures daily bars and the artifacts derived from them.
//!
//! ## Tables
//!
//! | Table | Description |
//! |-------|-------------|
//! | `dim_instrument` | Expiring contracts (immutable) |
//! | `dim_contract_series` | Registered continuous series |
//! | `g_continuous_bar_daily` | Daily OHLCV per series |
//! | `dim_roll_event` | Detected rolls, fully regenerable |
//! | `dim_session` | Data-derived trading calendar |
//! | `dim_canonical_series` | Mirror of the canonical mapping config |
//!
//! ## Views
//!
//! | View | Description |
//! |------|-------------|
//! | `v_canonical_continuous_bar_daily` | One row per root and trading date |
//!
//! All components take the [`Warehouse`] (or its connection) explicitly.

pub mod calendar;
pub mod canonical;
pub mod diagnostics;
pub mod duckdb;
pub mod health;
pub mod migrations;
pub mod rolls;
pub mod views;

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use ::duckdb::{params, Connection, ToSql};
use futdb_core::{ConfigError, ContractSeries, DailyBar, Instrument, TradingDate, ValidationError};
use thiserror::Error;
use tracing::{debug, info};

pub use duckdb::AccessMode;

const DB_FILE_NAME: &str = "market.duckdb";

/// Errors that can occur during warehouse operations.
#[derive(Debug, Error)]
pub enum WarehouseError {
    /// `DuckDB` database error.
    #[error(transparent)]
    DuckDb(#[from] ::duckdb::Error),

    /// I/O error (file system operations).
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Database file is absent and the operation does not create it.
    #[error("database not found at {}", path.display())]
    DatabaseMissing { path: PathBuf },

    /// The trading calendar cannot answer the question asked of it.
    #[error("calendar not usable: {0}; run `futdb sync-calendar`")]
    CalendarState(String),

    #[error("invalid window: {0}")]
    InvalidWindow(String),

    /// A stored value violates a column invariant.
    #[error("corrupt row in {table}: {detail}")]
    CorruptRow { table: &'static str, detail: String },
}

/// Configuration for the warehouse database.
#[derive(Debug, Clone)]
pub struct WarehouseConfig {
    /// Root directory for futdb data.
    pub futdb_home: PathBuf,
    /// Path to the `DuckDB` database file.
    pub db_path: PathBuf,
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        let futdb_home = resolve_futdb_home();
        let db_path = env::var_os("FUTDB_DB_PATH")
            .map(PathBuf::from)
            .filter(|path| !path.as_os_str().is_empty())
            .unwrap_or_else(|| futdb_home.join(DB_FILE_NAME));
        Self { futdb_home, db_path }
    }
}

impl WarehouseConfig {
    /// Override the database path, keeping the resolved home.
    #[must_use]
    pub fn with_db_path(mut self, db_path: impl Into<PathBuf>) -> Self {
        self.db_path = db_path.into();
        self
    }
}

/// Handle over one `DuckDB` connection.
pub struct Warehouse {
    db_path: Option<PathBuf>,
    mode: AccessMode,
    connection: Connection,
}

impl Warehouse {
    /// Open (creating if needed) and migrate the database at `config.db_path`.
    pub fn open(config: &WarehouseConfig) -> Result<Self, WarehouseError> {
        if let Some(parent) = config.db_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let connection = duckdb::open_connection(&config.db_path, AccessMode::ReadWrite)?;
        let warehouse = Self {
            db_path: Some(config.db_path.clone()),
            mode: AccessMode::ReadWrite,
            connection,
        };
        warehouse.initialize()?;
        Ok(warehouse)
    }

    /// Open an existing database without migrating or writing to it.
    pub fn open_read_only(config: &WarehouseConfig) -> Result<Self, WarehouseError> {
        if !config.db_path.exists() {
            return Err(WarehouseError::DatabaseMissing {
                path: config.db_path.clone(),
            });
        }
        let connection = duckdb::open_connection(&config.db_path, AccessMode::ReadOnly)?;
        Ok(Self {
            db_path: Some(config.db_path.clone()),
            mode: AccessMode::ReadOnly,
            connection,
        })
    }

    /// Fresh migrated in-memory database.
    pub fn open_in_memory() -> Result<Self, WarehouseError> {
        let warehouse = Self {
            db_path: None,
            mode: AccessMode::ReadWrite,
            connection: duckdb::open_in_memory()?,
        };
        warehouse.initialize()?;
        Ok(warehouse)
    }

    /// Initialize database schema and views.
    pub fn initialize(&self) -> Result<(), WarehouseError> {
        migrations::apply_migrations(&self.connection)?;
        views::create_views(&self.connection)?;
        Ok(())
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    pub fn access_mode(&self) -> AccessMode {
        self.mode
    }

    /// Path to the database file, `None` for in-memory databases.
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    pub fn db_label(&self) -> String {
        self.db_path
            .as_ref()
            .map_or_else(|| String::from(":memory:"), |path| path.display().to_string())
    }

    /// Insert instruments that are not yet known. Existing ids are left
    /// untouched since instrument definitions never change.
    pub fn register_instruments(&self, instruments: &[Instrument]) -> Result<usize, WarehouseError> {
        if instruments.is_empty() {
            return Ok(0);
        }

        self.in_transaction(|connection| {
            let mut inserted = 0;
            for instrument in instruments {
                let existing: i64 = connection.query_row(
                    "SELECT COUNT(*) FROM dim_instrument WHERE instrument_id = ?",
                    params![instrument.instrument_id],
                    |row| row.get(0),
                )?;
                if existing > 0 {
                    continue;
                }
                let expiry = instrument.expiry_date.map(|date| date.to_string());
                let params: [&dyn ToSql; 6] = [
                    &instrument.instrument_id,
                    &instrument.native_symbol,
                    &instrument.root,
                    &instrument.month,
                    &instrument.year,
                    &expiry,
                ];
                connection.execute(
                    "INSERT INTO dim_instrument \
                     (instrument_id, native_symbol, root, month, year, expiry_date) \
                     VALUES (?, ?, ?, ?, ?, CAST(? AS DATE))",
                    params.as_slice(),
                )?;
                inserted += 1;
            }
            debug!(inserted, offered = instruments.len(), "registered instruments");
            Ok(inserted)
        })
    }

    pub fn register_contract_series(&self, series: &[ContractSeries]) -> Result<usize, WarehouseError> {
        if series.is_empty() {
            return Ok(0);
        }

        self.in_transaction(|connection| {
            for entry in series {
                let id = entry.id();
                let strategy = entry.roll_strategy.slug();
                let params: [&dyn ToSql; 4] = [&id, &entry.root, &entry.rank, &strategy];
                connection.execute(
                    "INSERT OR REPLACE INTO dim_contract_series \
                     (contract_series, root, rank, roll_strategy, description) \
                     VALUES (?, ?, ?, ?, NULL)",
                    params.as_slice(),
                )?;
            }
            Ok(series.len())
        })
    }

    /// Upsert daily bars on `(trading_date, contract_series)`.
    pub fn ingest_daily_bars(&self, bars: &[DailyBar]) -> Result<usize, WarehouseError> {
        if bars.is_empty() {
            return Ok(0);
        }

        self.in_transaction(|connection| {
            for bar in bars {
                let trading_date = bar.trading_date.to_string();
                let key: [&dyn ToSql; 2] = [&trading_date, &bar.contract_series];
                connection.execute(
                    "DELETE FROM g_continuous_bar_daily \
                     WHERE trading_date = CAST(? AS DATE) AND contract_series = ?",
                    key.as_slice(),
                )?;

                let params: [&dyn ToSql; 8] = [
                    &trading_date,
                    &bar.contract_series,
                    &bar.underlying_instrument_id,
                    &bar.open,
                    &bar.high,
                    &bar.low,
                    &bar.close,
                    &bar.volume,
                ];
                connection.execute(
                    "INSERT INTO g_continuous_bar_daily \
                     (trading_date, contract_series, underlying_instrument_id, open, high, low, close, volume) \
                     VALUES (CAST(? AS DATE), ?, ?, ?, ?, ?, ?, ?)",
                    params.as_slice(),
                )?;
            }
            info!(rows = bars.len(), "ingested daily bars");
            Ok(bars.len())
        })
    }

    /// Run `body` inside one transaction, committing on success.
    pub(crate) fn in_transaction<T>(
        &self,
        body: impl FnOnce(&Connection) -> Result<T, WarehouseError>,
    ) -> Result<T, WarehouseError> {
        self.connection.execute_batch("BEGIN TRANSACTION")?;
        let result = body(&self.connection);
        finalize_transaction(&self.connection, result)
    }
}

/// Finalize a transaction, committing on success or rolling back on failure.
fn finalize_transaction<T>(
    connection: &Connection,
    result: Result<T, WarehouseError>,
) -> Result<T, WarehouseError> {
    match result {
        Ok(value) => {
            connection.execute_batch("COMMIT")?;
            Ok(value)
        }
        Err(error) => {
            let _ = connection.execute_batch("ROLLBACK");
            Err(error)
        }
    }
}

/// Read a single-column result of `CAST(... AS VARCHAR)` dates.
pub(crate) fn query_dates(
    connection: &Connection,
    sql: &str,
    params: &[&dyn ToSql],
) -> Result<Vec<TradingDate>, WarehouseError> {
    let mut statement = connection.prepare(sql)?;
    let mut rows = statement.query(params)?;
    let mut dates = Vec::new();
    while let Some(row) = rows.next()? {
        let value: String = row.get(0)?;
        dates.push(TradingDate::parse(&value)?);
    }
    Ok(dates)
}

/// Read a scalar date that may be NULL (e.g. `MAX` over an empty table).
pub(crate) fn query_optional_date(
    connection: &Connection,
    sql: &str,
    params: &[&dyn ToSql],
) -> Result<Option<TradingDate>, WarehouseError> {
    let value: Option<String> = connection.query_row(sql, params, |row| row.get(0))?;
    value
        .map(|value| TradingDate::parse(&value))
        .transpose()
        .map_err(WarehouseError::from)
}

fn resolve_futdb_home() -> PathBuf {
    if let Some(path) = env::var_os("FUTDB_HOME") {
        let path = PathBuf::from(path);
        if !path.as_os_str().is_empty() {
            return path;
        }
    }

    if let Some(home) = env::var_os("HOME") {
        return PathBuf::from(home).join(".futdb");
    }

    PathBuf::from(".futdb")
}
