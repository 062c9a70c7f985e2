use ::duckdb::{params, Connection};
use tracing::info;

struct Migration {
    version: &'static str,
    sql: &'static str,
}

// Fact tables carry no primary key: uniqueness of their natural keys is
// asserted by the diagnostics duplicate checks, not by the engine.
const MIGRATIONS: &[Migration] = &[
    Migration {
        version: "0001_core_tables",
        sql: r#"
CREATE TABLE IF NOT EXISTS dim_instrument (
    instrument_id BIGINT PRIMARY KEY,
    native_symbol TEXT NOT NULL,
    root TEXT NOT NULL,
    month INTEGER,
    year INTEGER,
    expiry_date DATE,
    created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS dim_contract_series (
    contract_series TEXT PRIMARY KEY,
    root TEXT NOT NULL,
    rank INTEGER NOT NULL,
    roll_strategy TEXT NOT NULL,
    description TEXT
);

CREATE TABLE IF NOT EXISTS g_continuous_bar_daily (
    trading_date DATE NOT NULL,
    contract_series TEXT NOT NULL,
    underlying_instrument_id BIGINT,
    open DOUBLE,
    high DOUBLE,
    low DOUBLE,
    close DOUBLE,
    volume BIGINT,
    updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS dim_roll_event (
    contract_series TEXT NOT NULL,
    rank INTEGER NOT NULL,
    roll_date DATE NOT NULL,
    old_instrument_id BIGINT NOT NULL,
    new_instrument_id BIGINT NOT NULL,
    old_native_symbol TEXT,
    new_native_symbol TEXT,
    old_expiry_date DATE,
    new_expiry_date DATE,
    detected_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);
"#,
    },
    Migration {
        version: "0002_calendar_and_canonical",
        sql: r#"
CREATE TABLE IF NOT EXISTS dim_session (
    trade_date DATE PRIMARY KEY,
    week INTEGER NOT NULL,
    month INTEGER NOT NULL,
    quarter INTEGER NOT NULL,
    is_holiday BOOLEAN NOT NULL DEFAULT FALSE
);

CREATE TABLE IF NOT EXISTS dim_canonical_series (
    root TEXT PRIMARY KEY,
    contract_series TEXT NOT NULL,
    description TEXT,
    optional BOOLEAN NOT NULL DEFAULT FALSE,
    updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);
"#,
    },
    Migration {
        version: "0003_indexes",
        sql: r#"
CREATE INDEX IF NOT EXISTS idx_bar_daily_series_date ON g_continuous_bar_daily(contract_series, trading_date);
CREATE INDEX IF NOT EXISTS idx_roll_event_series_date ON dim_roll_event(contract_series, roll_date);
"#,
    },
];

/// Applies every migration not yet listed in the `schema_version` ledger.
pub fn apply_migrations(connection: &Connection) -> Result<(), ::duckdb::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (\
             version TEXT PRIMARY KEY, \
             applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP)",
    )?;

    for migration in MIGRATIONS {
        let already_applied: bool = connection.query_row(
            "SELECT EXISTS (SELECT 1 FROM schema_version WHERE version = ?)",
            params![migration.version],
            |row| row.get(0),
        )?;
        if already_applied {
            continue;
        }

        connection.execute_batch(migration.sql)?;
        connection.execute(
            "INSERT INTO schema_version (version) VALUES (?)",
            params![migration.version],
        )?;
        info!(version = migration.version, "applied migration");
    }

    Ok(())
}

/// Quotes a value for inlining into an `IN (...)` list.
pub(crate) fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_recorded_once() {
        let connection = Connection::open_in_memory().expect("connection");
        apply_migrations(&connection).expect("first run");
        apply_migrations(&connection).expect("second run");
        let count: i64 = connection
            .query_row("SELECT COUNT(*) FROM schema_version", [], |row| row.get(0))
            .expect("count");
        assert_eq!(count, i64::try_from(MIGRATIONS.len()).expect("fits"));
    }

    #[test]
    fn quotes_embedded_apostrophes() {
        assert_eq!(quote_literal("O'Hare"), "'O''Hare'");
    }
}
