//! Database mirror of the canonical series mapping (`dim_canonical_series`).

use ::duckdb::{params, Connection, ToSql};
use futdb_core::{reconcile, CanonicalConfig, CanonicalMapping, MappingDiff};
use serde::Serialize;
use tracing::{info, warn};

use crate::{Warehouse, WarehouseError};

/// Outcome of writing the config into the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CanonicalSyncReport {
    /// Drift found before the write.
    pub diff_before: MappingDiff,
    pub roots_written: usize,
    pub roots_removed: usize,
}

/// Rows currently mirrored in the database, sorted by root.
pub fn load_db_mappings(connection: &Connection) -> Result<Vec<CanonicalMapping>, WarehouseError> {
    let mut statement = connection.prepare(
        "SELECT root, contract_series, description, optional \
         FROM dim_canonical_series ORDER BY root",
    )?;
    let mut rows = statement.query([])?;
    let mut mappings = Vec::new();
    while let Some(row) = rows.next()? {
        let description: Option<String> = row.get(2)?;
        let optional: Option<bool> = row.get(3)?;
        mappings.push(CanonicalMapping {
            root: row.get(0)?,
            contract_series: row.get(1)?,
            description: description.unwrap_or_default(),
            optional: optional.unwrap_or(false),
        });
    }
    Ok(mappings)
}

/// Compare the config against the database mirror.
pub fn diff_against_db(
    connection: &Connection,
    config: &CanonicalConfig,
) -> Result<MappingDiff, WarehouseError> {
    let actual = load_db_mappings(connection)?;
    Ok(reconcile(config.mappings(), &actual))
}

/// Make `dim_canonical_series` an exact copy of `config`.
pub fn sync_canonical(
    warehouse: &Warehouse,
    config: &CanonicalConfig,
) -> Result<CanonicalSyncReport, WarehouseError> {
    let diff_before = diff_against_db(warehouse.connection(), config)?;
    if !diff_before.is_clean() {
        warn!(
            missing = diff_before.missing_in_db.len(),
            extra = diff_before.extra_in_db.len(),
            mismatched = diff_before.mismatches.len(),
            "canonical mirror drifted from config; rewriting"
        );
    }

    let roots_removed = diff_before.extra_in_db.len();
    warehouse.in_transaction(|connection| {
        for root in &diff_before.extra_in_db {
            connection.execute(
                "DELETE FROM dim_canonical_series WHERE root = ?",
                params![root],
            )?;
        }
        for mapping in config.mappings() {
            let params: [&dyn ToSql; 4] = [
                &mapping.root,
                &mapping.contract_series,
                &mapping.description,
                &mapping.optional,
            ];
            // Upsert in place; DuckDB rejects delete-then-insert of one key
            // inside a single transaction.
            connection.execute(
                "INSERT OR REPLACE INTO dim_canonical_series \
                 (root, contract_series, description, optional, updated_at) \
                 VALUES (?, ?, ?, ?, CURRENT_TIMESTAMP)",
                params.as_slice(),
            )?;
        }
        Ok(())
    })?;

    let report = CanonicalSyncReport {
        roots_written: config.mappings().len(),
        roots_removed,
        diff_before,
    };
    info!(
        roots_written = report.roots_written,
        roots_removed = report.roots_removed,
        "synced canonical mapping"
    );
    Ok(report)
}
