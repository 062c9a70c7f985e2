use ::duckdb::{params, ToSql};
use futdb_core::{CanonicalConfig, DateWindow, TradingDate};

use crate::views::CANONICAL_DAILY_VIEW;
use crate::{query_optional_date, Warehouse, WarehouseError};

/// Everything a check may look at. Checks only read.
pub struct CheckContext<'a> {
    pub warehouse: &'a Warehouse,
    pub config: &'a CanonicalConfig,
    /// Calendar window for recent-activity checks; `None` when the database
    /// holds no canonical data to anchor it.
    pub window: Option<DateWindow>,
}

impl<'a> CheckContext<'a> {
    pub fn table_exists(&self, table: &str) -> Result<bool, WarehouseError> {
        self.relation_exists(table, "BASE TABLE")
    }

    pub fn view_exists(&self, view: &str) -> Result<bool, WarehouseError> {
        self.relation_exists(view, "VIEW")
    }

    fn relation_exists(&self, name: &str, kind: &str) -> Result<bool, WarehouseError> {
        let count: i64 = self.warehouse.connection().query_row(
            "SELECT COUNT(*) FROM information_schema.tables \
             WHERE table_schema = 'main' AND table_name = ? AND table_type = ?",
            params![name, kind],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// The canonical view and the tables it reads are all present. DuckDB
    /// keeps a view after its base table is dropped, so the view alone is
    /// not enough to query it.
    pub fn canonical_view_usable(&self) -> Result<bool, WarehouseError> {
        Ok(self.view_exists(CANONICAL_DAILY_VIEW)?
            && self.tables_exist(&["g_continuous_bar_daily", "dim_canonical_series"])?)
    }

    /// True when every named table exists.
    pub fn tables_exist(&self, tables: &[&str]) -> Result<bool, WarehouseError> {
        for table in tables {
            if !self.table_exists(table)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    pub fn count(&self, sql: &str, params: &[&dyn ToSql]) -> Result<i64, WarehouseError> {
        let value: Option<i64> = self
            .warehouse
            .connection()
            .query_row(sql, params, |row| row.get(0))?;
        Ok(value.unwrap_or(0))
    }

    pub fn optional_date(
        &self,
        sql: &str,
        params: &[&dyn ToSql],
    ) -> Result<Option<TradingDate>, WarehouseError> {
        query_optional_date(self.warehouse.connection(), sql, params)
    }
}
