//! Database views for downstream consumers.

use ::duckdb::Connection;

pub const CANONICAL_DAILY_VIEW: &str = "v_canonical_continuous_bar_daily";

/// Create database views.
///
/// - `v_canonical_continuous_bar_daily`: one row per `(root, trading_date)`
///   drawn from each root's designated series. Uniqueness is asserted by
///   diagnostics rather than enforced here.
///
/// # Errors
/// Returns an error if the view creation SQL fails to execute.
pub fn create_views(connection: &Connection) -> Result<(), ::duckdb::Error> {
    connection.execute_batch(
        r"
CREATE OR REPLACE VIEW v_canonical_continuous_bar_daily AS
SELECT
    c.root,
    b.trading_date,
    b.contract_series,
    b.underlying_instrument_id,
    b.open,
    b.high,
    b.low,
    b.close,
    b.volume
FROM g_continuous_bar_daily b
JOIN dim_canonical_series c ON c.contract_series = b.contract_series;
",
    )
}
