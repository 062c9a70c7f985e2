use futdb_core::{CheckCategory, CheckDescriptor, CheckResult, Severity};

use crate::diagnostics::{Check, CheckContext};
use crate::migrations::quote_literal;
use crate::WarehouseError;

const BARS: &str = "g_continuous_bar_daily";

/// Tables whose natural key must be unique. The set is fixed at compile
/// time; adding a table means adding a variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FactTable {
    DailyBars,
    RollEvents,
    Sessions,
    Instruments,
    CanonicalSeries,
}

impl FactTable {
    pub const ALL: [Self; 5] = [
        Self::DailyBars,
        Self::RollEvents,
        Self::Sessions,
        Self::Instruments,
        Self::CanonicalSeries,
    ];

    pub const fn table(self) -> &'static str {
        match self {
            Self::DailyBars => BARS,
            Self::RollEvents => "dim_roll_event",
            Self::Sessions => "dim_session",
            Self::Instruments => "dim_instrument",
            Self::CanonicalSeries => "dim_canonical_series",
        }
    }

    pub const fn natural_key(self) -> &'static [&'static str] {
        match self {
            Self::DailyBars => &["trading_date", "contract_series"],
            Self::RollEvents => &["contract_series", "rank", "roll_date"],
            Self::Sessions => &["trade_date"],
            Self::Instruments => &["instrument_id"],
            Self::CanonicalSeries => &["root"],
        }
    }
}

/// No two rows share a natural key. Absent tables are skipped as INFO.
pub struct DuplicateKeys {
    pub table: FactTable,
}

impl Check for DuplicateKeys {
    fn descriptor(&self) -> CheckDescriptor {
        let table = self.table.table();
        CheckDescriptor::new(
            format!("integrity.duplicates.{table}"),
            format!(
                "Duplicates absent: {table} on ({})",
                self.table.natural_key().join(", ")
            ),
            CheckCategory::DataIntegrity,
            Severity::Hard,
        )
    }

    fn run(&self, ctx: &CheckContext<'_>) -> Result<CheckResult, WarehouseError> {
        let descriptor = self.descriptor();
        let table = self.table.table();
        if !ctx.table_exists(table)? {
            return Ok(descriptor
                .skip("table not present")
                .with_severity(Severity::Info));
        }

        let key = self.table.natural_key().join(", ");
        let groups = ctx.count(
            &format!(
                "SELECT COUNT(*) FROM (SELECT {key} FROM {table} GROUP BY {key} HAVING COUNT(*) > 1)"
            ),
            &[],
        )?;
        Ok(descriptor
            .from_violations(groups, "ok", |n| format!("{n} duplicate key groups"))
            .with_metric("duplicate_key_groups", groups))
    }
}

/// Row-level quality rules over the daily bars.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarRule {
    /// high >= open, low, close and low <= open, close; exempt roots skipped.
    OhlcSanity,
    NullRequiredColumns,
    NegativeVolume,
    /// Bars whose series is not in `dim_contract_series`.
    UnregisteredSeries,
    /// Bars whose underlying id has no `dim_instrument` row.
    UnlinkedInstruments,
}

impl BarRule {
    pub const ALL: [Self; 5] = [
        Self::OhlcSanity,
        Self::NullRequiredColumns,
        Self::NegativeVolume,
        Self::UnregisteredSeries,
        Self::UnlinkedInstruments,
    ];

    const fn slug(self) -> &'static str {
        match self {
            Self::OhlcSanity => "ohlc_sanity",
            Self::NullRequiredColumns => "null_required_columns",
            Self::NegativeVolume => "negative_volume",
            Self::UnregisteredSeries => "unregistered_contract_series",
            Self::UnlinkedInstruments => "unlinked_instruments",
        }
    }

    const fn label(self) -> &'static str {
        match self {
            Self::OhlcSanity => "OHLC sanity",
            Self::NullRequiredColumns => "Null required columns",
            Self::NegativeVolume => "Negative volume",
            Self::UnregisteredSeries => "Unregistered contract series",
            Self::UnlinkedInstruments => "Unlinked instruments",
        }
    }

    // Metadata gaps only degrade roll enrichment, so they warn.
    const fn severity(self) -> Severity {
        match self {
            Self::UnregisteredSeries | Self::UnlinkedInstruments => Severity::Warn,
            _ => Severity::Hard,
        }
    }

    const fn dependency(self) -> Option<&'static str> {
        match self {
            Self::UnregisteredSeries => Some("dim_contract_series"),
            Self::UnlinkedInstruments => Some("dim_instrument"),
            _ => None,
        }
    }
}

pub struct BarValidator {
    pub rule: BarRule,
}

impl BarValidator {
    fn violation_sql(&self, ctx: &CheckContext<'_>) -> String {
        match self.rule {
            BarRule::OhlcSanity => {
                let exempt = ctx
                    .config
                    .ohlc_exempt_roots()
                    .iter()
                    .map(|root| quote_literal(root))
                    .collect::<Vec<_>>();
                let exemption = if exempt.is_empty() {
                    String::new()
                } else {
                    format!(
                        "split_part(contract_series, '_', 1) NOT IN ({}) AND ",
                        exempt.join(", ")
                    )
                };
                format!(
                    "SELECT COUNT(*) FROM {BARS} WHERE {exemption}\
                     (high < low OR high < open OR high < close OR low > open OR low > close)"
                )
            }
            BarRule::NullRequiredColumns => format!(
                "SELECT COUNT(*) FROM {BARS} WHERE trading_date IS NULL OR contract_series IS NULL \
                 OR underlying_instrument_id IS NULL OR open IS NULL OR high IS NULL \
                 OR low IS NULL OR close IS NULL"
            ),
            BarRule::NegativeVolume => {
                format!("SELECT COUNT(*) FROM {BARS} WHERE volume < 0")
            }
            BarRule::UnregisteredSeries => format!(
                "SELECT COUNT(*) FROM {BARS} b \
                 LEFT JOIN dim_contract_series s ON s.contract_series = b.contract_series \
                 WHERE s.contract_series IS NULL"
            ),
            BarRule::UnlinkedInstruments => format!(
                "SELECT COUNT(*) FROM {BARS} b \
                 LEFT JOIN dim_instrument i ON i.instrument_id = b.underlying_instrument_id \
                 WHERE b.underlying_instrument_id IS NOT NULL AND i.instrument_id IS NULL"
            ),
        }
    }
}

impl Check for BarValidator {
    fn descriptor(&self) -> CheckDescriptor {
        CheckDescriptor::new(
            format!("continuous_daily.validator.{}", self.rule.slug()),
            format!("Continuous daily: {}", self.rule.label()),
            CheckCategory::DataIntegrity,
            self.rule.severity(),
        )
    }

    fn run(&self, ctx: &CheckContext<'_>) -> Result<CheckResult, WarehouseError> {
        let descriptor = self.descriptor();
        if !ctx.table_exists(BARS)? {
            return Ok(descriptor.skip("g_continuous_bar_daily missing"));
        }
        if let Some(dependency) = self.rule.dependency() {
            if !ctx.table_exists(dependency)? {
                return Ok(descriptor.skip(format!("{dependency} missing")));
            }
        }

        let violations = ctx.count(&self.violation_sql(ctx), &[])?;
        Ok(descriptor
            .from_violations(violations, "ok", |n| format!("{n} violations"))
            .with_metric("violations", violations))
    }
}
