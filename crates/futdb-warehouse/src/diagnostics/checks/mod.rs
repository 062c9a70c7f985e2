//! The standard post-ingest check catalog.

mod calendar;
mod canonical;
mod coverage;
mod integrity;
mod rolls;
mod schema;

pub use calendar::{SessionFresh, SessionPopulated};
pub use canonical::{MappingInSync, PresenceInWindow, UniqueRootDate};
pub use coverage::CalendarCoverage;
pub use integrity::{BarRule, BarValidator, DuplicateKeys, FactTable};
pub use rolls::ExpiryAdvances;
pub use schema::{TableExists, ViewExists};

use super::Check;
use crate::views::CANONICAL_DAILY_VIEW;

pub const REQUIRED_TABLES: [&str; 6] = [
    "dim_instrument",
    "dim_contract_series",
    "g_continuous_bar_daily",
    "dim_roll_event",
    "dim_session",
    "dim_canonical_series",
];

/// Every standard check, in report order. Order is cosmetic; no check
/// depends on another having run.
pub fn standard_catalog() -> Vec<Box<dyn Check>> {
    let mut catalog: Vec<Box<dyn Check>> = Vec::new();
    for table in REQUIRED_TABLES {
        catalog.push(Box::new(TableExists { table }));
    }
    catalog.push(Box::new(ViewExists {
        view: CANONICAL_DAILY_VIEW,
    }));
    catalog.push(Box::new(MappingInSync));
    catalog.push(Box::new(SessionPopulated));
    catalog.push(Box::new(SessionFresh));
    for rule in BarRule::ALL {
        catalog.push(Box::new(BarValidator { rule }));
    }
    catalog.push(Box::new(UniqueRootDate));
    catalog.push(Box::new(PresenceInWindow));
    catalog.push(Box::new(CalendarCoverage));
    catalog.push(Box::new(ExpiryAdvances));
    for table in FactTable::ALL {
        catalog.push(Box::new(DuplicateKeys { table }));
    }
    catalog
}
