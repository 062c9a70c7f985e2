use futdb_core::{CheckCategory, CheckDescriptor, CheckResult, Severity};

use crate::diagnostics::{Check, CheckContext};
use crate::WarehouseError;

/// Each enriched roll moves to a later expiry. Enrichment is best-effort,
/// so rolls without both expiries are not judged.
pub struct ExpiryAdvances;

impl Check for ExpiryAdvances {
    fn descriptor(&self) -> CheckDescriptor {
        CheckDescriptor::new(
            "rolls.expiry_advances",
            "Roll events move to a later expiry",
            CheckCategory::DataIntegrity,
            Severity::Warn,
        )
    }

    fn run(&self, ctx: &CheckContext<'_>) -> Result<CheckResult, WarehouseError> {
        let descriptor = self.descriptor();
        if !ctx.table_exists("dim_roll_event")? {
            return Ok(descriptor.skip("dim_roll_event missing"));
        }

        let judged = ctx.count(
            "SELECT COUNT(*) FROM dim_roll_event \
             WHERE old_expiry_date IS NOT NULL AND new_expiry_date IS NOT NULL",
            &[],
        )?;
        if judged == 0 {
            return Ok(descriptor.skip("no enriched roll events"));
        }
        let backwards = ctx.count(
            "SELECT COUNT(*) FROM dim_roll_event \
             WHERE old_expiry_date IS NOT NULL AND new_expiry_date IS NOT NULL \
               AND new_expiry_date <= old_expiry_date",
            &[],
        )?;

        let result = if backwards == 0 {
            descriptor.pass("ok")
        } else {
            descriptor.fail(format!("{backwards} rolls do not advance expiry"))
        };
        Ok(result
            .with_metric("violations", backwards)
            .with_metric("judged_events", judged))
    }
}
