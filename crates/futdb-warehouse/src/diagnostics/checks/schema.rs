use futdb_core::{CheckCategory, CheckDescriptor, CheckResult, Severity};

use crate::diagnostics::{Check, CheckContext};
use crate::WarehouseError;

/// A required base table is present.
pub struct TableExists {
    pub table: &'static str,
}

impl Check for TableExists {
    fn descriptor(&self) -> CheckDescriptor {
        CheckDescriptor::new(
            format!("schema.table.{}", self.table),
            format!("Table exists: {}", self.table),
            CheckCategory::Structural,
            Severity::Hard,
        )
    }

    fn run(&self, ctx: &CheckContext<'_>) -> Result<CheckResult, WarehouseError> {
        let descriptor = self.descriptor();
        Ok(if ctx.table_exists(self.table)? {
            descriptor.pass("ok")
        } else {
            descriptor.fail("missing (run migrations)")
        })
    }
}

/// A required view is present.
pub struct ViewExists {
    pub view: &'static str,
}

impl Check for ViewExists {
    fn descriptor(&self) -> CheckDescriptor {
        CheckDescriptor::new(
            format!("schema.view.{}", self.view),
            format!("View exists: {}", self.view),
            CheckCategory::Structural,
            Severity::Hard,
        )
    }

    fn run(&self, ctx: &CheckContext<'_>) -> Result<CheckResult, WarehouseError> {
        let descriptor = self.descriptor();
        Ok(if ctx.view_exists(self.view)? {
            descriptor.pass("ok")
        } else {
            descriptor.fail("missing (run migrations)")
        })
    }
}
