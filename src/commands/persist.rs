use std::path::Path;

use tracing::info;

use crate::mapping;

use super::report::ActionOutcome;
use super::session::MappingSession;

impl MappingSession {
    /// Write the table to `path` as a JSON document keyed by target bone.
    pub fn save_mappings(&self, path: &Path) -> ActionOutcome {
        const ACTION: &str = "save_mappings";

        match mapping::save_mappings(&self.table, &self.vocabulary, path) {
            Ok(()) => self.outcome(ACTION, format!("Saved to {}", path.display())),
            Err(e) => self.failure(ACTION, format!("{:#}", e)),
        }
    }

    /// Replace the table with the document at `path`. Slots missing from the
    /// document are added unmapped; duplicate rows are settled by priority.
    /// The loaded rows are not checked against the skeleton until
    /// `validate_mappings` runs.
    pub fn load_mappings(&mut self, path: &Path) -> ActionOutcome {
        const ACTION: &str = "load_mappings";

        let mut table = match mapping::load_mappings(path) {
            Ok(table) => table,
            Err(e) => return self.failure(ACTION, format!("{:#}", e)),
        };
        table.ensure_slots(&self.vocabulary);
        let conflicts = table.resolve_conflicts();
        self.table = table;

        info!("Loaded mapping table from {:?}", path);
        ActionOutcome::ok(
            self.report(ACTION, format!("Loaded from {}", path.display()))
                .with_conflicts(conflicts),
        )
    }
}
