//! Detection actions: full auto-detect and threshold-driven gap filling.

use tracing::info;

use crate::error::MappingError;
use crate::mapping::{ConsolidationReport, Consolidator, MappingTable};
use crate::matcher::generate_candidates;

use super::report::ActionOutcome;
use super::session::MappingSession;

impl MappingSession {
    /// Recompute every non-manual row from the current skeleton pair.
    pub fn auto_detect(&mut self) -> ActionOutcome {
        self.auto_detect_with_abort(&|| false)
    }

    /// [`MappingSession::auto_detect`], polling `abort` between slots. An
    /// aborted pass reports failure and leaves the table as it was.
    pub fn auto_detect_with_abort(&mut self, abort: &dyn Fn() -> bool) -> ActionOutcome {
        const ACTION: &str = "auto_detect";

        let (table, report) = match self.run_detection(abort) {
            Ok(result) => result,
            Err(e) => return self.failure(ACTION, e),
        };
        self.table = table;

        let message = format!(
            "{} automatic, {} hierarchical, {} mirrored, {} manual kept",
            report.automatic,
            report.hierarchical,
            report.mirrored,
            report.locked.len()
        );
        info!("auto_detect: {}", message);

        let details = report
            .rejections
            .iter()
            .map(|r| format!("{:?} rejected {:?}: {}", r.target_bone, r.source_bone, r.reason))
            .collect();
        ActionOutcome::ok(
            self.report(ACTION, message)
                .with_conflicts(report.conflicts)
                .with_details(details),
        )
    }

    fn run_detection(
        &self,
        abort: &dyn Fn() -> bool,
    ) -> Result<(MappingTable, ConsolidationReport), MappingError> {
        let source = self.require_source()?;
        let config = self.scorer.config();
        let candidates = generate_candidates(
            &self.scorer,
            source,
            &self.vocabulary,
            &self.table,
            config.thresholds.similarity,
        );
        Consolidator::new(source, &self.vocabulary, config).consolidate(
            &candidates,
            &self.table,
            abort,
        )
    }

    /// Map every unmapped, unlocked slot to its best name match scoring at
    /// least `threshold`. Existing rows are left alone and every write keeps
    /// the hierarchy invariant.
    pub fn batch_map_similar_names(&mut self, threshold: f32) -> ActionOutcome {
        const ACTION: &str = "batch_map_similar_names";

        if !(0.0..=1.0).contains(&threshold) {
            return self.failure(
                ACTION,
                MappingError::Input(format!("threshold must be within [0, 1], got {}", threshold)),
            );
        }
        let source = match self.require_source() {
            Ok(source) => source,
            Err(e) => return self.failure(ACTION, e),
        };

        let candidates =
            generate_candidates(&self.scorer, source, &self.vocabulary, &self.table, threshold);
        let mut table = self.table.clone();
        table.ensure_slots(&self.vocabulary);
        let report = Consolidator::new(source, &self.vocabulary, self.scorer.config())
            .fill_unmapped(&candidates, &mut table);
        self.table = table;

        let message = format!(
            "{} slot(s) mapped at threshold {:.2}, {} still unmapped",
            report.automatic,
            threshold,
            report.unmapped.len()
        );
        info!("batch_map_similar_names: {}", message);
        ActionOutcome::ok(self.report(ACTION, message).with_conflicts(report.conflicts))
    }
}
