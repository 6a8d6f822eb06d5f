//! Direct table edits: manual assignment, clearing and mirroring.

use tracing::{info, warn};

use crate::error::MappingError;
use crate::mapping::{
    pair_consistent, ConflictRecord, DetectionMethod, MappingEntry, MirrorPolicy, MirrorResolver,
};

use super::report::ActionOutcome;
use super::session::MappingSession;

impl MappingSession {
    /// Assign `source` to `target` as a manual entry (confidence 1.0).
    ///
    /// An empty `source` clears the slot and releases its manual lock.
    /// Automatic rows that would break ancestor order against the new entry,
    /// or that use the same source bone, are disabled and reported.
    pub fn set_manual_mapping(&mut self, source: &str, target: &str) -> ActionOutcome {
        const ACTION: &str = "set_manual_mapping";

        if let Err(e) = self.check_manual_request(source, target) {
            return self.failure(ACTION, e);
        }

        if source.is_empty() {
            self.table.set(MappingEntry::unmapped(target));
            info!("Cleared manual mapping for {:?}", target);
            return self.outcome(ACTION, format!("{:?} cleared", target));
        }

        let mut conflicts = self.disable_contradicting(source, target);
        self.table
            .set(MappingEntry::new(target, source, DetectionMethod::Manual, 1.0));
        conflicts.extend(self.table.resolve_conflicts());

        let message = format!("{:?} -> {:?} set manually", source, target);
        info!("{}", message);
        ActionOutcome::ok(self.report(ACTION, message).with_conflicts(conflicts))
    }

    fn check_manual_request(&self, source: &str, target: &str) -> Result<(), MappingError> {
        let skeleton = self.require_source()?;
        if !self.vocabulary.contains(target) {
            return Err(MappingError::Input(format!(
                "{:?} is not a target slot of {}",
                target,
                self.vocabulary.name()
            )));
        }
        if !source.is_empty() && !skeleton.contains(source) {
            return Err(MappingError::Input(format!(
                "{:?} is not a bone of the selected skeleton",
                source
            )));
        }
        Ok(())
    }

    /// Disable non-manual rows that the manual entry `target -> source`
    /// contradicts. Manual rows are left alone even when they disagree.
    fn disable_contradicting(&mut self, source: &str, target: &str) -> Vec<ConflictRecord> {
        let Some(skeleton) = self.source.as_ref() else {
            return Vec::new();
        };
        let index = skeleton.index();
        let topology = self.vocabulary.topology();
        let mut conflicts = Vec::new();

        for entry in self.table.entries_mut() {
            if !entry.is_mapped() || entry.target_bone == target || !index.contains(&entry.source_bone)
            {
                continue;
            }
            let consistent = pair_consistent(
                index,
                topology,
                (target, source),
                (entry.target_bone.as_str(), entry.source_bone.as_str()),
            );
            let duplicate = entry.source_bone == source;
            if consistent && !duplicate {
                continue;
            }
            if entry.is_manual() {
                warn!(
                    "Manual mapping {:?} -> {:?} disagrees with manual {:?} -> {:?}",
                    source, target, entry.source_bone, entry.target_bone
                );
                continue;
            }

            entry.enabled = false;
            let description = if duplicate {
                format!("source bone now mapped manually to {:?}", target)
            } else {
                format!("breaks hierarchy order against manual {:?}", target)
            };
            warn!("Disabled {:?} -> {:?}: {}", entry.source_bone, entry.target_bone, description);
            conflicts.push(ConflictRecord {
                target_bone: entry.target_bone.clone(),
                kept_source: String::new(),
                disabled_source: entry.source_bone.clone(),
                description,
            });
        }
        conflicts
    }

    /// Reset every row, manual ones included.
    pub fn clear_mappings(&mut self) -> ActionOutcome {
        let cleared = self.table.mapped().count();
        self.table.clear();
        self.table.ensure_slots(&self.vocabulary);
        info!("Cleared {} mapping(s)", cleared);
        self.outcome("clear_mappings", format!("{} mapping(s) cleared", cleared))
    }

    /// Copy confident rows onto their opposite-side slots, replacing weaker
    /// automatic rows. Manual slots are never written.
    pub fn mirror_mappings(&mut self) -> ActionOutcome {
        const ACTION: &str = "mirror_mappings";

        let skeleton = match self.require_source() {
            Ok(skeleton) => skeleton,
            Err(e) => return self.failure(ACTION, e),
        };

        let mut table = self.table.clone();
        let mirror = MirrorResolver::new(self.scorer.config()).propagate(
            &mut table,
            skeleton.index(),
            self.vocabulary.topology(),
            MirrorPolicy::ReplaceWeaker,
        );
        let conflicts = table.resolve_conflicts();
        self.table = table;

        let message = format!(
            "{} mapping(s) mirrored, {} skipped",
            mirror.written.len(),
            mirror.skipped.len()
        );
        let details = mirror
            .skipped
            .iter()
            .map(|s| match &s.source_bone {
                Some(source) => format!("{:?} <- {:?} skipped: {}", s.target_bone, source, s.reason),
                None => format!("{:?} skipped: {}", s.target_bone, s.reason),
            })
            .collect();
        ActionOutcome::ok(
            self.report(ACTION, message)
                .with_conflicts(conflicts)
                .with_details(details),
        )
    }
}
