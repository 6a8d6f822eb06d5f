//! Table validation against the current skeleton and vocabulary.
//!
//! Invalid rows are disabled, never removed, so the host can still show
//! them and the user can repair them.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;
use tracing::warn;

use crate::skeleton::{Skeleton, TargetVocabulary};

use super::table::MappingTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DisableReason {
    /// Source bone is empty or not in the selected skeleton
    MissingSource,
    /// Target bone is not part of the vocabulary
    UnknownTarget,
    /// Another enabled row with higher precedence maps the same target
    DuplicateTarget,
}

impl fmt::Display for DisableReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DisableReason::MissingSource => "source bone not found in skeleton",
            DisableReason::UnknownTarget => "target bone not in vocabulary",
            DisableReason::DuplicateTarget => "duplicate target",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisabledEntry {
    pub target_bone: String,
    pub source_bone: String,
    pub reason: DisableReason,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationReport {
    /// Enabled rows left after validation
    pub valid_count: usize,
    pub disabled: Vec<DisabledEntry>,
}

/// Disable every enabled row whose source bone is missing from `source`,
/// whose target is outside `vocabulary`, or which loses a duplicate-target
/// contest. Disabled rows are left as they are.
pub fn validate_and_disable_invalid(
    table: &mut MappingTable,
    source: &Skeleton,
    vocabulary: &TargetVocabulary,
) -> ValidationReport {
    let mut report = ValidationReport::default();

    for entry in table.entries_mut().filter(|e| e.enabled) {
        let reason = if entry.source_bone.is_empty() || !source.contains(&entry.source_bone) {
            DisableReason::MissingSource
        } else if !vocabulary.contains(&entry.target_bone) {
            DisableReason::UnknownTarget
        } else {
            continue;
        };
        warn!(
            "Disabled {:?} -> {:?}: {}",
            entry.source_bone, entry.target_bone, reason
        );
        entry.enabled = false;
        report.disabled.push(DisabledEntry {
            target_bone: entry.target_bone.clone(),
            source_bone: entry.source_bone.clone(),
            reason,
        });
    }

    for conflict in table.resolve_conflicts() {
        report.disabled.push(DisabledEntry {
            target_bone: conflict.target_bone,
            source_bone: conflict.disabled_source,
            reason: DisableReason::DuplicateTarget,
        });
    }

    let mut enabled_per_target: HashMap<&str, usize> = HashMap::new();
    for entry in table.iter().filter(|e| e.enabled) {
        *enabled_per_target.entry(entry.target_bone.as_str()).or_default() += 1;
    }
    debug_assert!(enabled_per_target.values().all(|&n| n == 1));
    report.valid_count = enabled_per_target.len();

    report
}
