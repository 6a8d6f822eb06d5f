//! Type definitions for the mapping table.
//!
//! These types are serialized both into the persisted mapping document and
//! into action reports handed to the host.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// How a mapping entry was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DetectionMethod {
    /// Set by the user; never replaced by an automatic pass
    Manual,
    /// Best-scoring name candidate accepted by consolidation
    Automatic,
    /// Copied from the opposite side's entry
    Mirror,
    /// Inferred from the parent slot's mapping and sibling structure
    Hierarchical,
}

impl DetectionMethod {
    /// Conflict priority: Manual > Mirror > Hierarchical > Automatic.
    pub fn priority(self) -> u8 {
        match self {
            DetectionMethod::Manual => 3,
            DetectionMethod::Mirror => 2,
            DetectionMethod::Hierarchical => 1,
            DetectionMethod::Automatic => 0,
        }
    }
}

impl fmt::Display for DetectionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DetectionMethod::Manual => "manual",
            DetectionMethod::Automatic => "automatic",
            DetectionMethod::Mirror => "mirror",
            DetectionMethod::Hierarchical => "hierarchical",
        };
        f.write_str(s)
    }
}

/// One row of the mapping table: a source bone assigned to a target slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingEntry {
    /// Source bone name; empty when the slot is unmapped
    pub source_bone: String,
    /// Target slot name from the fixed vocabulary
    pub target_bone: String,
    pub enabled: bool,
    pub detection_method: DetectionMethod,
    /// Match confidence in [0, 1]; always 1.0 for manual entries
    pub confidence: f32,
}

impl MappingEntry {
    /// An enabled entry. Confidence is clamped to [0, 1] and pinned to 1.0
    /// for manual entries; an empty source produces a disabled entry.
    pub fn new(
        target_bone: impl Into<String>,
        source_bone: impl Into<String>,
        detection_method: DetectionMethod,
        confidence: f32,
    ) -> Self {
        let source_bone = source_bone.into();
        let mut entry = Self {
            enabled: !source_bone.is_empty(),
            source_bone,
            target_bone: target_bone.into(),
            detection_method,
            confidence,
        };
        entry.pin_confidence();
        entry
    }

    /// Placeholder row for a slot with no source bone.
    pub fn unmapped(target_bone: impl Into<String>) -> Self {
        Self {
            source_bone: String::new(),
            target_bone: target_bone.into(),
            enabled: false,
            detection_method: DetectionMethod::Automatic,
            confidence: 0.0,
        }
    }

    /// Enabled and pointing at a source bone.
    pub fn is_mapped(&self) -> bool {
        self.enabled && !self.source_bone.is_empty()
    }

    pub fn is_manual(&self) -> bool {
        self.detection_method == DetectionMethod::Manual
    }

    /// Clamp confidence into range and apply the manual pin.
    pub fn pin_confidence(&mut self) {
        self.confidence = if self.is_manual() {
            1.0
        } else if self.confidence.is_nan() {
            0.0
        } else {
            self.confidence.clamp(0.0, 1.0)
        };
    }

    /// Ordering used to settle two entries competing for one slot: method
    /// priority first, then confidence.
    pub fn precedence(&self, other: &Self) -> Ordering {
        self.detection_method
            .priority()
            .cmp(&other.detection_method.priority())
            .then(self.confidence.total_cmp(&other.confidence))
    }

    /// Reset to the unmapped placeholder, keeping the target.
    pub fn clear(&mut self) {
        *self = Self::unmapped(std::mem::take(&mut self.target_bone));
    }
}

/// Two enabled rows that claimed the same target; the loser was disabled.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConflictRecord {
    pub target_bone: String,
    pub kept_source: String,
    pub disabled_source: String,
    pub description: String,
}

impl fmt::Display for ConflictRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?}: kept {:?}, disabled {:?} ({})",
            self.target_bone, self.kept_source, self.disabled_source, self.description
        )
    }
}

/// Counts of mapped, unmapped and disabled slots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TableCounts {
    pub mapped: usize,
    pub unmapped: usize,
    pub disabled: usize,
}
