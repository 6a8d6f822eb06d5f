//! Per-slot candidate ranking.
//!
//! Every target slot that is not locked by a manual entry is scored against
//! every source bone. Candidates under the similarity threshold are dropped;
//! the rest are ranked by score, then edit distance, then hierarchy depth
//! difference, then source declaration order, so the ranking is a total
//! order and repeated runs agree exactly.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use crate::mapping::MappingTable;
use crate::skeleton::{Skeleton, TargetVocabulary};

use super::normalize::NormalizedName;
use super::similarity::Scorer;

/// A source bone proposed for one target slot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub source_bone: String,
    pub score: f32,
    pub edit_distance: usize,
    pub depth_delta: usize,
    /// Declaration position in the source skeleton; last tie-breaker
    pub source_position: usize,
}

impl Candidate {
    fn rank(&self, other: &Self) -> Ordering {
        other
            .score
            .total_cmp(&self.score)
            .then(self.edit_distance.cmp(&other.edit_distance))
            .then(self.depth_delta.cmp(&other.depth_delta))
            .then(self.source_position.cmp(&other.source_position))
    }
}

/// Ranked candidates for one target slot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlotCandidates {
    pub target: String,
    pub candidates: Vec<Candidate>,
}

/// Candidates for every unlocked slot, in vocabulary order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CandidateSet {
    slots: Vec<SlotCandidates>,
    #[serde(skip)]
    by_target: HashMap<String, usize>,
}

impl CandidateSet {
    fn push(&mut self, slot: SlotCandidates) {
        self.by_target.insert(slot.target.clone(), self.slots.len());
        self.slots.push(slot);
    }

    /// Ranked candidates for a slot; empty for locked or unknown slots.
    pub fn for_target(&self, target: &str) -> &[Candidate] {
        self.by_target
            .get(target)
            .map(|&i| self.slots[i].candidates.as_slice())
            .unwrap_or(&[])
    }

    /// True if the slot was considered (not locked by a manual entry).
    pub fn contains_slot(&self, target: &str) -> bool {
        self.by_target.contains_key(target)
    }

    pub fn slots(&self) -> &[SlotCandidates] {
        &self.slots
    }
}

/// Rank source bones for every target slot not locked by a manual entry,
/// enabled or disabled. Reads `table`, never writes it.
pub fn generate_candidates(
    scorer: &Scorer,
    source: &Skeleton,
    vocabulary: &TargetVocabulary,
    table: &MappingTable,
    threshold: f32,
) -> CandidateSet {
    let source_index = source.index();
    let topology = vocabulary.topology();

    let normalized_sources: Vec<(usize, &str, NormalizedName, usize)> = source_index
        .names()
        .enumerate()
        .map(|(pos, name)| {
            (
                pos,
                name,
                scorer.normalize(name),
                source_index.depth(name).unwrap_or(0),
            )
        })
        .collect();

    let mut set = CandidateSet::default();

    for target in vocabulary.slots() {
        if table.is_locked(target) {
            debug!("Slot {:?} locked by manual entry; no candidates", target);
            continue;
        }

        let target_name = scorer.normalize(target);
        let target_depth = topology.depth(target).unwrap_or(0);

        let mut candidates: Vec<Candidate> = normalized_sources
            .iter()
            .filter_map(|(pos, name, normalized, depth)| {
                let score = scorer.score_normalized(normalized, &target_name);
                if score < threshold || score <= 0.0 {
                    return None;
                }
                Some(Candidate {
                    source_bone: name.to_string(),
                    score,
                    edit_distance: scorer.edit_distance(normalized, &target_name),
                    depth_delta: depth.abs_diff(target_depth),
                    source_position: *pos,
                })
            })
            .collect();

        candidates.sort_by(Candidate::rank);

        debug!(
            "Slot {:?}: {} candidate(s){}",
            target,
            candidates.len(),
            candidates
                .first()
                .map(|c| format!(", best {:?} ({:.2})", c.source_bone, c.score))
                .unwrap_or_default()
        );

        set.push(SlotCandidates {
            target: target.to_string(),
            candidates,
        });
    }

    set
}
