//! Hierarchy-consistent consolidation of per-slot candidates.
//!
//! The output keeps one invariant: whenever target slot `a` is an ancestor
//! of slot `b` and both are mapped, the source bone of `a` is an ancestor of
//! (or equal to) the source bone of `b`.
//!
//! Passes, in order:
//! 1. Breadth-first over the target topology, accept the best candidate that
//!    keeps the invariant and is not already used by another slot.
//! 2. Top-down structural fill: an unmapped child slot of a mapped parent
//!    takes the one source child that corresponds to it.
//! 3. Mirror fill of the remaining gaps from already-accepted counterparts.
//!
//! All writes go to a staged copy of the table. The caller commits the copy
//! only when the pass finishes, so an aborted pass leaves the live table as
//! it was.

use serde::Serialize;
use tracing::{debug, info};

use crate::error::MappingError;
use crate::matcher::{CandidateSet, MatchConfig, Normalizer};
use crate::skeleton::{BoneIndex, Skeleton, TargetVocabulary};

use super::mirror::{MirrorPolicy, MirrorReport, MirrorResolver};
use super::table::MappingTable;
use super::types::{ConflictRecord, DetectionMethod, MappingEntry};

/// True unless one target is an ancestor of the other while their sources
/// are not in the same ancestor order.
pub fn pair_consistent(
    source: &BoneIndex,
    topology: &BoneIndex,
    (target_a, source_a): (&str, &str),
    (target_b, source_b): (&str, &str),
) -> bool {
    if topology.is_ancestor(target_a, target_b) {
        source.is_ancestor_or_equal(source_a, source_b)
    } else if topology.is_ancestor(target_b, target_a) {
        source.is_ancestor_or_equal(source_b, source_a)
    } else {
        true
    }
}

/// Check that mapping `target -> source_bone` keeps ancestor order against
/// every enabled row of `table` whose target is related to `target`.
///
/// Rows whose target is unknown to the topology or whose source is missing
/// from the skeleton are stale and left to the validator.
pub fn check_consistency(
    table: &MappingTable,
    source: &BoneIndex,
    topology: &BoneIndex,
    target: &str,
    source_bone: &str,
) -> Result<(), MappingError> {
    for entry in table.mapped() {
        if entry.target_bone == target
            || !topology.contains(&entry.target_bone)
            || !source.contains(&entry.source_bone)
        {
            continue;
        }

        let other = (entry.target_bone.as_str(), entry.source_bone.as_str());
        if !pair_consistent(source, topology, (target, source_bone), other) {
            return Err(MappingError::ConsistencyViolation {
                target: target.to_string(),
                source_bone: source_bone.to_string(),
                against: entry.target_bone.clone(),
            });
        }
    }
    Ok(())
}

/// A candidate that was considered and turned down.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rejection {
    pub target_bone: String,
    pub source_bone: String,
    pub reason: String,
}

/// What a consolidation pass did, slot by slot.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConsolidationReport {
    pub automatic: usize,
    pub hierarchical: usize,
    pub mirrored: usize,
    /// Slots skipped because they hold a manual row
    pub locked: Vec<String>,
    /// Slots left without a source bone
    pub unmapped: Vec<String>,
    pub rejections: Vec<Rejection>,
    pub conflicts: Vec<ConflictRecord>,
}

impl ConsolidationReport {
    pub fn accepted(&self) -> usize {
        self.automatic + self.hierarchical + self.mirrored
    }
}

/// Turns ranked candidates into one globally consistent mapping.
pub struct Consolidator<'a> {
    source: &'a Skeleton,
    vocabulary: &'a TargetVocabulary,
    config: &'a MatchConfig,
    normalizer: Normalizer<'a>,
}

impl<'a> Consolidator<'a> {
    pub fn new(
        source: &'a Skeleton,
        vocabulary: &'a TargetVocabulary,
        config: &'a MatchConfig,
    ) -> Self {
        Self {
            source,
            vocabulary,
            config,
            normalizer: Normalizer::new(&config.names),
        }
    }

    /// Run every pass against a staged copy of `table` and return it.
    ///
    /// `abort` is polled between slots; when it returns true the pass stops
    /// with [`MappingError::Aborted`] and nothing is returned for commit.
    pub fn consolidate(
        &self,
        candidates: &CandidateSet,
        table: &MappingTable,
        abort: &dyn Fn() -> bool,
    ) -> Result<(MappingTable, ConsolidationReport), MappingError> {
        let mut staged = table.clone();
        staged.ensure_slots(self.vocabulary);
        staged.reset_automatic();

        let mut report = ConsolidationReport::default();
        let order = self.vocabulary.topology().breadth_first();

        for target in &order {
            check_abort(abort)?;
            if staged.is_locked(target) {
                report.locked.push(target.to_string());
                continue;
            }
            if !self.accept_best(&mut staged, candidates, target, &mut report) {
                // Never keep an inconsistent guess.
                staged.set(MappingEntry::unmapped(*target));
            }
        }

        for target in &order {
            check_abort(abort)?;
            if staged.is_locked(target) || staged.source_for(target).is_some() {
                continue;
            }
            self.fill_from_structure(&mut staged, target, &mut report);
        }

        check_abort(abort)?;
        let resolver = MirrorResolver::new(self.config);
        let mirror: MirrorReport = resolver.propagate(
            &mut staged,
            self.source.index(),
            self.vocabulary.topology(),
            MirrorPolicy::FillUnmapped,
        );
        report.mirrored = mirror.written.len();
        report.rejections.extend(mirror.skipped.into_iter().filter_map(|s| {
            s.source_bone.map(|source_bone| Rejection {
                target_bone: s.target_bone,
                source_bone,
                reason: s.reason,
            })
        }));

        report.conflicts = staged.resolve_conflicts();
        report.unmapped = order
            .iter()
            .filter(|t| staged.source_for(t).is_none())
            .map(|t| t.to_string())
            .collect();

        info!(
            "Consolidated {} slot(s): {} automatic, {} hierarchical, {} mirrored, {} unmapped",
            order.len(),
            report.automatic,
            report.hierarchical,
            report.mirrored,
            report.unmapped.len()
        );

        Ok((staged, report))
    }

    /// Map every slot that is neither locked nor mapped to its best
    /// acceptable candidate, leaving the rest of `table` alone.
    pub fn fill_unmapped(
        &self,
        candidates: &CandidateSet,
        table: &mut MappingTable,
    ) -> ConsolidationReport {
        let mut report = ConsolidationReport::default();
        for target in self.vocabulary.topology().breadth_first() {
            if table.is_locked(target) {
                report.locked.push(target.to_string());
                continue;
            }
            if table.source_for(target).is_some() {
                continue;
            }
            if !self.accept_best(table, candidates, target, &mut report) {
                report.unmapped.push(target.to_string());
            }
        }
        report.conflicts = table.resolve_conflicts();
        report
    }

    /// Pass 1: first candidate that is unclaimed and keeps ancestor order.
    fn accept_best(
        &self,
        staged: &mut MappingTable,
        candidates: &CandidateSet,
        target: &str,
        report: &mut ConsolidationReport,
    ) -> bool {
        for candidate in candidates.for_target(target) {
            if staged.is_source_claimed(&candidate.source_bone, target) {
                report.rejections.push(Rejection {
                    target_bone: target.to_string(),
                    source_bone: candidate.source_bone.clone(),
                    reason: "source already mapped to another slot".to_string(),
                });
                continue;
            }

            if let Err(e) = check_consistency(
                staged,
                self.source.index(),
                self.vocabulary.topology(),
                target,
                &candidate.source_bone,
            ) {
                debug!("Rejected {:?} for {:?}: {}", candidate.source_bone, target, e);
                report.rejections.push(Rejection {
                    target_bone: target.to_string(),
                    source_bone: candidate.source_bone.clone(),
                    reason: e.to_string(),
                });
                continue;
            }

            debug!(
                "Accepted {:?} -> {:?} ({:.2})",
                candidate.source_bone, target, candidate.score
            );
            staged.set(MappingEntry::new(
                target,
                candidate.source_bone.as_str(),
                DetectionMethod::Automatic,
                candidate.score,
            ));
            report.automatic += 1;
            return true;
        }
        false
    }

    /// Pass 2: take the one unclaimed child of the parent's source bone that
    /// structurally corresponds to `target`.
    fn fill_from_structure(
        &self,
        staged: &mut MappingTable,
        target: &str,
        report: &mut ConsolidationReport,
    ) {
        let topology = self.vocabulary.topology();
        let source = self.source.index();

        let Some(parent_target) = topology.parent(target) else {
            return;
        };
        let Some(parent_entry) = staged.get(parent_target).filter(|e| e.is_mapped()) else {
            return;
        };
        if !source.contains(&parent_entry.source_bone) {
            return;
        }
        let parent_source = parent_entry.source_bone.clone();
        let parent_confidence = parent_entry.confidence;

        let target_siblings = topology.children(parent_target);
        let open_targets = target_siblings
            .iter()
            .filter(|t| !staged.is_locked(t) && staged.source_for(t).is_none())
            .count();

        let source_children = source.children(&parent_source);
        let unclaimed: Vec<&str> = source_children
            .iter()
            .copied()
            .filter(|c| !staged.is_source_claimed(c, target))
            .collect();

        let chosen = if unclaimed.len() == 1 && open_targets == 1 {
            Some(unclaimed[0])
        } else if source_children.len() == target_siblings.len() {
            topology
                .sibling_position(target)
                .map(|(pos, _)| source_children[pos])
                .filter(|c| unclaimed.contains(c))
        } else {
            None
        };

        let Some(chosen) = chosen else {
            return;
        };

        let target_side = self.normalizer.normalize(target).side;
        let chosen_side = self.normalizer.normalize(chosen).side;
        if let (Some(ts), Some(cs)) = (target_side, chosen_side) {
            if ts != cs {
                report.rejections.push(Rejection {
                    target_bone: target.to_string(),
                    source_bone: chosen.to_string(),
                    reason: "opposite side".to_string(),
                });
                return;
            }
        }

        if let Err(e) = check_consistency(staged, source, topology, target, chosen) {
            report.rejections.push(Rejection {
                target_bone: target.to_string(),
                source_bone: chosen.to_string(),
                reason: e.to_string(),
            });
            return;
        }

        let confidence = parent_confidence * self.config.thresholds.hierarchical_discount;
        debug!(
            "Structural match {:?} -> {:?} ({:.2}) under {:?}",
            chosen, target, confidence, parent_target
        );
        staged.set(MappingEntry::new(
            target,
            chosen,
            DetectionMethod::Hierarchical,
            confidence,
        ));
        report.hierarchical += 1;
    }
}

fn check_abort(abort: &dyn Fn() -> bool) -> Result<(), MappingError> {
    if abort() {
        return Err(MappingError::Aborted(
            "source selection changed during consolidation".to_string(),
        ));
    }
    Ok(())
}

/// True if every pair of enabled rows keeps ancestor order.
pub fn is_hierarchy_consistent(
    table: &MappingTable,
    source: &BoneIndex,
    topology: &BoneIndex,
) -> bool {
    table.mapped().all(|e| {
        !source.contains(&e.source_bone)
            || check_consistency(table, source, topology, &e.target_bone, &e.source_bone).is_ok()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::{default_config, generate_candidates, Scorer};
    use crate::skeleton::Bone;

    fn run(
        source: &Skeleton,
        vocabulary: &TargetVocabulary,
        table: &MappingTable,
    ) -> (MappingTable, ConsolidationReport) {
        let config = default_config();
        let scorer = Scorer::new(config.clone());
        let candidates = generate_candidates(
            &scorer,
            source,
            vocabulary,
            table,
            config.thresholds.similarity,
        );
        Consolidator::new(source, vocabulary, &config)
            .consolidate(&candidates, table, &|| false)
            .unwrap()
    }

    fn arm_vocab() -> TargetVocabulary {
        TargetVocabulary::new(
            "arm",
            "1",
            vec![
                Bone::new("Spine", None),
                Bone::new(" L Clavicle", Some("Spine")),
                Bone::new(" L UpperArm", Some(" L Clavicle")),
                Bone::new(" L Forearm", Some(" L UpperArm")),
                Bone::new(" R Clavicle", Some("Spine")),
                Bone::new(" R UpperArm", Some(" R Clavicle")),
                Bone::new(" R Forearm", Some(" R UpperArm")),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_inconsistent_candidate_is_rejected() {
        // LeftArm sits outside the LeftShoulder chain, so it cannot be the
        // upper arm once the clavicle is mapped.
        let source = Skeleton::from_pairs([
            ("Spine", None),
            ("LeftShoulder", Some("Spine")),
            ("LeftArm", Some("Spine")),
        ])
        .unwrap();
        let vocab = arm_vocab();
        let (table, report) = run(&source, &vocab, &MappingTable::for_vocabulary(&vocab));

        assert_eq!(table.source_for(" L Clavicle"), Some("LeftShoulder"));
        assert_eq!(table.source_for(" L UpperArm"), None);
        let upper = table.get(" L UpperArm").unwrap();
        assert!(!upper.enabled);
        assert_eq!(upper.confidence, 0.0);
        assert!(report
            .rejections
            .iter()
            .any(|r| r.target_bone == " L UpperArm" && r.source_bone == "LeftArm"));
        assert!(is_hierarchy_consistent(&table, source.index(), vocab.topology()));
    }

    #[test]
    fn test_structural_fill_uses_only_child() {
        let source = Skeleton::from_pairs([
            ("Spine", None),
            ("LeftShoulder", Some("Spine")),
            ("LeftArm", Some("LeftShoulder")),
            ("LeftArmTwist_xyz", Some("LeftArm")),
        ])
        .unwrap();
        let vocab = arm_vocab();
        let (table, report) = run(&source, &vocab, &MappingTable::for_vocabulary(&vocab));

        let forearm = table.get(" L Forearm").unwrap();
        assert_eq!(forearm.source_bone, "LeftArmTwist_xyz");
        assert_eq!(forearm.detection_method, DetectionMethod::Hierarchical);
        let upper = table.get(" L UpperArm").unwrap();
        assert!((forearm.confidence - upper.confidence * 0.9).abs() < 1e-6);
        assert_eq!(report.hierarchical, 1);
    }

    #[test]
    fn test_structural_fill_by_sibling_position() {
        let vocab = TargetVocabulary::new(
            "hand",
            "1",
            vec![
                Bone::new(" L Hand", None),
                Bone::new(" L Finger0", Some(" L Hand")),
                Bone::new(" L Finger1", Some(" L Hand")),
                Bone::new(" L Finger2", Some(" L Hand")),
            ],
        )
        .unwrap();
        let source = Skeleton::from_pairs([
            ("hand.L", None),
            ("digit_a.L", Some("hand.L")),
            ("digit_b.L", Some("hand.L")),
            ("digit_c.L", Some("hand.L")),
        ])
        .unwrap();
        let (table, _) = run(&source, &vocab, &MappingTable::for_vocabulary(&vocab));

        assert_eq!(table.source_for(" L Hand"), Some("hand.L"));
        assert_eq!(table.source_for(" L Finger0"), Some("digit_a.L"));
        assert_eq!(table.source_for(" L Finger1"), Some("digit_b.L"));
        assert_eq!(table.source_for(" L Finger2"), Some("digit_c.L"));
    }

    #[test]
    fn test_mirror_fills_missing_side() {
        // The right upper arm has two children, so only the left forearm can
        // be found structurally; the right one comes from its counterpart.
        let source = Skeleton::from_pairs([
            ("Spine", None),
            ("LeftShoulder", Some("Spine")),
            ("LeftArm", Some("LeftShoulder")),
            ("LeftXyz", Some("LeftArm")),
            ("RightShoulder", Some("Spine")),
            ("RightArm", Some("RightShoulder")),
            ("RightXyz", Some("RightArm")),
            ("RightArmRoll", Some("RightArm")),
        ])
        .unwrap();
        let vocab = arm_vocab();
        let (table, report) = run(&source, &vocab, &MappingTable::for_vocabulary(&vocab));

        let left = table.get(" L Forearm").unwrap();
        assert_eq!(left.source_bone, "LeftXyz");
        assert_eq!(left.detection_method, DetectionMethod::Hierarchical);

        let right = table.get(" R Forearm").unwrap();
        assert_eq!(right.source_bone, "RightXyz");
        assert_eq!(right.detection_method, DetectionMethod::Mirror);
        assert_eq!(right.confidence, left.confidence);
        assert_eq!(report.mirrored, 1);
    }

    #[test]
    fn test_manual_entries_are_fixed() {
        let source = Skeleton::from_pairs([
            ("Spine", None),
            ("LeftShoulder", Some("Spine")),
            ("LeftArm", Some("LeftShoulder")),
        ])
        .unwrap();
        let vocab = arm_vocab();
        let mut table = MappingTable::for_vocabulary(&vocab);
        table.set(MappingEntry::new(
            " L Clavicle",
            "Spine",
            DetectionMethod::Manual,
            1.0,
        ));
        let (out, report) = run(&source, &vocab, &table);

        let clavicle = out.get(" L Clavicle").unwrap();
        assert_eq!(clavicle.source_bone, "Spine");
        assert_eq!(clavicle.detection_method, DetectionMethod::Manual);
        assert!(report.locked.contains(&" L Clavicle".to_string()));
        // The upper arm must still sit below the manual clavicle's source.
        assert_eq!(out.source_for(" L UpperArm"), Some("LeftArm"));
        assert!(is_hierarchy_consistent(&out, source.index(), vocab.topology()));
    }

    #[test]
    fn test_abort_leaves_nothing_to_commit() {
        let source = Skeleton::from_pairs([("Spine", None)]).unwrap();
        let vocab = arm_vocab();
        let config = default_config();
        let table = MappingTable::for_vocabulary(&vocab);
        let candidates = CandidateSet::default();
        let result = Consolidator::new(&source, &vocab, &config).consolidate(
            &candidates,
            &table,
            &|| true,
        );
        assert!(matches!(result, Err(MappingError::Aborted(_))));
    }
}
