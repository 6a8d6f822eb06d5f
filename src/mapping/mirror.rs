//! Left/right symmetry propagation.

use serde::Serialize;
use tracing::{debug, info};

use crate::matcher::{shared_default, MatchConfig, Normalizer};
use crate::skeleton::BoneIndex;

use super::consolidate::check_consistency;
use super::table::MappingTable;
use super::types::{DetectionMethod, MappingEntry};

/// What to do when the opposite slot already holds an automatic mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MirrorPolicy {
    /// Only write slots that are currently unmapped
    FillUnmapped,
    /// Also overwrite mappings with lower confidence than the seed
    ReplaceWeaker,
}

/// A seed that could not be mirrored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MirrorSkip {
    pub target_bone: String,
    pub source_bone: Option<String>,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MirrorReport {
    pub written: Vec<MappingEntry>,
    pub skipped: Vec<MirrorSkip>,
}

/// Copies confident one-sided mappings onto their opposite-side slots.
pub struct MirrorResolver<'a> {
    normalizer: Normalizer<'a>,
    lock_threshold: f32,
}

impl<'a> MirrorResolver<'a> {
    pub fn new(config: &'a MatchConfig) -> Self {
        Self {
            normalizer: Normalizer::new(&config.names),
            lock_threshold: config.thresholds.lock,
        }
    }

    /// The opposite-side name of `name`, if it flips and exists in `index`.
    pub fn mirror_name(&self, name: &str, index: &BoneIndex) -> Option<String> {
        self.normalizer
            .normalize(name)
            .mirrored()
            .filter(|mirrored| index.contains(mirrored))
    }

    /// Mirror every enabled, non-mirror row with confidence at or above the
    /// lock threshold. Manual slots are never written and every write keeps
    /// ancestor order against the rest of the table.
    pub fn propagate(
        &self,
        table: &mut MappingTable,
        source: &BoneIndex,
        topology: &BoneIndex,
        policy: MirrorPolicy,
    ) -> MirrorReport {
        let seeds: Vec<MappingEntry> = table
            .mapped()
            .filter(|e| {
                e.detection_method != DetectionMethod::Mirror && e.confidence >= self.lock_threshold
            })
            .cloned()
            .collect();

        let mut report = MirrorReport::default();

        for seed in seeds {
            // A write earlier in this pass may have replaced the seed's own row.
            if table.get(&seed.target_bone) != Some(&seed) {
                debug!("Seed {:?} changed during the pass; not mirrored", seed.target_bone);
                continue;
            }
            let Some(target) = self.mirror_name(&seed.target_bone, topology) else {
                continue;
            };
            let mut skip = |source_bone: Option<&str>, reason: &str| {
                debug!("Mirror of {:?} into {:?} skipped: {}", seed.target_bone, target, reason);
                report.skipped.push(MirrorSkip {
                    target_bone: target.clone(),
                    source_bone: source_bone.map(str::to_string),
                    reason: reason.to_string(),
                });
            };

            let Some(mirrored_source) = self.mirror_name(&seed.source_bone, source) else {
                skip(None, "no opposite-side source bone");
                continue;
            };
            if table.is_locked(&target) {
                skip(Some(&mirrored_source), "slot holds a manual mapping");
                continue;
            }

            if let Some(existing) = table.get(&target).filter(|e| e.is_mapped()) {
                if existing.source_bone == mirrored_source {
                    continue;
                }
                match policy {
                    MirrorPolicy::FillUnmapped => {
                        skip(Some(&mirrored_source), "slot already mapped");
                        continue;
                    }
                    MirrorPolicy::ReplaceWeaker if existing.confidence > seed.confidence => {
                        skip(Some(&mirrored_source), "existing mapping is stronger");
                        continue;
                    }
                    MirrorPolicy::ReplaceWeaker => {}
                }
            }

            if table.is_source_claimed(&mirrored_source, &target) {
                skip(Some(&mirrored_source), "source already mapped to another slot");
                continue;
            }
            if let Err(e) = check_consistency(table, source, topology, &target, &mirrored_source) {
                skip(Some(&mirrored_source), &e.to_string());
                continue;
            }

            let entry = MappingEntry::new(
                target.as_str(),
                mirrored_source.as_str(),
                DetectionMethod::Mirror,
                seed.confidence,
            );
            debug!(
                "Mirrored {:?} -> {:?} from {:?}",
                mirrored_source, target, seed.target_bone
            );
            table.set(entry.clone());
            report.written.push(entry);
        }

        if !report.written.is_empty() {
            info!("Mirrored {} mapping(s)", report.written.len());
        }
        report
    }
}

/// Opposite-side name using the embedded default name rules.
pub fn mirror_name(name: &str, index: &BoneIndex) -> Option<String> {
    MirrorResolver::new(shared_default()).mirror_name(name, index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::default_config;
    use crate::skeleton::{Bone, Skeleton, TargetVocabulary};

    fn source() -> Skeleton {
        Skeleton::from_pairs([
            ("Hips", None),
            ("thigh.L", Some("Hips")),
            ("shin.L", Some("thigh.L")),
            ("thigh.R", Some("Hips")),
            ("shin.R", Some("thigh.R")),
        ])
        .unwrap()
    }

    fn vocab() -> TargetVocabulary {
        TargetVocabulary::new(
            "legs",
            "1",
            vec![
                Bone::new("Pelvis", None),
                Bone::new(" L Thigh", Some("Pelvis")),
                Bone::new(" L Calf", Some(" L Thigh")),
                Bone::new(" R Thigh", Some("Pelvis")),
                Bone::new(" R Calf", Some(" R Thigh")),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_mirror_name() {
        let skeleton = source();
        assert_eq!(mirror_name("thigh.L", skeleton.index()).as_deref(), Some("thigh.R"));
        assert_eq!(mirror_name("Hips", skeleton.index()), None);

        let vocab = vocab();
        assert_eq!(
            mirror_name(" L Calf", vocab.topology()).as_deref(),
            Some(" R Calf")
        );
    }

    #[test]
    fn test_fill_unmapped() {
        let config = default_config();
        let skeleton = source();
        let vocab = vocab();
        let mut table = MappingTable::for_vocabulary(&vocab);
        table.set(MappingEntry::new(" L Thigh", "thigh.L", DetectionMethod::Automatic, 0.9));
        table.set(MappingEntry::new(" L Calf", "shin.L", DetectionMethod::Automatic, 0.9));

        let report = MirrorResolver::new(&config).propagate(
            &mut table,
            skeleton.index(),
            vocab.topology(),
            MirrorPolicy::FillUnmapped,
        );

        assert_eq!(report.written.len(), 2);
        let calf = table.get(" R Calf").unwrap();
        assert_eq!(calf.source_bone, "shin.R");
        assert_eq!(calf.detection_method, DetectionMethod::Mirror);
        assert!((calf.confidence - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_weak_seeds_are_ignored() {
        let config = default_config();
        let skeleton = source();
        let vocab = vocab();
        let mut table = MappingTable::for_vocabulary(&vocab);
        table.set(MappingEntry::new(" L Thigh", "thigh.L", DetectionMethod::Automatic, 0.75));

        let report = MirrorResolver::new(&config).propagate(
            &mut table,
            skeleton.index(),
            vocab.topology(),
            MirrorPolicy::ReplaceWeaker,
        );
        assert!(report.written.is_empty());
        assert_eq!(table.source_for(" R Thigh"), None);
    }

    #[test]
    fn test_replace_weaker_policy() {
        let config = default_config();
        let skeleton = source();
        let vocab = vocab();
        let mut table = MappingTable::for_vocabulary(&vocab);
        table.set(MappingEntry::new(" L Thigh", "thigh.L", DetectionMethod::Automatic, 0.95));
        table.set(MappingEntry::new(" R Thigh", "Hips", DetectionMethod::Automatic, 0.72));

        let mut fill = table.clone();
        MirrorResolver::new(&config).propagate(
            &mut fill,
            skeleton.index(),
            vocab.topology(),
            MirrorPolicy::FillUnmapped,
        );
        assert_eq!(fill.source_for(" R Thigh"), Some("Hips"));

        MirrorResolver::new(&config).propagate(
            &mut table,
            skeleton.index(),
            vocab.topology(),
            MirrorPolicy::ReplaceWeaker,
        );
        assert_eq!(table.source_for(" R Thigh"), Some("thigh.R"));
    }

    #[test]
    fn test_manual_slot_is_not_overwritten() {
        let config = default_config();
        let skeleton = source();
        let vocab = vocab();
        let mut table = MappingTable::for_vocabulary(&vocab);
        table.set(MappingEntry::new(" L Thigh", "thigh.L", DetectionMethod::Automatic, 0.95));
        let mut manual = MappingEntry::new(" R Thigh", "thigh.R", DetectionMethod::Manual, 1.0);
        manual.enabled = false;
        table.set(manual);

        let report = MirrorResolver::new(&config).propagate(
            &mut table,
            skeleton.index(),
            vocab.topology(),
            MirrorPolicy::ReplaceWeaker,
        );
        assert!(report.written.is_empty());
        assert_eq!(report.skipped.len(), 1);
        assert!(!table.get(" R Thigh").unwrap().enabled);
    }

    #[test]
    fn test_replaced_seed_is_not_mirrored_back() {
        let config = default_config();
        let skeleton = source();
        let vocab = vocab();
        let mut table = MappingTable::for_vocabulary(&vocab);
        table.set(MappingEntry::new(" L Calf", "shin.L", DetectionMethod::Automatic, 0.9));
        table.set(MappingEntry::new(" R Calf", "thigh.R", DetectionMethod::Automatic, 0.9));

        let report = MirrorResolver::new(&config).propagate(
            &mut table,
            skeleton.index(),
            vocab.topology(),
            MirrorPolicy::ReplaceWeaker,
        );

        // The left row wins the tie and rewrites the right slot; the old
        // right row is gone and must not be copied over the left one.
        assert_eq!(report.written.len(), 1);
        let left = table.get(" L Calf").unwrap();
        assert_eq!(left.source_bone, "shin.L");
        assert_eq!(left.detection_method, DetectionMethod::Automatic);
        let right = table.get(" R Calf").unwrap();
        assert_eq!(right.source_bone, "shin.R");
        assert_eq!(right.detection_method, DetectionMethod::Mirror);
    }
}
