use std::collections::HashMap;
use std::path::PathBuf;

use rigmap::mapping::{is_hierarchy_consistent, mirror_name};
use rigmap::matcher::{default_config, score};
use rigmap::skeleton::load_skeleton;
use rigmap::{Bone, DetectionMethod, MappingSession, Skeleton, TargetVocabulary};
use tempfile::TempDir;

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn mixamo() -> Skeleton {
    load_skeleton(&fixture_path("mixamo_skeleton.json")).expect("Failed to load fixture")
}

fn mixamo_session() -> MappingSession {
    let mut session = MappingSession::default();
    assert!(session.select_source(mixamo()).success);
    session
}

fn shoulder_vocab() -> TargetVocabulary {
    TargetVocabulary::new(
        "shoulders",
        "1",
        vec![
            Bone::new("Spine", None),
            Bone::new(" L Clavicle", Some("Spine")),
            Bone::new(" L UpperArm", Some(" L Clavicle")),
        ],
    )
    .unwrap()
}

fn shoulder_skeleton() -> Skeleton {
    Skeleton::from_pairs([
        ("mixamorig:LeftShoulder", None),
        ("mixamorig:LeftArm", Some("mixamorig:LeftShoulder")),
    ])
    .unwrap()
    .with_name("shoulder_rig")
}

fn assert_invariants(session: &MappingSession) {
    let source = session.source().expect("no source selected");
    assert!(
        is_hierarchy_consistent(
            session.table(),
            source.index(),
            session.vocabulary().topology()
        ),
        "hierarchy invariant broken"
    );

    let mut per_target: HashMap<&str, usize> = HashMap::new();
    for entry in session.table().iter().filter(|e| e.enabled) {
        *per_target.entry(entry.target_bone.as_str()).or_default() += 1;
    }
    for (target, count) in per_target {
        assert_eq!(count, 1, "{:?} has {} enabled rows", target, count);
    }
}

#[test]
fn test_shoulder_and_upper_arm_detected() {
    let mut session = MappingSession::new(shoulder_vocab(), default_config()).unwrap();
    session.select_source(shoulder_skeleton());
    let outcome = session.auto_detect();
    assert!(outcome.success, "{}", outcome);

    for (target, source) in [
        (" L Clavicle", "mixamorig:LeftShoulder"),
        (" L UpperArm", "mixamorig:LeftArm"),
    ] {
        let entry = session.table().get(target).unwrap();
        assert_eq!(entry.source_bone, source);
        assert!(entry.enabled);
        assert_eq!(entry.detection_method, DetectionMethod::Automatic);
        assert!(entry.confidence >= 0.7, "{} at {}", target, entry.confidence);
    }
    assert_invariants(&session);
}

#[test]
fn test_removed_bone_disables_only_its_entry() {
    let mut session = MappingSession::new(shoulder_vocab(), default_config()).unwrap();
    session.select_source(shoulder_skeleton());
    session.auto_detect();

    let changed = shoulder_skeleton().without_bone("mixamorig:LeftArm").unwrap();
    session.select_source(changed);
    let outcome = session.validate_mappings();
    assert!(outcome.success);

    let disabled: Vec<&str> = session
        .table()
        .iter()
        .filter(|e| !e.enabled && !e.source_bone.is_empty())
        .map(|e| e.target_bone.as_str())
        .collect();
    assert_eq!(disabled, vec![" L UpperArm"]);
    assert_eq!(
        session.table().source_for(" L Clavicle"),
        Some("mixamorig:LeftShoulder")
    );
}

#[test]
fn test_laterality_veto() {
    assert_eq!(score(" L UpperArm", "mixamorig:RightArm"), 0.0);
    assert_eq!(score("mixamorig:RightArm", " L UpperArm"), 0.0);
}

#[test]
fn test_full_mixamo_rig_maps_every_slot() {
    let mut session = mixamo_session();
    let outcome = session.auto_detect();
    assert!(outcome.success, "{}", outcome);
    assert_eq!(outcome.report.unmapped, 0, "{}", outcome);
    assert_eq!(outcome.report.mapped, session.vocabulary().len());

    let table = session.table();
    assert_eq!(table.source_for("Pelvis"), Some("mixamorig:Hips"));
    assert_eq!(table.source_for(" L Forearm"), Some("mixamorig:LeftForeArm"));
    assert_eq!(table.source_for(" R Finger0"), Some("mixamorig:RightHandThumb1"));
    assert_eq!(table.source_for(" L Finger4"), Some("mixamorig:LeftHandPinky1"));
    assert_eq!(table.source_for(" R Calf"), Some("mixamorig:RightLeg"));
    assert_eq!(table.source_for(" L Toe0"), Some("mixamorig:LeftToeBase"));
    assert_invariants(&session);
}

#[test]
fn test_auto_detect_is_idempotent() {
    let mut session = mixamo_session();
    session.set_manual_mapping("mixamorig:Spine1", "Spine1");
    session.auto_detect();
    let first = session.snapshot();
    session.auto_detect();
    assert_eq!(session.snapshot(), first);
}

#[test]
fn test_detection_is_deterministic() {
    let mut a = mixamo_session();
    let mut b = mixamo_session();
    a.auto_detect();
    b.auto_detect();
    assert_eq!(a.snapshot(), b.snapshot());
}

#[test]
fn test_manual_entry_survives_better_candidate() {
    let mut session = mixamo_session();
    assert!(session.set_manual_mapping("mixamorig:Spine1", "Spine").success);
    session.auto_detect();

    let spine = session.table().get("Spine").unwrap();
    assert_eq!(spine.source_bone, "mixamorig:Spine1");
    assert_eq!(spine.detection_method, DetectionMethod::Manual);
    assert_eq!(spine.confidence, 1.0);
    // The manual choice claims Spine1, so its own slot cannot reuse it.
    assert_ne!(session.table().source_for("Spine1"), Some("mixamorig:Spine1"));
    assert_invariants(&session);
}

#[test]
fn test_mirror_copies_confident_side() {
    let mut session = mixamo_session();
    session.auto_detect();
    session.set_manual_mapping("mixamorig:LeftArm", " L UpperArm");
    session.set_manual_mapping("", " R UpperArm");
    assert_eq!(session.table().source_for(" R UpperArm"), None);

    let outcome = session.mirror_mappings();
    assert!(outcome.success, "{}", outcome);

    let left = session.table().get(" L UpperArm").unwrap().clone();
    let right = session.table().get(" R UpperArm").unwrap();
    let source = session.source().unwrap();
    assert_eq!(
        Some(right.source_bone.clone()),
        mirror_name(&left.source_bone, source.index())
    );
    assert_eq!(right.detection_method, DetectionMethod::Mirror);
    assert_eq!(right.confidence, left.confidence);
    assert_invariants(&session);
}

#[test]
fn test_mirror_on_symmetric_rig_keeps_both_sides() {
    let mut session = mixamo_session();
    session.auto_detect();
    let before = session.snapshot();
    let left = session.table().get(" L Hand").unwrap().clone();
    let right = session.table().get(" R Hand").unwrap().clone();
    assert_eq!(left.confidence, right.confidence);

    let outcome = session.mirror_mappings();
    assert!(outcome.success, "{}", outcome);

    let after = session.snapshot();
    for (old, new) in before.iter().zip(&after) {
        assert_eq!(old.source_bone, new.source_bone, "{:?} changed", old.target_bone);
    }
    assert_eq!(session.table().source_for(" L Hand"), Some("mixamorig:LeftHand"));
    assert_eq!(session.table().source_for(" R Hand"), Some("mixamorig:RightHand"));
    assert_invariants(&session);
}

#[test]
fn test_mirror_never_touches_manual_slot() {
    let mut session = mixamo_session();
    session.auto_detect();
    session.set_manual_mapping("mixamorig:RightForeArm", " R UpperArm");
    session.mirror_mappings();

    let right = session.table().get(" R UpperArm").unwrap();
    assert_eq!(right.source_bone, "mixamorig:RightForeArm");
    assert_eq!(right.detection_method, DetectionMethod::Manual);
}

#[test]
fn test_unknown_source_fails_without_mutation() {
    let mut session = MappingSession::default();
    let outcome = session.auto_detect();
    assert!(!outcome.success);
    assert!(session.table().iter().all(|e| !e.enabled));
}

#[test]
fn test_saved_table_round_trips() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("mixamo_mapping.json");

    let mut session = mixamo_session();
    session.set_manual_mapping("mixamorig:Neck", "Neck");
    session.auto_detect();
    assert!(session.save_mappings(&path).success);

    let mut restored = MappingSession::default();
    restored.select_source(mixamo());
    assert!(restored.load_mappings(&path).success);
    assert_eq!(restored.snapshot(), session.snapshot());

    let doc: serde_json::Map<String, serde_json::Value> =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    let keys: Vec<&str> = doc.keys().map(String::as_str).collect();
    let slots: Vec<&str> = session.vocabulary().slots().collect();
    assert_eq!(keys, slots);
    assert_eq!(doc["Neck"]["detection_method"], "Manual");
}
