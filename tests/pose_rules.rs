use serde_json::json;

use pose_coach::catalog::PoseKind;
use pose_coach::evaluate::NO_POSE_DETECTED;
use pose_coach::{Catalog, DetectionResult, PoseEvaluator, Target};

const STANDING: [(&str, f64, f64); 13] = [
    ("nose", 0.50, 0.10),
    ("left_ear", 0.47, 0.10),
    ("right_ear", 0.53, 0.10),
    ("left_shoulder", 0.40, 0.25),
    ("right_shoulder", 0.60, 0.27),
    ("left_wrist", 0.40, 0.55),
    ("right_wrist", 0.60, 0.55),
    ("left_hip", 0.45, 0.52),
    ("right_hip", 0.55, 0.54),
    ("left_knee", 0.45, 0.72),
    ("right_knee", 0.55, 0.72),
    ("left_ankle", 0.45, 0.92),
    ("right_ankle", 0.55, 0.92),
];

/// Name-keyed detection in pixel space of a 640x480 frame.
fn pixel_detection(points: &[(&str, f64, f64)]) -> DetectionResult {
    let keypoints: Vec<_> = points
        .iter()
        .map(|(name, x, y)| json!({"name": name, "x": x * 640.0, "y": y * 480.0, "score": 0.9}))
        .collect();
    serde_json::from_value(json!({
        "poses": [{"keypoints": keypoints, "score": 0.8}],
        "space": "pixels",
        "frame": {"width": 640, "height": 480}
    }))
    .unwrap()
}

fn replace(part: &str, x: f64, y: f64) -> Vec<(&'static str, f64, f64)> {
    STANDING
        .iter()
        .map(|&(name, px, py)| if name == part { (name, x, y) } else { (name, px, py) })
        .collect()
}

#[test]
fn mountain_pose_from_pixel_detection() {
    let evaluator = PoseEvaluator::default();
    let target = Target::Pose(PoseKind::Mountain);

    let verdict = evaluator.evaluate_detection(&pixel_detection(&STANDING), &target);
    assert!(verdict.correct, "{:?}", verdict.corrections);

    let tilted = replace("right_shoulder", 0.60, 0.45);
    let verdict = evaluator.evaluate_detection(&pixel_detection(&tilted), &target);
    assert!(!verdict.correct);
    assert_eq!(verdict.first_correction(), Some("Level your shoulders."));
}

#[test]
fn mountain_pose_from_index_keyed_landmarks() {
    let index_of = |name: &str| match name {
        "nose" => 0,
        "left_ear" => 7,
        "right_ear" => 8,
        "left_shoulder" => 11,
        "right_shoulder" => 12,
        "left_wrist" => 15,
        "right_wrist" => 16,
        "left_hip" => 23,
        "right_hip" => 24,
        "left_knee" => 25,
        "right_knee" => 26,
        "left_ankle" => 27,
        "right_ankle" => 28,
        other => panic!("unmapped {other}"),
    };
    let mut landmarks = vec![json!({"x": 0.0, "y": 0.0, "visibility": 0.0}); 33];
    for (name, x, y) in STANDING {
        landmarks[index_of(name)] = json!({"x": x, "y": y, "visibility": 0.95});
    }
    let detection: DetectionResult = serde_json::from_value(json!({
        "poses": [{"landmarks": landmarks}],
        "topology": "mediapipe"
    }))
    .unwrap();

    let verdict =
        PoseEvaluator::default().evaluate_detection(&detection, &Target::Pose(PoseKind::Mountain));
    assert!(verdict.correct, "{:?}", verdict.corrections);
}

#[test]
fn tree_pose_tagged_from_catalog_name() {
    let catalog = Catalog::builtin_library();
    let tree = catalog.find_by_name("tree pose").unwrap();
    let target = Target::for_pose(tree);
    assert_eq!(target, Target::Pose(PoseKind::Tree));

    let raised = [
        ("left_hip", 0.45, 0.50),
        ("right_hip", 0.55, 0.52),
        ("left_knee", 0.45, 0.70),
        ("left_ankle", 0.45, 0.90),
        ("right_knee", 0.65, 0.65),
        ("right_ankle", 0.48, 0.72),
        ("left_wrist", 0.49, 0.20),
        ("right_wrist", 0.51, 0.20),
    ];
    let evaluator = PoseEvaluator::default();
    let verdict = evaluator.evaluate_detection(&pixel_detection(&raised), &target);
    assert!(verdict.correct, "{:?}", verdict.corrections);

    let mut dropped = raised;
    dropped[5] = ("right_ankle", 0.95, 0.30);
    let verdict = evaluator.evaluate_detection(&pixel_detection(&dropped), &target);
    assert!(!verdict.correct);
    assert!(verdict
        .corrections
        .iter()
        .any(|c| c == "Place your raised foot against your standing leg."));
}

#[test]
fn hidden_landmarks_give_one_visibility_hint() {
    let mut detection = pixel_detection(&STANDING);
    for keypoint in detection.poses[0].keypoints.iter_mut() {
        if keypoint.name.as_deref().is_some_and(|n| n.ends_with("ankle")) {
            keypoint.point.score = Some(0.1);
        }
    }
    let verdict =
        PoseEvaluator::default().evaluate_detection(&detection, &Target::Pose(PoseKind::Tree));
    assert!(!verdict.correct);
    assert_eq!(verdict.corrections.len(), 1);
}

#[test]
fn weak_or_absent_bodies_are_not_judged() {
    let evaluator = PoseEvaluator::default();
    let target = Target::Pose(PoseKind::Mountain);

    let verdict = evaluator.evaluate_detection(&DetectionResult::default(), &target);
    assert_eq!(verdict.first_correction(), Some(NO_POSE_DETECTED));

    let mut faint = pixel_detection(&STANDING);
    faint.poses[0].score = Some(0.2);
    let verdict = evaluator.evaluate_detection(&faint, &target);
    assert_eq!(verdict.first_correction(), Some(NO_POSE_DETECTED));
}

#[test]
fn unknown_exercise_is_reported() {
    let verdict = PoseEvaluator::default().evaluate_detection(
        &pixel_detection(&STANDING),
        &Target::Exercise("jumping-jacks".into()),
    );
    assert_eq!(verdict.first_correction(), Some("Exercise not found."));
}
