//! Pose evaluator: detector output in, uniform verdict out.

use crate::catalog::{PoseDefinition, PoseKind};
use crate::classify::{Classifier, PoseVerdict, RuleFamily};
use crate::detect::DetectionResult;
use crate::landmark::{Skeleton, DEFAULT_MIN_VISIBILITY};
use crate::CoachError;

pub const NO_POSE_DETECTED: &str =
    "No pose detected. Please position yourself in front of the camera.";
pub const EXERCISE_NOT_FOUND: &str = "Exercise not found.";

/// What the current cycle is judged against.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Target {
    /// Guided-session yoga pose, tagged at catalog load.
    Pose(PoseKind),
    /// Exercise-tracking id such as `pushups` or `squats`.
    Exercise(String),
    /// Yoga id followed by the tracking flow, such as `vrikshasana`.
    TrackedYoga(String),
}

impl Target {
    pub fn for_pose(pose: &PoseDefinition) -> Self {
        Target::Pose(pose.kind())
    }

    /// Classifier for this target, `None` for an unknown exercise id.
    pub fn classifier(&self) -> Option<Classifier> {
        match self {
            Target::Pose(kind) => Some(kind.classifier()),
            Target::Exercise(id) => match id.as_str() {
                "pushups" => Some(Classifier::PushUp),
                "squats" => Some(Classifier::Squat),
                "planks" => Some(Classifier::Plank),
                "burpees" => Some(Classifier::TrackingGeneric),
                _ => None,
            },
            Target::TrackedYoga(id) => Some(match id.as_str() {
                "vrikshasana" => Classifier::TreeBalance,
                "bhujangasana" => Classifier::Cobra,
                _ => Classifier::TrackingGeneric,
            }),
        }
    }
}

/// Stateless dispatcher from landmarks to the matching classifier.
#[derive(Clone, Debug)]
pub struct PoseEvaluator {
    min_visibility: f64,
    min_confidence: f64,
}

/// Bodies reported below this score are ignored.
pub const DEFAULT_MIN_DETECTION_CONFIDENCE: f64 = 0.5;

impl Default for PoseEvaluator {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_VISIBILITY)
    }
}

impl PoseEvaluator {
    pub fn new(min_visibility: f64) -> Self {
        Self {
            min_visibility,
            min_confidence: DEFAULT_MIN_DETECTION_CONFIDENCE,
        }
    }

    pub fn with_min_confidence(mut self, min_confidence: f64) -> Self {
        self.min_confidence = min_confidence;
        self
    }

    pub fn min_visibility(&self) -> f64 {
        self.min_visibility
    }

    /// Judge the first confident body. Zero bodies is a negative verdict, not an error.
    pub fn evaluate_detection(&self, detection: &DetectionResult, target: &Target) -> PoseVerdict {
        match detection
            .primary_skeleton(self.min_visibility, self.min_confidence)
            .ok_or(CoachError::NoBodyDetected)
        {
            Ok(skeleton) => self.evaluate(&skeleton, target),
            Err(err) => PoseVerdict::from_error(&err),
        }
    }

    pub fn evaluate(&self, skeleton: &Skeleton, target: &Target) -> PoseVerdict {
        let Some(classifier) = target.classifier() else {
            return PoseVerdict::fail(EXERCISE_NOT_FOUND);
        };
        let converted = match classifier.family() {
            RuleFamily::Alignment => skeleton.to_normalized(),
            RuleFamily::Tracking => skeleton.to_pixels(),
        };
        match converted {
            Ok(skeleton) => classifier.classify(&skeleton),
            Err(err) => {
                log::warn!("cannot evaluate {:?}: {}", classifier, err);
                PoseVerdict::fail(NO_POSE_DETECTED)
            }
        }
    }
}
