//! Pose-correctness rules.
//!
//! Every classifier is a pure predicate over a [`Skeleton`]: it never fails,
//! it degrades to a negative verdict with guidance text. Missing or
//! low-confidence landmarks short-circuit to a single "make visible" correction.
//!
//! Two rule families exist:
//! - `alignment`: yoga poses measured in normalized `[0, 1]` coordinates.
//! - `tracking`: exercise-tracking rules measured in pixels.

mod alignment;
mod tracking;

use serde::{Deserialize, Serialize};

use crate::landmark::{BodyPart, CoordinateSpace, Skeleton};
use crate::CoachError;

/// Correctness judgment for one evaluation cycle.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoseVerdict {
    pub correct: bool,
    /// Ordered corrective messages; only the first is surfaced to the user.
    pub corrections: Vec<String>,
}

impl PoseVerdict {
    pub fn pass() -> Self {
        Self {
            correct: true,
            corrections: Vec::new(),
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            correct: false,
            corrections: vec![message.into()],
        }
    }

    /// Correct exactly when no correction was collected.
    pub fn from_corrections(corrections: Vec<String>) -> Self {
        Self {
            correct: corrections.is_empty(),
            corrections,
        }
    }

    /// Negative verdict carrying the error's user-facing text.
    pub fn from_error(err: &CoachError) -> Self {
        Self::fail(err.to_string())
    }

    pub fn first_correction(&self) -> Option<&str> {
        self.corrections.first().map(String::as_str)
    }
}

/// Which rule family a classifier belongs to, and so which coordinates it reads.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RuleFamily {
    Alignment,
    Tracking,
}

impl RuleFamily {
    pub fn space(self) -> CoordinateSpace {
        match self {
            RuleFamily::Alignment => CoordinateSpace::Normalized,
            RuleFamily::Tracking => CoordinateSpace::Pixels,
        }
    }
}

/// The fixed rule set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classifier {
    Mountain,
    Tree,
    Warrior,
    DownwardDog,
    Plank,
    AlignmentGeneric,
    PushUp,
    Squat,
    TreeBalance,
    Cobra,
    TrackingGeneric,
}

const WHOLE_BODY: &str = "Make sure your whole body is visible to the camera.";
const LEGS: &str = "Make sure your legs are visible to the camera.";
const UPPER_BODY: &str = "Make sure your upper body is visible to the camera.";
const ARMS: &str = "Make sure your arms and shoulders are visible to the camera.";

impl Classifier {
    pub fn family(self) -> RuleFamily {
        match self {
            Classifier::Mountain
            | Classifier::Tree
            | Classifier::Warrior
            | Classifier::DownwardDog
            | Classifier::Plank
            | Classifier::AlignmentGeneric => RuleFamily::Alignment,
            Classifier::PushUp
            | Classifier::Squat
            | Classifier::TreeBalance
            | Classifier::Cobra
            | Classifier::TrackingGeneric => RuleFamily::Tracking,
        }
    }

    /// Landmarks that must be visible before any rule is checked.
    pub fn required(self) -> &'static [BodyPart] {
        use BodyPart::*;
        match self {
            Classifier::Mountain => &[
                Nose,
                LeftEar,
                RightEar,
                LeftShoulder,
                RightShoulder,
                LeftWrist,
                RightWrist,
                LeftHip,
                RightHip,
            ],
            Classifier::Tree => &[
                LeftHip, RightHip, LeftKnee, RightKnee, LeftAnkle, RightAnkle, LeftWrist,
                RightWrist,
            ],
            Classifier::Warrior => &[
                LeftShoulder,
                RightShoulder,
                LeftWrist,
                RightWrist,
                LeftHip,
                RightHip,
                LeftKnee,
                RightKnee,
                LeftAnkle,
                RightAnkle,
            ],
            Classifier::DownwardDog => &[
                LeftShoulder,
                LeftElbow,
                LeftWrist,
                LeftHip,
                LeftKnee,
                LeftAnkle,
            ],
            Classifier::Plank => &[LeftShoulder, LeftWrist, LeftHip, LeftAnkle],
            Classifier::AlignmentGeneric => &[Nose, LeftShoulder, RightShoulder, LeftHip, RightHip],
            Classifier::PushUp => &[
                LeftShoulder,
                RightShoulder,
                LeftElbow,
                RightElbow,
                LeftWrist,
                RightWrist,
            ],
            Classifier::Squat | Classifier::TreeBalance => {
                &[LeftHip, RightHip, LeftKnee, RightKnee, LeftAnkle, RightAnkle]
            }
            Classifier::Cobra => &[LeftShoulder, RightShoulder, LeftHip, RightHip],
            Classifier::TrackingGeneric => &[Nose, LeftShoulder, RightShoulder],
        }
    }

    /// Correction used when a required landmark is not visible.
    pub fn visibility_message(self) -> &'static str {
        match self {
            Classifier::Mountain
            | Classifier::Tree
            | Classifier::Warrior
            | Classifier::DownwardDog
            | Classifier::Plank => WHOLE_BODY,
            Classifier::Squat | Classifier::TreeBalance => LEGS,
            Classifier::PushUp => ARMS,
            Classifier::AlignmentGeneric | Classifier::Cobra | Classifier::TrackingGeneric => {
                UPPER_BODY
            }
        }
    }

    /// Fails with [`CoachError::MissingLandmarks`] when a required point is
    /// absent or below the skeleton's visibility threshold.
    pub fn require(self, skeleton: &Skeleton) -> Result<(), CoachError> {
        let missing = skeleton.missing(self.required());
        if missing.is_empty() {
            return Ok(());
        }
        Err(CoachError::MissingLandmarks {
            missing,
            guidance: self.visibility_message(),
        })
    }

    /// Judge a skeleton already expressed in this classifier's coordinate space.
    pub fn classify(self, skeleton: &Skeleton) -> PoseVerdict {
        if let Err(err) = self.require(skeleton) {
            log::debug!("{:?}: {:?}", self, err);
            return PoseVerdict::from_error(&err);
        }
        let corrections = match self {
            Classifier::Mountain => alignment::mountain(skeleton),
            Classifier::Tree => alignment::tree(skeleton),
            Classifier::Warrior => alignment::warrior(skeleton),
            Classifier::DownwardDog => alignment::downward_dog(skeleton),
            Classifier::Plank => alignment::plank(skeleton),
            Classifier::AlignmentGeneric => alignment::generic(skeleton),
            Classifier::PushUp => tracking::push_up(skeleton),
            Classifier::Squat => tracking::squat(skeleton),
            Classifier::TreeBalance => tracking::tree_balance(skeleton),
            Classifier::Cobra => tracking::cobra(skeleton),
            Classifier::TrackingGeneric => tracking::generic(skeleton),
        };
        PoseVerdict::from_corrections(corrections)
    }
}

/// Shorthand used by the rule modules once `required()` has been checked.
pub(crate) fn part(skeleton: &Skeleton, part: BodyPart) -> crate::landmark::Landmark {
    skeleton
        .get(part)
        .copied()
        .unwrap_or_else(|| crate::landmark::Landmark::new(f64::NAN, f64::NAN))
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::landmark::{BodyPart, CoordinateSpace, FrameSize, Landmark, Skeleton};

    pub fn normalized(points: &[(BodyPart, f64, f64)]) -> Skeleton {
        build(CoordinateSpace::Normalized, points)
    }

    pub fn pixels(points: &[(BodyPart, f64, f64)]) -> Skeleton {
        build(CoordinateSpace::Pixels, points)
    }

    fn build(space: CoordinateSpace, points: &[(BodyPart, f64, f64)]) -> Skeleton {
        let mut skeleton = Skeleton::new(space, FrameSize::default());
        for (part, x, y) in points {
            skeleton.set(*part, Landmark::new(*x, *y).with_score(0.9));
        }
        skeleton
    }
}
