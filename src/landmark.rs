//! Body landmarks and the per-cycle skeleton lookup.
//!
//! Detectors report landmarks either keyed by semantic name (MoveNet style,
//! pixel coordinates) or as a fixed-position list (MediaPipe style, normalized
//! coordinates). A `Skeleton` accepts either and answers lookups by
//! [`BodyPart`], hiding landmarks whose score is below its visibility threshold.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Default score a landmark must reach before its coordinates are trusted.
pub const DEFAULT_MIN_VISIBILITY: f64 = 0.3;

/// Number of landmarks in the MediaPipe pose topology.
pub const MEDIAPIPE_LANDMARKS: usize = 33;

/// Body points used by the pose rules.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyPart {
    Nose,
    LeftEye,
    RightEye,
    LeftEar,
    RightEar,
    LeftShoulder,
    RightShoulder,
    LeftElbow,
    RightElbow,
    LeftWrist,
    RightWrist,
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
    LeftAnkle,
    RightAnkle,
}

impl BodyPart {
    /// All parts in MoveNet keypoint order.
    pub const ALL: [BodyPart; 17] = [
        BodyPart::Nose,
        BodyPart::LeftEye,
        BodyPart::RightEye,
        BodyPart::LeftEar,
        BodyPart::RightEar,
        BodyPart::LeftShoulder,
        BodyPart::RightShoulder,
        BodyPart::LeftElbow,
        BodyPart::RightElbow,
        BodyPart::LeftWrist,
        BodyPart::RightWrist,
        BodyPart::LeftHip,
        BodyPart::RightHip,
        BodyPart::LeftKnee,
        BodyPart::RightKnee,
        BodyPart::LeftAnkle,
        BodyPart::RightAnkle,
    ];

    pub fn name(self) -> &'static str {
        match self {
            BodyPart::Nose => "nose",
            BodyPart::LeftEye => "left_eye",
            BodyPart::RightEye => "right_eye",
            BodyPart::LeftEar => "left_ear",
            BodyPart::RightEar => "right_ear",
            BodyPart::LeftShoulder => "left_shoulder",
            BodyPart::RightShoulder => "right_shoulder",
            BodyPart::LeftElbow => "left_elbow",
            BodyPart::RightElbow => "right_elbow",
            BodyPart::LeftWrist => "left_wrist",
            BodyPart::RightWrist => "right_wrist",
            BodyPart::LeftHip => "left_hip",
            BodyPart::RightHip => "right_hip",
            BodyPart::LeftKnee => "left_knee",
            BodyPart::RightKnee => "right_knee",
            BodyPart::LeftAnkle => "left_ankle",
            BodyPart::RightAnkle => "right_ankle",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        BodyPart::ALL
            .iter()
            .copied()
            .find(|part| part.name() == name)
    }

    /// Position in the MediaPipe 33-landmark list.
    pub fn mediapipe_index(self) -> usize {
        match self {
            BodyPart::Nose => 0,
            BodyPart::LeftEye => 2,
            BodyPart::RightEye => 5,
            BodyPart::LeftEar => 7,
            BodyPart::RightEar => 8,
            BodyPart::LeftShoulder => 11,
            BodyPart::RightShoulder => 12,
            BodyPart::LeftElbow => 13,
            BodyPart::RightElbow => 14,
            BodyPart::LeftWrist => 15,
            BodyPart::RightWrist => 16,
            BodyPart::LeftHip => 23,
            BodyPart::RightHip => 24,
            BodyPart::LeftKnee => 25,
            BodyPart::RightKnee => 26,
            BodyPart::LeftAnkle => 27,
            BodyPart::RightAnkle => 28,
        }
    }

    /// Position in the MoveNet 17-keypoint list.
    pub fn movenet_index(self) -> usize {
        BodyPart::ALL
            .iter()
            .position(|part| *part == self)
            .unwrap_or_default()
    }

    /// Part at a position of the given topology, if that position is tracked.
    pub fn at_index(topology: Topology, index: usize) -> Option<Self> {
        match topology {
            Topology::MediaPipe => BodyPart::ALL
                .iter()
                .copied()
                .find(|part| part.mediapipe_index() == index),
            Topology::MoveNet => BodyPart::ALL.get(index).copied(),
        }
    }
}

/// Index layout used when raw landmarks carry no name.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Topology {
    #[default]
    MediaPipe,
    MoveNet,
}

/// Coordinate space of a detector's output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoordinateSpace {
    /// `[0, 1]` relative to the frame.
    #[default]
    Normalized,
    /// Pixels of the source frame.
    Pixels,
}

/// Source frame dimensions in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl Default for FrameSize {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
        }
    }
}

/// One tracked body point.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f64,
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z: Option<f64>,
    /// Detection confidence (MoveNet `score`, MediaPipe `visibility`).
    #[serde(default, alias = "visibility", skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

impl Landmark {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            z: None,
            score: None,
        }
    }

    pub fn with_score(mut self, score: f64) -> Self {
        self.score = Some(score);
        self
    }

    /// Unscored landmarks are treated as visible.
    pub fn is_visible(&self, min_visibility: f64) -> bool {
        self.score.map_or(true, |score| score >= min_visibility)
    }
}

/// Landmark as produced by a detector, optionally named.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawLandmark {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub point: Landmark,
}

/// Landmarks of one detected body for one detection cycle.
#[derive(Clone, Debug)]
pub struct Skeleton {
    points: HashMap<BodyPart, Landmark>,
    space: CoordinateSpace,
    frame: FrameSize,
    min_visibility: f64,
}

impl Skeleton {
    pub fn new(space: CoordinateSpace, frame: FrameSize) -> Self {
        Self {
            points: HashMap::new(),
            space,
            frame,
            min_visibility: DEFAULT_MIN_VISIBILITY,
        }
    }

    /// Build from a detector's raw list. Named entries are keyed by name;
    /// unnamed entries by their position in `topology`. Untracked names and
    /// positions are ignored.
    pub fn from_raw(
        raw: &[RawLandmark],
        topology: Topology,
        space: CoordinateSpace,
        frame: FrameSize,
    ) -> Self {
        let mut skeleton = Self::new(space, frame);
        for (index, entry) in raw.iter().enumerate() {
            let part = match entry.name.as_deref() {
                Some(name) => BodyPart::from_name(name),
                None => BodyPart::at_index(topology, index),
            };
            if let Some(part) = part {
                skeleton.points.insert(part, entry.point);
            }
        }
        skeleton
    }

    pub fn with_min_visibility(mut self, min_visibility: f64) -> Self {
        self.min_visibility = min_visibility;
        self
    }

    pub fn set(&mut self, part: BodyPart, landmark: Landmark) {
        self.points.insert(part, landmark);
    }

    pub fn remove(&mut self, part: BodyPart) -> Option<Landmark> {
        self.points.remove(&part)
    }

    /// Visible landmark for a part.
    pub fn get(&self, part: BodyPart) -> Option<&Landmark> {
        self.points
            .get(&part)
            .filter(|lm| lm.is_visible(self.min_visibility))
    }

    /// Landmark regardless of its score.
    pub fn get_raw(&self, part: BodyPart) -> Option<&Landmark> {
        self.points.get(&part)
    }

    /// Parts from `required` that are absent or below the visibility threshold.
    pub fn missing(&self, required: &[BodyPart]) -> Vec<BodyPart> {
        required
            .iter()
            .copied()
            .filter(|part| self.get(*part).is_none())
            .collect()
    }

    pub fn space(&self) -> CoordinateSpace {
        self.space
    }

    pub fn frame(&self) -> FrameSize {
        self.frame
    }

    pub fn min_visibility(&self) -> f64 {
        self.min_visibility
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Copy of this skeleton in `[0, 1]` frame coordinates.
    pub fn to_normalized(&self) -> Result<Skeleton> {
        match self.space {
            CoordinateSpace::Normalized => Ok(self.clone()),
            CoordinateSpace::Pixels => {
                let (w, h) = self.frame_dims()?;
                Ok(self.rescaled(CoordinateSpace::Normalized, 1.0 / w, 1.0 / h))
            }
        }
    }

    /// Copy of this skeleton in pixel coordinates.
    pub fn to_pixels(&self) -> Result<Skeleton> {
        match self.space {
            CoordinateSpace::Pixels => Ok(self.clone()),
            CoordinateSpace::Normalized => {
                let (w, h) = self.frame_dims()?;
                Ok(self.rescaled(CoordinateSpace::Pixels, w, h))
            }
        }
    }

    fn frame_dims(&self) -> Result<(f64, f64)> {
        if self.frame.width == 0 || self.frame.height == 0 {
            return Err(anyhow!(
                "cannot convert coordinates: frame size {}x{} is empty",
                self.frame.width,
                self.frame.height
            ));
        }
        Ok((self.frame.width as f64, self.frame.height as f64))
    }

    fn rescaled(&self, space: CoordinateSpace, sx: f64, sy: f64) -> Skeleton {
        let points = self
            .points
            .iter()
            .map(|(part, lm)| {
                (
                    *part,
                    Landmark {
                        x: lm.x * sx,
                        y: lm.y * sy,
                        ..*lm
                    },
                )
            })
            .collect();
        Skeleton {
            points,
            space,
            frame: self.frame,
            min_visibility: self.min_visibility,
        }
    }
}
