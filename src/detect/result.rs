use serde::{Deserialize, Serialize};

use crate::landmark::{CoordinateSpace, FrameSize, RawLandmark, Skeleton, Topology};

/// Result of running pose detection on a frame.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DetectionResult {
    /// Detected bodies, most confident first. Empty when nobody is in view.
    #[serde(default)]
    pub poses: Vec<DetectedPose>,
    /// Layout of unnamed landmark lists.
    #[serde(default)]
    pub topology: Topology,
    /// Coordinate space of every landmark in this result.
    #[serde(default)]
    pub space: CoordinateSpace,
    /// Dimensions of the analysed frame.
    #[serde(default)]
    pub frame: FrameSize,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DetectedPose {
    #[serde(default, alias = "landmarks")]
    pub keypoints: Vec<RawLandmark>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

impl DetectionResult {
    pub fn empty(frame: FrameSize) -> Self {
        Self {
            frame,
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.poses.is_empty()
    }

    /// Skeleton of the first body whose score (if reported) reaches
    /// `min_confidence`.
    pub fn primary_skeleton(&self, min_visibility: f64, min_confidence: f64) -> Option<Skeleton> {
        self.poses
            .iter()
            .find(|pose| pose.score.map_or(true, |score| score >= min_confidence))
            .map(|pose| {
                Skeleton::from_raw(&pose.keypoints, self.topology, self.space, self.frame)
                    .with_min_visibility(min_visibility)
            })
    }
}
