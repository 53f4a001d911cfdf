//! Pose-detection collaborator seam.
//!
//! The coach never runs a model itself. A [`PoseDetector`] backend turns a
//! frame into landmark lists; the registry picks one by name at session start.

mod backend;
mod backends;
mod registry;
mod result;

pub use backend::PoseDetector;
pub use backends::{ReplayDetector, StubDetector};
pub use registry::{DetectorRegistry, SharedDetector};
pub use result::{DetectedPose, DetectionResult};
