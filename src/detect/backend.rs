use anyhow::Result;

use crate::detect::result::DetectionResult;
use crate::ingest::VideoFrame;

/// Pose detector backend trait.
///
/// Implementations turn one frame into zero or more bodies of landmarks. They
/// must treat the frame as read-only and must not keep it past the call.
pub trait PoseDetector: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Run detection on a frame.
    fn detect(&mut self, frame: &VideoFrame) -> Result<DetectionResult>;

    /// Model loading hook, run once before the first `detect`.
    ///
    /// A failure here is reported as [`crate::CoachError::DetectionUnavailable`]
    /// and puts the session into simulated-verdict mode.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}
