//! Video frame sources.
//!
//! A source hands frames to the detector one at a time. Frames are not
//! retained past the detection call that consumes them.
//!
//! Sources:
//! - `stub://` synthetic camera (tests, replay runs)
//! - `stub://denied` camera that refuses access, for exercising the
//!   permission-denied path

pub mod camera;

use anyhow::{anyhow, Result};

use crate::landmark::FrameSize;

pub use camera::{CameraConfig, CameraSource, CameraStats};

/// Largest accepted frame area, 8K UHD.
pub const MAX_FRAME_PIXELS: u64 = 7_680 * 4_320;

/// Reject empty frame sizes and sizes above [`MAX_FRAME_PIXELS`].
pub fn check_frame_size(width: u32, height: u32) -> Result<()> {
    let area = u64::from(width) * u64::from(height);
    if area == 0 {
        return Err(anyhow!("camera frame size {}x{} is empty", width, height));
    }
    if area > MAX_FRAME_PIXELS {
        return Err(anyhow!(
            "camera frame size {}x{} exceeds {} pixels",
            width,
            height,
            MAX_FRAME_PIXELS
        ));
    }
    Ok(())
}

/// One captured frame.
#[derive(Clone, Debug)]
pub struct VideoFrame {
    /// Packed RGB pixels. Empty when the source only reports geometry.
    pub pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Capture time on the session clock.
    pub captured_at_ms: u64,
    pub sequence: u64,
}

impl VideoFrame {
    pub fn size(&self) -> FrameSize {
        FrameSize {
            width: self.width,
            height: self.height,
        }
    }

    /// A frame with no dimensions means the stream has not started yet.
    pub fn is_ready(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}

/// Producer of frames for the detection loop.
pub trait FrameSource: Send {
    fn name(&self) -> &'static str;

    /// Acquire the device. Fails with [`crate::CoachError::CameraAccessDenied`]
    /// when access is refused.
    fn connect(&mut self) -> Result<()>;

    /// Capture the next frame.
    fn next_frame(&mut self, now_ms: u64) -> Result<VideoFrame>;

    fn is_healthy(&self) -> bool;

    /// Stop the stream. Idempotent.
    fn release(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_size_limits() {
        check_frame_size(640, 480).unwrap();
        check_frame_size(7_680, 4_320).unwrap();
        assert!(check_frame_size(0, 480).is_err());
        assert!(check_frame_size(7_681, 4_320).is_err());
        assert!(check_frame_size(40_000, 40_000).is_err());
        assert!(check_frame_size(u32::MAX, u32::MAX).is_err());
    }
}
