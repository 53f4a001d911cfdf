//! Camera frame source.
//!
//! Only synthetic `stub://` cameras are built in. Their frames carry size and
//! timing but no pixels. Hardware capture lives outside this crate and plugs
//! in through [`FrameSource`].

use anyhow::{anyhow, Result};

use super::{check_frame_size, FrameSource, VideoFrame};
use crate::CoachError;

const DENIED_URL: &str = "stub://denied";

/// Configuration for a camera source.
#[derive(Clone, Debug)]
pub struct CameraConfig {
    /// Source URL, e.g. `stub://front`.
    pub url: String,
    pub width: u32,
    pub height: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            url: "stub://front".to_string(),
            width: 640,
            height: 480,
        }
    }
}

/// Statistics for a camera source.
#[derive(Clone, Debug)]
pub struct CameraStats {
    pub frames_captured: u64,
    pub url: String,
}

/// Synthetic camera.
pub struct CameraSource {
    config: CameraConfig,
    frame_count: u64,
    connected: bool,
}

impl CameraSource {
    pub fn new(config: CameraConfig) -> Result<Self> {
        if !config.url.starts_with("stub://") {
            return Err(anyhow!(
                "camera '{}' is not supported: only stub:// sources are built in",
                config.url
            ));
        }
        check_frame_size(config.width, config.height)?;
        Ok(Self {
            config,
            frame_count: 0,
            connected: false,
        })
    }

    pub fn stats(&self) -> CameraStats {
        CameraStats {
            frames_captured: self.frame_count,
            url: self.config.url.clone(),
        }
    }
}

impl FrameSource for CameraSource {
    fn name(&self) -> &'static str {
        "camera"
    }

    fn connect(&mut self) -> Result<()> {
        if self.config.url == DENIED_URL {
            return Err(CoachError::CameraAccessDenied(self.config.url.clone()).into());
        }
        self.connected = true;
        log::info!("CameraSource: connected to {} (synthetic)", self.config.url);
        Ok(())
    }

    fn next_frame(&mut self, now_ms: u64) -> Result<VideoFrame> {
        if !self.connected {
            return Err(anyhow!("camera {} is not connected", self.config.url));
        }
        self.frame_count += 1;
        Ok(VideoFrame {
            pixels: Vec::new(),
            width: self.config.width,
            height: self.config.height,
            captured_at_ms: now_ms,
            sequence: self.frame_count,
        })
    }

    fn is_healthy(&self) -> bool {
        self.connected
    }

    fn release(&mut self) {
        if self.connected {
            log::info!(
                "CameraSource: released {} after {} frames",
                self.config.url,
                self.frame_count
            );
        }
        self.connected = false;
    }
}
