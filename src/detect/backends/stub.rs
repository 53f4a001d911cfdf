use anyhow::{anyhow, Result};

use crate::detect::backend::PoseDetector;
use crate::detect::result::DetectionResult;
use crate::ingest::VideoFrame;

/// Stub backend for testing. Reports the same detection for every frame, or
/// refuses to load at all.
pub struct StubDetector {
    result: DetectionResult,
    load_error: Option<String>,
    frames_seen: u64,
}

impl StubDetector {
    /// Always returns `result`, resized to the incoming frame.
    pub fn fixed(result: DetectionResult) -> Self {
        Self {
            result,
            load_error: None,
            frames_seen: 0,
        }
    }

    /// Fails `warm_up` with `reason`.
    pub fn unavailable(reason: &str) -> Self {
        Self {
            result: DetectionResult::default(),
            load_error: Some(reason.to_string()),
            frames_seen: 0,
        }
    }

    pub fn frames_seen(&self) -> u64 {
        self.frames_seen
    }
}

impl Default for StubDetector {
    fn default() -> Self {
        Self::fixed(DetectionResult::default())
    }
}

impl PoseDetector for StubDetector {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn warm_up(&mut self) -> Result<()> {
        match &self.load_error {
            Some(reason) => Err(anyhow!("{}", reason)),
            None => Ok(()),
        }
    }

    fn detect(&mut self, frame: &VideoFrame) -> Result<DetectionResult> {
        if let Some(reason) = &self.load_error {
            return Err(anyhow!("stub detector unavailable: {}", reason));
        }
        self.frames_seen += 1;
        let mut result = self.result.clone();
        result.frame = frame.size();
        Ok(result)
    }
}
