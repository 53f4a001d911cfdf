//! Replays recorded detector output.
//!
//! The recording is a JSON array of [`DetectionResult`], JSON lines with one
//! result per line, or a single result. Frames are served in order; once the
//! recording runs out the last frame is held.

use anyhow::{anyhow, Result};
use std::path::Path;

use crate::detect::backend::PoseDetector;
use crate::detect::result::DetectionResult;
use crate::ingest::VideoFrame;

pub struct ReplayDetector {
    frames: Vec<DetectionResult>,
    cursor: usize,
    looped: bool,
}

impl ReplayDetector {
    pub fn new(frames: Vec<DetectionResult>) -> Self {
        Self {
            frames,
            cursor: 0,
            looped: false,
        }
    }

    /// Start over from the first frame after the last one.
    pub fn looping(mut self) -> Self {
        self.looped = true;
        self
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow!("failed to read recording {}: {}", path.display(), e))?;
        let frames = parse_recording(&raw)
            .map_err(|e| anyhow!("invalid recording {}: {}", path.display(), e))?;
        log::info!(
            "ReplayDetector: loaded {} frames from {}",
            frames.len(),
            path.display()
        );
        Ok(Self::new(frames))
    }

    pub fn frames(&self) -> &[DetectionResult] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

fn parse_recording(raw: &str) -> Result<Vec<DetectionResult>> {
    let trimmed = raw.trim_start();
    if trimmed.starts_with('[') {
        return Ok(serde_json::from_str(trimmed)?);
    }
    // A single frame, possibly pretty-printed.
    if let Ok(single) = serde_json::from_str::<DetectionResult>(trimmed) {
        return Ok(vec![single]);
    }
    trimmed
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            serde_json::from_str(line).map_err(|e| anyhow!("line {}: {}", index + 1, e))
        })
        .collect()
}

impl PoseDetector for ReplayDetector {
    fn name(&self) -> &'static str {
        "replay"
    }

    fn warm_up(&mut self) -> Result<()> {
        if self.frames.is_empty() {
            return Err(anyhow!("recording has no frames"));
        }
        Ok(())
    }

    fn detect(&mut self, _frame: &VideoFrame) -> Result<DetectionResult> {
        let last = self
            .frames
            .len()
            .checked_sub(1)
            .ok_or_else(|| anyhow!("recording has no frames"))?;
        let result = self.frames[self.cursor.min(last)].clone();
        if self.cursor < last {
            self.cursor += 1;
        } else if self.looped {
            self.cursor = 0;
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmark::FrameSize;
    use std::io::Write;

    fn frame() -> VideoFrame {
        VideoFrame {
            pixels: Vec::new(),
            width: 640,
            height: 480,
            captured_at_ms: 0,
            sequence: 1,
        }
    }

    #[test]
    fn parses_json_lines_and_holds_last_frame() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"poses":[]}}"#).unwrap();
        writeln!(file).unwrap();
        writeln!(
            file,
            r#"{{"poses":[{{"keypoints":[{{"name":"nose","x":320,"y":80,"score":0.9}}]}}],"topology":"movenet","space":"pixels"}}"#
        )
        .unwrap();
        let mut replay = ReplayDetector::from_path(file.path()).unwrap();
        assert_eq!(replay.len(), 2);
        replay.warm_up().unwrap();

        assert!(replay.detect(&frame()).unwrap().is_empty());
        for _ in 0..3 {
            let result = replay.detect(&frame()).unwrap();
            assert_eq!(result.poses.len(), 1);
            assert_eq!(result.frame, FrameSize::default());
        }
    }

    #[test]
    fn looping_restarts() {
        let mut replay = ReplayDetector::new(vec![
            DetectionResult::default(),
            DetectionResult {
                poses: vec![Default::default()],
                ..Default::default()
            },
        ])
        .looping();
        let seen: Vec<usize> = (0..4)
            .map(|_| replay.detect(&frame()).unwrap().poses.len())
            .collect();
        assert_eq!(seen, vec![0, 1, 0, 1]);
    }

    #[test]
    fn empty_recording_fails_warm_up() {
        let mut replay = ReplayDetector::new(Vec::new());
        assert!(replay.warm_up().is_err());
        assert!(replay.detect(&frame()).is_err());
        assert!(parse_recording("[]").unwrap().is_empty());
    }

    #[test]
    fn single_pretty_frame() {
        let raw = "{\n  \"poses\": [],\n  \"space\": \"pixels\"\n}\n";
        let frames = parse_recording(raw).unwrap();
        assert_eq!(frames.len(), 1);
        assert!(frames[0].is_empty());
    }
}
