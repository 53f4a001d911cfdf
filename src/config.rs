use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::evaluate::DEFAULT_MIN_DETECTION_CONFIDENCE;
use crate::feedback::VoiceSettings;
use crate::ingest::{check_frame_size, CameraConfig};
use crate::landmark::DEFAULT_MIN_VISIBILITY;
use crate::session::SessionTiming;

const DEFAULT_DB_PATH: &str = "pose_coach.db";
const DEFAULT_USER_ID: &str = "default_user";

#[derive(Debug, Deserialize, Default)]
struct CoachConfigFile {
    db_path: Option<String>,
    user_id: Option<String>,
    catalog_path: Option<PathBuf>,
    camera: Option<CameraConfigFile>,
    detector: Option<DetectorConfigFile>,
    timing: Option<TimingConfigFile>,
    voice: Option<VoiceConfigFile>,
    seed: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct CameraConfigFile {
    url: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct DetectorConfigFile {
    backend: Option<String>,
    min_visibility: Option<f64>,
    min_detection_confidence: Option<f64>,
}

#[derive(Debug, Deserialize, Default)]
struct TimingConfigFile {
    analysis_ms: Option<u64>,
    simulated_ms: Option<u64>,
    no_body_fallback_cycles: Option<u32>,
    tick_ms: Option<u64>,
    grace_ms: Option<u64>,
    advance_ms: Option<u64>,
    exit_ms: Option<u64>,
    hold_min_secs: Option<u32>,
    hold_max_secs: Option<u32>,
    short_rest_min_secs: Option<u32>,
    short_rest_max_secs: Option<u32>,
    long_rest_secs: Option<u32>,
    long_rest_every: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct VoiceConfigFile {
    enabled: Option<bool>,
    muted: Option<bool>,
    rate: Option<f32>,
    pitch: Option<f32>,
}

#[derive(Debug, Clone)]
pub struct CoachConfig {
    pub db_path: String,
    pub user_id: String,
    /// Pose library file; the built-in library when unset.
    pub catalog_path: Option<PathBuf>,
    pub camera: CameraConfig,
    pub detector: DetectorSettings,
    pub timing: SessionTiming,
    pub voice: VoiceSettings,
    /// Fixed seed for hold/rest durations and simulated verdicts.
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetectorSettings {
    /// Registered backend name; the registry default when unset.
    pub backend: Option<String>,
    pub min_visibility: f64,
    pub min_detection_confidence: f64,
}

impl CoachConfig {
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("POSE_COACH_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) => Some(read_config_file(Path::new(path))?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: CoachConfigFile) -> Self {
        let camera_defaults = CameraConfig::default();
        let camera = file.camera.unwrap_or_default();
        let detector = file.detector.unwrap_or_default();
        let timing = file.timing.unwrap_or_default();
        let voice = file.voice.unwrap_or_default();
        let t = SessionTiming::default();
        let v = VoiceSettings::default();

        Self {
            db_path: file.db_path.unwrap_or_else(|| DEFAULT_DB_PATH.to_string()),
            user_id: file.user_id.unwrap_or_else(|| DEFAULT_USER_ID.to_string()),
            catalog_path: file.catalog_path,
            camera: CameraConfig {
                url: camera.url.unwrap_or(camera_defaults.url),
                width: camera.width.unwrap_or(camera_defaults.width),
                height: camera.height.unwrap_or(camera_defaults.height),
            },
            detector: DetectorSettings {
                backend: detector.backend,
                min_visibility: detector.min_visibility.unwrap_or(DEFAULT_MIN_VISIBILITY),
                min_detection_confidence: detector
                    .min_detection_confidence
                    .unwrap_or(DEFAULT_MIN_DETECTION_CONFIDENCE),
            },
            timing: SessionTiming {
                analysis_interval_ms: timing.analysis_ms.unwrap_or(t.analysis_interval_ms),
                simulated_interval_ms: timing.simulated_ms.unwrap_or(t.simulated_interval_ms),
                no_body_fallback_cycles: timing
                    .no_body_fallback_cycles
                    .unwrap_or(t.no_body_fallback_cycles),
                tick_ms: timing.tick_ms.unwrap_or(t.tick_ms),
                grace_ms: timing.grace_ms.unwrap_or(t.grace_ms),
                advance_ms: timing.advance_ms.unwrap_or(t.advance_ms),
                exit_ms: timing.exit_ms.unwrap_or(t.exit_ms),
                camera_prompt_ms: t.camera_prompt_ms,
                hold_min_secs: timing.hold_min_secs.unwrap_or(t.hold_min_secs),
                hold_max_secs: timing.hold_max_secs.unwrap_or(t.hold_max_secs),
                short_rest_min_secs: timing.short_rest_min_secs.unwrap_or(t.short_rest_min_secs),
                short_rest_max_secs: timing.short_rest_max_secs.unwrap_or(t.short_rest_max_secs),
                long_rest_secs: timing.long_rest_secs.unwrap_or(t.long_rest_secs),
                long_rest_every: timing.long_rest_every.unwrap_or(t.long_rest_every),
            },
            voice: VoiceSettings {
                enabled: voice.enabled.unwrap_or(v.enabled),
                muted: voice.muted.unwrap_or(v.muted),
                rate: voice.rate.unwrap_or(v.rate),
                pitch: voice.pitch.unwrap_or(v.pitch),
            },
            seed: file.seed,
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(path) = std::env::var("POSE_COACH_DB_PATH") {
            if !path.trim().is_empty() {
                self.db_path = path;
            }
        }
        if let Ok(user) = std::env::var("POSE_COACH_USER_ID") {
            if !user.trim().is_empty() {
                self.user_id = user.trim().to_string();
            }
        }
        if let Ok(backend) = std::env::var("POSE_COACH_DETECTOR") {
            if !backend.trim().is_empty() {
                self.detector.backend = Some(backend.trim().to_string());
            }
        }
        if let Ok(voice) = std::env::var("POSE_COACH_VOICE") {
            self.voice.enabled = match voice.trim().to_lowercase().as_str() {
                "on" => true,
                "off" => false,
                _ => return Err(anyhow!("POSE_COACH_VOICE must be 'on' or 'off'")),
            };
        }
        if let Ok(muted) = std::env::var("POSE_COACH_MUTED") {
            self.voice.muted = muted
                .trim()
                .parse()
                .map_err(|_| anyhow!("POSE_COACH_MUTED must be 'true' or 'false'"))?;
        }
        if let Ok(ms) = std::env::var("POSE_COACH_ANALYSIS_MS") {
            self.timing.analysis_interval_ms = ms.trim().parse().map_err(|_| {
                anyhow!("POSE_COACH_ANALYSIS_MS must be an integer number of milliseconds")
            })?;
        }
        if let Ok(seed) = std::env::var("POSE_COACH_SEED") {
            let seed: u64 = seed
                .trim()
                .parse()
                .map_err(|_| anyhow!("POSE_COACH_SEED must be an unsigned integer"))?;
            self.seed = Some(seed);
        }
        Ok(())
    }

    fn validate(&mut self) -> Result<()> {
        crate::validate_user_id(&self.user_id)?;
        if let Some(backend) = &self.detector.backend {
            crate::validate_pose_id(backend)
                .map_err(|_| anyhow!("detector backend '{}' is not a valid name", backend))?;
        }
        for (name, value) in [
            ("min_visibility", self.detector.min_visibility),
            (
                "min_detection_confidence",
                self.detector.min_detection_confidence,
            ),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(anyhow!("detector.{} must be within [0, 1], got {}", name, value));
            }
        }
        check_frame_size(self.camera.width, self.camera.height)?;
        if self.voice.rate <= 0.0 || self.voice.pitch <= 0.0 {
            return Err(anyhow!("voice rate and pitch must be positive"));
        }
        self.timing.validate()
    }
}

fn read_config_file(path: &Path) -> Result<CoachConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}

/// Comma-separated list, blanks dropped.
pub fn split_csv(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|entry| entry.trim())
        .filter(|entry| !entry.is_empty())
        .map(|entry| entry.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let mut cfg = CoachConfig::from_file(CoachConfigFile::default());
        cfg.validate().unwrap();
        assert_eq!(cfg.db_path, DEFAULT_DB_PATH);
        assert_eq!(cfg.timing, SessionTiming::default());
        assert_eq!(cfg.voice, VoiceSettings::default());
        assert_eq!(cfg.camera.url, "stub://front");
        assert!(cfg.detector.backend.is_none());
    }

    #[test]
    fn validation_catches_bad_ranges() {
        let file: CoachConfigFile = serde_json::from_str(
            r#"{"timing": {"short_rest_min_secs": 25, "short_rest_max_secs": 20}}"#,
        )
        .unwrap();
        assert!(CoachConfig::from_file(file).validate().is_err());

        let file: CoachConfigFile =
            serde_json::from_str(r#"{"detector": {"min_visibility": 1.5}}"#).unwrap();
        assert!(CoachConfig::from_file(file).validate().is_err());
    }

    #[test]
    fn csv_split() {
        assert_eq!(split_csv(" a, ,b,"), vec!["a", "b"]);
    }
}
