//! Pose Coach
//!
//! Real-time posture coaching for yoga and strength exercises.
//!
//! # Architecture
//!
//! A pose detector turns each camera frame into body landmarks. Rule-based
//! classifiers measure joint angles and alignments on those landmarks and
//! return a verdict: correct, or a list of corrections. A guided session
//! holds each pose for a randomized time, pausing while the form is wrong,
//! and rests between poses. Completed poses go to a local session log that
//! feeds the weekly report and the schedule generator.
//!
//! # Module Structure
//!
//! - `geometry`, `landmark`: points, angles, skeletons
//! - `classify`: per-pose rules and verdicts
//! - `catalog`: the pose library
//! - `detect`, `ingest`: detector backends and frame sources
//! - `evaluate`: detection result to verdict
//! - `session`: guided-session state machine on a virtual-time scheduler
//! - `exercise`: free-form rep and hold tracking
//! - `feedback`: banners and speech
//! - `storage`, `schedule`: session log, weekly schedule generation
//! - `config`, `ui`: configuration and terminal rendering

use anyhow::{anyhow, Result};
use rand::RngCore;
use rusqlite::{Connection, OpenFlags};
use std::fmt;
use std::sync::OnceLock;

use crate::landmark::BodyPart;

pub mod catalog;
pub mod classify;
pub mod config;
pub mod detect;
pub mod evaluate;
pub mod exercise;
pub mod feedback;
pub mod geometry;
pub mod ingest;
pub mod landmark;
pub mod schedule;
pub mod session;
pub mod storage;
pub mod ui;

pub use catalog::{Catalog, PoseDefinition, PoseKind};
pub use classify::{Classifier, PoseVerdict};
pub use config::CoachConfig;
pub use detect::{DetectionResult, DetectorRegistry, PoseDetector};
pub use evaluate::{PoseEvaluator, Target};
pub use exercise::{ExerciseMonitor, TrackingMode, TrackingStats};
pub use feedback::{Feedback, FeedbackSink, RecordingSink, VoiceSettings};
pub use ingest::{CameraConfig, CameraSource, FrameSource, VideoFrame};
pub use landmark::{Landmark, Skeleton};
pub use schedule::{generate_schedule, SchedulePreferences, WeeklySchedule};
pub use session::{SessionEvent, SessionMachine, SessionPhase, SessionTiming, VerdictSource};
pub use storage::{InMemorySessionLog, PoseCompletion, SessionLog, SqliteSessionLog};

pub fn shared_memory_uri() -> String {
    let mut bytes = [0u8; 8];
    rand::thread_rng().fill_bytes(&mut bytes);
    format!(
        "file:pose_coach_{:x}?mode=memory&cache=shared",
        u64::from_le_bytes(bytes)
    )
}

pub(crate) fn open_db_connection(db_path: &str) -> Result<Connection> {
    if db_path.starts_with("file:") {
        return Ok(Connection::open_with_flags(
            db_path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_URI,
        )?);
    }
    Ok(Connection::open(db_path)?)
}

// -------------------- Errors --------------------

/// Failures the session reacts to by kind rather than by message.
///
/// They travel inside `anyhow::Error`; recover them with
/// `err.downcast_ref::<CoachError>()`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CoachError {
    /// No detector backend could be loaded or warmed up.
    DetectionUnavailable(String),
    /// The frame was analyzed but contained no body.
    NoBodyDetected,
    /// A body was found but the rule's required landmarks were not visible.
    MissingLandmarks {
        missing: Vec<BodyPart>,
        guidance: &'static str,
    },
    /// The camera refused access.
    CameraAccessDenied(String),
}

impl fmt::Display for CoachError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoachError::DetectionUnavailable(reason) => {
                write!(f, "pose detection unavailable: {}", reason)
            }
            CoachError::NoBodyDetected => f.write_str(evaluate::NO_POSE_DETECTED),
            CoachError::MissingLandmarks { guidance, .. } => f.write_str(guidance),
            CoachError::CameraAccessDenied(source) => {
                write!(f, "camera access denied: {}", source)
            }
        }
    }
}

impl std::error::Error for CoachError {}

// -------------------- Identifiers --------------------

static ID_RE: OnceLock<Option<regex::Regex>> = OnceLock::new();

fn id_regex() -> Result<&'static regex::Regex> {
    ID_RE
        .get_or_init(|| regex::Regex::new(r"^[a-z0-9_-]{1,64}$").ok())
        .as_ref()
        .ok_or_else(|| anyhow!("identifier pattern failed to compile"))
}

/// Pose ids and backend names: 1..64 of `[a-z0-9_-]`.
pub fn validate_pose_id(id: &str) -> Result<()> {
    if !id_regex()?.is_match(id) {
        return Err(anyhow!(
            "pose id '{}' must match ^[a-z0-9_-]{{1,64}}$",
            id
        ));
    }
    Ok(())
}

/// User ids are free text, but never blank, never multi-line, and bounded.
pub fn validate_user_id(id: &str) -> Result<()> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        return Err(anyhow!("user_id must not be empty"));
    }
    if trimmed.len() > 128 {
        return Err(anyhow!("user_id must be at most 128 bytes"));
    }
    if trimmed.chars().any(char::is_control) {
        return Err(anyhow!("user_id must not contain control characters"));
    }
    Ok(())
}
