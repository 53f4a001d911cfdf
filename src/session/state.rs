use serde::Serialize;
use std::fmt;

/// Where the guided session currently is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// Built but not started.
    Idle,
    /// Pose announced, grace period before the timer runs.
    PoseLoaded,
    TimerRunning,
    /// Timer running but held because the pose went wrong.
    Paused,
    /// Transient: the pose timer reached zero.
    PoseComplete,
    Resting(RestKind),
    /// Rest finished, next pose loads shortly.
    Advancing,
    SessionComplete,
    /// Torn down before completion.
    Ended,
}

impl SessionPhase {
    pub fn is_resting(self) -> bool {
        matches!(self, SessionPhase::Resting(_))
    }

    /// Terminal phases never schedule anything again.
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionPhase::SessionComplete | SessionPhase::Ended)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RestKind {
    Short,
    Long,
}

impl fmt::Display for RestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RestKind::Short => f.write_str("short"),
            RestKind::Long => f.write_str("long"),
        }
    }
}

/// Notable transitions, queued for the host to drain.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    PoseLoaded { index: usize, name: String },
    TimerStarted { target_secs: u32 },
    Paused,
    Resumed,
    PoseCompleted { index: usize, name: String, held_secs: u32 },
    RestStarted { kind: RestKind, secs: u32 },
    RestEnded,
    DetectionActive,
    FallbackActive { reason: String },
    CameraDenied,
    SessionComplete { poses_completed: u32 },
    ExitRequested,
}

/// Seconds as `MM:SS`. Minutes are not capped at 59.
pub fn format_clock(total_secs: u64) -> String {
    format!("{:02}:{:02}", total_secs / 60, total_secs % 60)
}
