//! Guided session: one pose after another, each held for a randomized time,
//! with rests in between and verdict-driven pause/resume.
//!
//! Everything runs on one cooperative loop. [`SessionMachine`] owns a
//! [`Scheduler`] of virtual-time timers; the host either drives it against a
//! wall clock or jumps straight from one due timer to the next.

mod machine;
mod scheduler;
mod source;
mod state;

use anyhow::{anyhow, Result};

pub use machine::{PoseTimer, SessionMachine, SessionStatus};
pub use scheduler::{Scheduler, TimerId, TimerKind};
pub use source::{
    select_verdict_source, DetectorVerdictSource, Observation, ScriptedVerdictSource,
    SimulatedVerdictSource, VerdictSource, SIMULATED_CORRECT_PROBABILITY, SIMULATED_INTERVAL_MS,
};
pub use state::{format_clock, RestKind, SessionEvent, SessionPhase};

/// Delays and durations of a session.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionTiming {
    pub analysis_interval_ms: u64,
    pub simulated_interval_ms: u64,
    /// Consecutive analysis cycles without a body before the detector is
    /// abandoned for simulated verdicts. Zero never abandons it.
    pub no_body_fallback_cycles: u32,
    /// Wall time per timer second. Each tick counts one second down.
    pub tick_ms: u64,
    pub grace_ms: u64,
    pub advance_ms: u64,
    pub exit_ms: u64,
    pub camera_prompt_ms: u64,
    pub hold_min_secs: u32,
    pub hold_max_secs: u32,
    pub short_rest_min_secs: u32,
    pub short_rest_max_secs: u32,
    pub long_rest_secs: u32,
    /// Every n-th completed pose earns the long rest.
    pub long_rest_every: u32,
}

impl Default for SessionTiming {
    fn default() -> Self {
        Self {
            analysis_interval_ms: 500,
            simulated_interval_ms: SIMULATED_INTERVAL_MS,
            no_body_fallback_cycles: 20,
            tick_ms: 1_000,
            grace_ms: 2_000,
            advance_ms: 2_000,
            exit_ms: 5_000,
            camera_prompt_ms: 2_000,
            hold_min_secs: 30,
            hold_max_secs: 40,
            short_rest_min_secs: 10,
            short_rest_max_secs: 20,
            long_rest_secs: 30,
            long_rest_every: 3,
        }
    }
}

impl SessionTiming {
    pub fn validate(&self) -> Result<()> {
        if self.analysis_interval_ms == 0 || self.tick_ms == 0 {
            return Err(anyhow!("analysis and tick intervals must be > 0"));
        }
        if self.hold_min_secs == 0 || self.hold_min_secs > self.hold_max_secs {
            return Err(anyhow!(
                "hold range {}..={} seconds is invalid",
                self.hold_min_secs,
                self.hold_max_secs
            ));
        }
        if self.short_rest_min_secs == 0 || self.short_rest_min_secs > self.short_rest_max_secs {
            return Err(anyhow!(
                "short rest range {}..={} seconds is invalid",
                self.short_rest_min_secs,
                self.short_rest_max_secs
            ));
        }
        if self.long_rest_secs == 0 {
            return Err(anyhow!("long rest must be > 0 seconds"));
        }
        if self.long_rest_every == 0 {
            return Err(anyhow!("long_rest_every must be >= 1"));
        }
        Ok(())
    }
}
