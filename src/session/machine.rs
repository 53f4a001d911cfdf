use anyhow::{anyhow, Result};
use rand::{Rng, RngCore};
use serde::Serialize;
use std::collections::VecDeque;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::catalog::{PoseDefinition, PoseKind};
use crate::classify::PoseVerdict;
use crate::evaluate::Target;
use crate::feedback::{Feedback, Severity};
use crate::session::scheduler::{Scheduler, TimerKind};
use crate::session::source::{Observation, VerdictSource};
use crate::session::state::{format_clock, RestKind, SessionEvent, SessionPhase};
use crate::session::SessionTiming;
use crate::storage::{PoseCompletion, SessionLog};
use crate::CoachError;

// -------------------- Messages --------------------

const NO_POSES: &str = "No poses found. Please generate a schedule first.";
const CAMERA_DENIED: &str = "Camera access denied. Please check permissions.";
const DETECTION_FALLBACK: &str = "AI pose detection failed. Using fallback mode.";
const DETECTION_ACTIVE: &str = "AI pose detection active!";
const CAMERA_READY: &str =
    "Camera ready! Stand 3-6 feet away, ensure good lighting, and face the camera directly.";
const CAMERA_READY_SPEECH: &str = "Camera is ready. Please stand 3 to 6 feet away from the camera, ensure good lighting, and face the camera directly for best pose detection.";
const TIMER_STARTED: &str = "Timer started! Hold the pose steady.";
const TIMER_STARTED_SPEECH: &str =
    "Timer started. Hold the pose steady and focus on your breathing.";
const PAUSED: &str = "Session paused. Please correct your pose.";
const PAUSED_SPEECH: &str = "Session paused. Please correct your pose before continuing.";
const RESUMED: &str = "Session resumed! Great job correcting your pose.";
const RESUMED_SPEECH: &str = "Excellent! Pose corrected. Session resumed.";
const POSE_CORRECT_SPEECH: &str = "Great! Your pose looks correct. Continue holding the pose.";
const FALLBACK_CORRECT: &str = "Pose is correct! Timer can now start.";
const FALLBACK_INCORRECT: &str = "Adjust your pose...";
const FALLBACK_INCORRECT_SPEECH: &str = "Please correct your pose. Focus on your alignment.";
const POSE_COMPLETED: &str = "Pose completed! Great job!";
const POSE_COMPLETED_SPEECH: &str = "Excellent! Pose completed successfully.";
const REST_COMPLETE: &str = "Rest complete! Prepare for next pose.";
const REST_COMPLETE_SPEECH: &str = "Rest complete. Prepare for your next pose.";
const PAUSED_DISPLAY: &str = "PAUSED";
const SESSION_COMPLETE: &str = "Session completed! Congratulations!";
const SESSION_COMPLETE_SPEECH: &str = "Congratulations! You have completed your yoga session. Take a moment to appreciate your dedication and progress.";

/// Countdown of the pose being held.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct PoseTimer {
    pub target_secs: u32,
    pub remaining_secs: u32,
}

/// Snapshot for renderers.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SessionStatus {
    pub phase: SessionPhase,
    pub pose_index: usize,
    pub pose_total: usize,
    pub pose_name: Option<String>,
    pub display: String,
    pub progress_pct: f64,
    pub clock: String,
    pub pose_correct: bool,
    pub paused: bool,
    pub poses_completed: u32,
}

/// The guided-session state machine.
///
/// All mutation happens inside timer dispatch or the explicit host calls
/// ([`start`](Self::start), [`end`](Self::end), toggles, help), so there is
/// exactly one writer.
pub struct SessionMachine {
    poses: Vec<PoseDefinition>,
    index: usize,
    phase: SessionPhase,
    pose_correct: bool,
    paused: bool,
    timer: Option<PoseTimer>,
    rest_left_secs: u32,
    completed: u32,
    display: String,
    started_at_ms: Option<u64>,
    detection_announced: bool,
    last_error: Option<String>,
    last_verdict: Option<PoseVerdict>,
    fallback_reason: Option<String>,
    timing: SessionTiming,
    scheduler: Scheduler,
    source: Box<dyn VerdictSource>,
    feedback: Feedback,
    rng: Box<dyn RngCore + Send>,
    log: Option<Box<dyn SessionLog>>,
    user_id: String,
    epoch_base_secs: i64,
    events: VecDeque<SessionEvent>,
}

impl SessionMachine {
    pub fn new(
        poses: Vec<PoseDefinition>,
        timing: SessionTiming,
        source: Box<dyn VerdictSource>,
        feedback: Feedback,
        rng: Box<dyn RngCore + Send>,
    ) -> Result<Self> {
        if poses.is_empty() {
            return Err(anyhow!(NO_POSES));
        }
        timing.validate()?;
        let epoch_base_secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);
        Ok(Self {
            poses,
            index: 0,
            phase: SessionPhase::Idle,
            pose_correct: false,
            paused: false,
            timer: None,
            rest_left_secs: 0,
            completed: 0,
            display: format_clock(0),
            started_at_ms: None,
            detection_announced: false,
            last_error: None,
            last_verdict: None,
            fallback_reason: None,
            timing,
            scheduler: Scheduler::new(),
            source,
            feedback,
            rng,
            log: None,
            user_id: "default_user".to_string(),
            epoch_base_secs,
            events: VecDeque::new(),
        })
    }

    /// Record each completed pose.
    pub fn with_log(mut self, log: Box<dyn SessionLog>) -> Self {
        self.log = Some(log);
        self
    }

    pub fn with_user(mut self, user_id: &str) -> Self {
        self.user_id = user_id.to_string();
        self
    }

    /// Unix time that virtual time zero maps to.
    pub fn with_clock_base(mut self, epoch_secs: i64) -> Self {
        self.epoch_base_secs = epoch_secs;
        self
    }

    pub fn with_fallback_reason(mut self, reason: Option<String>) -> Self {
        self.fallback_reason = reason;
        self
    }

    // -------------------- Host controls --------------------

    /// Acquire the camera, arm the analysis trigger and load the first pose.
    pub fn start(&mut self) -> Result<()> {
        if self.phase != SessionPhase::Idle {
            return Err(anyhow!("session already started"));
        }
        let now = self.now();
        if let Err(err) = self.source.start(now) {
            match err.downcast_ref::<CoachError>() {
                Some(CoachError::CameraAccessDenied(_)) => {
                    self.feedback.error(now, CAMERA_DENIED);
                    self.events.push_back(SessionEvent::CameraDenied);
                }
                _ => self.feedback.error(now, format!("Camera error: {}", err)),
            }
            self.end();
            return Err(err);
        }
        self.started_at_ms = Some(now);
        log::info!(
            "session started: {} poses, verdicts from {}",
            self.poses.len(),
            self.source.name()
        );

        if self.source.is_fallback() {
            let reason = self
                .fallback_reason
                .clone()
                .unwrap_or_else(|| "pose detection unavailable".to_string());
            self.announce_fallback(reason);
        }

        self.scheduler
            .set_timeout(self.timing.camera_prompt_ms, TimerKind::CameraPrompt);
        self.scheduler
            .set_interval(self.timing.analysis_interval_ms, TimerKind::Analysis);
        self.load_current_pose();
        Ok(())
    }

    /// Cancel every timer and release the camera. Safe to call repeatedly.
    pub fn end(&mut self) {
        self.scheduler.cancel_all();
        self.source.release();
        self.timer = None;
        if !self.phase.is_terminal() {
            self.phase = SessionPhase::Ended;
            log::info!("session ended after {} poses", self.completed);
        }
    }

    /// Fire every timer due up to `until_ms`, then move the clock there.
    pub fn run_until(&mut self, until_ms: u64) {
        while let Some((_, kind)) = self.scheduler.pop_due(until_ms) {
            self.dispatch(kind);
        }
        self.scheduler.advance_to(until_ms);
    }

    /// Jump to the next due timer and fire it. Returns its due time.
    pub fn step(&mut self) -> Option<u64> {
        let due = self.scheduler.next_due()?;
        let (_, kind) = self.scheduler.pop_due(due)?;
        self.dispatch(kind);
        Some(due)
    }

    /// Step until nothing is scheduled or the next timer is past `limit_ms`.
    pub fn run_to_end(&mut self, limit_ms: u64) {
        while let Some(due) = self.scheduler.next_due() {
            if due > limit_ms {
                break;
            }
            self.step();
        }
    }

    pub fn toggle_voice(&mut self) -> bool {
        self.feedback.toggle_voice()
    }

    pub fn toggle_mute(&mut self) -> bool {
        self.feedback.toggle_mute()
    }

    /// Explain what is being checked for the current pose.
    pub fn request_help(&mut self) {
        let Some(pose) = self.poses.get(self.index) else {
            return;
        };
        let help = pose.kind().help();
        let name = pose.display_name().to_string();
        let now = self.now();
        self.feedback
            .show(now, format!("AI Help: {}", help), Severity::Info);
        self.feedback
            .speak(format!("For {}, the AI is checking: {}", name, help));
    }

    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        self.events.drain(..).collect()
    }

    // -------------------- Queries --------------------

    pub fn now(&self) -> u64 {
        self.scheduler.now()
    }

    pub fn next_due(&mut self) -> Option<u64> {
        self.scheduler.next_due()
    }

    pub fn pending_timers(&self) -> usize {
        self.scheduler.pending()
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Terminal and nothing left to fire.
    pub fn is_finished(&self) -> bool {
        self.phase.is_terminal() && self.scheduler.pending() == 0
    }

    pub fn current_pose(&self) -> Option<&PoseDefinition> {
        self.poses.get(self.index)
    }

    pub fn pose_index(&self) -> usize {
        self.index
    }

    pub fn poses_completed(&self) -> u32 {
        self.completed
    }

    pub fn timer(&self) -> Option<PoseTimer> {
        self.timer
    }

    pub fn is_pose_correct(&self) -> bool {
        self.pose_correct
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn last_verdict(&self) -> Option<&PoseVerdict> {
        self.last_verdict.as_ref()
    }

    /// Pose countdown, or the rest countdown while resting.
    pub fn display(&self) -> &str {
        &self.display
    }

    pub fn progress_pct(&self) -> f64 {
        (self.index + 1) as f64 / self.poses.len() as f64 * 100.0
    }

    /// Elapsed time since start as `MM:SS`.
    pub fn session_clock(&self) -> String {
        let elapsed = self
            .started_at_ms
            .map(|start| self.now().saturating_sub(start) / 1_000)
            .unwrap_or(0);
        format_clock(elapsed)
    }

    pub fn feedback(&self) -> &Feedback {
        &self.feedback
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            phase: self.phase,
            pose_index: self.index,
            pose_total: self.poses.len(),
            pose_name: self.current_pose().map(|p| p.display_name().to_string()),
            display: self.display.clone(),
            progress_pct: self.progress_pct(),
            clock: self.session_clock(),
            pose_correct: self.pose_correct,
            paused: self.paused,
            poses_completed: self.completed,
        }
    }

    // -------------------- Timer dispatch --------------------

    fn dispatch(&mut self, kind: TimerKind) {
        match kind {
            TimerKind::Analysis => self.on_analysis(),
            TimerKind::PoseTick => self.on_tick(),
            TimerKind::Grace => self.start_timer(),
            TimerKind::RestEnd => self.end_rest(),
            TimerKind::RestCountdown => self.on_rest_countdown(),
            TimerKind::Advance => {
                self.index += 1;
                self.load_current_pose();
            }
            TimerKind::Exit => {
                self.events.push_back(SessionEvent::ExitRequested);
                self.end();
            }
            TimerKind::CameraPrompt => {
                let now = self.now();
                self.feedback.show(now, CAMERA_READY, Severity::Info);
                self.feedback.speak(CAMERA_READY_SPEECH);
            }
        }
    }

    fn on_analysis(&mut self) {
        if self.phase.is_resting() || self.phase.is_terminal() {
            return;
        }
        let Some(pose) = self.poses.get(self.index) else {
            return;
        };
        let target = Target::for_pose(pose);
        let now = self.now();
        let polled = self.source.poll(now, &target);
        if let Some(reason) = self.source.take_fallback_notice() {
            self.detection_announced = false;
            self.fallback_reason = Some(reason.clone());
            self.announce_fallback(reason);
        }
        match polled {
            Ok(Some(observation)) => {
                self.last_error = None;
                self.apply(observation);
            }
            Ok(None) => {}
            Err(err) => {
                let message = err.to_string();
                log::warn!("pose analysis failed: {}", message);
                if self.last_error.as_deref() != Some(message.as_str()) {
                    self.feedback
                        .error(now, format!("Pose analysis failed: {}", message));
                    self.last_error = Some(message);
                }
            }
        }
    }

    fn announce_fallback(&mut self, reason: String) {
        let now = self.now();
        self.feedback.error(now, DETECTION_FALLBACK);
        self.events.push_back(SessionEvent::FallbackActive { reason });
    }

    /// Feedback fires only when the verdict flips.
    fn apply(&mut self, observation: Observation) {
        let correct = observation.verdict.correct;
        if correct != self.pose_correct {
            self.pose_correct = correct;
            if correct {
                self.became_correct(observation.simulated);
            } else {
                self.became_incorrect(&observation);
            }
        }

        if !observation.simulated {
            if observation.bodies > 0 && !self.detection_announced {
                self.detection_announced = true;
                let now = self.now();
                self.feedback.show(now, DETECTION_ACTIVE, Severity::Success);
                self.events.push_back(SessionEvent::DetectionActive);
            } else if observation.bodies == 0 {
                self.detection_announced = false;
            }
        }
        self.last_verdict = Some(observation.verdict);
    }

    fn became_correct(&mut self, simulated: bool) {
        let now = self.now();
        let praise = if simulated {
            FALLBACK_CORRECT
        } else {
            self.current_kind().praise()
        };
        self.feedback.show(now, praise, Severity::Success);
        if self.paused {
            self.resume();
        }
        self.feedback.speak(POSE_CORRECT_SPEECH);
    }

    fn became_incorrect(&mut self, observation: &Observation) {
        let now = self.now();
        let running = self.phase == SessionPhase::TimerRunning;
        if observation.simulated {
            self.feedback.show(now, FALLBACK_INCORRECT, Severity::Warning);
            if running {
                self.pause();
            }
            self.feedback.speak(FALLBACK_INCORRECT_SPEECH);
            return;
        }

        let kind = self.current_kind();
        let message = observation
            .verdict
            .first_correction()
            .unwrap_or(kind.cue())
            .to_string();
        let benefit = self.current_benefit(kind);
        self.feedback.show(now, message.clone(), Severity::Warning);
        let cue = message.trim_end_matches('.');
        if running {
            self.pause();
            self.feedback.speak(format!(
                "Timer paused. Please correct your pose. {}. This pose {}.",
                cue, benefit
            ));
        } else {
            self.feedback.speak(format!(
                "Please correct your pose. {}. This pose {}.",
                cue, benefit
            ));
        }
    }

    fn pause(&mut self) {
        let now = self.now();
        self.paused = true;
        self.phase = SessionPhase::Paused;
        log::debug!("paused at {} ms", now);
        self.feedback.show(now, PAUSED, Severity::Warning);
        self.feedback.speak(PAUSED_SPEECH);
        self.events.push_back(SessionEvent::Paused);
    }

    fn resume(&mut self) {
        let now = self.now();
        self.paused = false;
        log::debug!("resumed at {} ms", now);
        if self.timer.is_some() {
            self.phase = SessionPhase::TimerRunning;
        }
        self.feedback.show(now, RESUMED, Severity::Success);
        self.feedback.speak(RESUMED_SPEECH);
        self.events.push_back(SessionEvent::Resumed);
    }

    fn on_tick(&mut self) {
        if self.timer.is_none() {
            return;
        }
        if self.paused || !self.pose_correct {
            self.display = PAUSED_DISPLAY.to_string();
            return;
        }
        let Some(timer) = self.timer.as_mut() else {
            return;
        };
        timer.remaining_secs = timer.remaining_secs.saturating_sub(1);
        let remaining = timer.remaining_secs;
        self.display = format_clock(u64::from(remaining));
        if remaining == 0 {
            self.complete_pose();
        }
    }

    // -------------------- Pose lifecycle --------------------

    fn load_current_pose(&mut self) {
        let Some(pose) = self.poses.get(self.index) else {
            self.complete_session();
            return;
        };
        let name = pose.display_name().to_string();
        let guidance = pose.guidance().trim().to_string();

        self.scheduler.cancel_kind(TimerKind::PoseTick);
        self.scheduler.cancel_kind(TimerKind::Grace);
        self.timer = None;
        self.pose_correct = false;
        self.paused = false;
        self.display = format_clock(0);
        self.phase = SessionPhase::PoseLoaded;
        log::info!("pose {}/{}: {}", self.index + 1, self.poses.len(), name);
        self.events.push_back(SessionEvent::PoseLoaded {
            index: self.index,
            name: name.clone(),
        });

        if guidance.is_empty() {
            self.feedback.speak(format!("Now perform {}.", name));
        } else {
            self.feedback
                .speak(format!("Now perform {}. {}", name, guidance));
        }
        self.scheduler
            .set_timeout(self.timing.grace_ms, TimerKind::Grace);
    }

    fn start_timer(&mut self) {
        if self.phase != SessionPhase::PoseLoaded || self.timer.is_some() {
            return;
        }
        let target_secs = self
            .rng
            .gen_range(self.timing.hold_min_secs..=self.timing.hold_max_secs);
        self.timer = Some(PoseTimer {
            target_secs,
            remaining_secs: target_secs,
        });
        self.display = format_clock(u64::from(target_secs));
        self.scheduler
            .set_interval(self.timing.tick_ms, TimerKind::PoseTick);
        self.phase = SessionPhase::TimerRunning;

        let now = self.now();
        self.feedback.show(now, TIMER_STARTED, Severity::Success);
        self.feedback.speak(TIMER_STARTED_SPEECH);
        self.events.push_back(SessionEvent::TimerStarted { target_secs });
    }

    fn complete_pose(&mut self) {
        self.scheduler.cancel_kind(TimerKind::PoseTick);
        let held_secs = self.timer.take().map(|t| t.target_secs).unwrap_or(0);
        self.phase = SessionPhase::PoseComplete;
        self.completed += 1;

        let now = self.now();
        self.feedback.show(now, POSE_COMPLETED, Severity::Success);
        self.feedback.speak(POSE_COMPLETED_SPEECH);
        let name = self
            .current_pose()
            .map(|p| p.display_name().to_string())
            .unwrap_or_default();
        self.events.push_back(SessionEvent::PoseCompleted {
            index: self.index,
            name: name.clone(),
            held_secs,
        });
        self.record_completion(&name, held_secs);

        if self.index + 1 >= self.poses.len() {
            self.complete_session();
        } else if self.completed % self.timing.long_rest_every == 0 {
            self.start_rest(RestKind::Long, self.timing.long_rest_secs);
        } else {
            let secs = self
                .rng
                .gen_range(self.timing.short_rest_min_secs..=self.timing.short_rest_max_secs);
            self.start_rest(RestKind::Short, secs);
        }
    }

    fn record_completion(&mut self, pose_name: &str, held_secs: u32) {
        let completed_at = self.epoch_base_secs + (self.now() / 1_000) as i64;
        let Some(log) = self.log.as_mut() else {
            return;
        };
        let entry = PoseCompletion {
            user_id: self.user_id.clone(),
            pose_name: pose_name.to_string(),
            duration_secs: held_secs,
            is_correct: true,
            completed_at,
        };
        if let Err(err) = log.record(&entry) {
            log::warn!("failed to record completion of {}: {}", pose_name, err);
        }
    }

    // -------------------- Rests --------------------

    fn start_rest(&mut self, kind: RestKind, secs: u32) {
        self.phase = SessionPhase::Resting(kind);
        self.rest_left_secs = secs;
        log::debug!("{} rest for {} s", kind, secs);
        self.display = format!("Rest: {}", format_clock(u64::from(secs)));

        let now = self.now();
        match kind {
            RestKind::Short => {
                self.feedback.show(
                    now,
                    format!("Short rest: {} seconds. Relax and breathe.", secs),
                    Severity::Info,
                );
                self.feedback.speak(format!(
                    "Take a short rest for {} seconds. Relax your muscles and focus on your breathing.",
                    secs
                ));
            }
            RestKind::Long => {
                self.feedback.show(
                    now,
                    format!("Long rest: {} seconds. Great progress!", secs),
                    Severity::Success,
                );
                self.feedback.speak(format!(
                    "Excellent work! You've completed {} poses. Take a longer rest for {} seconds. Hydrate and prepare for the next set.",
                    self.completed, secs
                ));
            }
        }
        self.events.push_back(SessionEvent::RestStarted { kind, secs });
        self.scheduler
            .set_timeout(u64::from(secs) * self.timing.tick_ms, TimerKind::RestEnd);
        self.scheduler
            .set_interval(self.timing.tick_ms, TimerKind::RestCountdown);
    }

    fn on_rest_countdown(&mut self) {
        self.rest_left_secs = self.rest_left_secs.saturating_sub(1);
        if self.rest_left_secs > 0 {
            self.display = format!("Rest: {}", format_clock(u64::from(self.rest_left_secs)));
        } else {
            self.scheduler.cancel_kind(TimerKind::RestCountdown);
        }
    }

    fn end_rest(&mut self) {
        self.scheduler.cancel_kind(TimerKind::RestCountdown);
        self.rest_left_secs = 0;
        self.phase = SessionPhase::Advancing;
        log::debug!("rest over, advancing");

        let now = self.now();
        self.feedback.show(now, REST_COMPLETE, Severity::Info);
        self.feedback.speak(REST_COMPLETE_SPEECH);
        self.events.push_back(SessionEvent::RestEnded);
        self.scheduler
            .set_timeout(self.timing.advance_ms, TimerKind::Advance);
    }

    fn complete_session(&mut self) {
        for kind in [
            TimerKind::Analysis,
            TimerKind::PoseTick,
            TimerKind::Grace,
            TimerKind::RestEnd,
            TimerKind::RestCountdown,
            TimerKind::Advance,
        ] {
            self.scheduler.cancel_kind(kind);
        }
        self.phase = SessionPhase::SessionComplete;

        let now = self.now();
        self.feedback.show(now, SESSION_COMPLETE, Severity::Success);
        self.feedback.speak(SESSION_COMPLETE_SPEECH);
        log::info!("session complete: {} poses", self.completed);
        self.events.push_back(SessionEvent::SessionComplete {
            poses_completed: self.completed,
        });
        self.scheduler
            .set_timeout(self.timing.exit_ms, TimerKind::Exit);
    }

    fn current_kind(&self) -> PoseKind {
        self.current_pose()
            .map(PoseDefinition::kind)
            .unwrap_or_default()
    }

    /// The pose's own benefit text, else the kind's, as a sentence tail.
    fn current_benefit(&self, kind: PoseKind) -> String {
        let text = self
            .current_pose()
            .map(|p| p.benefits.trim())
            .filter(|b| !b.is_empty())
            .unwrap_or(kind.benefits());
        let text = text.trim_end_matches('.');
        let mut chars = text.chars();
        match chars.next() {
            Some(first) => first.to_lowercase().chain(chars).collect(),
            None => String::new(),
        }
    }
}
