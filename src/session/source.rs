//! Where per-cycle verdicts come from.
//!
//! A detector-backed source is preferred. When the detector cannot be
//! activated the session runs on a simulated source instead, which flips a
//! weighted coin on a fixed cadence. A detector that stops seeing anyone for
//! too many cycles hands over to the same simulated verdicts. Both keep the
//! camera handle so the camera is requested, and released, the same way
//! either way.

use anyhow::{anyhow, Result};
use rand::{Rng, RngCore};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::classify::PoseVerdict;
use crate::detect::{DetectorRegistry, SharedDetector};
use crate::evaluate::{PoseEvaluator, Target};
use crate::ingest::FrameSource;
use crate::session::SessionTiming;

/// Default cadence of simulated verdicts.
pub const SIMULATED_INTERVAL_MS: u64 = 3_000;
/// Probability that a simulated verdict is "correct".
pub const SIMULATED_CORRECT_PROBABILITY: f64 = 0.6;

/// One analysis cycle's outcome.
#[derive(Clone, Debug, PartialEq)]
pub struct Observation {
    pub verdict: PoseVerdict,
    /// Produced without looking at landmarks.
    pub simulated: bool,
    /// Bodies the detector reported.
    pub bodies: usize,
}

pub trait VerdictSource: Send {
    fn name(&self) -> &'static str;

    /// True once verdicts are simulated for the rest of the session.
    fn is_fallback(&self) -> bool;

    /// Acquire the camera. Errors with [`crate::CoachError::CameraAccessDenied`]
    /// when refused.
    fn start(&mut self, now_ms: u64) -> Result<()>;

    /// `Ok(None)` means nothing new this cycle.
    fn poll(&mut self, now_ms: u64, target: &Target) -> Result<Option<Observation>>;

    /// Stop the camera. Idempotent.
    fn release(&mut self);

    /// Why the source switched to simulated verdicts mid-session. Yields the
    /// reason once.
    fn take_fallback_notice(&mut self) -> Option<String> {
        None
    }
}

pub struct SimulatedVerdictSource {
    camera: Option<Box<dyn FrameSource>>,
    rng: Box<dyn RngCore + Send>,
    interval_ms: u64,
    last_change_ms: Option<u64>,
}

impl SimulatedVerdictSource {
    pub fn new(rng: Box<dyn RngCore + Send>, interval_ms: u64) -> Self {
        Self {
            camera: None,
            rng,
            interval_ms,
            last_change_ms: None,
        }
    }

    pub fn with_camera(mut self, camera: Box<dyn FrameSource>) -> Self {
        self.camera = Some(camera);
        self
    }
}

impl VerdictSource for SimulatedVerdictSource {
    fn name(&self) -> &'static str {
        "simulated"
    }

    fn is_fallback(&self) -> bool {
        true
    }

    fn start(&mut self, _now_ms: u64) -> Result<()> {
        match self.camera.as_mut() {
            Some(camera) => camera.connect(),
            None => Ok(()),
        }
    }

    fn poll(&mut self, now_ms: u64, _target: &Target) -> Result<Option<Observation>> {
        if let Some(last) = self.last_change_ms {
            if now_ms.saturating_sub(last) < self.interval_ms {
                return Ok(None);
            }
        }
        self.last_change_ms = Some(now_ms);
        let correct = self.rng.gen_bool(SIMULATED_CORRECT_PROBABILITY);
        let verdict = if correct {
            PoseVerdict::pass()
        } else {
            PoseVerdict::fail("Focus on your alignment.")
        };
        Ok(Some(Observation {
            verdict,
            simulated: true,
            bodies: 0,
        }))
    }

    fn release(&mut self) {
        if let Some(camera) = self.camera.as_mut() {
            camera.release();
        }
    }
}

/// Camera frames through a detector and the evaluator.
///
/// Frames that arrive before the stream has dimensions are judged by an
/// internal simulated source for that cycle only. After
/// `no_body_fallback_cycles` consecutive detections without a body the
/// simulated source takes over for the rest of the session.
pub struct DetectorVerdictSource {
    camera: Box<dyn FrameSource>,
    detector: SharedDetector,
    evaluator: PoseEvaluator,
    warmup: SimulatedVerdictSource,
    no_body_limit: u32,
    no_body_streak: u32,
    degraded: bool,
    notice: Option<String>,
}

impl DetectorVerdictSource {
    pub fn new(
        camera: Box<dyn FrameSource>,
        detector: SharedDetector,
        evaluator: PoseEvaluator,
        rng: Box<dyn RngCore + Send>,
        timing: &SessionTiming,
    ) -> Self {
        Self {
            camera,
            detector,
            evaluator,
            warmup: SimulatedVerdictSource::new(rng, timing.simulated_interval_ms),
            no_body_limit: timing.no_body_fallback_cycles,
            no_body_streak: 0,
            degraded: false,
            notice: None,
        }
    }

    fn note_bodies(&mut self, bodies: usize) {
        if bodies > 0 {
            self.no_body_streak = 0;
            return;
        }
        self.no_body_streak = self.no_body_streak.saturating_add(1);
        if self.no_body_limit > 0 && self.no_body_streak >= self.no_body_limit {
            let reason = format!(
                "no body detected in {} consecutive frames",
                self.no_body_streak
            );
            log::warn!("{}, switching to simulated verdicts", reason);
            self.degraded = true;
            self.notice = Some(reason);
        }
    }
}

impl VerdictSource for DetectorVerdictSource {
    fn name(&self) -> &'static str {
        "detector"
    }

    fn is_fallback(&self) -> bool {
        self.degraded
    }

    fn start(&mut self, _now_ms: u64) -> Result<()> {
        self.camera.connect()
    }

    fn poll(&mut self, now_ms: u64, target: &Target) -> Result<Option<Observation>> {
        // Released or never started.
        if !self.camera.is_healthy() {
            return Ok(None);
        }
        if self.degraded {
            return self.warmup.poll(now_ms, target);
        }
        let frame = self.camera.next_frame(now_ms)?;
        if !frame.is_ready() {
            return self.warmup.poll(now_ms, target);
        }
        let detection = {
            let mut detector = self
                .detector
                .lock()
                .map_err(|_| anyhow!("detector lock poisoned"))?;
            detector.detect(&frame)?
        };
        self.note_bodies(detection.poses.len());
        if self.degraded {
            return self.warmup.poll(now_ms, target);
        }
        let verdict = self.evaluator.evaluate_detection(&detection, target);
        Ok(Some(Observation {
            verdict,
            simulated: false,
            bodies: detection.poses.len(),
        }))
    }

    fn release(&mut self) {
        self.camera.release();
    }

    fn take_fallback_notice(&mut self) -> Option<String> {
        self.notice.take()
    }
}

/// Detector-backed source when the backend activates, else the simulated one.
/// The second value carries the activation failure.
pub fn select_verdict_source(
    registry: &DetectorRegistry,
    backend: Option<&str>,
    camera: Box<dyn FrameSource>,
    evaluator: PoseEvaluator,
    rng: Box<dyn RngCore + Send>,
    timing: &SessionTiming,
) -> (Box<dyn VerdictSource>, Option<String>) {
    match registry.activate(backend) {
        Ok(detector) => (
            Box::new(DetectorVerdictSource::new(
                camera, detector, evaluator, rng, timing,
            )),
            None,
        ),
        Err(err) => {
            log::warn!("pose detection unavailable, using simulated verdicts: {}", err);
            let source = SimulatedVerdictSource::new(rng, timing.simulated_interval_ms)
                .with_camera(camera);
            (Box::new(source), Some(err.to_string()))
        }
    }
}

#[derive(Debug, Default)]
struct Script {
    queue: VecDeque<PoseVerdict>,
    current: Option<PoseVerdict>,
    polls: u64,
    started: bool,
    released: bool,
}

/// Replays queued verdicts, then repeats the last one. Clones share state, so
/// a test can keep a handle after moving the source into a session.
#[derive(Clone, Debug, Default)]
pub struct ScriptedVerdictSource {
    script: Arc<Mutex<Script>>,
    fallback: bool,
    deny_camera: bool,
}

impl ScriptedVerdictSource {
    pub fn new(verdicts: Vec<PoseVerdict>) -> Self {
        let source = Self::default();
        source.extend(verdicts);
        source
    }

    pub fn always(verdict: PoseVerdict) -> Self {
        Self::new(vec![verdict])
    }

    /// Report as a fallback source.
    pub fn as_fallback(mut self) -> Self {
        self.fallback = true;
        self
    }

    /// Refuse camera access on start.
    pub fn denying_camera(mut self) -> Self {
        self.deny_camera = true;
        self
    }

    pub fn push(&self, verdict: PoseVerdict) {
        self.extend(vec![verdict]);
    }

    pub fn polls(&self) -> u64 {
        self.script.lock().map(|s| s.polls).unwrap_or(0)
    }

    pub fn is_started(&self) -> bool {
        self.script.lock().map(|s| s.started).unwrap_or(false)
    }

    pub fn is_released(&self) -> bool {
        self.script.lock().map(|s| s.released).unwrap_or(false)
    }

    fn extend(&self, verdicts: Vec<PoseVerdict>) {
        if let Ok(mut script) = self.script.lock() {
            script.queue.extend(verdicts);
        }
    }
}

impl VerdictSource for ScriptedVerdictSource {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn is_fallback(&self) -> bool {
        self.fallback
    }

    fn start(&mut self, _now_ms: u64) -> Result<()> {
        if self.deny_camera {
            return Err(crate::CoachError::CameraAccessDenied("scripted".into()).into());
        }
        let mut script = self
            .script
            .lock()
            .map_err(|_| anyhow!("script lock poisoned"))?;
        script.started = true;
        Ok(())
    }

    fn poll(&mut self, _now_ms: u64, _target: &Target) -> Result<Option<Observation>> {
        let mut script = self
            .script
            .lock()
            .map_err(|_| anyhow!("script lock poisoned"))?;
        script.polls += 1;
        if let Some(next) = script.queue.pop_front() {
            script.current = Some(next);
        }
        Ok(script.current.clone().map(|verdict| Observation {
            verdict,
            simulated: self.fallback,
            bodies: usize::from(!self.fallback),
        }))
    }

    fn release(&mut self) {
        if let Ok(mut script) = self.script.lock() {
            script.released = true;
        }
    }
}
