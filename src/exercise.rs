//! Free-form tracking of an exercise or a single yoga pose.
//!
//! Unlike the guided session there is no timer here. Each frame's verdict
//! either counts toward the correct-frame tally or surfaces a correction,
//! and the same correction is never repeated back to back.

use anyhow::{anyhow, Result};
use rand::{Rng, RngCore};
use serde::Serialize;

use crate::catalog::PoseDefinition;
use crate::classify::PoseVerdict;
use crate::detect::DetectionResult;
use crate::evaluate::{PoseEvaluator, Target, EXERCISE_NOT_FOUND};

/// Chance that a correct exercise frame completes a rep.
pub const REP_PROBABILITY: f64 = 0.05;
/// Chance that a correct yoga frame earns a maintenance bonus.
pub const HOLD_BONUS_PROBABILITY: f64 = 0.02;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackingMode {
    Exercise,
    Yoga,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TrackingStats {
    pub frames: u64,
    pub correct_frames: u64,
    pub reps: u32,
    pub perfect_reps: u32,
    pub credits: u32,
    pub bonus_points: u32,
}

pub struct ExerciseMonitor {
    mode: TrackingMode,
    name: String,
    target: Target,
    evaluator: PoseEvaluator,
    rng: Box<dyn RngCore + Send>,
    stats: TrackingStats,
    last_correction: Option<String>,
}

impl ExerciseMonitor {
    /// Track an exercise by its catalog id. Fails for ids no rule knows.
    pub fn exercise(
        pose: &PoseDefinition,
        evaluator: PoseEvaluator,
        rng: Box<dyn RngCore + Send>,
    ) -> Result<Self> {
        let target = Target::Exercise(pose.id.clone());
        if target.classifier().is_none() {
            return Err(anyhow!(EXERCISE_NOT_FOUND));
        }
        Ok(Self::with_target(TrackingMode::Exercise, pose, target, evaluator, rng))
    }

    pub fn yoga(
        pose: &PoseDefinition,
        evaluator: PoseEvaluator,
        rng: Box<dyn RngCore + Send>,
    ) -> Self {
        let target = Target::TrackedYoga(pose.id.clone());
        Self::with_target(TrackingMode::Yoga, pose, target, evaluator, rng)
    }

    fn with_target(
        mode: TrackingMode,
        pose: &PoseDefinition,
        target: Target,
        evaluator: PoseEvaluator,
        rng: Box<dyn RngCore + Send>,
    ) -> Self {
        Self {
            mode,
            name: pose.display_name().to_string(),
            target,
            evaluator,
            rng,
            stats: TrackingStats::default(),
            last_correction: None,
        }
    }

    pub fn mode(&self) -> TrackingMode {
        self.mode
    }

    pub fn stats(&self) -> &TrackingStats {
        &self.stats
    }

    /// Evaluate one detector frame. Returns the verdict and any message to
    /// surface.
    pub fn observe_detection(&mut self, detection: &DetectionResult) -> (PoseVerdict, Option<String>) {
        let verdict = self.evaluator.evaluate_detection(detection, &self.target);
        let message = self.observe(&verdict);
        (verdict, message)
    }

    pub fn observe(&mut self, verdict: &PoseVerdict) -> Option<String> {
        self.stats.frames += 1;
        if verdict.correct {
            self.stats.correct_frames += 1;
            return self.on_correct();
        }
        let correction = verdict.first_correction()?;
        if self.last_correction.as_deref() == Some(correction) {
            return None;
        }
        self.last_correction = Some(correction.to_string());
        Some(correction.to_string())
    }

    fn on_correct(&mut self) -> Option<String> {
        match self.mode {
            TrackingMode::Exercise => {
                if !self.rng.gen_bool(REP_PROBABILITY) {
                    return None;
                }
                self.stats.reps += 1;
                self.stats.perfect_reps += 1;
                self.stats.credits += 10;
                self.stats.bonus_points += 5;
                Some(format!(
                    "Perfect! That's {} reps. Keep going!",
                    self.stats.reps
                ))
            }
            TrackingMode::Yoga => {
                if self.rng.gen_bool(HOLD_BONUS_PROBABILITY) {
                    self.stats.credits += 5;
                    self.stats.bonus_points += 2;
                }
                None
            }
        }
    }

    /// Closing line for the tracking session.
    pub fn summary(&self) -> String {
        match self.mode {
            TrackingMode::Exercise => format!(
                "Great workout! You completed {} reps with {} perfect form.",
                self.stats.reps, self.stats.perfect_reps
            ),
            TrackingMode::Yoga => format!("Excellent! You've mastered the {} pose.", self.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn rng() -> Box<dyn RngCore + Send> {
        Box::new(StdRng::seed_from_u64(3))
    }

    #[test]
    fn repeated_correction_is_surfaced_once() {
        let exercises = Catalog::builtin_exercises();
        let pose = exercises.get("squats").unwrap();
        let mut monitor = ExerciseMonitor::exercise(pose, PoseEvaluator::default(), rng()).unwrap();
        let bend = PoseVerdict::fail("Lower your body more - bend your knees further.");
        assert_eq!(
            monitor.observe(&bend).as_deref(),
            Some("Lower your body more - bend your knees further.")
        );
        assert_eq!(monitor.observe(&bend), None);
        assert_eq!(monitor.observe(&bend), None);
        let knees = PoseVerdict::fail("Keep your left knee behind your toes.");
        assert!(monitor.observe(&knees).is_some());
        assert!(monitor.observe(&bend).is_some());
        assert_eq!(monitor.stats().frames, 5);
        assert_eq!(monitor.stats().correct_frames, 0);
    }

    #[test]
    fn correct_frames_count_and_reps_accumulate() {
        let exercises = Catalog::builtin_exercises();
        let pose = exercises.get("pushups").unwrap();
        let mut monitor = ExerciseMonitor::exercise(pose, PoseEvaluator::default(), rng()).unwrap();
        let announced = (0..1_000)
            .filter_map(|_| monitor.observe(&PoseVerdict::pass()))
            .count();
        let stats = monitor.stats().clone();
        assert_eq!(stats.correct_frames, 1_000);
        assert_eq!(stats.reps as usize, announced);
        assert!(stats.reps > 0 && stats.reps < 150);
        assert_eq!(stats.credits, stats.reps * 10);
        assert!(monitor.summary().starts_with(&format!(
            "Great workout! You completed {} reps",
            stats.reps
        )));
    }

    #[test]
    fn unknown_exercise_is_rejected() {
        let pose = PoseDefinition::new("jumping-jacks", "Jumping Jacks");
        let err = ExerciseMonitor::exercise(&pose, PoseEvaluator::default(), rng())
            .err()
            .unwrap();
        assert_eq!(err.to_string(), EXERCISE_NOT_FOUND);
    }

    #[test]
    fn yoga_tracking_reports_no_body() {
        let yoga = Catalog::builtin_yoga();
        let pose = yoga.get("vrikshasana").unwrap();
        let mut monitor = ExerciseMonitor::yoga(pose, PoseEvaluator::default(), rng());
        let (verdict, message) = monitor.observe_detection(&DetectionResult::default());
        assert!(!verdict.correct);
        assert_eq!(
            message.as_deref(),
            Some(crate::evaluate::NO_POSE_DETECTED)
        );
        assert_eq!(
            monitor.summary(),
            "Excellent! You've mastered the Tree Pose pose."
        );
    }
}
