//! evaluate_pose - judge recorded detector output offline
//!
//! Reads a recording (JSON array or JSON lines of detection results) and
//! prints one verdict per frame. With `--exercise` or `--yoga` the frames go
//! through the tracking monitor instead and a summary is printed at the end.

use anyhow::{anyhow, Result};
use clap::Parser;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use serde::Serialize;
use std::io::IsTerminal;
use std::path::PathBuf;

use pose_coach::{
    detect::ReplayDetector, ui, Catalog, CoachConfig, ExerciseMonitor, PoseEvaluator, PoseVerdict,
    Target, TrackingStats,
};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Recorded detection results.
    #[arg(long)]
    input: PathBuf,

    /// Library pose id or name to judge each frame against.
    #[arg(long, conflicts_with_all = ["exercise", "yoga"])]
    pose: Option<String>,

    /// Track an exercise (pushups, squats, planks, burpees).
    #[arg(long, conflicts_with = "yoga")]
    exercise: Option<String>,

    /// Track a yoga pose (vrikshasana, bhujangasana, ...).
    #[arg(long)]
    yoga: Option<String>,

    /// Pose library (TOML or JSON) for `--pose`.
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// UI mode: auto, plain, pretty.
    #[arg(long, default_value = "auto", value_name = "MODE")]
    ui: String,
}

#[derive(Serialize)]
struct FrameReport<'a> {
    frame: usize,
    bodies: usize,
    #[serde(flatten)]
    verdict: &'a PoseVerdict,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

#[derive(Serialize)]
struct TrackingSummary<'a> {
    summary: String,
    stats: &'a TrackingStats,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();
    let cfg = CoachConfig::load()?;
    let ui = ui::Ui::from_args(Some(&args.ui), std::io::stderr().is_terminal());

    let recording = {
        let _stage = ui.stage("Load recording");
        ReplayDetector::from_path(&args.input)?
    };
    let evaluator = PoseEvaluator::new(cfg.detector.min_visibility)
        .with_min_confidence(cfg.detector.min_detection_confidence);
    let rng: Box<dyn RngCore + Send> = match cfg.seed {
        Some(seed) => Box::new(StdRng::seed_from_u64(seed)),
        None => Box::new(StdRng::from_entropy()),
    };

    if let Some(id) = &args.exercise {
        let exercises = Catalog::builtin_exercises();
        let pose = exercises
            .get(id)
            .ok_or_else(|| anyhow!(pose_coach::evaluate::EXERCISE_NOT_FOUND))?;
        let monitor = ExerciseMonitor::exercise(pose, evaluator, rng)?;
        return track(monitor, &recording);
    }
    if let Some(id) = &args.yoga {
        let yoga = Catalog::builtin_yoga();
        let pose = yoga
            .get(id)
            .ok_or_else(|| anyhow!("unknown yoga pose '{}'", id))?;
        return track(ExerciseMonitor::yoga(pose, evaluator, rng), &recording);
    }

    let key = args
        .pose
        .as_deref()
        .ok_or_else(|| anyhow!("one of --pose, --exercise or --yoga is required"))?;
    let catalog = match args.catalog.as_ref().or(cfg.catalog_path.as_ref()) {
        Some(path) => Catalog::load(path)?,
        None => Catalog::builtin_library(),
    };
    let pose = catalog
        .get(key)
        .or_else(|| catalog.find_by_name(key))
        .ok_or_else(|| anyhow!("unknown pose '{}'", key))?;
    let target = Target::for_pose(pose);

    let mut correct = 0usize;
    for (frame, detection) in recording.frames().iter().enumerate() {
        let verdict = evaluator.evaluate_detection(detection, &target);
        correct += usize::from(verdict.correct);
        let report = FrameReport {
            frame,
            bodies: detection.poses.len(),
            verdict: &verdict,
            message: None,
        };
        println!("{}", serde_json::to_string(&report)?);
    }
    log::info!(
        "{}: {}/{} frames correct",
        pose.display_name(),
        correct,
        recording.len()
    );
    Ok(())
}

fn track(mut monitor: ExerciseMonitor, recording: &ReplayDetector) -> Result<()> {
    for (frame, detection) in recording.frames().iter().enumerate() {
        let (verdict, message) = monitor.observe_detection(detection);
        let report = FrameReport {
            frame,
            bodies: detection.poses.len(),
            verdict: &verdict,
            message,
        };
        println!("{}", serde_json::to_string(&report)?);
    }
    let summary = TrackingSummary {
        summary: monitor.summary(),
        stats: monitor.stats(),
    };
    println!("{}", serde_json::to_string(&summary)?);
    Ok(())
}
