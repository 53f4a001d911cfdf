//! coach - guided pose session in the terminal
//!
//! Loads a pose list (explicit ids, a saved weekly schedule, or the whole
//! library), then runs the session loop: analysis every few hundred
//! milliseconds, a per-second countdown, rests between poses. Verdicts come
//! from a recorded detector stream when `--replay` is given and from the
//! simulated fallback otherwise.

use anyhow::{anyhow, Result};
use clap::Parser;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use pose_coach::{
    config::split_csv,
    detect::{ReplayDetector, StubDetector},
    session::select_verdict_source,
    ui, CameraSource, Catalog, CoachConfig, DetectorRegistry, Feedback, PoseDefinition,
    PoseEvaluator, SessionLog, SessionMachine, SqliteSessionLog, WeeklySchedule,
};

/// Longest the loop sleeps between checks, so Ctrl-C stays responsive.
const MAX_IDLE: Duration = Duration::from_millis(100);

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Comma-separated pose ids or names.
    #[arg(long)]
    poses: Option<String>,

    /// Weekly schedule JSON written by make_schedule.
    #[arg(long, requires = "day")]
    schedule: Option<PathBuf>,

    /// Day of the schedule to run.
    #[arg(long)]
    day: Option<String>,

    /// Pose library (TOML or JSON); overrides the configured one.
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Recorded detector output to judge poses against.
    #[arg(long)]
    replay: Option<PathBuf>,

    /// Jump from timer to timer instead of waiting on the wall clock.
    #[arg(long)]
    fast: bool,

    /// Print session events as JSON lines on stdout.
    #[arg(long)]
    events: bool,

    /// Do not write completions to the session log.
    #[arg(long)]
    no_log: bool,

    /// UI mode: auto, plain, pretty.
    #[arg(long, default_value = "auto", value_name = "MODE")]
    ui: String,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let cfg = CoachConfig::load()?;
    let ui = ui::Ui::from_args(Some(&args.ui), std::io::stderr().is_terminal());

    let catalog = {
        let _stage = ui.stage("Load pose library");
        match args.catalog.as_ref().or(cfg.catalog_path.as_ref()) {
            Some(path) => Catalog::load(path)?,
            None => Catalog::builtin_library(),
        }
    };
    let poses = select_poses(&args, &catalog)?;

    let mut registry = DetectorRegistry::new();
    match &args.replay {
        Some(path) => registry.register(ReplayDetector::from_path(path)?),
        None => registry.register(StubDetector::unavailable("no pose model configured")),
    }
    let backend = match &args.replay {
        Some(_) => Some("replay"),
        None => cfg.detector.backend.as_deref(),
    };

    let evaluator = PoseEvaluator::new(cfg.detector.min_visibility)
        .with_min_confidence(cfg.detector.min_detection_confidence);
    let camera = CameraSource::new(cfg.camera.clone())?;
    let (source, fallback_reason) = select_verdict_source(
        &registry,
        backend,
        Box::new(camera),
        evaluator,
        rng(cfg.seed, 0),
        &cfg.timing,
    );

    let view = ui.session_view(poses.len());
    let feedback = Feedback::new(Box::new(view.sink()), cfg.voice);
    let mut session =
        SessionMachine::new(poses, cfg.timing.clone(), source, feedback, rng(cfg.seed, 1))?
            .with_user(&cfg.user_id)
            .with_fallback_reason(fallback_reason);
    if !args.no_log {
        let log: Box<dyn SessionLog> = Box::new(SqliteSessionLog::open(&cfg.db_path)?);
        session = session.with_log(log);
        log::info!("logging completions to {}", cfg.db_path);
    }

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = Arc::clone(&stop);
        ctrlc::set_handler(move || stop.store(true, Ordering::SeqCst))
            .map_err(|e| anyhow!("failed to install Ctrl-C handler: {}", e))?;
    }

    session.start()?;
    if args.fast {
        while !stop.load(Ordering::SeqCst) && session.step().is_some() {
            publish(&mut session, &view, args.events)?;
        }
    } else {
        let started = Instant::now();
        while !stop.load(Ordering::SeqCst) && !session.is_finished() {
            let now_ms = started.elapsed().as_millis() as u64;
            session.run_until(now_ms);
            publish(&mut session, &view, args.events)?;
            let wait = session
                .next_due()
                .map(|due| Duration::from_millis(due.saturating_sub(now_ms)))
                .unwrap_or(MAX_IDLE)
                .min(MAX_IDLE);
            std::thread::sleep(wait);
        }
    }

    if stop.load(Ordering::SeqCst) {
        log::info!("interrupted, ending session");
    }
    session.end();
    publish(&mut session, &view, args.events)?;
    view.finish(&session.status());
    Ok(())
}

fn publish(session: &mut SessionMachine, view: &ui::SessionView, events: bool) -> Result<()> {
    for event in session.drain_events() {
        if events {
            println!("{}", serde_json::to_string(&event)?);
        } else {
            log::debug!("{:?}", event);
        }
    }
    view.update(&session.status());
    Ok(())
}

fn select_poses(args: &Args, catalog: &Catalog) -> Result<Vec<PoseDefinition>> {
    if let Some(list) = &args.poses {
        return split_csv(list)
            .iter()
            .map(|key| {
                catalog
                    .get(key)
                    .or_else(|| catalog.find_by_name(key))
                    .cloned()
                    .ok_or_else(|| anyhow!("unknown pose '{}'", key))
            })
            .collect();
    }
    if let (Some(path), Some(day)) = (&args.schedule, &args.day) {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow!("failed to read schedule {}: {}", path.display(), e))?;
        let schedule: WeeklySchedule = serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid schedule {}: {}", path.display(), e))?;
        return Ok(schedule.day_poses(day, catalog));
    }
    Ok(catalog.poses().to_vec())
}

fn rng(seed: Option<u64>, stream: u64) -> Box<dyn RngCore + Send> {
    match seed {
        Some(seed) => Box::new(StdRng::seed_from_u64(seed.wrapping_add(stream))),
        None => Box::new(StdRng::from_entropy()),
    }
}
