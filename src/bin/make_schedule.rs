//! make_schedule - weekly practice plan from a preferences file

use anyhow::Result;
use clap::Parser;
use std::io::IsTerminal;
use std::path::PathBuf;

use pose_coach::{generate_schedule, ui, Catalog, CoachConfig, SchedulePreferences};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Preferences JSON (skill level, minutes, days, goals, ...).
    #[arg(long)]
    prefs: PathBuf,

    /// Pose library (TOML or JSON); overrides the configured one.
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Where to write the schedule JSON.
    #[arg(long, default_value = "schedule.json")]
    out: PathBuf,

    /// UI mode: auto, plain, pretty.
    #[arg(long, default_value = "auto", value_name = "MODE")]
    ui: String,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let cfg = CoachConfig::load()?;
    let ui = ui::Ui::from_args(Some(&args.ui), std::io::stderr().is_terminal());

    let prefs = SchedulePreferences::from_path(&args.prefs)?;
    let catalog = match args.catalog.as_ref().or(cfg.catalog_path.as_ref()) {
        Some(path) => Catalog::load(path)?,
        None => Catalog::builtin_library(),
    };

    let schedule = {
        let _stage = ui.stage("Build weekly schedule");
        generate_schedule(&catalog, &prefs)?
    };
    {
        let _stage = ui.stage("Write schedule");
        std::fs::write(&args.out, serde_json::to_vec_pretty(&schedule)?)?;
    }

    for day in &schedule.days {
        println!(
            "{:<10} {:<28} {:>2} poses  ~{} min",
            day.day,
            day.focus_area,
            day.poses.len(),
            day.total_minutes
        );
    }
    for tip in &schedule.recommendations {
        println!("- {}", tip);
    }
    log::info!("schedule written to {}", args.out.display());
    Ok(())
}
