//! weekly_report - per-pose completion counts for the last seven days

use anyhow::{anyhow, Result};
use clap::Parser;
use std::time::{SystemTime, UNIX_EPOCH};

use pose_coach::{CoachConfig, SessionLog, SqliteSessionLog};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Session log database; overrides the configured one.
    #[arg(long)]
    db: Option<String>,

    /// User to report on; overrides the configured one.
    #[arg(long)]
    user: Option<String>,

    /// Emit JSON instead of a table.
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();
    let cfg = CoachConfig::load()?;

    let db_path = args.db.unwrap_or(cfg.db_path);
    let user_id = args.user.unwrap_or(cfg.user_id);
    pose_coach::validate_user_id(&user_id)?;

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| anyhow!("system clock before unix epoch: {}", e))?
        .as_secs() as i64;
    let log = SqliteSessionLog::open(&db_path)?;
    let report = log.weekly_report(&user_id, now)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }
    if report.is_empty() {
        println!("No completed poses for {} in the last 7 days.", user_id);
        return Ok(());
    }
    let total: u32 = report.iter().map(|row| row.completions).sum();
    println!("Weekly report for {} ({} completions)", user_id, total);
    for row in &report {
        println!("{:>4}  {}", row.completions, row.pose_name);
    }
    Ok(())
}
