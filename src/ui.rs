use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::{Duration, Instant};

use crate::feedback::{Banner, FeedbackSink, Severity, Utterance};
use crate::session::{SessionPhase, SessionStatus};

#[derive(Clone, Copy, Debug)]
pub enum UiMode {
    Auto,
    Plain,
    Pretty,
}

#[derive(Clone, Debug)]
pub struct Ui {
    mode: UiMode,
    is_tty: bool,
}

impl Ui {
    pub fn new(mode: UiMode, is_tty: bool) -> Self {
        Self { mode, is_tty }
    }

    pub fn from_args(ui_flag: Option<&str>, is_tty: bool) -> Self {
        let mode = match ui_flag {
            Some("plain") => UiMode::Plain,
            Some("pretty") => UiMode::Pretty,
            _ => UiMode::Auto,
        };
        Self::new(mode, is_tty)
    }

    fn pretty(&self) -> bool {
        self.is_tty && !matches!(self.mode, UiMode::Plain)
    }

    pub fn stage(&self, name: &str) -> StageGuard {
        if self.pretty() {
            let spinner = ProgressBar::new_spinner();
            spinner.set_draw_target(ProgressDrawTarget::stderr());
            spinner.enable_steady_tick(Duration::from_millis(120));
            let style = ProgressStyle::with_template("{spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner());
            spinner.set_style(style);
            spinner.set_message(format!("{name}…"));
            StageGuard::new(name.to_string(), Some(spinner))
        } else {
            eprintln!("==> {}", name);
            StageGuard::new(name.to_string(), None)
        }
    }

    /// Live view of a guided session, one bar step per pose.
    pub fn session_view(&self, pose_total: usize) -> SessionView {
        if !self.pretty() {
            return SessionView { bar: None };
        }
        let bar = ProgressBar::new(pose_total as u64);
        bar.set_draw_target(ProgressDrawTarget::stderr());
        let style = ProgressStyle::with_template("[{pos}/{len}] {bar:20} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        bar.set_style(style);
        SessionView { bar: Some(bar) }
    }
}

pub struct StageGuard {
    name: String,
    start: Instant,
    spinner: Option<ProgressBar>,
}

impl StageGuard {
    fn new(name: String, spinner: Option<ProgressBar>) -> Self {
        Self {
            name,
            start: Instant::now(),
            spinner,
        }
    }
}

impl Drop for StageGuard {
    fn drop(&mut self) {
        let elapsed = self.start.elapsed();
        let message = format!("✔ {} ({})", self.name, format_duration(elapsed));
        if let Some(spinner) = &self.spinner {
            spinner.finish_with_message(message);
        } else {
            eprintln!("{message}");
        }
    }
}

pub struct SessionView {
    bar: Option<ProgressBar>,
}

impl SessionView {
    /// Sink that prints above the bar instead of tearing it.
    pub fn sink(&self) -> TerminalSink {
        TerminalSink {
            bar: self.bar.clone(),
        }
    }

    pub fn update(&self, status: &SessionStatus) {
        let line = status_line(status);
        match &self.bar {
            Some(bar) => {
                bar.set_position(u64::from(status.poses_completed));
                bar.set_message(line);
            }
            None => log::debug!("{}", line),
        }
    }

    pub fn finish(&self, status: &SessionStatus) {
        if let Some(bar) = &self.bar {
            bar.finish_with_message(status_line(status));
        }
    }
}

/// `Tree Pose 00:31 | 02:15 elapsed` style summary.
pub fn status_line(status: &SessionStatus) -> String {
    let name = status.pose_name.as_deref().unwrap_or("-");
    match status.phase {
        SessionPhase::SessionComplete => format!(
            "session complete: {} poses in {}",
            status.poses_completed, status.clock
        ),
        SessionPhase::Ended => format!("session ended after {} poses", status.poses_completed),
        _ => format!("{} {} | {} elapsed", name, status.display, status.clock),
    }
}

/// Prints banners and speech to the terminal.
#[derive(Clone, Default)]
pub struct TerminalSink {
    bar: Option<ProgressBar>,
}

impl TerminalSink {
    fn emit(&self, line: String) {
        match &self.bar {
            Some(bar) => bar.println(line),
            None => eprintln!("{line}"),
        }
    }
}

impl FeedbackSink for TerminalSink {
    fn show(&mut self, banner: &Banner) {
        let tag = match banner.severity {
            Severity::Info => "i",
            Severity::Success => "✔",
            Severity::Warning => "!",
            Severity::Error => "✘",
        };
        self.emit(format!("{} {}", tag, banner.message));
    }

    fn speak(&mut self, utterance: &Utterance) {
        self.emit(format!("  » {}", utterance.text));
    }
}

fn format_duration(duration: Duration) -> String {
    if duration.as_secs() >= 1 {
        format!("{:.2}s", duration.as_secs_f64())
    } else {
        format!("{}ms", duration.as_millis())
    }
}
