//! Feedback sink: transient banners plus optional speech.
//!
//! [`Feedback`] owns the voice/mute state and gates speech before it reaches
//! a sink. Sinks only render; they never decide whether to speak.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex};

/// Banners hide themselves this long after being shown.
pub const BANNER_TTL_MS: u64 = 5_000;

pub const DEFAULT_SPEECH_RATE: f32 = 0.9;
pub const DEFAULT_SPEECH_PITCH: f32 = 1.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::Info => "info",
            Severity::Success => "success",
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        f.write_str(label)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Banner {
    pub message: String,
    pub severity: Severity,
    pub shown_at_ms: u64,
    pub hide_at_ms: u64,
}

impl Banner {
    pub fn is_visible(&self, now_ms: u64) -> bool {
        now_ms < self.hide_at_ms
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Utterance {
    pub text: String,
    pub rate: f32,
    pub pitch: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VoiceSettings {
    pub enabled: bool,
    pub muted: bool,
    pub rate: f32,
    pub pitch: f32,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            muted: false,
            rate: DEFAULT_SPEECH_RATE,
            pitch: DEFAULT_SPEECH_PITCH,
        }
    }
}

impl VoiceSettings {
    pub fn can_speak(&self) -> bool {
        self.enabled && !self.muted
    }
}

/// Renders banners and speech.
pub trait FeedbackSink: Send {
    fn show(&mut self, banner: &Banner);
    fn speak(&mut self, utterance: &Utterance);
}

/// Writes feedback through the `log` facade.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogSink;

impl FeedbackSink for LogSink {
    fn show(&mut self, banner: &Banner) {
        match banner.severity {
            Severity::Error => log::error!("{}", banner.message),
            Severity::Warning => log::warn!("{}", banner.message),
            Severity::Info | Severity::Success => log::info!("{}", banner.message),
        }
    }

    fn speak(&mut self, utterance: &Utterance) {
        log::info!("say: {}", utterance.text);
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum FeedbackRecord {
    Banner(Banner),
    Speech(Utterance),
}

/// Keeps everything it is given. Clones share the same record list.
#[derive(Clone, Debug, Default)]
pub struct RecordingSink {
    records: Arc<Mutex<Vec<FeedbackRecord>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<FeedbackRecord> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }

    pub fn banners(&self) -> Vec<Banner> {
        self.records()
            .into_iter()
            .filter_map(|record| match record {
                FeedbackRecord::Banner(banner) => Some(banner),
                FeedbackRecord::Speech(_) => None,
            })
            .collect()
    }

    pub fn speech(&self) -> Vec<String> {
        self.records()
            .into_iter()
            .filter_map(|record| match record {
                FeedbackRecord::Speech(utterance) => Some(utterance.text),
                FeedbackRecord::Banner(_) => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        if let Ok(mut records) = self.records.lock() {
            records.clear();
        }
    }

    fn push(&self, record: FeedbackRecord) {
        if let Ok(mut records) = self.records.lock() {
            records.push(record);
        }
    }
}

impl FeedbackSink for RecordingSink {
    fn show(&mut self, banner: &Banner) {
        self.push(FeedbackRecord::Banner(banner.clone()));
    }

    fn speak(&mut self, utterance: &Utterance) {
        self.push(FeedbackRecord::Speech(utterance.clone()));
    }
}

/// Feedback front end used by the session.
pub struct Feedback {
    sink: Box<dyn FeedbackSink>,
    voice: VoiceSettings,
    banner: Option<Banner>,
}

impl Feedback {
    pub fn new(sink: Box<dyn FeedbackSink>, voice: VoiceSettings) -> Self {
        Self {
            sink,
            voice,
            banner: None,
        }
    }

    /// Replace the current banner.
    pub fn show(&mut self, now_ms: u64, message: impl Into<String>, severity: Severity) {
        let banner = Banner {
            message: message.into(),
            severity,
            shown_at_ms: now_ms,
            hide_at_ms: now_ms + BANNER_TTL_MS,
        };
        self.sink.show(&banner);
        self.banner = Some(banner);
    }

    pub fn error(&mut self, now_ms: u64, message: impl Into<String>) {
        self.show(now_ms, message, Severity::Error);
    }

    /// Speak unless voice is off or muted. Returns whether anything was spoken.
    pub fn speak(&mut self, text: impl Into<String>) -> bool {
        if !self.voice.can_speak() {
            return false;
        }
        self.sink.speak(&Utterance {
            text: text.into(),
            rate: self.voice.rate,
            pitch: self.voice.pitch,
        });
        true
    }

    /// Banner still on screen at `now_ms`.
    pub fn visible_banner(&self, now_ms: u64) -> Option<&Banner> {
        self.banner.as_ref().filter(|banner| banner.is_visible(now_ms))
    }

    pub fn voice(&self) -> VoiceSettings {
        self.voice
    }

    /// Flip voice guidance; announces itself when switched back on.
    pub fn toggle_voice(&mut self) -> bool {
        self.voice.enabled = !self.voice.enabled;
        if self.voice.enabled {
            self.speak("Voice guidance enabled");
        }
        self.voice.enabled
    }

    pub fn toggle_mute(&mut self) -> bool {
        self.voice.muted = !self.voice.muted;
        self.voice.muted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn banners_expire_after_ttl() {
        let sink = RecordingSink::new();
        let mut feedback = Feedback::new(Box::new(sink.clone()), VoiceSettings::default());
        feedback.show(1_000, "Pose completed! Great job!", Severity::Success);
        assert!(feedback.visible_banner(5_999).is_some());
        assert!(feedback.visible_banner(6_000).is_none());
        assert_eq!(sink.banners()[0].severity, Severity::Success);
    }

    #[test]
    fn speech_is_gated_by_voice_and_mute() {
        let sink = RecordingSink::new();
        let mut feedback = Feedback::new(Box::new(sink.clone()), VoiceSettings::default());
        assert!(feedback.speak("one"));
        assert!(feedback.toggle_mute());
        assert!(!feedback.speak("two"));
        feedback.toggle_mute();
        assert!(!feedback.toggle_voice());
        assert!(!feedback.speak("three"));
        assert!(feedback.toggle_voice());
        assert_eq!(
            sink.speech(),
            vec!["one".to_string(), "Voice guidance enabled".to_string()]
        );
    }

    #[test]
    fn utterances_carry_voice_settings() {
        let sink = RecordingSink::new();
        let mut feedback = Feedback::new(Box::new(sink.clone()), VoiceSettings::default());
        feedback.speak("hello");
        match &sink.records()[0] {
            FeedbackRecord::Speech(utterance) => {
                assert_eq!(utterance.rate, DEFAULT_SPEECH_RATE);
                assert_eq!(utterance.pitch, DEFAULT_SPEECH_PITCH);
            }
            other => panic!("unexpected record {:?}", other),
        }
    }
}
