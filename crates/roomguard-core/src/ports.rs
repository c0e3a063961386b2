//! Capability ports consumed by the guard core.
//!
//! Each collaborator is a synchronous trait with explicit timeouts where it can block.
//! Production adapters live in `roomguard-voice` and `roomguard-vision`; tests use fakes.

use crate::error::GuardResult;
use crate::identity::TrustedIdentitySet;
use crate::session::EscalationLevel;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::error;

/// One encoded camera image (JPEG/PNG bytes).
#[derive(Debug, Clone)]
pub struct Frame {
    pub bytes: Vec<u8>,
    pub captured_at: DateTime<Utc>,
}

impl Frame {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            captured_at: Utc::now(),
        }
    }
}

/// Face matcher verdict for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Presence {
    /// At least one trusted identity is in frame.
    Known,
    /// Nobody trusted is in frame.
    Unknown,
}

/// Speech in and out. Implementations serialize capture and playback.
pub trait VoiceIo {
    /// Listen for one utterance within `window`. Returns the lowercase transcript,
    /// or `None` on silence, timeout or transcription failure.
    fn listen(&self, window: Duration) -> Option<String>;

    /// Speak `text`, blocking until playback has finished.
    fn say(&self, text: &str);
}

/// Camera access. The escalation loop opens it on arm and releases it on every exit.
pub trait FrameSource {
    fn open(&mut self) -> GuardResult<()>;

    fn capture_frame(&mut self) -> GuardResult<Frame>;

    fn release(&mut self);
}

/// Face enrollment and comparison.
pub trait FaceMatcher {
    /// Encode every image in `dir` into the trusted set.
    fn load_trusted_set(&self, dir: &Path) -> GuardResult<TrustedIdentitySet>;

    fn classify(&self, frame: &Frame, trusted: &TrustedIdentitySet) -> GuardResult<Presence>;
}

/// Free-text generation for the level-2 warning.
pub trait Responder {
    fn respond(&self, prompt: &str) -> GuardResult<String>;
}

/// Facts handed to the authorities hook when an intrusion reaches level 3.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncidentReport {
    pub cycle: u64,
    pub level: EscalationLevel,
    /// Cycles elapsed since the first Unknown of this incident.
    pub cycles_unresolved: u64,
    pub started_at: DateTime<Utc>,
    pub reported_at: DateTime<Utc>,
}

/// Terminal "authorities contacted" side effect.
pub trait AuthorityNotifier {
    fn notify(&self, report: &IncidentReport);
}

/// Records the incident in the log. There is no dispatch protocol behind it.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl AuthorityNotifier for LogNotifier {
    fn notify(&self, report: &IncidentReport) {
        let payload = serde_json::to_string(report).unwrap_or_else(|_| format!("{:?}", report));
        error!(
            cycle = report.cycle,
            level = %report.level,
            incident = %payload,
            "AUTHORITIES NOTIFIED: unresolved intrusion"
        );
    }
}
