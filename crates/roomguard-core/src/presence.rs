//! Presence classifier: one frame in, one observation outcome out.

use crate::identity::TrustedIdentitySet;
use crate::ports::{FaceMatcher, FrameSource, Presence};
use tracing::debug;

/// Result of one capture + classify cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObservationOutcome {
    Known,
    Unknown,
    /// Camera unreadable this cycle. Not evidence of intrusion.
    CaptureFailed(String),
    /// Matcher errored. Retried; never counted as Unknown.
    ClassificationFailed(String),
}

impl From<Presence> for ObservationOutcome {
    fn from(p: Presence) -> Self {
        match p {
            Presence::Known => ObservationOutcome::Known,
            Presence::Unknown => ObservationOutcome::Unknown,
        }
    }
}

pub struct PresenceClassifier {
    matcher: Box<dyn FaceMatcher>,
}

impl PresenceClassifier {
    pub fn new(matcher: Box<dyn FaceMatcher>) -> Self {
        Self { matcher }
    }

    /// Capture one frame and classify it against `trusted`.
    pub fn observe(&self, source: &mut dyn FrameSource, trusted: &TrustedIdentitySet) -> ObservationOutcome {
        let frame = match source.capture_frame() {
            Ok(f) => f,
            Err(e) => return ObservationOutcome::CaptureFailed(e.to_string()),
        };
        debug!(bytes = frame.bytes.len(), "frame captured");
        match self.matcher.classify(&frame, trusted) {
            Ok(p) => p.into(),
            Err(e) => ObservationOutcome::ClassificationFailed(e.to_string()),
        }
    }
}
