//! Activation controller: wake/deactivate handshake with spoken confirmation.

use super::{GuardAgent, Incident};
use crate::events::{ControllerState, GuardEvent};
use crate::matcher::match_phrase;
use crate::session::EscalationLevel;
use chrono::Utc;
use tracing::info;

/// What one handled utterance did to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeOutcome {
    /// No phrase above threshold.
    Ignored,
    /// Requested state already holds; reported by speech, nothing mutated.
    AlreadyInState,
    /// Confirmation missing or rejected; back to the prior stable state.
    Cancelled,
    Armed,
    Disarmed,
    Shutdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Intent {
    Arm,
    Disarm,
    Shutdown,
}

impl GuardAgent {
    /// Match `text` against the wake and deactivate sets and run the confirmation
    /// protocol for whichever intent clears the activation threshold.
    pub fn handle_utterance(&mut self, text: &str) -> HandshakeOutcome {
        let threshold = self.config.matching.activation_threshold;
        let wake = match_phrase(text, &self.phrases.wake);
        let deact = match_phrase(text, &self.phrases.deactivate);
        info!(
            heard = %text,
            wake_best = ?wake.candidate,
            wake_score = wake.score,
            deact_best = ?deact.candidate,
            deact_score = deact.score,
            "phrase match"
        );

        // Shared words ("guard") let a short phrase clear another set's threshold on
        // partial scoring, so the strongest accepted intent wins; ties keep list order.
        let mut candidates = vec![(Intent::Arm, wake), (Intent::Disarm, deact)];
        if !self.session.is_armed() {
            candidates.push((Intent::Shutdown, match_phrase(text, &self.phrases.shutdown)));
        }
        let mut intent: Option<(Intent, f64)> = None;
        for (kind, m) in candidates {
            if m.accepts(threshold) && intent.map_or(true, |(_, best)| m.score > best) {
                intent = Some((kind, m.score));
            }
        }
        let intent = intent.map(|(kind, _)| kind);

        match intent {
            Some(Intent::Arm) => self.request_arm(),
            Some(Intent::Disarm) => self.request_disarm(),
            Some(Intent::Shutdown) => {
                info!("shutdown phrase heard");
                self.say("Shutting down. Goodbye!");
                self.request_shutdown();
                HandshakeOutcome::Shutdown
            }
            None => HandshakeOutcome::Ignored,
        }
    }

    fn request_arm(&mut self) -> HandshakeOutcome {
        if self.session.is_armed() {
            self.say("Guard mode is already active.");
            return HandshakeOutcome::AlreadyInState;
        }
        self.set_state(ControllerState::AwaitingWakeConfirm);
        if self.confirm_with_user("I heard activation. Confirm activation by saying 'yes'.") {
            self.arm();
            HandshakeOutcome::Armed
        } else {
            self.set_state(ControllerState::Disarmed);
            self.say("Activation canceled.");
            HandshakeOutcome::Cancelled
        }
    }

    fn request_disarm(&mut self) -> HandshakeOutcome {
        if !self.session.is_armed() {
            self.say("Guard mode is already off.");
            return HandshakeOutcome::AlreadyInState;
        }
        self.set_state(ControllerState::AwaitingDisarmConfirm);
        if self.confirm_with_user("I heard a request to stop guard. Say 'yes' to confirm.") {
            self.disarm();
            HandshakeOutcome::Disarmed
        } else {
            self.set_state(ControllerState::Armed);
            self.say("Deactivation canceled.");
            HandshakeOutcome::Cancelled
        }
    }

    /// Speak `prompt`, listen for the confirm window, match against the confirm set.
    /// Silence counts as "no".
    fn confirm_with_user(&mut self, prompt: &str) -> bool {
        self.say(prompt);
        let Some(heard) = self.voice.listen(self.config.listen.confirm()) else {
            info!("no confirmation heard");
            return false;
        };
        let m = match_phrase(&heard, &self.phrases.confirm);
        info!(heard = %heard, best = ?m.candidate, score = m.score, "confirmation match");
        m.accepts(self.config.matching.confirm_threshold)
    }

    fn arm(&mut self) {
        self.session.arm();
        self.incident = Incident::default();
        self.set_state(ControllerState::Armed);
        self.say("Guard mode activated. I will monitor the room.");
        info!("GUARD ON");
    }

    fn disarm(&mut self) {
        let from = self.session.level();
        self.session.disarm();
        if from != EscalationLevel::Scanning {
            self.emit(GuardEvent::LevelChanged {
                cycle: self.cycle,
                from,
                to: EscalationLevel::Scanning,
                at: Utc::now(),
            });
        }
        self.incident = Incident::default();
        self.set_state(ControllerState::Disarmed);
        self.say("Guard mode deactivated.");
        info!("GUARD OFF");
    }
}
