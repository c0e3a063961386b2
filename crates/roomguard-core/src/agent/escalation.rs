//! Escalation loop: the intrusion-response state machine.
//!
//! Each cycle captures one frame and classifies it. Known resets the level to 0 and
//! offers the trusted person a command; Unknown climbs one rung of `LADDER`.
//! Capture and classification failures retry the cycle and never move the level.

use super::{GuardAgent, Incident};
use crate::events::GuardEvent;
use crate::ports::{FrameSource, IncidentReport};
use crate::presence::ObservationOutcome;
use crate::responder::{warning_prompt, IntruderExchange};
use crate::session::EscalationLevel;
use chrono::Utc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// How a rung gets the content it speaks or waits for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    /// Speak the prompt, then listen for the subject's justification.
    Justification,
    /// Ask the responder for a warning built from the justification; `{warning}` in
    /// the prompt is replaced by it.
    GeneratedWarning,
    /// Speak the prompt and fire the authorities hook.
    Authorities,
}

#[derive(Debug, Clone, Copy)]
pub struct EscalationStep {
    pub to: EscalationLevel,
    pub prompt: &'static str,
    pub source: ResponseSource,
}

/// Indexed by the current level: `LADDER[n]` moves from level n to n + 1.
pub static LADDER: [EscalationStep; 3] = [
    EscalationStep {
        to: EscalationLevel::Challenged,
        prompt: "I do not recognize you. Who are you, and why are you in this room?",
        source: ResponseSource::Justification,
    },
    EscalationStep {
        to: EscalationLevel::Warned,
        prompt: "{warning}",
        source: ResponseSource::GeneratedWarning,
    },
    EscalationStep {
        to: EscalationLevel::Escalated,
        prompt: "You have ignored my warnings. This is your final notice. I am contacting the authorities now.",
        source: ResponseSource::Authorities,
    },
];

const ACCESS_GRANTED: &str = "Access granted. Welcome back.";
const AUTHORITIES_CONTACTED: &str = "The authorities have been contacted.";

/// Why the escalation loop returned control to the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    Disarmed,
    Shutdown,
}

/// Exclusive hold on the camera for one run of the loop. Released on every exit,
/// including unwinding.
struct CameraLease {
    source: Option<Box<dyn FrameSource>>,
}

impl CameraLease {
    fn open(mut source: Box<dyn FrameSource>) -> Self {
        if let Err(e) = source.open() {
            warn!(error = %e, "camera open failed; captures will retry");
        }
        Self { source: Some(source) }
    }

    fn source_mut(&mut self) -> Option<&mut (dyn FrameSource + 'static)> {
        self.source.as_deref_mut()
    }

    fn reopen(&mut self) {
        if let Some(s) = self.source.as_mut() {
            s.release();
            if let Err(e) = s.open() {
                warn!(error = %e, "camera reopen failed");
            }
        }
    }

    fn release(mut self) -> Option<Box<dyn FrameSource>> {
        let mut s = self.source.take()?;
        s.release();
        Some(s)
    }
}

impl Drop for CameraLease {
    fn drop(&mut self) {
        if let Some(s) = self.source.as_mut() {
            s.release();
        }
    }
}

impl GuardAgent {
    /// Run the escalation loop until the session is disarmed or shutdown is requested.
    pub fn guard(&mut self) -> LoopExit {
        let Some(source) = self.camera.take() else {
            error!("camera already leased; cannot guard");
            self.request_shutdown();
            return LoopExit::Shutdown;
        };
        let mut lease = CameraLease::open(source);
        info!(level = %self.session.level(), "escalation loop started");

        let mut capture_failures = 0u32;
        let exit = loop {
            if self.stopping() {
                break LoopExit::Shutdown;
            }
            if !self.session.is_armed() {
                break LoopExit::Disarmed;
            }
            let pause = self.run_cycle(&mut lease, &mut capture_failures);
            if self.session.is_armed() && !self.stopping() && !pause.is_zero() {
                std::thread::sleep(pause);
            }
        };

        self.camera = lease.release();
        info!(?exit, cycles = self.cycle, "escalation loop stopped; camera released");
        exit
    }

    /// One observation cycle. Returns the pause before the next one.
    fn run_cycle(&mut self, lease: &mut CameraLease, capture_failures: &mut u32) -> Duration {
        self.cycle += 1;
        let cycle = self.cycle;
        let level = self.session.level();

        let outcome = match lease.source_mut() {
            Some(src) => self.classifier.observe(src, self.session.trusted()),
            None => ObservationOutcome::CaptureFailed("camera not leased".to_string()),
        };
        debug!(cycle, %level, ?outcome, "observation");

        match outcome {
            ObservationOutcome::Known => {
                *capture_failures = 0;
                self.on_known(cycle);
                self.config.escalation.scan_interval()
            }
            ObservationOutcome::Unknown => {
                *capture_failures = 0;
                self.on_unknown(cycle);
                self.config.escalation.scan_interval()
            }
            ObservationOutcome::CaptureFailed(reason) => {
                *capture_failures += 1;
                warn!(cycle, %level, attempt = *capture_failures, %reason, "capture failed; retrying cycle");
                self.emit(GuardEvent::CycleFailed {
                    cycle,
                    level,
                    kind: "capture",
                    reason,
                    at: Utc::now(),
                });
                if *capture_failures >= self.config.escalation.capture_retry_limit.max(1) {
                    warn!(cycle, "capture retry budget spent; reopening camera");
                    lease.reopen();
                    *capture_failures = 0;
                }
                self.config.escalation.retry_backoff()
            }
            ObservationOutcome::ClassificationFailed(reason) => {
                warn!(cycle, %level, %reason, "classification failed; retrying cycle");
                self.emit(GuardEvent::CycleFailed {
                    cycle,
                    level,
                    kind: "classification",
                    reason,
                    at: Utc::now(),
                });
                self.config.escalation.retry_backoff()
            }
        }
    }

    fn on_known(&mut self, cycle: u64) {
        let from = self.session.level();
        self.session.reset_level();
        self.incident = Incident::default();
        if from != EscalationLevel::Scanning {
            info!(cycle, %from, "trusted identity recognized; incident resolved");
            self.emit(GuardEvent::LevelChanged {
                cycle,
                from,
                to: EscalationLevel::Scanning,
                at: Utc::now(),
            });
        }
        self.emit(GuardEvent::AccessGranted { cycle, at: Utc::now() });
        self.say(ACCESS_GRANTED);

        match self.voice.listen(self.config.listen.command()) {
            Some(command) => {
                let outcome = self.handle_utterance(&command);
                info!(cycle, ?outcome, "command from trusted identity");
            }
            None => debug!(cycle, "no command after access granted"),
        }
    }

    fn on_unknown(&mut self, cycle: u64) {
        let from = self.session.level();
        let Some(&step) = LADDER.get(from.as_u8() as usize) else {
            debug!(cycle, level = %from, "intrusion persists; already escalated");
            return;
        };
        if from == EscalationLevel::Scanning {
            self.incident.started_at = Some(Utc::now());
            self.incident.first_cycle = cycle;
        }
        let Some(to) = self.session.escalate() else {
            return;
        };
        warn!(cycle, %from, %to, "unknown presence; escalating");
        self.emit(GuardEvent::LevelChanged {
            cycle,
            from,
            to,
            at: Utc::now(),
        });

        match step.source {
            ResponseSource::Justification => {
                self.say(step.prompt);
                let heard = self.voice.listen(self.config.listen.challenge());
                let exchange = IntruderExchange::from_transcript(heard);
                info!(cycle, statement = %exchange, "challenge answered");
                self.incident.exchange = Some(exchange);
            }
            ResponseSource::GeneratedWarning => {
                let exchange = self
                    .incident
                    .exchange
                    .take()
                    .unwrap_or(IntruderExchange::NoResponse);
                let warning = self.generate_warning(cycle, &exchange);
                self.say(&step.prompt.replace("{warning}", &warning));
            }
            ResponseSource::Authorities => {
                self.say(step.prompt);
                let now = Utc::now();
                let report = IncidentReport {
                    cycle,
                    level: to,
                    cycles_unresolved: cycle.saturating_sub(self.incident.first_cycle),
                    started_at: self.incident.started_at.unwrap_or(now),
                    reported_at: now,
                };
                self.notifier.notify(&report);
                self.emit(GuardEvent::AuthoritiesNotified { cycle, at: now });
                self.say(AUTHORITIES_CONTACTED);
            }
        }
    }

    fn generate_warning(&self, cycle: u64, exchange: &IntruderExchange) -> String {
        let fallback = &self.config.escalation.fallback_warning;
        let Some(responder) = &self.responder else {
            return fallback.clone();
        };
        match responder.respond(&warning_prompt(exchange)) {
            Ok(text) => text,
            Err(e) => {
                warn!(cycle, level = 2, error = %e, "responder failed; using fallback warning");
                fallback.clone()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ladder_is_indexed_by_current_level() {
        for (i, step) in LADDER.iter().enumerate() {
            assert_eq!(step.to.as_u8() as usize, i + 1);
        }
        assert!(LADDER.get(EscalationLevel::Escalated.as_u8() as usize).is_none());
    }

    #[test]
    fn only_the_warning_rung_is_templated() {
        let templated: Vec<_> = LADDER.iter().filter(|s| s.prompt.contains("{warning}")).collect();
        assert_eq!(templated.len(), 1);
        assert_eq!(templated[0].source, ResponseSource::GeneratedWarning);
    }
}
