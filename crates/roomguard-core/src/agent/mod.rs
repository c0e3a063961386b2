//! The guard agent: one sequential worker that owns the session and every port.
//!
//! While disarmed it listens for phrases (activation controller); once armed it runs
//! the escalation loop until the session is disarmed or shutdown is requested.
//! Shutdown is observed at listen and cycle boundaries, never mid-cycle.

mod activation;
mod escalation;

pub use activation::HandshakeOutcome;
pub use escalation::{EscalationStep, LoopExit, ResponseSource, LADDER};

use crate::config::GuardConfig;
use crate::events::{ControllerState, EventSender, GuardEvent};
use crate::matcher::PhraseSet;
use crate::ports::{AuthorityNotifier, FrameSource, Responder, VoiceIo};
use crate::presence::PresenceClassifier;
use crate::responder::IntruderExchange;
use crate::session::GuardSession;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// External collaborators the agent drives.
pub struct GuardPorts {
    pub voice: Box<dyn VoiceIo>,
    pub camera: Box<dyn FrameSource>,
    pub classifier: PresenceClassifier,
    /// `None` means every level-2 warning uses the configured fallback.
    pub responder: Option<Box<dyn Responder>>,
    pub notifier: Box<dyn AuthorityNotifier>,
}

/// Normalized phrase sets built once from config.
#[derive(Debug, Clone)]
struct Phrases {
    wake: PhraseSet,
    deactivate: PhraseSet,
    confirm: PhraseSet,
    shutdown: PhraseSet,
}

impl Phrases {
    fn from_config(cfg: &GuardConfig) -> Self {
        Self {
            wake: PhraseSet::new(&cfg.phrases.wake),
            deactivate: PhraseSet::new(&cfg.phrases.deactivate),
            confirm: PhraseSet::new(&cfg.phrases.confirm),
            shutdown: PhraseSet::new(&cfg.phrases.shutdown),
        }
    }
}

/// Bookkeeping for the incident in progress; cleared on Known or disarm.
#[derive(Debug, Default)]
struct Incident {
    started_at: Option<DateTime<Utc>>,
    first_cycle: u64,
    exchange: Option<IntruderExchange>,
}

pub struct GuardAgent {
    config: GuardConfig,
    phrases: Phrases,
    session: GuardSession,
    state: ControllerState,
    voice: Box<dyn VoiceIo>,
    camera: Option<Box<dyn FrameSource>>,
    classifier: PresenceClassifier,
    responder: Option<Box<dyn Responder>>,
    notifier: Box<dyn AuthorityNotifier>,
    incident: Incident,
    cycle: u64,
    events: Option<EventSender>,
    shutdown: Arc<AtomicBool>,
}

impl GuardAgent {
    pub fn new(config: GuardConfig, session: GuardSession, ports: GuardPorts) -> Self {
        let phrases = Phrases::from_config(&config);
        let state = if session.is_armed() {
            ControllerState::Armed
        } else {
            ControllerState::Disarmed
        };
        Self {
            config,
            phrases,
            session,
            state,
            voice: ports.voice,
            camera: Some(ports.camera),
            classifier: ports.classifier,
            responder: ports.responder,
            notifier: ports.notifier,
            incident: Incident::default(),
            cycle: 0,
            events: None,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Publish guard events on `tx`.
    pub fn with_events(mut self, tx: EventSender) -> Self {
        self.events = Some(tx);
        self
    }

    /// Share an externally owned shutdown flag (e.g. set from a Ctrl-C handler).
    pub fn with_shutdown(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown = flag;
        self
    }

    pub fn session(&self) -> &GuardSession {
        &self.session
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    /// Observation cycles run since start.
    pub fn cycles(&self) -> u64 {
        self.cycle
    }

    /// Main worker loop. Returns once shutdown is requested.
    pub fn run(&mut self) {
        let greeting = match self.phrases.wake.phrases().first() {
            Some(p) => format!("Guard agent started. Say '{}' to activate.", p),
            None => "Guard agent started.".to_string(),
        };
        self.say(&greeting);

        while !self.stopping() {
            if self.session.is_armed() {
                self.guard();
                continue;
            }
            match self.voice.listen(self.config.listen.wake()) {
                Some(text) => {
                    let outcome = self.handle_utterance(&text);
                    debug!(?outcome, "utterance handled");
                }
                None => debug!("no utterance in wake window"),
            }
        }

        self.say("Guard agent stopped.");
        self.emit(GuardEvent::Shutdown { at: Utc::now() });
        info!("agent stopped");
    }

    fn stopping(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    fn say(&self, text: &str) {
        info!(target: "roomguard::speech", "[TTS] {}", text);
        self.voice.say(text);
    }

    fn set_state(&mut self, to: ControllerState) {
        if self.state == to {
            return;
        }
        let from = self.state;
        self.state = to;
        info!(%from, %to, "controller state");
        self.emit(GuardEvent::StateChanged {
            from,
            to,
            at: Utc::now(),
        });
    }

    fn emit(&self, event: GuardEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }
}
