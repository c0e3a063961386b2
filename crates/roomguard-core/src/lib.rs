//! roomguard-core: the guard control state machine.
//!
//! A spoken wake phrase (fuzzy-matched, then confirmed) arms the session; while armed
//! the escalation loop samples the camera, classifies the subject against the trusted
//! identities and climbs a four-level response ladder until a trusted face appears,
//! the session is verbally disarmed, or the intrusion is reported.
//!
//! ```text
//!  listen ──► PhraseMatcher ──► ActivationController ──► arm / disarm
//!                                        │
//!                                        ▼ (armed)
//!  FrameSource ──► PresenceClassifier ──► EscalationLoop ──► say / Responder / notify
//! ```
//!
//! Every external capability (ASR/TTS, camera, face matcher, language model,
//! authorities hook) is a synchronous port in [`ports`].

pub mod agent;
pub mod config;
pub mod error;
pub mod events;
pub mod identity;
pub mod matcher;
pub mod ports;
pub mod presence;
pub mod responder;
pub mod session;

pub use agent::{
    EscalationStep, GuardAgent, GuardPorts, HandshakeOutcome, LoopExit, ResponseSource, LADDER,
};
pub use config::{
    EscalationConfig, GuardConfig, ListenConfig, MatchingConfig, PathsConfig, PhraseConfig,
    ResponderConfig, VisionConfig, VoiceConfig,
};
pub use error::{GuardError, GuardResult};
pub use events::{ControllerState, EventReceiver, EventSender, GuardEvent};
pub use identity::{FaceEncoding, TrustedFace, TrustedIdentitySet};
pub use matcher::{match_phrase, normalize, weighted_ratio, MatchResult, PhraseSet};
pub use ports::{
    AuthorityNotifier, FaceMatcher, Frame, FrameSource, IncidentReport, LogNotifier, Presence,
    Responder, VoiceIo,
};
pub use presence::{ObservationOutcome, PresenceClassifier};
pub use responder::{warning_prompt, IntruderExchange, OpenRouterResponder};
pub use session::{EscalationLevel, GuardSession};
