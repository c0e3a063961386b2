//! Error types for the guard core.
//!
//! None of these are fatal to the agent: the controller and the escalation loop
//! catch every variant, log it with cycle/level context and keep going.

use thiserror::Error;

/// Result type alias for guard operations
pub type GuardResult<T> = Result<T, GuardError>;

/// Failures reported by the external collaborators behind the guard ports.
#[derive(Error, Debug)]
pub enum GuardError {
    /// ASR unavailable or audio unintelligible. Treated as "no utterance".
    #[error("Transcription failed: {0}")]
    Transcription(String),

    /// Camera unreadable. Transient; the cycle is retried.
    #[error("Frame capture failed: {0}")]
    Capture(String),

    /// Face matcher failed on a frame. Retried, never counted as Unknown.
    #[error("Classification failed: {0}")]
    Classification(String),

    /// Language model unavailable. A fallback warning is spoken instead.
    #[error("Responder failed: {0}")]
    Responder(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<config::ConfigError> for GuardError {
    fn from(err: config::ConfigError) -> Self {
        GuardError::Config(err.to_string())
    }
}

impl GuardError {
    /// Short machine-friendly label used in log fields and guard events.
    pub fn kind(&self) -> &'static str {
        match self {
            GuardError::Transcription(_) => "transcription",
            GuardError::Capture(_) => "capture",
            GuardError::Classification(_) => "classification",
            GuardError::Responder(_) => "responder",
            GuardError::Config(_) => "config",
            GuardError::Io(_) => "io",
        }
    }
}
