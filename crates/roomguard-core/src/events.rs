//! Guard events: the incident timeline as a stream.
//!
//! Emitted on an unbounded channel so the worker never blocks on a slow consumer.
//! A dropped receiver is ignored.

use crate::session::EscalationLevel;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use tokio::sync::mpsc;

/// Activation controller state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ControllerState {
    Disarmed,
    AwaitingWakeConfirm,
    Armed,
    AwaitingDisarmConfirm,
}

impl fmt::Display for ControllerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ControllerState::Disarmed => "disarmed",
            ControllerState::AwaitingWakeConfirm => "awaiting_wake_confirm",
            ControllerState::Armed => "armed",
            ControllerState::AwaitingDisarmConfirm => "awaiting_disarm_confirm",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GuardEvent {
    StateChanged {
        from: ControllerState,
        to: ControllerState,
        at: DateTime<Utc>,
    },
    LevelChanged {
        cycle: u64,
        from: EscalationLevel,
        to: EscalationLevel,
        at: DateTime<Utc>,
    },
    AccessGranted {
        cycle: u64,
        at: DateTime<Utc>,
    },
    AuthoritiesNotified {
        cycle: u64,
        at: DateTime<Utc>,
    },
    CycleFailed {
        cycle: u64,
        level: EscalationLevel,
        kind: &'static str,
        reason: String,
        at: DateTime<Utc>,
    },
    Shutdown {
        at: DateTime<Utc>,
    },
}

pub type EventSender = mpsc::UnboundedSender<GuardEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<GuardEvent>;

pub fn channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}
