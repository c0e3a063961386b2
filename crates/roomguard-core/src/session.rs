//! The single live guard state of the process.

use crate::identity::TrustedIdentitySet;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Intrusion-response severity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationLevel {
    /// 0: watching, nothing suspicious yet.
    #[default]
    Scanning,
    /// 1: an unknown subject was asked to identify themselves.
    Challenged,
    /// 2: a generated warning was delivered.
    Warned,
    /// 3: authorities notified; keeps observing until Known or disarm.
    Escalated,
}

impl EscalationLevel {
    pub fn as_u8(self) -> u8 {
        match self {
            EscalationLevel::Scanning => 0,
            EscalationLevel::Challenged => 1,
            EscalationLevel::Warned => 2,
            EscalationLevel::Escalated => 3,
        }
    }

    /// Next level up, or `None` at the top.
    pub fn next(self) -> Option<Self> {
        match self {
            EscalationLevel::Scanning => Some(EscalationLevel::Challenged),
            EscalationLevel::Challenged => Some(EscalationLevel::Warned),
            EscalationLevel::Warned => Some(EscalationLevel::Escalated),
            EscalationLevel::Escalated => None,
        }
    }
}

impl fmt::Display for EscalationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

/// Guard state: armed flag, escalation level, and the trusted identities.
///
/// Invariant: `level() > Scanning` implies `is_armed()`. Only `arm`, `disarm`,
/// `escalate` and `reset_level` mutate it.
#[derive(Debug, Clone)]
pub struct GuardSession {
    armed: bool,
    level: EscalationLevel,
    trusted: Arc<TrustedIdentitySet>,
}

impl GuardSession {
    /// New disarmed session over an already-loaded trusted set.
    pub fn new(trusted: Arc<TrustedIdentitySet>) -> Self {
        Self {
            armed: false,
            level: EscalationLevel::Scanning,
            trusted,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn level(&self) -> EscalationLevel {
        self.level
    }

    pub fn trusted(&self) -> &Arc<TrustedIdentitySet> {
        &self.trusted
    }

    /// Arm with a fresh incident (level 0).
    pub fn arm(&mut self) {
        self.armed = true;
        self.level = EscalationLevel::Scanning;
    }

    /// Disarm and reset the level.
    pub fn disarm(&mut self) {
        self.armed = false;
        self.level = EscalationLevel::Scanning;
    }

    /// Raise the level by one. Returns the new level, or `None` when disarmed or
    /// already at the top (no mutation in either case).
    pub fn escalate(&mut self) -> Option<EscalationLevel> {
        if !self.armed {
            return None;
        }
        let next = self.level.next()?;
        self.level = next;
        Some(next)
    }

    /// Back to Scanning, e.g. after a trusted identity is recognized.
    pub fn reset_level(&mut self) {
        self.level = EscalationLevel::Scanning;
    }
}
