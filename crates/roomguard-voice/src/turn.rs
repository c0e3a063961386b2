//! Turn detection: decides when one spoken phrase has ended.
//!
//! Gap logic: a turn is committed after `silence_threshold` of silence follows speech,
//! or when it reaches `max_turn_duration` (the phrase time limit). Timing is counted
//! in audio time from the chunk lengths, not wall-clock time.

use crate::error::{VoiceError, VoiceResult};
use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Events emitted by the turn manager
#[derive(Debug, Clone)]
pub enum TurnEvent {
    /// Speech began after silence.
    SpeechStarted { timestamp: DateTime<Utc> },

    /// Speech was too short to be a phrase and was discarded.
    TurnDropped { speech_duration: Duration },

    /// A complete phrase, ready for transcription.
    TurnCommitted {
        timestamp: DateTime<Utc>,
        speech_duration: Duration,
        audio_samples: Vec<f32>,
    },
}

/// Configuration for turn detection
#[derive(Debug, Clone)]
pub struct TurnConfig {
    /// Silence duration before committing a turn (default: 800ms)
    pub silence_threshold: Duration,

    /// Minimum speech duration to be considered a valid turn (default: 200ms)
    pub min_speech_duration: Duration,

    /// Longest phrase before auto-commit (default: 8s)
    pub max_turn_duration: Duration,

    /// Sample rate for audio (default: 16000 Hz)
    pub sample_rate: u32,
}

impl Default for TurnConfig {
    fn default() -> Self {
        Self {
            silence_threshold: Duration::from_millis(800),
            min_speech_duration: Duration::from_millis(200),
            max_turn_duration: Duration::from_secs(8),
            sample_rate: 16000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum TurnState {
    Idle,
    Speaking,
    SilenceDetected,
}

/// Tracks speech/silence frames and emits turn events
pub struct TurnManager {
    config: TurnConfig,
    state: TurnState,

    /// Audio time since speech started.
    speech_elapsed: Duration,
    /// Audio time since the last speech frame.
    silence_run: Duration,

    audio_buffer: Vec<f32>,
    event_tx: mpsc::UnboundedSender<TurnEvent>,
}

impl TurnManager {
    pub fn new(config: TurnConfig) -> (Self, mpsc::UnboundedReceiver<TurnEvent>) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let manager = Self {
            config,
            state: TurnState::Idle,
            speech_elapsed: Duration::ZERO,
            silence_run: Duration::ZERO,
            audio_buffer: Vec::new(),
            event_tx,
        };
        (manager, event_rx)
    }

    fn chunk_duration(&self, chunk: &[f32]) -> Duration {
        Duration::from_secs_f64(chunk.len() as f64 / self.config.sample_rate.max(1) as f64)
    }

    /// Feed one VAD decision with the chunk it was made on.
    pub fn process_vad_result(&mut self, is_speech: bool, audio_chunk: &[f32]) -> VoiceResult<()> {
        let step = self.chunk_duration(audio_chunk);

        match (self.state, is_speech) {
            (TurnState::Idle, true) => {
                debug!("speech started");
                self.state = TurnState::Speaking;
                self.speech_elapsed = step;
                self.silence_run = Duration::ZERO;
                self.audio_buffer.clear();
                self.audio_buffer.extend_from_slice(audio_chunk);
                self.emit_event(TurnEvent::SpeechStarted {
                    timestamp: Utc::now(),
                })?;
            }

            (TurnState::Speaking, true) | (TurnState::SilenceDetected, true) => {
                self.state = TurnState::Speaking;
                self.speech_elapsed += step;
                self.silence_run = Duration::ZERO;
                self.audio_buffer.extend_from_slice(audio_chunk);
            }

            (TurnState::Speaking, false) | (TurnState::SilenceDetected, false) => {
                // Trailing silence stays in the buffer so STT sees the phrase end.
                self.state = TurnState::SilenceDetected;
                self.speech_elapsed += step;
                self.silence_run += step;
                self.audio_buffer.extend_from_slice(audio_chunk);
                if self.silence_run >= self.config.silence_threshold {
                    return self.commit_turn();
                }
            }

            (TurnState::Idle, false) => {}
        }

        if self.state != TurnState::Idle && self.speech_elapsed >= self.config.max_turn_duration {
            warn!(limit = ?self.config.max_turn_duration, "phrase time limit reached, committing");
            return self.commit_turn();
        }
        Ok(())
    }

    fn commit_turn(&mut self) -> VoiceResult<()> {
        if self.state == TurnState::Idle {
            return Ok(());
        }

        let speech_duration = self.speech_elapsed.saturating_sub(self.silence_run);
        if speech_duration < self.config.min_speech_duration {
            debug!(?speech_duration, "speech too short, dropping");
            self.reset();
            return self.emit_event(TurnEvent::TurnDropped { speech_duration });
        }

        info!(?speech_duration, samples = self.audio_buffer.len(), "turn committed");
        let audio_samples = std::mem::take(&mut self.audio_buffer);
        self.reset();
        self.emit_event(TurnEvent::TurnCommitted {
            timestamp: Utc::now(),
            speech_duration,
            audio_samples,
        })
    }

    /// Discard any partial turn (e.g. when nobody is listening).
    pub fn reset(&mut self) {
        self.state = TurnState::Idle;
        self.speech_elapsed = Duration::ZERO;
        self.silence_run = Duration::ZERO;
        self.audio_buffer.clear();
    }

    fn emit_event(&self, event: TurnEvent) -> VoiceResult<()> {
        self.event_tx
            .send(event)
            .map_err(|e| VoiceError::ChannelSend(e.to_string()))
    }

    /// Current state name (for logs and tests)
    pub fn state(&self) -> &'static str {
        match self.state {
            TurnState::Idle => "idle",
            TurnState::Speaking => "speaking",
            TurnState::SilenceDetected => "silence_detected",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHUNK: usize = 480; // 30ms at 16kHz

    fn feed(manager: &mut TurnManager, speech: bool, chunks: usize) {
        let chunk = vec![if speech { 0.5f32 } else { 0.0 }; CHUNK];
        for _ in 0..chunks {
            manager.process_vad_result(speech, &chunk).unwrap();
        }
    }

    #[test]
    fn test_turn_manager_basic_flow() {
        let (mut manager, mut rx) = TurnManager::new(TurnConfig::default());

        feed(&mut manager, true, 1);
        assert!(matches!(rx.try_recv().unwrap(), TurnEvent::SpeechStarted { .. }));
        assert_eq!(manager.state(), "speaking");

        // 1s of speech, then 900ms of silence commits.
        feed(&mut manager, true, 32);
        feed(&mut manager, false, 30);
        match rx.try_recv().unwrap() {
            TurnEvent::TurnCommitted {
                speech_duration,
                audio_samples,
                ..
            } => {
                assert!(speech_duration >= Duration::from_millis(900));
                assert!(!audio_samples.is_empty());
            }
            other => panic!("expected commit, got {:?}", other),
        }
        assert_eq!(manager.state(), "idle");
    }

    #[test]
    fn short_pause_does_not_split_the_phrase() {
        let (mut manager, mut rx) = TurnManager::new(TurnConfig::default());
        feed(&mut manager, true, 10);
        feed(&mut manager, false, 10); // 300ms
        feed(&mut manager, true, 10);
        assert_eq!(manager.state(), "speaking");
        let _ = rx.try_recv(); // SpeechStarted
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn blip_is_dropped() {
        let (mut manager, mut rx) = TurnManager::new(TurnConfig::default());
        feed(&mut manager, true, 2); // 60ms
        feed(&mut manager, false, 30);
        let _ = rx.try_recv();
        assert!(matches!(rx.try_recv().unwrap(), TurnEvent::TurnDropped { .. }));
    }

    #[test]
    fn phrase_limit_forces_commit() {
        let config = TurnConfig {
            max_turn_duration: Duration::from_millis(600),
            ..Default::default()
        };
        let (mut manager, mut rx) = TurnManager::new(config);
        feed(&mut manager, true, 25); // 750ms of continuous speech
        let _ = rx.try_recv();
        assert!(matches!(rx.try_recv().unwrap(), TurnEvent::TurnCommitted { .. }));
    }
}
