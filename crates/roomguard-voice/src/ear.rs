//! The ear: microphone capture, local VAD and turn detection with bounded listening.
//!
//! Captures via CPAL in 30ms chunks, runs WebRTC VAD and the gap logic on a worker
//! thread, and hands committed phrases to whoever is currently listening. Audio that
//! arrives while nobody listens (including the agent's own speech) is discarded.

use crate::audio::{AudioCapture, AudioChunk, AudioConfig};
use crate::error::VoiceResult;
use crate::turn::{TurnConfig, TurnEvent, TurnManager};
use crate::vad::{VadConfig, VadDetector};
use chrono::{DateTime, Utc};
use cpal::Stream;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// A completed phrase: buffered PCM from speech start until the gap.
#[derive(Debug, Clone)]
pub struct AudioTurn {
    /// PCM samples (f32, -1.0..1.0) for the full turn.
    pub samples: Vec<f32>,
    /// When the turn was committed.
    pub timestamp: DateTime<Utc>,
    /// Approximate speech duration.
    pub duration: Duration,
    pub sample_rate: u32,
}

/// Anything that can produce one spoken phrase within a listening window.
pub trait TurnSource {
    /// Wait up to `window` for speech to begin, then for the phrase to finish.
    /// `None` if nobody spoke in time.
    fn next_turn(&self, window: Duration) -> Option<AudioTurn>;
}

#[derive(Debug, Clone)]
pub struct EarConfig {
    /// Sample rate (default 16000). Must be one WebRTC VAD accepts.
    pub sample_rate: u32,
    /// Chunk size in samples (default 480 = 30ms at 16kHz).
    pub chunk_size: usize,
    /// WebRTC VAD aggressiveness 0-3 (default 2).
    pub vad_mode: u8,
    /// Silence after speech that ends a phrase (default 800ms).
    pub gap_ms: u64,
    /// Shorter speech is dropped as noise (default 200ms).
    pub min_speech_ms: u64,
    /// Longest phrase once speech has started (default 8s).
    pub phrase_limit: Duration,
}

impl Default for EarConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            chunk_size: 480,
            vad_mode: 2,
            gap_ms: 800,
            min_speech_ms: 200,
            phrase_limit: Duration::from_secs(8),
        }
    }
}

impl EarConfig {
    pub fn from_voice_config(cfg: &roomguard_core::VoiceConfig) -> Self {
        let defaults = Self::default();
        let phrase_limit = Duration::try_from_secs_f64(cfg.phrase_limit_secs.max(0.5))
            .unwrap_or(defaults.phrase_limit);
        Self { phrase_limit, ..defaults }
    }
}

pub struct VoiceEar {
    config: EarConfig,
}

impl VoiceEar {
    pub fn new(config: EarConfig) -> Self {
        Self { config }
    }

    /// Open the microphone and start the VAD worker. Capture stops when the
    /// returned handle is dropped.
    pub fn start_listening(self) -> VoiceResult<EarHandle> {
        let config = self.config;
        let capture = AudioCapture::new(AudioConfig {
            sample_rate: config.sample_rate,
            channels: 1,
            buffer_size: config.chunk_size,
        })?;

        let vad_config = VadConfig {
            sample_rate: config.sample_rate,
            mode: config.vad_mode,
        };

        let (audio_tx, audio_rx) = mpsc::channel::<AudioChunk>();
        let stream = capture.start_capture(audio_tx)?;

        let (turn_tx, turn_rx) = mpsc::channel::<AudioTurn>();
        let listening = Arc::new(AtomicBool::new(false));
        let speaking = Arc::new(AtomicBool::new(false));

        let (mut turns, mut events) = TurnManager::new(TurnConfig {
            silence_threshold: Duration::from_millis(config.gap_ms),
            min_speech_duration: Duration::from_millis(config.min_speech_ms),
            max_turn_duration: config.phrase_limit,
            sample_rate: config.sample_rate,
        });

        let worker_listening = Arc::clone(&listening);
        let worker_speaking = Arc::clone(&speaking);
        let sample_rate = config.sample_rate;
        info!(gap_ms = config.gap_ms, phrase_limit = ?config.phrase_limit, "ear listening");

        // cpal Stream is !Send on some platforms, so it stays with the handle and only
        // the chunk receiver moves to the worker. The loop ends when the stream drops.
        thread::spawn(move || {
            // The VAD holds a raw C handle, so it is built on the thread that uses it.
            let mut vad = match VadDetector::new(vad_config) {
                Ok(v) => v,
                Err(e) => {
                    error!("Ear: VAD init failed: {}", e);
                    return;
                }
            };
            while let Ok(chunk) = audio_rx.recv() {
                if !worker_listening.load(Ordering::SeqCst) {
                    turns.reset();
                    worker_speaking.store(false, Ordering::SeqCst);
                    continue;
                }
                if chunk.samples.len() != vad.chunk_size() {
                    continue;
                }
                let is_speech = match vad.is_speech(&chunk.samples) {
                    Ok(s) => s,
                    Err(e) => {
                        debug!("Ear: VAD error: {}", e);
                        continue;
                    }
                };
                if let Err(e) = turns.process_vad_result(is_speech, &chunk.samples) {
                    error!("Ear: turn manager error: {}", e);
                    break;
                }
                while let Ok(ev) = events.try_recv() {
                    match ev {
                        TurnEvent::SpeechStarted { .. } => worker_speaking.store(true, Ordering::SeqCst),
                        TurnEvent::TurnDropped { .. } => worker_speaking.store(false, Ordering::SeqCst),
                        TurnEvent::TurnCommitted {
                            timestamp,
                            speech_duration,
                            audio_samples,
                        } => {
                            worker_speaking.store(false, Ordering::SeqCst);
                            let turn = AudioTurn {
                                samples: audio_samples,
                                timestamp,
                                duration: speech_duration,
                                sample_rate,
                            };
                            if turn_tx.send(turn).is_err() {
                                warn!("Ear: turn receiver dropped");
                                return;
                            }
                        }
                    }
                }
            }
            debug!("Ear: audio stream closed, worker exiting");
        });

        Ok(EarHandle {
            _stream: stream,
            turn_rx,
            listening,
            speaking,
            grace: config.phrase_limit + Duration::from_millis(config.gap_ms),
        })
    }
}

/// Keeps the capture stream alive. Drop to stop listening.
pub struct EarHandle {
    _stream: Stream,
    turn_rx: mpsc::Receiver<AudioTurn>,
    listening: Arc<AtomicBool>,
    speaking: Arc<AtomicBool>,
    /// Extra wait once speech has started: the phrase limit plus one gap.
    grace: Duration,
}

impl TurnSource for EarHandle {
    fn next_turn(&self, window: Duration) -> Option<AudioTurn> {
        while self.turn_rx.try_recv().is_ok() {}
        self.listening.store(true, Ordering::SeqCst);

        let turn = match self.turn_rx.recv_timeout(window) {
            Ok(turn) => Some(turn),
            Err(RecvTimeoutError::Timeout) if self.speaking.load(Ordering::SeqCst) => {
                debug!("speech in progress at window end, waiting for phrase");
                self.turn_rx.recv_timeout(self.grace).ok()
            }
            Err(_) => None,
        };

        self.listening.store(false, Ordering::SeqCst);
        turn
    }
}
